//! Pricing and lifecycle rules shared by checkout, the seller dashboard and
//! courier webhooks.

use rust_decimal::Decimal;

use aquamart_core::OrderStatus;
use aquamart_storefront::config::ShopConfig;
use aquamart_storefront::models::Totals;
use aquamart_storefront::models::cart::merged_quantity;
use aquamart_storefront::shipmozo::webhook::map_status;

#[test]
fn test_shipping_fee_below_threshold_only() {
    let shop = ShopConfig::default();

    let small = Totals::for_subtotal(Decimal::from(998), &shop);
    assert_eq!(small.shipping_fee, shop.shipping_fee);
    assert_eq!(small.total, Decimal::from(998) + shop.shipping_fee);

    let at_threshold = Totals::for_subtotal(shop.free_shipping_threshold, &shop);
    assert_eq!(at_threshold.shipping_fee, Decimal::ZERO);
    assert_eq!(at_threshold.total, shop.free_shipping_threshold);

    let empty = Totals::for_subtotal(Decimal::ZERO, &shop);
    assert_eq!(empty.total, Decimal::ZERO);
}

#[test]
fn test_custom_shop_rules_apply() {
    let shop = ShopConfig {
        free_shipping_threshold: Decimal::from(2500),
        shipping_fee: Decimal::new(7950, 2),
        cod_enabled: false,
    };
    let totals = Totals::for_subtotal(Decimal::new(199_900, 2), &shop);
    assert_eq!(totals.total, Decimal::new(207_850, 2));
}

#[test]
fn test_cart_merge_caps_at_stock() {
    assert_eq!(merged_quantity(2, 3, 10), 5);
    assert_eq!(merged_quantity(8, 5, 10), 10);
}

#[test]
fn test_courier_updates_follow_lifecycle() {
    let mut status = OrderStatus::Processing;
    for raw in ["Picked Up", "In Transit", "Out For Delivery", "Delivered"] {
        let next = map_status(raw).expect("mapped status");
        assert!(status.can_transition_to(next), "{status} -> {next}");
        status = next;
    }
    assert_eq!(status, OrderStatus::Delivered);

    // Late scans never move an order backwards.
    let late = map_status("in_transit").expect("mapped status");
    assert!(!status.can_transition_to(late));
}

#[test]
fn test_courier_cancel_only_before_dispatch() {
    let cancelled = map_status("Cancelled").expect("mapped status");
    assert!(OrderStatus::Processing.can_transition_to(cancelled));
    assert!(!OrderStatus::Shipped.can_transition_to(cancelled));

    let returned = map_status("RTO Delivered").expect("mapped status");
    assert_eq!(returned, OrderStatus::Returned);
    assert!(OrderStatus::InTransit.can_transition_to(returned));
    assert!(!OrderStatus::Confirmed.can_transition_to(returned));
}

#[test]
fn test_customer_cancel_window() {
    assert!(OrderStatus::Pending.is_cancellable_by_customer());
    assert!(OrderStatus::Confirmed.is_cancellable_by_customer());
    assert!(!OrderStatus::Processing.is_cancellable_by_customer());
    assert!(!OrderStatus::Delivered.is_cancellable_by_customer());
}

//! Checkout and the order lifecycle.
//!
//! Every status change goes through [`OrderRepository::apply_status_change`],
//! which only moves an order that is still in the status we read. After a
//! change the customer gets a stored notification, a live push and an email.

use rand::Rng;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use aquamart_core::{
    NotificationKind, OrderId, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus,
    StatusSource, UserId,
};

use crate::config::ShopConfig;
use crate::db::orders::{HistoryNote, NewOrder, StatusChange, TrackingUpdate};
use crate::db::shipments::NewShipmentEvent;
use crate::db::{
    CartRepository, OrderRepository, RepositoryError, ShipmentEventRepository, UserRepository,
};
use crate::error::add_breadcrumb;
use crate::models::order::NewOrderItem;
use crate::models::{
    CartLine, CheckoutRequest, CurrentUser, NewNotification, Order, OrderDetail, PaymentOrder,
    ShipRequest, Totals, ValidationError, VerifyPaymentRequest,
};
use crate::razorpay::types::WebhookEvent;
use crate::razorpay::{RazorpayClient, RazorpayError};
use crate::services::email::{EmailService, status_label};
use crate::services::notifier::{NotificationHub, Notifier};
use crate::services::shop_today;
use crate::shipmozo::types::CourierAssignment;
use crate::shipmozo::webhook::ShipmentWebhook;
use crate::shipmozo::{ShipMozoClient, ShipMozoError};

/// Fresh order numbers tried before giving up.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// Errors from checkout and order lifecycle operations.
///
/// Display strings are shown to clients.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("{0} is no longer available")]
    ProductUnavailable(String),

    #[error("Not enough stock for {0}")]
    InsufficientStock(String),

    #[error("Cannot move an order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Orders that are {0} can no longer be cancelled")]
    NotCancellable(OrderStatus),

    #[error("Cash on delivery is not available")]
    CodDisabled,

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] ValidationError),

    #[error("This order is not awaiting online payment")]
    NotPayable,

    #[error("This order has already been paid")]
    AlreadyPaid,

    #[error("Payment verification failed")]
    PaymentVerificationFailed,

    #[error("Order has already been shipped (AWB {0})")]
    AlreadyShipped(String),

    #[error("The order was updated meanwhile, please refresh")]
    Concurrent,

    #[error("Could not allocate an order number")]
    NumberExhausted,

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] RazorpayError),

    #[error("Shipping partner error: {0}")]
    Shipping(#[from] ShipMozoError),
}

/// What a courier webhook did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipmentOutcome {
    /// Same AWB, status and time already handled.
    Duplicate,
    /// No order matches the AWB or reference.
    Unmatched,
    /// Stored, but the courier status does not map to an order status.
    Recorded,
    /// Stored, but the move is not a valid forward step.
    Ignored { from: OrderStatus, to: OrderStatus },
    /// The order moved to this status.
    Applied(OrderStatus),
}

impl ShipmentOutcome {
    /// Acknowledgement text returned to the courier.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Duplicate => "Duplicate event ignored".to_string(),
            Self::Unmatched => "No matching order".to_string(),
            Self::Recorded => "Event recorded".to_string(),
            Self::Ignored { from, to } => format!("Event recorded, {from} -> {to} not applied"),
            Self::Applied(status) => format!("Order updated to {status}"),
        }
    }
}

/// Order operations for customers, sellers and integrations.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    hub: &'a NotificationHub,
    email: Option<&'a EmailService>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        hub: &'a NotificationHub,
        email: Option<&'a EmailService>,
    ) -> Self {
        Self { pool, hub, email }
    }

    /// Turn the customer's cart into an order.
    ///
    /// COD orders are confirmed immediately; online orders wait in `pending`
    /// until the payment is verified.
    ///
    /// # Errors
    ///
    /// Returns validation errors for the address, cart and stock, and
    /// `OrderError::Repository` if storage fails.
    #[instrument(skip(self, user, request, shop), fields(user_id = %user.id, method = %request.payment_method))]
    pub async fn checkout(
        &self,
        user: &CurrentUser,
        request: &CheckoutRequest,
        shop: &ShopConfig,
    ) -> Result<OrderDetail, OrderError> {
        request.address.validate()?;
        if request.payment_method == PaymentMethod::Cod && !shop.cod_enabled {
            return Err(OrderError::CodDisabled);
        }

        let lines: Vec<CartLine> = CartRepository::new(self.pool)
            .lines(user.id)
            .await?
            .into_iter()
            .map(CartLine::from)
            .collect();
        let items = checkout_items(&lines)?;
        let totals = Totals::for_subtotal(items.iter().map(NewOrderItem::line_total).sum(), shop);
        let (status, history) = opening_history(request.payment_method);

        let repo = OrderRepository::new(self.pool);
        let today = shop_today();
        let mut placed = None;
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let order_number = OrderNumber::new(today, rand::rng().random_range(0..=999_999))
                .map_err(|_| OrderError::NumberExhausted)?;
            let new_order = NewOrder {
                order_number: &order_number,
                user_id: user.id,
                status,
                payment_method: request.payment_method,
                totals,
                shipping_address: &request.address,
                items: &items,
                history: &history,
            };
            match repo.create(&new_order).await {
                Ok(Some(order)) => {
                    placed = Some(order);
                    break;
                }
                Ok(None) => debug!(%order_number, "order number taken, retrying"),
                Err(RepositoryError::Conflict(product)) => {
                    return Err(OrderError::InsufficientStock(product));
                }
                Err(e) => return Err(e.into()),
            }
        }
        let order = placed.ok_or(OrderError::NumberExhausted)?;

        let items = repo.items(order.id).await?;
        let history = repo.history(order.id).await?;

        info!(
            order_number = %order.order_number,
            total = %order.total,
            status = %order.status,
            "order placed"
        );
        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("order_number", order.order_number.as_str())]),
        );

        let notifier = Notifier::new(self.pool, self.hub);
        notifier
            .deliver(NewNotification {
                user_id: user.id,
                kind: NotificationKind::OrderPlaced,
                title: "Order placed".to_string(),
                message: format!(
                    "Your order {} for {} has been placed.",
                    order.order_number,
                    aquamart_core::Price::inr(order.total)
                ),
                order_id: Some(order.id),
            })
            .await;
        if let Err(e) = notifier
            .notify_sellers(
                NotificationKind::OrderPlaced,
                "New order",
                &format!(
                    "{} placed {} ({}, {} items)",
                    user.name,
                    order.order_number,
                    aquamart_core::Price::inr(order.total),
                    items.iter().map(|i| i.quantity).sum::<i32>()
                ),
                Some(order.id),
            )
            .await
        {
            warn!(order_number = %order.order_number, error = %e, "failed to notify sellers");
        }

        if let Some(email) = self.email.cloned() {
            let to = user.email.to_string();
            let name = user.name.clone();
            let order = order.clone();
            let items = items.clone();
            tokio::spawn(async move {
                if let Err(e) = email.send_order_confirmation(&to, &name, &order, &items).await {
                    warn!(order_number = %order.order_number, error = %e, "failed to send order confirmation");
                }
            });
        }

        Ok(OrderDetail {
            order,
            items,
            history,
        })
    }

    /// An order with its items and timeline. `owner` restricts it to one customer.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if it doesn't exist or belongs to someone else.
    pub async fn detail(&self, id: OrderId, owner: Option<UserId>) -> Result<OrderDetail, OrderError> {
        let repo = OrderRepository::new(self.pool);
        let order = match owner {
            Some(user_id) => repo.get_for_user(user_id, id).await?,
            None => repo.get(id).await?,
        }
        .ok_or(OrderError::NotFound)?;
        let items = repo.items(order.id).await?;
        let history = repo.history(order.id).await?;
        Ok(OrderDetail {
            order,
            items,
            history,
        })
    }

    /// Customer cancellation: puts the stock back, paid orders become `refunded`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotCancellable` once the shipment is booked.
    #[instrument(skip(self, reason))]
    pub async fn cancel_by_customer(
        &self,
        user_id: UserId,
        id: OrderId,
        reason: Option<&str>,
    ) -> Result<Order, OrderError> {
        let repo = OrderRepository::new(self.pool);
        let order = repo
            .get_for_user(user_id, id)
            .await?
            .ok_or(OrderError::NotFound)?;
        if !order.status.is_cancellable_by_customer() {
            return Err(OrderError::NotCancellable(order.status));
        }

        let note = cancellation_note(reason, order.payment_status);
        let change = transition(&order, OrderStatus::Cancelled, Some(&note), StatusSource::Customer);
        let updated = repo
            .apply_status_change(order.id, &change)
            .await?
            .ok_or(OrderError::Concurrent)?;

        info!(order_number = %updated.order_number, "order cancelled by customer");
        self.announce_status(&updated, Some(&note)).await;
        Ok(updated)
    }

    /// Seller moves an order along its lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` for moves the lifecycle forbids.
    #[instrument(skip(self, note))]
    pub async fn update_status(
        &self,
        id: OrderId,
        to: OrderStatus,
        note: Option<&str>,
    ) -> Result<Order, OrderError> {
        let repo = OrderRepository::new(self.pool);
        let order = repo.get(id).await?.ok_or(OrderError::NotFound)?;
        if !order.status.can_transition_to(to) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to,
            });
        }

        let note = note.map(str::trim).filter(|n| !n.is_empty());
        let change = transition(&order, to, note, StatusSource::Seller);
        let updated = repo
            .apply_status_change(order.id, &change)
            .await?
            .ok_or(OrderError::Concurrent)?;

        info!(order_number = %updated.order_number, from = %order.status, to = %to, "order status updated");
        self.announce_status(&updated, note).await;
        Ok(updated)
    }

    /// Book the shipment with `ShipMozo` and move a confirmed order to `processing`.
    ///
    /// Safe to retry: an order already pushed to `ShipMozo` is not pushed again.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::AlreadyShipped` once an AWB is assigned and
    /// `OrderError::Shipping` if `ShipMozo` rejects a call.
    #[instrument(skip(self, request, shipmozo))]
    pub async fn ship(
        &self,
        id: OrderId,
        request: &ShipRequest,
        shipmozo: &ShipMozoClient,
    ) -> Result<Order, OrderError> {
        let repo = OrderRepository::new(self.pool);
        let order = repo.get(id).await?.ok_or(OrderError::NotFound)?;
        if let Some(awb) = &order.awb_number {
            return Err(OrderError::AlreadyShipped(awb.clone()));
        }
        if !matches!(order.status, OrderStatus::Confirmed | OrderStatus::Processing) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Processing,
            });
        }

        let shipmozo_order_id = if let Some(existing) = order.shipmozo_order_id.clone() {
            existing
        } else {
            let items = repo.items(order.id).await?;
            let customer = UserRepository::new(self.pool).get_by_id(order.user_id).await?;
            let pushed = shipmozo
                .push_order(
                    &order,
                    &items,
                    customer.as_ref().map(|c| c.email.as_str()),
                    request,
                )
                .await?;
            repo.update_tracking(
                order.id,
                &TrackingUpdate {
                    shipmozo_order_id: Some(&pushed.order_id),
                    ..TrackingUpdate::default()
                },
            )
            .await?;
            pushed.order_id
        };

        let assignment = shipmozo
            .assign_courier(&shipmozo_order_id, request.courier_id.as_deref())
            .await?;
        let mut order = repo
            .update_tracking(
                order.id,
                &TrackingUpdate {
                    awb_number: Some(&assignment.awb_number),
                    courier_name: assignment.courier_name.as_deref(),
                    ..TrackingUpdate::default()
                },
            )
            .await?;
        info!(
            order_number = %order.order_number,
            awb = %assignment.awb_number,
            "shipment booked"
        );

        if order.status == OrderStatus::Confirmed {
            let note = shipment_note(&assignment);
            let change = transition(&order, OrderStatus::Processing, Some(&note), StatusSource::Seller);
            if let Some(updated) = repo.apply_status_change(order.id, &change).await? {
                order = updated;
                self.announce_status(&order, Some(&note)).await;
            }
        }
        Ok(order)
    }

    /// Create the Razorpay order the browser checkout pays against.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotPayable` unless this is the caller's unpaid
    /// online order, `OrderError::Gateway` if Razorpay fails.
    #[instrument(skip(self, razorpay))]
    pub async fn start_payment(
        &self,
        user_id: UserId,
        id: OrderId,
        razorpay: &RazorpayClient,
    ) -> Result<PaymentOrder, OrderError> {
        let repo = OrderRepository::new(self.pool);
        let order = repo
            .get_for_user(user_id, id)
            .await?
            .ok_or(OrderError::NotFound)?;
        if order.payment_status == PaymentStatus::Paid {
            return Err(OrderError::AlreadyPaid);
        }
        if !order.awaits_online_payment() {
            return Err(OrderError::NotPayable);
        }

        let razorpay_order = razorpay
            .create_order(order.total, &order.order_number)
            .await?;
        repo.set_razorpay_order_id(order.id, &razorpay_order.id)
            .await?;

        Ok(PaymentOrder {
            key_id: razorpay.key_id().to_owned(),
            razorpay_order_id: razorpay_order.id,
            amount: razorpay_order.amount,
            currency: razorpay_order.currency,
            order_id: order.id,
            order_number: order.order_number,
        })
    }

    /// Check the checkout signature and record the payment.
    ///
    /// Verifying an already paid order succeeds without changes.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::PaymentVerificationFailed` on a bad signature,
    /// after marking the payment failed.
    #[instrument(skip(self, request, razorpay), fields(razorpay_order_id = %request.razorpay_order_id))]
    pub async fn verify_payment(
        &self,
        user_id: UserId,
        request: &VerifyPaymentRequest,
        razorpay: &RazorpayClient,
    ) -> Result<Order, OrderError> {
        let order = OrderRepository::new(self.pool)
            .find_by_razorpay_order_id(&request.razorpay_order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(OrderError::NotFound)?;
        if order.payment_status == PaymentStatus::Paid {
            return Ok(order);
        }

        if razorpay
            .verify_payment_signature(
                &request.razorpay_order_id,
                &request.razorpay_payment_id,
                &request.razorpay_signature,
            )
            .is_err()
        {
            warn!(order_number = %order.order_number, "payment signature mismatch");
            self.record_payment_failure(&order, "Payment could not be verified")
                .await?;
            return Err(OrderError::PaymentVerificationFailed);
        }

        self.mark_paid(order, &request.razorpay_payment_id).await
    }

    /// Apply a verified Razorpay webhook. Returns an acknowledgement message.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if storage fails.
    #[instrument(skip(self, event), fields(event = %event.event))]
    pub async fn handle_payment_event(&self, event: &WebhookEvent) -> Result<&'static str, OrderError> {
        let Some(payment) = event.payment() else {
            return Ok("Event ignored");
        };
        let Some(razorpay_order_id) = payment.order_id.as_deref() else {
            return Ok("Event ignored");
        };
        let Some(order) = OrderRepository::new(self.pool)
            .find_by_razorpay_order_id(razorpay_order_id)
            .await?
        else {
            warn!(razorpay_order_id, "payment event for unknown order");
            return Ok("No matching order");
        };

        match event.event.as_str() {
            "payment.captured" | "order.paid" => {
                self.mark_paid(order, &payment.id).await?;
                Ok("Payment recorded")
            }
            "payment.failed" => {
                let reason = payment
                    .error_description
                    .as_deref()
                    .unwrap_or("Payment failed");
                self.record_payment_failure(&order, reason).await?;
                Ok("Payment failure recorded")
            }
            _ => Ok("Event ignored"),
        }
    }

    /// Apply a `ShipMozo` status webhook.
    ///
    /// Each (AWB, status, time) is processed once. An event stays unhandled
    /// until processing finishes, so a courier retry after a failure or an
    /// event that arrived before its order could be matched is processed
    /// again. Unknown statuses and backwards moves are stored but leave the
    /// order alone.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if storage fails.
    #[instrument(skip(self, hook, payload), fields(status = %hook.current_status))]
    pub async fn apply_shipment_event(
        &self,
        hook: &ShipmentWebhook,
        payload: &Value,
    ) -> Result<ShipmentOutcome, OrderError> {
        let awb = hook.awb();
        let reference = hook.reference();
        let mapped = hook.mapped_status();

        let repo = OrderRepository::new(self.pool);
        let order = repo.find_for_shipment(awb, reference).await?;

        let events = ShipmentEventRepository::new(self.pool);
        let event = events
            .record(&NewShipmentEvent {
                order_id: order.as_ref().map(|o| o.id),
                awb_number: awb.or(reference).unwrap_or_default(),
                raw_status: hook.current_status.trim(),
                status_time: hook.status_time(),
                mapped_status: mapped,
                payload,
            })
            .await?;
        if event.handled {
            return Ok(ShipmentOutcome::Duplicate);
        }

        let Some(mut order) = order else {
            warn!(awb, reference, "courier event for unknown order");
            return Ok(ShipmentOutcome::Unmatched);
        };

        let tracking = TrackingUpdate {
            shipmozo_order_id: None,
            awb_number: awb.filter(|a| order.awb_number.as_deref() != Some(*a)),
            courier_name: non_blank(hook.courier.as_deref()),
            expected_delivery_date: non_blank(hook.expected_delivery_date.as_deref()),
        };
        if tracking.awb_number.is_some()
            || tracking.courier_name.is_some()
            || tracking.expected_delivery_date.is_some()
        {
            match repo.update_tracking(order.id, &tracking).await {
                Ok(updated) => order = updated,
                Err(RepositoryError::Conflict(message)) => {
                    warn!(order_number = %order.order_number, %message, "tracking not updated");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let Some(to) = mapped else {
            events.mark_handled(event.id).await?;
            return Ok(ShipmentOutcome::Recorded);
        };
        let from = order.status;
        if !from.can_transition_to(to) {
            debug!(order_number = %order.order_number, %from, %to, "courier status not applied");
            events.mark_handled(event.id).await?;
            return Ok(ShipmentOutcome::Ignored { from, to });
        }

        let note = format!("Courier update: {}", hook.current_status.trim());
        let mut change = transition(&order, to, Some(&note), StatusSource::Webhook);
        change.shipment_event_id = Some(event.id);
        let Some(updated) = repo.apply_status_change(order.id, &change).await? else {
            events.mark_handled(event.id).await?;
            return Ok(ShipmentOutcome::Ignored { from, to });
        };

        info!(order_number = %updated.order_number, %from, %to, "courier status applied");
        self.announce_status(&updated, Some(&note)).await;
        Ok(ShipmentOutcome::Applied(to))
    }

    async fn mark_paid(&self, order: Order, razorpay_payment_id: &str) -> Result<Order, OrderError> {
        if order.payment_status == PaymentStatus::Paid {
            return Ok(order);
        }
        let repo = OrderRepository::new(self.pool);

        if order.status == OrderStatus::Pending {
            let note = "Payment received";
            let mut change = transition(&order, OrderStatus::Confirmed, Some(note), StatusSource::Payment);
            change.payment_status = Some(PaymentStatus::Paid);
            change.razorpay_payment_id = Some(razorpay_payment_id);
            if let Some(updated) = repo.apply_status_change(order.id, &change).await? {
                info!(order_number = %updated.order_number, "payment received, order confirmed");
                self.announce_status(&updated, Some(note)).await;
                return Ok(updated);
            }
        }

        // Money arrived for an order that has moved on (usually cancelled).
        let payment_status = if order.status == OrderStatus::Cancelled {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::Paid
        };
        let updated = repo
            .set_payment_status(order.id, payment_status, Some(razorpay_payment_id))
            .await?;
        info!(order_number = %updated.order_number, %payment_status, "late payment recorded");
        Notifier::new(self.pool, self.hub)
            .deliver(NewNotification {
                user_id: updated.user_id,
                kind: NotificationKind::Payment,
                title: "Payment received".to_string(),
                message: if payment_status == PaymentStatus::Refunded {
                    format!(
                        "We received your payment for cancelled order {}. It will be refunded.",
                        updated.order_number
                    )
                } else {
                    format!("We received your payment for order {}.", updated.order_number)
                },
                order_id: Some(updated.id),
            })
            .await;
        Ok(updated)
    }

    async fn record_payment_failure(&self, order: &Order, reason: &str) -> Result<(), OrderError> {
        if order.payment_status == PaymentStatus::Paid {
            return Ok(());
        }
        OrderRepository::new(self.pool)
            .set_payment_status(order.id, PaymentStatus::Failed, None)
            .await?;
        info!(order_number = %order.order_number, reason, "payment failed");
        Notifier::new(self.pool, self.hub)
            .deliver(NewNotification {
                user_id: order.user_id,
                kind: NotificationKind::Payment,
                title: "Payment failed".to_string(),
                message: format!(
                    "Payment for order {} failed: {reason}. You can try again from your orders page.",
                    order.order_number
                ),
                order_id: Some(order.id),
            })
            .await;
        Ok(())
    }

    /// Notification, live push and email for the order's current status.
    async fn announce_status(&self, order: &Order, note: Option<&str>) {
        Notifier::new(self.pool, self.hub)
            .deliver(NewNotification {
                user_id: order.user_id,
                kind: NotificationKind::OrderStatus,
                title: format!("Order {}", status_label(order.status).to_lowercase()),
                message: status_message(order),
                order_id: Some(order.id),
            })
            .await;

        let Some(email) = self.email.cloned() else {
            return;
        };
        let customer = match UserRepository::new(self.pool).get_by_id(order.user_id).await {
            Ok(Some(customer)) => customer,
            Ok(None) => return,
            Err(e) => {
                warn!(order_number = %order.order_number, error = %e, "customer lookup for email failed");
                return;
            }
        };
        let order = order.clone();
        let note = note.map(str::to_owned);
        tokio::spawn(async move {
            if let Err(e) = email
                .send_order_status(customer.email.as_str(), &customer.name, &order, note.as_deref())
                .await
            {
                warn!(order_number = %order.order_number, error = %e, "failed to send status email");
            }
        });
    }
}

/// Snapshot cart lines into order lines, rejecting what cannot be bought.
///
/// # Errors
///
/// Returns `EmptyCart`, `ProductUnavailable` or `InsufficientStock`.
pub fn checkout_items(lines: &[CartLine]) -> Result<Vec<NewOrderItem>, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyCart);
    }
    lines
        .iter()
        .map(|line| {
            if !line.is_active {
                return Err(OrderError::ProductUnavailable(line.name.clone()));
            }
            if line.stock < line.quantity {
                return Err(OrderError::InsufficientStock(line.name.clone()));
            }
            Ok(NewOrderItem {
                product_id: line.product_id,
                product_name: line.name.clone(),
                product_slug: line.slug.clone(),
                image_url: line.image.clone(),
                unit_price: line.price,
                quantity: line.quantity,
            })
        })
        .collect()
}

/// Initial status and timeline for a new order.
#[must_use]
pub fn opening_history(method: PaymentMethod) -> (OrderStatus, Vec<HistoryNote<'static>>) {
    match method {
        PaymentMethod::Cod => (
            OrderStatus::Confirmed,
            vec![
                HistoryNote {
                    status: OrderStatus::Pending,
                    note: Some("Order placed"),
                    source: StatusSource::Customer,
                },
                HistoryNote {
                    status: OrderStatus::Confirmed,
                    note: Some("Cash on delivery"),
                    source: StatusSource::System,
                },
            ],
        ),
        PaymentMethod::Online => (
            OrderStatus::Pending,
            vec![HistoryNote {
                status: OrderStatus::Pending,
                note: Some("Order placed, awaiting payment"),
                source: StatusSource::Customer,
            }],
        ),
    }
}

/// The guarded change for moving `order` to `to`, with its payment and stock
/// side effects.
#[must_use]
pub fn transition<'n>(
    order: &Order,
    to: OrderStatus,
    note: Option<&'n str>,
    source: StatusSource,
) -> StatusChange<'n> {
    let mut change = StatusChange::new(order.status, to, note, source);
    match to {
        OrderStatus::Cancelled => {
            change.restore_stock = true;
            if order.payment_status == PaymentStatus::Paid {
                change.payment_status = Some(PaymentStatus::Refunded);
            }
        }
        OrderStatus::Delivered
            if order.payment_method == PaymentMethod::Cod
                && order.payment_status != PaymentStatus::Paid =>
        {
            change.payment_status = Some(PaymentStatus::Paid);
        }
        _ => {}
    }
    change
}

/// One-line status text for notifications.
#[must_use]
pub fn status_message(order: &Order) -> String {
    let number = &order.order_number;
    match order.status {
        OrderStatus::Shipped | OrderStatus::InTransit | OrderStatus::OutForDelivery => {
            let mut message = format!(
                "Order {number} is {}.",
                status_label(order.status).to_lowercase()
            );
            if let Some(awb) = &order.awb_number {
                message.push_str(&format!(" AWB {awb}"));
                if let Some(courier) = &order.courier_name {
                    message.push_str(&format!(" ({courier})"));
                }
                message.push('.');
            }
            message
        }
        OrderStatus::Delivered => format!("Order {number} has been delivered."),
        OrderStatus::Cancelled if order.payment_status == PaymentStatus::Refunded => {
            format!("Order {number} has been cancelled. Your payment will be refunded.")
        }
        OrderStatus::Cancelled => format!("Order {number} has been cancelled."),
        OrderStatus::Returned => format!("Order {number} is being returned to us."),
        OrderStatus::Processing => format!("Order {number} is being packed."),
        OrderStatus::Confirmed => format!("Order {number} is confirmed."),
        OrderStatus::Pending => format!("Order {number} is awaiting payment."),
    }
}

fn cancellation_note(reason: Option<&str>, payment_status: PaymentStatus) -> String {
    let mut note = match non_blank(reason) {
        Some(reason) => format!("Cancelled by customer: {reason}"),
        None => "Cancelled by customer".to_string(),
    };
    if payment_status == PaymentStatus::Paid {
        note.push_str(". Refund pending");
    }
    note
}

fn shipment_note(assignment: &CourierAssignment) -> String {
    match &assignment.courier_name {
        Some(courier) => format!("Shipment booked with {courier}, AWB {}", assignment.awb_number),
        None => format!("Shipment booked, AWB {}", assignment.awb_number),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use aquamart_core::ProductId;

    use super::*;
    use crate::models::ShippingAddress;

    fn line(name: &str, stock: i32, quantity: i32, is_active: bool) -> CartLine {
        CartLine {
            product_id: ProductId::new(1),
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            price: Decimal::new(49950, 2),
            image: None,
            stock,
            is_active,
            quantity,
            line_total: Decimal::new(49950, 2) * Decimal::from(quantity),
        }
    }

    fn order(status: OrderStatus, method: PaymentMethod, payment: PaymentStatus) -> Order {
        let address: ShippingAddress = serde_json::from_value(serde_json::json!({
            "name": "Asha Rao",
            "phone": "9845012345",
            "line1": "12, 4th Cross",
            "city": "Bengaluru",
            "state": "Karnataka",
            "pincode": "560038"
        }))
        .unwrap();
        Order {
            id: OrderId::new(42),
            order_number: "AQ261016000042".to_string(),
            user_id: UserId::new(7),
            status,
            payment_method: method,
            payment_status: payment,
            subtotal: Decimal::new(999, 0),
            shipping_fee: Decimal::ZERO,
            total: Decimal::new(999, 0),
            shipping_address: address,
            razorpay_order_id: None,
            razorpay_payment_id: None,
            shipmozo_order_id: None,
            awb_number: None,
            courier_name: None,
            expected_delivery_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_checkout_items_rejects_empty_cart() {
        assert!(matches!(checkout_items(&[]), Err(OrderError::EmptyCart)));
    }

    #[test]
    fn test_checkout_items_checks_availability() {
        let err = checkout_items(&[line("Carbon filter", 5, 1, false)]).unwrap_err();
        assert_eq!(err.to_string(), "Carbon filter is no longer available");

        let err = checkout_items(&[line("Carbon filter", 1, 2, true)]).unwrap_err();
        assert_eq!(err.to_string(), "Not enough stock for Carbon filter");

        let items = checkout_items(&[line("Carbon filter", 2, 2, true)]).unwrap();
        assert_eq!(items[0].product_slug, "carbon-filter");
        assert_eq!(items[0].line_total(), Decimal::new(99900, 2));
    }

    #[test]
    fn test_opening_history() {
        let (status, history) = opening_history(PaymentMethod::Cod);
        assert_eq!(status, OrderStatus::Confirmed);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].source, StatusSource::System);

        let (status, history) = opening_history(PaymentMethod::Online);
        assert_eq!(status, OrderStatus::Pending);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_transition_cancel_restores_stock_and_refunds() {
        let paid = order(OrderStatus::Confirmed, PaymentMethod::Online, PaymentStatus::Paid);
        let change = transition(&paid, OrderStatus::Cancelled, None, StatusSource::Customer);
        assert!(change.restore_stock);
        assert_eq!(change.payment_status, Some(PaymentStatus::Refunded));

        let unpaid = order(OrderStatus::Pending, PaymentMethod::Online, PaymentStatus::Pending);
        let change = transition(&unpaid, OrderStatus::Cancelled, None, StatusSource::Customer);
        assert!(change.restore_stock);
        assert_eq!(change.payment_status, None);
    }

    #[test]
    fn test_transition_cod_delivery_marks_paid() {
        let cod = order(OrderStatus::OutForDelivery, PaymentMethod::Cod, PaymentStatus::Pending);
        let change = transition(&cod, OrderStatus::Delivered, None, StatusSource::Webhook);
        assert_eq!(change.payment_status, Some(PaymentStatus::Paid));
        assert!(!change.restore_stock);

        let online = order(OrderStatus::OutForDelivery, PaymentMethod::Online, PaymentStatus::Paid);
        let change = transition(&online, OrderStatus::Delivered, None, StatusSource::Webhook);
        assert_eq!(change.payment_status, None);
    }

    #[test]
    fn test_status_message_includes_tracking() {
        let mut shipped = order(OrderStatus::InTransit, PaymentMethod::Cod, PaymentStatus::Pending);
        shipped.awb_number = Some("1234567890".to_string());
        shipped.courier_name = Some("Delhivery".to_string());
        assert_eq!(
            status_message(&shipped),
            "Order AQ261016000042 is in transit. AWB 1234567890 (Delhivery)."
        );
    }

    #[test]
    fn test_cancellation_note() {
        assert_eq!(
            cancellation_note(Some("  ordered twice "), PaymentStatus::Pending),
            "Cancelled by customer: ordered twice"
        );
        assert_eq!(
            cancellation_note(None, PaymentStatus::Paid),
            "Cancelled by customer. Refund pending"
        );
    }

    #[test]
    fn test_shipment_outcome_messages() {
        assert_eq!(
            ShipmentOutcome::Applied(OrderStatus::Delivered).message(),
            "Order updated to delivered"
        );
        assert_eq!(
            ShipmentOutcome::Ignored {
                from: OrderStatus::Delivered,
                to: OrderStatus::InTransit
            }
            .message(),
            "Event recorded, delivered -> in_transit not applied"
        );
    }
}

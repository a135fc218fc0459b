//! Transactional email: order confirmations, status updates, booking updates.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and text templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;

use aquamart_core::Price;

use crate::config::EmailConfig;
use crate::models::{Booking, Order, OrderItem};

/// One line of an order as shown in email.
struct ItemLine {
    name: String,
    quantity: i32,
    line_total: String,
}

/// HTML template for order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    name: &'a str,
    order_number: &'a str,
    items: &'a [ItemLine],
    subtotal: &'a str,
    shipping_fee: &'a str,
    total: &'a str,
    payment_method: &'a str,
    address: &'a str,
    order_url: &'a str,
}

/// Plain text template for order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    name: &'a str,
    order_number: &'a str,
    items: &'a [ItemLine],
    subtotal: &'a str,
    shipping_fee: &'a str,
    total: &'a str,
    payment_method: &'a str,
    address: &'a str,
    order_url: &'a str,
}

/// HTML template for order status updates.
#[derive(Template)]
#[template(path = "email/order_status.html")]
struct OrderStatusHtml<'a> {
    name: &'a str,
    order_number: &'a str,
    status: &'a str,
    note: Option<&'a str>,
    courier: Option<&'a str>,
    awb: Option<&'a str>,
    expected_delivery: Option<&'a str>,
    order_url: &'a str,
}

/// Plain text template for order status updates.
#[derive(Template)]
#[template(path = "email/order_status.txt")]
struct OrderStatusText<'a> {
    name: &'a str,
    order_number: &'a str,
    status: &'a str,
    note: Option<&'a str>,
    courier: Option<&'a str>,
    awb: Option<&'a str>,
    expected_delivery: Option<&'a str>,
    order_url: &'a str,
}

/// HTML template for booking updates.
#[derive(Template)]
#[template(path = "email/booking_update.html")]
struct BookingUpdateHtml<'a> {
    name: &'a str,
    service: &'a str,
    status: &'a str,
    date: &'a str,
    slot: &'a str,
    technician: Option<&'a str>,
}

/// Plain text template for booking updates.
#[derive(Template)]
#[template(path = "email/booking_update.txt")]
struct BookingUpdateText<'a> {
    name: &'a str,
    service: &'a str,
    status: &'a str,
    date: &'a str,
    slot: &'a str,
    technician: Option<&'a str>,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    frontend_origin: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, frontend_origin: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            frontend_origin: frontend_origin.trim_end_matches('/').to_owned(),
        })
    }

    /// Send the order confirmation.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        name: &str,
        order: &Order,
        items: &[OrderItem],
    ) -> Result<(), EmailError> {
        let lines: Vec<ItemLine> = items
            .iter()
            .map(|item| ItemLine {
                name: item.product_name.clone(),
                quantity: item.quantity,
                line_total: rupees(item.line_total),
            })
            .collect();
        let subtotal = rupees(order.subtotal);
        let shipping_fee = rupees(order.shipping_fee);
        let total = rupees(order.total);
        let address = order.shipping_address.one_line();
        let order_url = self.order_url(order);
        let payment_method = match order.payment_method {
            aquamart_core::PaymentMethod::Cod => "Cash on delivery",
            aquamart_core::PaymentMethod::Online => "Online payment",
        };

        let html = OrderConfirmationHtml {
            name,
            order_number: &order.order_number,
            items: &lines,
            subtotal: &subtotal,
            shipping_fee: &shipping_fee,
            total: &total,
            payment_method,
            address: &address,
            order_url: &order_url,
        }
        .render()?;
        let text = OrderConfirmationText {
            name,
            order_number: &order.order_number,
            items: &lines,
            subtotal: &subtotal,
            shipping_fee: &shipping_fee,
            total: &total,
            payment_method,
            address: &address,
            order_url: &order_url,
        }
        .render()?;

        let subject = format!("Order {} received", order.order_number);
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Send an order status update.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_status(
        &self,
        to: &str,
        name: &str,
        order: &Order,
        note: Option<&str>,
    ) -> Result<(), EmailError> {
        let status = status_label(order.status);
        let order_url = self.order_url(order);
        let courier = order.courier_name.as_deref();
        let awb = order.awb_number.as_deref();
        let expected_delivery = order.expected_delivery_date.as_deref();

        let html = OrderStatusHtml {
            name,
            order_number: &order.order_number,
            status,
            note,
            courier,
            awb,
            expected_delivery,
            order_url: &order_url,
        }
        .render()?;
        let text = OrderStatusText {
            name,
            order_number: &order.order_number,
            status,
            note,
            courier,
            awb,
            expected_delivery,
            order_url: &order_url,
        }
        .render()?;

        let subject = format!("Order {}: {status}", order.order_number);
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Send a booking update.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_booking_update(
        &self,
        to: &str,
        name: &str,
        booking: &Booking,
    ) -> Result<(), EmailError> {
        let service = booking.service.label();
        let status = booking_status_label(booking.status);
        let date = booking.preferred_date.format("%d %b %Y").to_string();
        let slot = booking.time_slot.as_str();
        let technician = booking.technician_name.as_deref();

        let html = BookingUpdateHtml {
            name,
            service,
            status,
            date: &date,
            slot,
            technician,
        }
        .render()?;
        let text = BookingUpdateText {
            name,
            service,
            status,
            date: &date,
            slot,
            technician,
        }
        .render()?;

        let subject = format!("{service} booking {status}");
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    fn order_url(&self, order: &Order) -> String {
        format!("{}/orders/{}", self.frontend_origin, order.id)
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

fn rupees(amount: Decimal) -> String {
    Price::inr(amount).to_string()
}

/// Customer-facing wording for an order status.
#[must_use]
pub const fn status_label(status: aquamart_core::OrderStatus) -> &'static str {
    use aquamart_core::OrderStatus;
    match status {
        OrderStatus::Pending => "Awaiting payment",
        OrderStatus::Confirmed => "Confirmed",
        OrderStatus::Processing => "Being packed",
        OrderStatus::Shipped => "Shipped",
        OrderStatus::InTransit => "In transit",
        OrderStatus::OutForDelivery => "Out for delivery",
        OrderStatus::Delivered => "Delivered",
        OrderStatus::Cancelled => "Cancelled",
        OrderStatus::Returned => "Returned",
    }
}

/// Customer-facing wording for a booking status.
#[must_use]
pub const fn booking_status_label(status: aquamart_core::BookingStatus) -> &'static str {
    use aquamart_core::BookingStatus;
    match status {
        BookingStatus::Requested => "requested",
        BookingStatus::Scheduled => "scheduled",
        BookingStatus::Completed => "completed",
        BookingStatus::Cancelled => "cancelled",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rupees_formatting() {
        assert_eq!(rupees(Decimal::new(149, 0)), "₹149.00");
        assert_eq!(rupees(Decimal::new(99950, 2)), "₹999.50");
    }

    #[test]
    fn test_status_text_template_renders_tracking() {
        let text = OrderStatusText {
            name: "Asha",
            order_number: "AQ261016000042",
            status: status_label(aquamart_core::OrderStatus::Shipped),
            note: None,
            courier: Some("Delhivery"),
            awb: Some("1234567890"),
            expected_delivery: None,
            order_url: "https://aquamart.in/orders/42",
        }
        .render()
        .unwrap();
        assert!(text.contains("AQ261016000042"));
        assert!(text.contains("Shipped"));
        assert!(text.contains("Delhivery"));
        assert!(text.contains("1234567890"));
    }

    #[test]
    fn test_confirmation_text_lists_items() {
        let items = vec![ItemLine {
            name: "RO+UV Purifier".to_string(),
            quantity: 1,
            line_total: rupees(Decimal::new(12999, 0)),
        }];
        let text = OrderConfirmationText {
            name: "Asha",
            order_number: "AQ261016000042",
            items: &items,
            subtotal: "₹12999.00",
            shipping_fee: "₹0.00",
            total: "₹12999.00",
            payment_method: "Cash on delivery",
            address: "Asha, 12 4th Cross, Bengaluru, Karnataka 560038",
            order_url: "https://aquamart.in/orders/42",
        }
        .render()
        .unwrap();
        assert!(text.contains("RO+UV Purifier x 1"));
        assert!(text.contains("Cash on delivery"));
    }
}

//! Notification Dispatcher Service
//!
//! Fetches invoice details from the payment processor and emails the admin,
//! and the buyer where allowed, about payment progress or failure.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tracing::{error, info, warn};

use crate::config::{BtcPayConfig, NotificationConfig};
use crate::models::invoice::{Invoice, InvoicePaymentMethod};
use crate::models::notification::{FailureReason, OutgoingEmail, PaymentEvent};
use crate::services::btcpay::InvoiceProvider;
use crate::services::email::{EmailTemplates, Mailer};

/// Notification dispatcher service
#[derive(Clone)]
pub struct NotificationDispatcher {
    provider: Arc<dyn InvoiceProvider>,
    mailer: Arc<dyn Mailer>,
    notifications: NotificationConfig,
    btcpay: BtcPayConfig,
}

impl NotificationDispatcher {
    pub fn new(
        provider: Arc<dyn InvoiceProvider>,
        mailer: Arc<dyn Mailer>,
        notifications: NotificationConfig,
        btcpay: BtcPayConfig,
    ) -> Self {
        Self {
            provider,
            mailer,
            notifications,
            btcpay,
        }
    }

    /// Notify about payment progress. Returns whether the admin email went out;
    /// the buyer receipt never affects the result.
    pub async fn notify_settled(&self, invoice_id: &str, event: PaymentEvent, event_type: &str) -> bool {
        let Some(invoice) = self.fetch_invoice(invoice_id).await else {
            return false;
        };
        let methods = self.fetch_payment_methods(invoice_id).await;
        let now = Utc::now();
        let dashboard_url = self.btcpay.dashboard_invoice_url(&invoice.id);

        let admin_email = OutgoingEmail {
            to: self.notifications.admin_email.clone(),
            subject: EmailTemplates::payment_notification_subject(&invoice, event),
            html_body: EmailTemplates::payment_notification_email(
                &invoice,
                &methods,
                event,
                event_type,
                &dashboard_url,
                now,
            ),
            text_body: EmailTemplates::payment_notification_text(
                &invoice,
                event,
                event_type,
                &dashboard_url,
                now,
            ),
        };
        let admin_sent = self.deliver(&admin_email, "admin").await;

        if !self.notifications.notify_buyer {
            return admin_sent;
        }

        match invoice.metadata.buyer_email() {
            Some(buyer) if !buyer.trim().is_empty() => {
                let receipt = OutgoingEmail {
                    to: buyer.trim().to_string(),
                    subject: EmailTemplates::customer_receipt_subject(&invoice),
                    html_body: EmailTemplates::customer_receipt_email(&invoice, &methods, event, now),
                    text_body: EmailTemplates::customer_receipt_text(&invoice, event, now),
                };
                self.deliver(&receipt, "buyer").await;
            }
            _ => info!(invoice_id = %invoice.id, "No buyer email on invoice, skipping receipt"),
        }

        admin_sent
    }

    /// Notify the admin that an invoice expired or became invalid
    pub async fn notify_failed(&self, invoice_id: &str, reason: FailureReason) -> bool {
        let Some(invoice) = self.fetch_invoice(invoice_id).await else {
            return false;
        };
        let now = Utc::now();
        let dashboard_url = self.btcpay.dashboard_invoice_url(&invoice.id);

        let email = OutgoingEmail {
            to: self.notifications.admin_email.clone(),
            subject: EmailTemplates::payment_failed_subject(&invoice, reason),
            html_body: EmailTemplates::payment_failed_email(&invoice, reason, &dashboard_url, now),
            text_body: EmailTemplates::payment_failed_text(&invoice, reason, &dashboard_url, now),
        };

        self.deliver(&email, "admin").await
    }

    async fn fetch_invoice(&self, invoice_id: &str) -> Option<Invoice> {
        match self.provider.fetch_invoice(invoice_id).await {
            Ok(invoice) => Some(invoice),
            Err(e) => {
                error!(invoice_id = %invoice_id, "Failed to fetch invoice for notification: {}", e);
                counter!("btcpay_relay_invoice_fetch_failures_total").increment(1);
                None
            }
        }
    }

    async fn fetch_payment_methods(&self, invoice_id: &str) -> Vec<InvoicePaymentMethod> {
        self.provider
            .fetch_payment_methods(invoice_id)
            .await
            .unwrap_or_else(|e| {
                warn!(invoice_id = %invoice_id, "Payment methods unavailable: {}", e);
                Vec::new()
            })
    }

    async fn deliver(&self, email: &OutgoingEmail, recipient: &'static str) -> bool {
        match self.mailer.send(email).await {
            Ok(()) => {
                counter!("btcpay_relay_emails_total", "recipient" => recipient, "outcome" => "sent")
                    .increment(1);
                true
            }
            Err(e) => {
                error!("Failed to send {} notification '{}': {}", recipient, email.subject, e);
                counter!("btcpay_relay_emails_total", "recipient" => recipient, "outcome" => "failed")
                    .increment(1);
                false
            }
        }
    }
}

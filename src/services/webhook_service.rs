use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{error, info, warn};

use crate::models::webhook::{EventRoute, WebhookEvent};
use crate::services::notification_dispatcher::NotificationDispatcher;
use crate::utils::signature::{verify_webhook_signature, SignatureError};

/// Result of handling one webhook delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Signature check failed; nothing was done
    Rejected(SignatureError),
    /// Body was not a usable event
    InvalidPayload,
    /// Event type has no notification attached
    Ignored,
    /// Notification ran to completion; `delivered` is the admin delivery result
    Dispatched { delivered: bool },
    /// Notification did not finish within the dispatch timeout
    TimedOut,
}

/// Inbound BTCPay webhook processing
#[derive(Clone)]
pub struct WebhookService {
    secret: Option<String>,
    dispatcher: Arc<NotificationDispatcher>,
    dispatch_timeout: Duration,
}

impl WebhookService {
    pub fn new(
        secret: Option<String>,
        dispatcher: Arc<NotificationDispatcher>,
        dispatch_timeout: Duration,
    ) -> Self {
        let secret = secret.filter(|s| !s.is_empty());
        Self {
            secret,
            dispatcher,
            dispatch_timeout,
        }
    }

    pub fn verification_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify, classify and dispatch one delivery.
    ///
    /// `body` must be the exact bytes received; re-serialized JSON will not verify.
    pub async fn handle(&self, body: &[u8], signature: Option<&str>) -> WebhookOutcome {
        if let Some(secret) = &self.secret {
            if let Err(e) = verify_webhook_signature(secret, body, signature) {
                warn!("Rejected webhook: {}", e);
                counter!("btcpay_relay_webhook_rejections_total").increment(1);
                return WebhookOutcome::Rejected(e);
            }
        }

        let event: WebhookEvent = match serde_json::from_slice(body) {
            Ok(event) => event,
            Err(e) => {
                warn!("Ignoring webhook with malformed body: {}", e);
                counter!("btcpay_relay_webhook_events_total", "type" => "malformed").increment(1);
                return WebhookOutcome::InvalidPayload;
            }
        };

        let kind = event.kind();
        counter!("btcpay_relay_webhook_events_total", "type" => kind.metric_label()).increment(1);
        info!(
            event_type = %kind.as_str(),
            invoice_id = ?event.invoice_id(),
            delivery_id = ?event.delivery_id,
            redelivery = event.is_redelivery(),
            "Webhook received"
        );

        let route = kind.route();
        if route == EventRoute::Ignore {
            info!("No notification for webhook type '{}'", kind.as_str());
            return WebhookOutcome::Ignored;
        }

        let Some(invoice_id) = event.invoice_id() else {
            warn!(
                raw_invoice_id = ?event.invoice_id,
                "Webhook '{}' has no usable invoiceId",
                kind.as_str()
            );
            return WebhookOutcome::InvalidPayload;
        };

        let dispatch = async {
            match route {
                EventRoute::Payment(payment) => {
                    self.dispatcher
                        .notify_settled(invoice_id, payment, kind.as_str())
                        .await
                }
                EventRoute::Failure(reason) => self.dispatcher.notify_failed(invoice_id, reason).await,
                EventRoute::Ignore => false,
            }
        };

        match tokio::time::timeout(self.dispatch_timeout, dispatch).await {
            Ok(delivered) => {
                if !delivered {
                    warn!(invoice_id = %invoice_id, "Admin notification was not delivered");
                }
                WebhookOutcome::Dispatched { delivered }
            }
            Err(_) => {
                error!(
                    invoice_id = %invoice_id,
                    "Notification dispatch timed out after {:?}", self.dispatch_timeout
                );
                counter!("btcpay_relay_webhook_dispatch_timeouts_total").increment(1);
                WebhookOutcome::TimedOut
            }
        }
    }
}

//! Webhook Models
//!
//! Inbound BTCPay webhook payloads and their classification.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::invoice::is_valid_invoice_id;
use super::notification::{FailureReason, PaymentEvent};

/// Webhook delivery body. Only the fields this relay reads are modelled.
///
/// Every field is optional and a value of the wrong JSON type reads as absent,
/// so one odd field never costs the whole delivery.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub event_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub invoice_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub delivery_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_redelivery: Option<bool>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl WebhookEvent {
    pub fn kind(&self) -> WebhookEventKind {
        WebhookEventKind::from_type(self.event_type.as_deref().unwrap_or_default())
    }

    /// Invoice id, if present and well-formed
    pub fn invoice_id(&self) -> Option<&str> {
        self.invoice_id.as_deref().filter(|id| is_valid_invoice_id(id))
    }

    pub fn is_redelivery(&self) -> bool {
        self.is_redelivery.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    InvoiceSettled,
    InvoicePaymentSettled,
    InvoiceReceivedPayment,
    InvoiceProcessing,
    InvoiceExpired,
    InvoiceInvalid,
    Unrecognized(String),
}

/// What the relay does with a classified event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRoute {
    /// Admin plus (optionally) buyer
    Payment(PaymentEvent),
    /// Admin only
    Failure(FailureReason),
    Ignore,
}

impl WebhookEventKind {
    pub fn from_type(raw: &str) -> Self {
        match raw {
            "InvoiceSettled" => WebhookEventKind::InvoiceSettled,
            "InvoicePaymentSettled" => WebhookEventKind::InvoicePaymentSettled,
            "InvoiceReceivedPayment" => WebhookEventKind::InvoiceReceivedPayment,
            "InvoiceProcessing" => WebhookEventKind::InvoiceProcessing,
            "InvoiceExpired" => WebhookEventKind::InvoiceExpired,
            "InvoiceInvalid" => WebhookEventKind::InvoiceInvalid,
            other => WebhookEventKind::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventKind::InvoiceSettled => "InvoiceSettled",
            WebhookEventKind::InvoicePaymentSettled => "InvoicePaymentSettled",
            WebhookEventKind::InvoiceReceivedPayment => "InvoiceReceivedPayment",
            WebhookEventKind::InvoiceProcessing => "InvoiceProcessing",
            WebhookEventKind::InvoiceExpired => "InvoiceExpired",
            WebhookEventKind::InvoiceInvalid => "InvoiceInvalid",
            WebhookEventKind::Unrecognized(raw) => raw,
        }
    }

    pub fn route(&self) -> EventRoute {
        match self {
            WebhookEventKind::InvoiceSettled | WebhookEventKind::InvoicePaymentSettled => {
                EventRoute::Payment(PaymentEvent::Settled)
            }
            WebhookEventKind::InvoiceReceivedPayment => {
                EventRoute::Payment(PaymentEvent::PaymentReceived)
            }
            WebhookEventKind::InvoiceProcessing => EventRoute::Payment(PaymentEvent::Processing),
            WebhookEventKind::InvoiceExpired => EventRoute::Failure(FailureReason::Expired),
            WebhookEventKind::InvoiceInvalid => EventRoute::Failure(FailureReason::Invalid),
            WebhookEventKind::Unrecognized(_) => EventRoute::Ignore,
        }
    }

    /// Label used for metrics; unrecognized types collapse to one bucket
    pub fn metric_label(&self) -> &'static str {
        match self {
            WebhookEventKind::InvoiceSettled => "InvoiceSettled",
            WebhookEventKind::InvoicePaymentSettled => "InvoicePaymentSettled",
            WebhookEventKind::InvoiceReceivedPayment => "InvoiceReceivedPayment",
            WebhookEventKind::InvoiceProcessing => "InvoiceProcessing",
            WebhookEventKind::InvoiceExpired => "InvoiceExpired",
            WebhookEventKind::InvoiceInvalid => "InvoiceInvalid",
            WebhookEventKind::Unrecognized(_) => "unrecognized",
        }
    }
}

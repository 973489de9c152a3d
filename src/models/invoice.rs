//! Invoice Models
//!
//! Wire types for the BTCPay Greenfield invoice API and the storefront-facing DTOs
//! built from them.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

/// Minutes before a freshly created invoice expires
pub const INVOICE_EXPIRATION_MINUTES: u32 = 15;

const MAX_INVOICE_ID_LEN: usize = 64;

/// Invoice ids are opaque tokens of ASCII letters, digits, `-` and `_`
pub fn is_valid_invoice_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_INVOICE_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Invoice lifecycle status as reported by the processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvoiceStatus {
    New,
    Processing,
    Settled,
    Expired,
    Invalid,
    /// Any status this relay does not interpret
    Other(String),
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InvoiceStatus::New => "New",
            InvoiceStatus::Processing => "Processing",
            InvoiceStatus::Settled => "Settled",
            InvoiceStatus::Expired => "Expired",
            InvoiceStatus::Invalid => "Invalid",
            InvoiceStatus::Other(raw) => raw,
        }
    }

    /// Funds have been seen, whether or not they are final yet
    pub fn payment_received(&self) -> bool {
        matches!(self, InvoiceStatus::Settled | InvoiceStatus::Processing)
    }

    pub fn payment_completed(&self) -> bool {
        matches!(self, InvoiceStatus::Settled)
    }
}

impl From<String> for InvoiceStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "New" => InvoiceStatus::New,
            "Processing" => InvoiceStatus::Processing,
            "Settled" => InvoiceStatus::Settled,
            "Expired" => InvoiceStatus::Expired,
            "Invalid" => InvoiceStatus::Invalid,
            _ => InvoiceStatus::Other(raw),
        }
    }
}

impl From<InvoiceStatus> for String {
    fn from(status: InvoiceStatus) -> Self {
        match status {
            InvoiceStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form invoice metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceMetadata(pub Map<String, Value>);

impl InvoiceMetadata {
    /// Non-empty string value for `key`
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn buyer_email(&self) -> Option<&str> {
        self.get_str("buyerEmail")
    }

    pub fn order_id(&self) -> Option<&str> {
        self.get_str("orderId")
    }

    pub fn item_desc(&self) -> Option<&str> {
        self.get_str("itemDesc")
    }

    pub fn description(&self) -> Option<&str> {
        self.get_str("description")
    }

    /// Entries with a non-null value, nested objects rendered as JSON
    pub fn display_entries(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect()
    }
}

/// Invoice as returned by `GET /api/v1/stores/{storeId}/invoices/{invoiceId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub store_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub additional_status: Option<String>,
    #[serde(default)]
    pub checkout_link: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub created_time: Option<i64>,
    /// Unix seconds
    #[serde(default)]
    pub expiration_time: Option<i64>,
    #[serde(default)]
    pub metadata: InvoiceMetadata,
}

impl Invoice {
    /// `additionalStatus` unless the processor reports the placeholder "None"
    pub fn additional_status(&self) -> Option<&str> {
        self.additional_status
            .as_deref()
            .filter(|s| !s.is_empty() && *s != "None")
    }
}

/// One entry of `GET .../invoices/{invoiceId}/payment-methods`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePaymentMethod {
    #[serde(alias = "paymentMethod")]
    pub payment_method_id: String,
    #[serde(default, alias = "cryptoCode")]
    pub currency: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub rate: Option<Decimal>,
    #[serde(default)]
    pub payments: Vec<InvoicePayment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayment {
    #[serde(default)]
    pub id: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub received_date: Option<i64>,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Storefront request to open a new invoice
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    /// Must be present and strictly positive
    #[schema(value_type = Option<String>, example = "25.00")]
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub product_id: Option<String>,
    pub title: Option<String>,
    #[validate(email)]
    pub customer_email: Option<String>,
    pub redirect_url: Option<String>,
    pub description: Option<String>,
}

impl CreateInvoiceRequest {
    /// Amount if present and strictly positive
    pub fn positive_amount(&self) -> Option<Decimal> {
        self.amount.filter(|amount| *amount > Decimal::ZERO)
    }

    /// Build the processor payload. `order_stamp` stands in for a missing product id.
    pub fn to_payload(
        &self,
        amount: Decimal,
        fallback_redirect: &str,
        order_stamp: i64,
    ) -> InvoiceCreatePayload {
        let product_id = non_empty(&self.product_id);
        let title = non_empty(&self.title);
        let item_desc = title
            .or(product_id)
            .unwrap_or("Product Purchase")
            .to_string();
        let description = non_empty(&self.description)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Payment for product: {}", product_id.unwrap_or("Item")));
        let order_id = match product_id {
            Some(id) => format!("order-{}", id),
            None => format!("order-{}", order_stamp),
        };

        InvoiceCreatePayload {
            amount: amount.to_string(),
            currency: self
                .currency
                .clone()
                .unwrap_or_else(|| "USD".to_string()),
            metadata: CreateInvoiceMetadata {
                order_id,
                buyer_email: non_empty(&self.customer_email).map(str::to_string),
                item_code: product_id.unwrap_or("product").to_string(),
                item_desc: item_desc.clone(),
                description: description.clone(),
                pos_data: PosData {
                    game_id: item_desc,
                    description,
                },
            },
            checkout: CheckoutOptions {
                redirect_url: non_empty(&self.redirect_url)
                    .unwrap_or(fallback_redirect)
                    .to_string(),
                default_payment_method: "BTC".to_string(),
                expiration_minutes: INVOICE_EXPIRATION_MINUTES,
            },
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Body of `POST /api/v1/stores/{storeId}/invoices`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCreatePayload {
    pub amount: String,
    pub currency: String,
    pub metadata: CreateInvoiceMetadata,
    pub checkout: CheckoutOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceMetadata {
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_email: Option<String>,
    pub item_code: String,
    pub item_desc: String,
    pub description: String,
    /// Point-of-sale receipt block shown on the BTCPay receipt page
    pub pos_data: PosData,
}

#[derive(Debug, Clone, Serialize)]
pub struct PosData {
    #[serde(rename = "Gameid")]
    pub game_id: String,
    #[serde(rename = "Description")]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOptions {
    #[serde(rename = "redirectURL")]
    pub redirect_url: String,
    pub default_payment_method: String,
    pub expiration_minutes: u32,
}

/// Response to `POST /api/create-invoice`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceResponse {
    pub invoice_id: String,
    pub payment_url: Option<String>,
    pub status: String,
    pub expiration_time: Option<i64>,
}

impl From<Invoice> for CreateInvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            invoice_id: invoice.id,
            payment_url: invoice.checkout_link,
            status: invoice.status.into(),
            expiration_time: invoice.expiration_time,
        }
    }
}

/// Response to `GET /api/invoices/{invoiceId}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStatusResponse {
    pub invoice_id: String,
    pub status: String,
    pub payment_received: bool,
    pub payment_completed: bool,
}

impl From<Invoice> for InvoiceStatusResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            payment_received: invoice.status.payment_received(),
            payment_completed: invoice.status.payment_completed(),
            invoice_id: invoice.id,
            status: invoice.status.into(),
        }
    }
}

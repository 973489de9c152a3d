//! BTCPay Server Greenfield API client.
//!
//! Plain request/response wrapper: no retries, no backoff. Any transport
//! failure or non-2xx status is handed back to the caller as a `ProcessorError`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::BtcPayConfig;
use crate::models::invoice::{
    is_valid_invoice_id, Invoice, InvoiceCreatePayload, InvoicePaymentMethod,
};

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("payment processor request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment processor returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected payment processor response: {0}")]
    Decode(String),

    #[error("invalid invoice id: {0:?}")]
    InvalidInvoiceId(String),

    #[error("invalid payment processor url: {0}")]
    InvalidUrl(String),
}

/// Invoice operations the relay needs from the payment processor
#[async_trait]
pub trait InvoiceProvider: Send + Sync {
    async fn fetch_invoice(&self, invoice_id: &str) -> Result<Invoice, ProcessorError>;

    async fn create_invoice(
        &self,
        payload: &InvoiceCreatePayload,
    ) -> Result<Invoice, ProcessorError>;

    async fn fetch_payment_methods(
        &self,
        invoice_id: &str,
    ) -> Result<Vec<InvoicePaymentMethod>, ProcessorError>;
}

#[derive(Clone)]
pub struct BtcPayClient {
    client: Client,
    base_url: Url,
    store_id: String,
    api_key: String,
}

impl BtcPayClient {
    pub fn new(config: &BtcPayConfig) -> Result<Self, ProcessorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let base_url = Url::parse(&config.server_url)
            .map_err(|e| ProcessorError::InvalidUrl(format!("{}: {}", config.server_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ProcessorError::InvalidUrl(config.server_url.clone()));
        }

        Ok(Self {
            client,
            base_url,
            store_id: config.store_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// `.../api/v1/stores/{storeId}/invoices` followed by `extra`, each segment percent-encoded
    fn invoices_url(&self, extra: &[&str]) -> Result<Url, ProcessorError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProcessorError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "v1", "stores", self.store_id.as_str(), "invoices"])
            .extend(extra);
        Ok(url)
    }

    fn invoice_url(&self, invoice_id: &str, extra: Option<&str>) -> Result<Url, ProcessorError> {
        if !is_valid_invoice_id(invoice_id) {
            return Err(ProcessorError::InvalidInvoiceId(invoice_id.to_string()));
        }
        match extra {
            Some(tail) => self.invoices_url(&[invoice_id, tail]),
            None => self.invoices_url(&[invoice_id]),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(
            reqwest::header::AUTHORIZATION,
            format!("token {}", self.api_key),
        )
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ProcessorError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("BTCPay returned {}: {}", status, body);
            return Err(ProcessorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ProcessorError::Decode(e.to_string()))
    }
}

#[async_trait]
impl InvoiceProvider for BtcPayClient {
    async fn fetch_invoice(&self, invoice_id: &str) -> Result<Invoice, ProcessorError> {
        debug!(invoice_id = %invoice_id, "Fetching invoice from BTCPay");

        let url = self.invoice_url(invoice_id, None)?;
        let response = self.authorized(self.client.get(url)).send().await?;

        Self::read_json(response).await
    }

    async fn create_invoice(
        &self,
        payload: &InvoiceCreatePayload,
    ) -> Result<Invoice, ProcessorError> {
        debug!(
            order_id = %payload.metadata.order_id,
            amount = %payload.amount,
            currency = %payload.currency,
            "Creating BTCPay invoice"
        );

        let url = self.invoices_url(&[])?;
        let response = self
            .authorized(self.client.post(url))
            .json(payload)
            .send()
            .await?;

        let invoice: Invoice = Self::read_json(response).await?;
        info!(invoice_id = %invoice.id, "Invoice created");
        Ok(invoice)
    }

    async fn fetch_payment_methods(
        &self,
        invoice_id: &str,
    ) -> Result<Vec<InvoicePaymentMethod>, ProcessorError> {
        let url = self.invoice_url(invoice_id, Some("payment-methods"))?;
        let response = self.authorized(self.client.get(url)).send().await?;

        Self::read_json(response).await
    }
}

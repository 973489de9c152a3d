//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::Config;
use crate::services::{InvoiceProvider, Mailer, NotificationDispatcher, WebhookService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// BTCPay invoice API
    pub invoices: Arc<dyn InvoiceProvider>,
    /// Webhook verification and notification dispatch
    pub webhooks: Arc<WebhookService>,
    /// Prometheus recorder handle; `None` when metrics are not exported
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire the services around an invoice provider and a mailer
    pub fn new(
        config: Config,
        invoices: Arc<dyn InvoiceProvider>,
        mailer: Arc<dyn Mailer>,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Self {
        let dispatcher = NotificationDispatcher::new(
            invoices.clone(),
            mailer,
            config.notifications.clone(),
            config.btcpay.clone(),
        );
        let webhooks = WebhookService::new(
            config.btcpay.webhook_secret.clone(),
            Arc::new(dispatcher),
            Duration::from_secs(config.webhook_dispatch_timeout_secs),
        );

        Self {
            config: Arc::new(config),
            invoices,
            webhooks: Arc::new(webhooks),
            metrics_handle,
        }
    }
}

//! Application startup and initialization logic.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::app_state::AppState;
use crate::config::Config;
use crate::services::{BtcPayClient, SmtpMailer};

/// Initialize application services and create the AppState.
pub async fn initialize_app(config: &Config) -> Result<AppState> {
    info!("Starting BTCPay relay ({})", config.environment);

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;
    info!("Prometheus metrics initialized");

    let btcpay = BtcPayClient::new(&config.btcpay)?;
    info!(
        "BTCPay client initialized (server: {}, store: {})",
        config.btcpay.server_url, config.btcpay.store_id
    );

    let mailer = SmtpMailer::new(&config.email)?;

    if config.webhook_verification_enabled() {
        info!("Webhook signature verification enabled");
    } else {
        warn!("BTCPAY_WEBHOOK_SECRET is not set: webhook signatures will NOT be verified");
    }

    if !config.notifications.notify_buyer {
        info!("Buyer receipts disabled (NOTIFY_BUYER=false)");
    }

    Ok(AppState::new(
        config.clone(),
        Arc::new(btcpay),
        Arc::new(mailer),
        Some(metrics_handle),
    ))
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully");
        },
    }
}

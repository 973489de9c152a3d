use anyhow::Result;
use reqwest::Url;
use std::env;

/// Default storefront URL used when neither the request nor `CLIENT_URL` sets a redirect.
pub const DEFAULT_CLIENT_URL: &str = "http://localhost:5173";

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub port: u16,
    pub client_url: String,
    pub btcpay: BtcPayConfig,
    pub notifications: NotificationConfig,
    pub email: EmailConfig,
    /// Upper bound on the notification work done inside one webhook delivery
    pub webhook_dispatch_timeout_secs: u64,
}

/// Connection details for the BTCPay Server Greenfield API
#[derive(Debug, Clone)]
pub struct BtcPayConfig {
    pub server_url: String,
    pub api_key: String,
    pub store_id: String,
    /// Shared secret for `btcpay-sig`. `None` disables webhook verification.
    pub webhook_secret: Option<String>,
    pub request_timeout_secs: u64,
}

impl BtcPayConfig {
    /// Link to an invoice in the BTCPay dashboard
    pub fn dashboard_invoice_url(&self, invoice_id: &str) -> String {
        match Url::parse(&self.server_url) {
            Ok(mut url) => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().extend(["invoices", invoice_id]);
                }
                url.into()
            }
            Err(_) => self.server_url.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub admin_email: String,
    pub notify_buyer: bool,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_name: String,
    pub from_address: String,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let email_user = required("EMAIL_USER")?;

        Ok(Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: parse_or("PORT", 3000)?,
            client_url: env::var("CLIENT_URL").unwrap_or_else(|_| DEFAULT_CLIENT_URL.to_string()),
            btcpay: BtcPayConfig {
                server_url: required("SERVER_URL")?,
                api_key: required("BTCPAY_API_KEY")?,
                store_id: required("BTCPAY_STORE_ID")?,
                webhook_secret: env::var("BTCPAY_WEBHOOK_SECRET")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                request_timeout_secs: parse_or("BTCPAY_REQUEST_TIMEOUT_SECS", 10)?,
            },
            notifications: NotificationConfig {
                admin_email: required("ADMIN_EMAIL")?,
                notify_buyer: parse_or("NOTIFY_BUYER", true)?,
            },
            email: EmailConfig {
                smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                smtp_port: parse_or("SMTP_PORT", 587)?,
                smtp_password: env::var("EMAIL_PASSWORD").unwrap_or_default(),
                from_name: env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "Payments".to_string()),
                from_address: email_user.clone(),
                smtp_username: email_user,
                timeout_secs: parse_or("SMTP_TIMEOUT_SECS", 15)?,
            },
            webhook_dispatch_timeout_secs: parse_or("WEBHOOK_DISPATCH_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn webhook_verification_enabled(&self) -> bool {
        self.btcpay.webhook_secret.is_some()
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("{} environment variable is required", key))
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))
}

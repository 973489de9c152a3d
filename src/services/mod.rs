// Business logic services
// Payment processor client, email delivery, notification dispatch, webhook handling

pub mod btcpay;
pub mod email;
pub mod notification_dispatcher;
pub mod webhook_service;

pub use btcpay::{BtcPayClient, InvoiceProvider, ProcessorError};
pub use email::{EmailTemplates, Mailer, SmtpMailer};
pub use notification_dispatcher::NotificationDispatcher;
pub use webhook_service::{WebhookOutcome, WebhookService};

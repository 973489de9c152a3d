/// Email templates for payment notifications
/// Admin notification, buyer receipt and failure notice, each in HTML and plain text.
use chrono::{DateTime, TimeZone, Utc};
use htmlescape::{encode_attribute as esc_attr, encode_minimal as esc};

use crate::models::invoice::{Invoice, InvoicePaymentMethod};
use crate::models::notification::{FailureReason, PaymentEvent};

const CELL: &str = "padding: 5px; border-bottom: 1px solid #eee;";
const HEAD: &str = "padding: 8px; text-align: left; border-bottom: 2px solid #ddd;";

pub struct EmailTemplates;

impl EmailTemplates {
    /// Subject for the admin payment notification
    pub fn payment_notification_subject(invoice: &Invoice, event: PaymentEvent) -> String {
        match event {
            PaymentEvent::PaymentReceived => format!("Payment Received: Invoice {}", invoice.id),
            _ => format!("Payment {}: Invoice {}", event.label(), invoice.id),
        }
    }

    /// Subject for the buyer receipt
    pub fn customer_receipt_subject(invoice: &Invoice) -> String {
        format!("Payment Confirmation: Invoice {}", invoice.id)
    }

    /// Subject for the admin failure notice
    pub fn payment_failed_subject(invoice: &Invoice, reason: FailureReason) -> String {
        format!("Payment Failed ({}): Invoice {}", reason.label(), invoice.id)
    }

    /// HTML admin notification with full invoice, payment and metadata detail
    pub fn payment_notification_email(
        invoice: &Invoice,
        methods: &[InvoicePaymentMethod],
        event: PaymentEvent,
        event_type: &str,
        dashboard_url: &str,
        now: DateTime<Utc>,
    ) -> String {
        let (banner_bg, banner_fg) = if event.is_final() {
            ("#e8f5e9", "#2e7d32")
        } else {
            ("#fff8e1", "#ff8f00")
        };

        let mut details = String::new();
        details.push_str(&row("Invoice ID", &esc(&invoice.id)));
        details.push_str(&row("Amount", &esc(&amount_line(invoice))));
        details.push_str(&row("Created", &format_time(invoice.created_time)));
        details.push_str(&row("Expiration", &format_time(invoice.expiration_time)));
        details.push_str(&row("Current Status", &esc(invoice.status.as_str())));
        details.push_str(&row(
            "Description",
            &esc(description(invoice).unwrap_or("N/A")),
        ));
        if let Some(additional) = invoice.additional_status() {
            details.push_str(&row("Additional Status", &esc(additional)));
        }
        if let Some(link) = &invoice.checkout_link {
            details.push_str(&row("Checkout Link", &link_html(link)));
        }

        let method_rows = if methods.is_empty() {
            r#"<tr><td colspan="3">No payment method details available</td></tr>"#.to_string()
        } else {
            methods
                .iter()
                .map(|pm| {
                    let rate = pm
                        .rate
                        .map(|r| format!("Rate: {} {}", r, invoice.currency))
                        .unwrap_or_default();
                    format!(
                        r#"<tr><td style="{CELL}"><strong>{}</strong></td><td style="{CELL}">{}</td><td style="{CELL}">{}</td></tr>"#,
                        esc(&pm.payment_method_id),
                        esc(&method_amount(pm)),
                        esc(&rate)
                    )
                })
                .collect()
        };

        let payment_rows: String = {
            let rows: Vec<String> = methods
                .iter()
                .flat_map(|pm| pm.payments.iter().map(move |p| (pm, p)))
                .map(|(pm, payment)| {
                    let value = payment
                        .value
                        .map(|v| {
                            format!("{} {}", v, pm.currency.as_deref().unwrap_or("BTC"))
                        })
                        .unwrap_or_else(|| "N/A".to_string());
                    format!(
                        r#"<tr><td style="{CELL}"><strong>{}</strong></td><td style="{CELL}">{}</td><td style="{CELL}">{}</td><td style="{CELL}">{}</td></tr>"#,
                        esc(payment.id.as_deref().unwrap_or("N/A")),
                        esc(&value),
                        format_time(payment.received_date),
                        esc(payment.status.as_deref().unwrap_or("Unknown"))
                    )
                })
                .collect();
            if rows.is_empty() {
                r#"<tr><td colspan="4">No payment details available</td></tr>"#.to_string()
            } else {
                rows.concat()
            }
        };

        let metadata_rows: String = {
            let entries = invoice.metadata.display_entries();
            if entries.is_empty() {
                r#"<tr><td colspan="2">No metadata available</td></tr>"#.to_string()
            } else {
                entries
                    .iter()
                    .map(|(key, value)| row(&esc(key), &esc(value)))
                    .collect()
            }
        };

        format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; border: 1px solid #eee; border-radius: 5px;">
  <h2 style="color: #333; border-bottom: 1px solid #eee; padding-bottom: 10px;">Payment Notification</h2>
  <div style="margin: 20px 0; background-color: {banner_bg}; padding: 15px; border-radius: 4px;">
    <h3 style="margin-top: 0; color: {banner_fg};">Status: {status}</h3>
  </div>

  <h3 style="margin-top: 25px; color: #333;">Invoice Details</h3>
  <table style="width: 100%; border-collapse: collapse;">{details}</table>

  <h3 style="margin-top: 25px; color: #333;">Payment Methods</h3>
  <table style="width: 100%; border-collapse: collapse;">
    <thead><tr style="background-color: #f5f5f5;"><th style="{HEAD}">Method</th><th style="{HEAD}">Amount</th><th style="{HEAD}">Rate Info</th></tr></thead>
    <tbody>{method_rows}</tbody>
  </table>

  <h3 style="margin-top: 25px; color: #333;">Payment Details</h3>
  <table style="width: 100%; border-collapse: collapse;">
    <thead><tr style="background-color: #f5f5f5;"><th style="{HEAD}">ID</th><th style="{HEAD}">Amount</th><th style="{HEAD}">Received Date</th><th style="{HEAD}">Status</th></tr></thead>
    <tbody>{payment_rows}</tbody>
  </table>

  <h3 style="margin-top: 25px; color: #333;">Metadata</h3>
  <table style="width: 100%; border-collapse: collapse;">
    <thead><tr style="background-color: #f5f5f5;"><th style="{HEAD}">Key</th><th style="{HEAD}">Value</th></tr></thead>
    <tbody>{metadata_rows}</tbody>
  </table>

  <div style="margin-top: 30px; padding-top: 15px; border-top: 1px solid #eee;">
    <p>View complete invoice details in your <a href="{dashboard}" style="color: #0066cc; text-decoration: none;">BTCPay Server dashboard</a>.</p>
  </div>
  <div style="margin-top: 30px; font-size: 12px; color: #666; text-align: center;">
    <p>This is an automated notification from your payment system.<br>Event Type: {event_type}<br>Time: {now}</p>
  </div>
</div>"#,
            status = event.label(),
            dashboard = esc_attr(dashboard_url),
            event_type = esc(event_type),
            now = format_datetime(now),
        )
    }

    pub fn payment_notification_text(
        invoice: &Invoice,
        event: PaymentEvent,
        event_type: &str,
        dashboard_url: &str,
        now: DateTime<Utc>,
    ) -> String {
        let mut text = format!(
            "Payment Notification\n\nStatus: {}\n\nInvoice ID: {}\nAmount: {}\nCreated: {}\nExpiration: {}\nCurrent Status: {}\nDescription: {}\n",
            event.label(),
            invoice.id,
            amount_line(invoice),
            format_time(invoice.created_time),
            format_time(invoice.expiration_time),
            invoice.status,
            description(invoice).unwrap_or("N/A"),
        );
        for (key, value) in invoice.metadata.display_entries() {
            text.push_str(&format!("{}: {}\n", key, value));
        }
        text.push_str(&format!(
            "\nDashboard: {}\n\nEvent Type: {}\nTime: {}\n",
            dashboard_url,
            event_type,
            format_datetime(now)
        ));
        text
    }

    /// HTML buyer receipt
    pub fn customer_receipt_email(
        invoice: &Invoice,
        methods: &[InvoicePaymentMethod],
        event: PaymentEvent,
        now: DateTime<Utc>,
    ) -> String {
        let intro = match event {
            PaymentEvent::Settled => {
                "Thank you for your payment. We have received your payment and it has been processed successfully."
            }
            PaymentEvent::PaymentReceived | PaymentEvent::Processing => {
                "Thank you for your payment. We have received it and are waiting for network confirmation."
            }
        };

        let mut details = String::new();
        details.push_str(&row("Amount", &esc(&amount_line(invoice))));
        details.push_str(&row("Invoice ID", &esc(&invoice.id)));
        details.push_str(&row("Date", &format_datetime(now)));
        details.push_str(&row("Status", &esc(invoice.status.as_str())));
        if let Some(item) = invoice.metadata.item_desc() {
            details.push_str(&row("Item", &esc(item)));
        }
        if let Some(desc) = description(invoice) {
            details.push_str(&row("Description", &esc(desc)));
        }

        let methods_block = if methods.is_empty() {
            String::new()
        } else {
            let rows: String = methods
                .iter()
                .map(|pm| row(&esc(&pm.payment_method_id), &esc(&method_amount(pm))))
                .collect();
            format!(
                r#"<h3 style="margin-top: 25px; color: #333;">Payment Method</h3>
  <table style="width: 100%; border-collapse: collapse;"><tbody>{rows}</tbody></table>"#
            )
        };

        format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #eee; border-radius: 5px;">
  <h2 style="color: #28a745; border-bottom: 1px solid #eee; padding-bottom: 10px;">Payment Confirmation</h2>
  <div style="margin: 20px 0; background-color: #e8f5e9; padding: 15px; border-radius: 4px;">
    <p style="margin: 0;">{intro}</p>
  </div>
  <h3 style="margin-top: 25px; color: #333;">Payment Details</h3>
  <table style="width: 100%; border-collapse: collapse;">{details}</table>
  {methods_block}
  <div style="margin-top: 30px; padding-top: 15px; border-top: 1px solid #eee; text-align: center;">
    <p>If you have any questions, please contact our support team.</p>
  </div>
</div>"#
        )
    }

    pub fn customer_receipt_text(invoice: &Invoice, event: PaymentEvent, now: DateTime<Utc>) -> String {
        let mut text = format!(
            "Payment Confirmation\n\nThank you for your payment ({}).\n\nAmount: {}\nInvoice ID: {}\nDate: {}\nStatus: {}\n",
            event.label(),
            amount_line(invoice),
            invoice.id,
            format_datetime(now),
            invoice.status,
        );
        if let Some(item) = invoice.metadata.item_desc() {
            text.push_str(&format!("Item: {}\n", item));
        }
        text.push_str("\nIf you have any questions, please contact our support team.\n");
        text
    }

    /// HTML admin notice for an invoice that expired or went invalid
    pub fn payment_failed_email(
        invoice: &Invoice,
        reason: FailureReason,
        dashboard_url: &str,
        now: DateTime<Utc>,
    ) -> String {
        let mut details = String::new();
        details.push_str(&row("Invoice ID", &esc(&invoice.id)));
        details.push_str(&row("Amount", &esc(&amount_line(invoice))));
        details.push_str(&row("Created", &format_time(invoice.created_time)));
        details.push_str(&row("Expired", &format_time(invoice.expiration_time)));
        details.push_str(&row("Time of Failure", &format_datetime(now)));
        if let Some(email) = invoice.metadata.buyer_email() {
            details.push_str(&row("Customer Email", &esc(email)));
        }
        if let Some(order_id) = invoice.metadata.order_id() {
            details.push_str(&row("Order ID", &esc(order_id)));
        }
        if let Some(link) = &invoice.checkout_link {
            details.push_str(&row("Checkout Link", &link_html(link)));
        }

        format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #eee; border-radius: 5px;">
  <h2 style="color: #dc3545; border-bottom: 1px solid #eee; padding-bottom: 10px;">Payment Failed</h2>
  <div style="margin: 20px 0; background-color: #f8d7da; padding: 15px; border-radius: 4px;">
    <h3 style="margin-top: 0; color: #721c24;">Status: Failed/{reason}</h3>
  </div>
  <h3 style="margin-top: 25px; color: #333;">Invoice Details</h3>
  <table style="width: 100%; border-collapse: collapse;">{details}</table>
  <div style="margin-top: 30px; padding-top: 15px; border-top: 1px solid #eee;">
    <p>View invoice details in your <a href="{dashboard}" style="color: #0066cc; text-decoration: none;">BTCPay Server dashboard</a>.</p>
  </div>
</div>"#,
            reason = reason.label(),
            dashboard = esc_attr(dashboard_url),
        )
    }

    pub fn payment_failed_text(
        invoice: &Invoice,
        reason: FailureReason,
        dashboard_url: &str,
        now: DateTime<Utc>,
    ) -> String {
        let mut text = format!(
            "Payment Failed\n\nStatus: Failed/{}\n\nInvoice ID: {}\nAmount: {}\nCreated: {}\nExpired: {}\nTime of Failure: {}\n",
            reason.label(),
            invoice.id,
            amount_line(invoice),
            format_time(invoice.created_time),
            format_time(invoice.expiration_time),
            format_datetime(now),
        );
        if let Some(email) = invoice.metadata.buyer_email() {
            text.push_str(&format!("Customer Email: {}\n", email));
        }
        if let Some(order_id) = invoice.metadata.order_id() {
            text.push_str(&format!("Order ID: {}\n", order_id));
        }
        text.push_str(&format!("\nDashboard: {}\n", dashboard_url));
        text
    }
}

/// Two-column table row; both cells must already be escaped
fn row(label: &str, value_html: &str) -> String {
    format!(
        r#"<tr><td style="{CELL}"><strong>{label}</strong></td><td style="{CELL}">{value_html}</td></tr>"#
    )
}

fn link_html(url: &str) -> String {
    format!(r#"<a href="{}">{}</a>"#, esc_attr(url), esc(url))
}

fn amount_line(invoice: &Invoice) -> String {
    format!("{} {}", invoice.amount, invoice.currency)
}

fn method_amount(pm: &InvoicePaymentMethod) -> String {
    match (pm.amount, pm.currency.as_deref()) {
        (Some(amount), Some(currency)) => format!("{} {}", amount, currency),
        (Some(amount), None) => amount.to_string(),
        (None, _) => "N/A".to_string(),
    }
}

fn description(invoice: &Invoice) -> Option<&str> {
    invoice
        .metadata
        .description()
        .or_else(|| invoice.metadata.item_desc())
}

fn format_datetime(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_time(unix_secs: Option<i64>) -> String {
    unix_secs
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .map(format_datetime)
        .unwrap_or_else(|| "N/A".to_string())
}

//! Notification Models
//!
//! Payment event classifications and the rendered email handed to a `Mailer`.

use std::fmt;

/// Payment progress worth telling the admin and buyer about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEvent {
    Settled,
    PaymentReceived,
    Processing,
}

impl PaymentEvent {
    /// Human label shown in subjects and the status banner
    pub fn label(&self) -> &'static str {
        match self {
            PaymentEvent::Settled => "Settled",
            PaymentEvent::PaymentReceived => "Payment Received",
            PaymentEvent::Processing => "Processing",
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, PaymentEvent::Settled)
    }
}

impl fmt::Display for PaymentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why an invoice ended without payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Expired,
    Invalid,
}

impl FailureReason {
    pub fn label(&self) -> &'static str {
        match self {
            FailureReason::Expired => "Expired",
            FailureReason::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

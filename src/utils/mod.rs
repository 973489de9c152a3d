// Utility functions
// Webhook signing and verification

pub mod signature;

pub use signature::{sign_payload, verify_webhook_signature, SignatureError, SIGNATURE_HEADER};

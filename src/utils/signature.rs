use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Header BTCPay puts the webhook signature in
pub const SIGNATURE_HEADER: &str = "btcpay-sig";

const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is missing")]
    Missing,
    #[error("signature header must look like sha256=<hex>")]
    Malformed,
    #[error("signature digest is not valid hex")]
    InvalidHex,
    #[error("signature does not match payload")]
    Mismatch,
    #[error("webhook secret cannot be used as an HMAC key")]
    InvalidKey,
}

/// Hex HMAC-SHA256 of `payload` under `secret`
pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a `btcpay-sig` header against the exact raw body.
///
/// The digest must match in full; comparison is constant-time via `verify_slice`.
pub fn verify_webhook_signature(
    secret: &str,
    payload: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let header = header.map(str::trim).ok_or(SignatureError::Missing)?;
    if header.is_empty() {
        return Err(SignatureError::Missing);
    }

    let digest_hex = strip_prefix_ignore_case(header, SIGNATURE_PREFIX)
        .ok_or(SignatureError::Malformed)?;
    let digest = hex::decode(digest_hex).map_err(|_| SignatureError::InvalidHex)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(payload);

    mac.verify_slice(&digest).map_err(|_| {
        debug!("Webhook signature mismatch ({} byte digest)", digest.len());
        SignatureError::Mismatch
    })
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        value.get(prefix.len()..)
    } else {
        None
    }
}

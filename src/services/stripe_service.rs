use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{
    config::StripeConfig,
    error::{ApiError, Result},
};

type HmacSha256 = Hmac<Sha256>;

/// Reject signatures whose timestamp is older than this, limiting the
/// replay window for captured webhook deliveries.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verifies `Stripe-Signature` headers against the endpoint's signing
/// secret. Header format: `t=<unix>,v1=<hex>[,v1=<hex>...]`; the signed
/// payload is `"{t}.{body}"`.
pub struct StripeService {
    webhook_secret: String,
}

impl StripeService {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    /// Verify a webhook body against its signature header.
    pub fn verify_signature(&self, payload: &[u8], header: &str) -> Result<()> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        self.verify_signature_at(payload, header, now)
    }

    fn verify_signature_at(&self, payload: &[u8], header: &str, now: i64) -> Result<()> {
        let (timestamp, candidates) = parse_signature_header(header)?;

        if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(ApiError::InvalidSignature(format!(
                "timestamp {} outside tolerance window",
                timestamp
            )));
        }

        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let expected = hmac_sha256_hex(&self.webhook_secret, &signed_payload);

        // Stripe rotates secrets by sending several v1 entries; any match accepts
        if candidates.iter().any(|sig| constant_time_eq(&expected, sig)) {
            Ok(())
        } else {
            Err(ApiError::InvalidSignature("signature mismatch".to_string()))
        }
    }
}

/// Split the header into the timestamp and all v1 signature candidates.
fn parse_signature_header(header: &str) -> Result<(i64, Vec<&str>)> {
    let mut timestamp = None;
    let mut candidates = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse::<i64>().ok();
            }
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| ApiError::InvalidSignature("missing or non-numeric timestamp".to_string()))?;

    if candidates.is_empty() {
        return Err(ApiError::InvalidSignature(
            "no v1 signature in header".to_string(),
        ));
    }

    Ok((timestamp, candidates))
}

/// HMAC-SHA256, hex-encoded. HMAC accepts keys of any length, so
/// construction cannot fail.
fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts any key size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison so verification latency leaks nothing about
/// how much of the signature matched.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

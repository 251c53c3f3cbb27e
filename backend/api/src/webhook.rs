//! Payment webhook authentication and payload decoding.
//!
//! Deliveries carry `Payment-Signature: t=<unix>,v1=<hex>` where `v1` is
//! HMAC-SHA256 over `"{t}.{raw body}"` keyed with the shared webhook secret.
//! Several `v1` entries may be present while the secret is being rotated.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::errors::{ApiError, Result};

pub const SIGNATURE_HEADER: &str = "payment-signature";

type HmacSha256 = Hmac<Sha256>;

/// Hex signature of `"{timestamp}.{body}"`.
pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> Result<String> {
    Ok(hex::encode(mac_for(secret, timestamp, body)?.finalize().into_bytes()))
}

fn mac_for(secret: &str, timestamp: i64, body: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ApiError::Config("webhook secret is unusable".to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

/// Checks the signature header against `body` and the timestamp against
/// `now ± tolerance_secs`.
pub fn verify(
    secret: &str,
    header: Option<&str>,
    body: &[u8],
    now: i64,
    tolerance_secs: i64,
) -> Result<()> {
    let header = header.ok_or_else(|| unauthorized("missing signature header"))?;

    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| unauthorized("malformed signature header"))?;
    let skew = now.checked_sub(timestamp).map(i64::unsigned_abs);
    if skew.map_or(true, |skew| skew > tolerance_secs.max(0) as u64) {
        return Err(unauthorized("signature timestamp outside tolerance"));
    }

    let matched = candidates.iter().any(|candidate| {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        mac_for(secret, timestamp, body)
            .map(|mac| mac.verify_slice(&expected).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err(unauthorized("signature mismatch"))
    }
}

fn unauthorized(reason: &str) -> ApiError {
    ApiError::Unauthorized(format!("invalid webhook signature: {reason}"))
}

// ─────────────────────────────────────────────────────────
// Payload
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    object: Value,
}

/// The parts of a gateway event the payment status machine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub id: String,
    pub event_type: String,
    pub payment_intent_id: Option<String>,
    /// Cumulative refunded amount on refund events.
    pub amount_refunded: Option<i64>,
    pub failure_reason: Option<String>,
}

pub fn parse_event(body: &[u8]) -> Result<WebhookEvent> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| ApiError::field("body", format!("malformed webhook payload: {e}")))?;
    let object = &envelope.data.object;

    // Charges point at their intent; intents are the object itself.
    let payment_intent_id = if envelope.event_type.starts_with("charge.") {
        object.get("payment_intent").and_then(Value::as_str)
    } else {
        object.get("id").and_then(Value::as_str)
    }
    .map(str::to_string);

    Ok(WebhookEvent {
        id: envelope.id,
        payment_intent_id,
        amount_refunded: object.get("amount_refunded").and_then(Value::as_i64),
        failure_reason: object
            .pointer("/last_payment_error/message")
            .and_then(Value::as_str)
            .map(str::to_string),
        event_type: envelope.event_type,
    })
}

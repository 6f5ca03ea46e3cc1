// Webhook signature verification.
//
// The gateway signs each delivery with HMAC-SHA256 over
// `"{timestamp}.{raw_body}"` and ships the result in a
// `t=<unix>,v1=<hex>` header. Nothing in the body is trusted until the
// signature and the timestamp freshness window have both passed.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::core::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Deliveries older than this are rejected as replays.
pub const MAX_EVENT_AGE_SECS: i64 = 300;

/// Allowance for sender clocks running ahead of ours.
pub const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed `t=...,v1=...` signature header. Unknown schemes in the header
/// are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| AppError::signature("Malformed signature header"))?;

            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .parse()
                            .map_err(|_| AppError::signature("Invalid signature timestamp"))?,
                    );
                }
                "v1" => {
                    v1_signature = Some(
                        hex::decode(value)
                            .map_err(|_| AppError::signature("Invalid v1 signature hex"))?,
                    );
                }
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| AppError::signature("Signature header missing timestamp"))?;
        let v1_signature =
            v1_signature.ok_or_else(|| AppError::signature("Signature header missing v1"))?;

        Ok(Self {
            timestamp,
            v1_signature,
        })
    }
}

/// Authenticates raw webhook deliveries against the shared signing secret.
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Check signature and freshness for a raw delivery. Returns nothing on
    /// success; the caller parses the payload only after this passes.
    pub fn verify(&self, payload: &[u8], signature_header: &str, now: DateTime<Utc>) -> Result<()> {
        let header = SignatureHeader::parse(signature_header)?;
        self.validate_timestamp(header.timestamp, now)?;

        let expected = self.compute_signature(header.timestamp, payload);
        if !constant_time_compare(&expected, &header.v1_signature) {
            return Err(AppError::signature("Webhook signature mismatch"));
        }

        Ok(())
    }

    fn validate_timestamp(&self, timestamp: i64, now: DateTime<Utc>) -> Result<()> {
        let age = now.timestamp() - timestamp;

        if age > MAX_EVENT_AGE_SECS {
            return Err(AppError::signature("Webhook timestamp too old"));
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(AppError::signature("Webhook timestamp in the future"));
        }

        Ok(())
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Vec<u8> {
        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(signed_payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Length-checked constant-time equality; the length check itself leaks
/// nothing useful since digest lengths are public.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Produce a valid `t=...,v1=...` header for a payload. Test fixture helper.
pub fn sign_test_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(signed_payload.as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

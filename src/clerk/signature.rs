use axum::http::HeaderMap;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";
/// Maximum distance between the signed timestamp and now, in seconds
const TIMESTAMP_TOLERANCE_SECS: u64 = 5 * 60;

const ID_HEADERS: [&str; 2] = ["svix-id", "webhook-id"];
const TIMESTAMP_HEADERS: [&str; 2] = ["svix-timestamp", "webhook-timestamp"];
const SIGNATURE_HEADERS: [&str; 2] = ["svix-signature", "webhook-signature"];

#[derive(Debug, Error, PartialEq)]
pub enum WebhookError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("invalid timestamp header")]
    InvalidTimestamp,
    #[error("message timestamp too old or too new")]
    TimestampOutOfTolerance,
    #[error("no matching signature found")]
    InvalidSignature,
    #[error("webhook signing secret is not valid base64")]
    InvalidSecret,
}

/// Verifies webhook deliveries signed with the Svix scheme used by Clerk
///
/// The signed content is `{id}.{timestamp}.{body}`; the signature header
/// carries one or more space separated `v1,<base64 HMAC-SHA256>` entries.
#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

fn header<'a>(headers: &'a HeaderMap, names: [&'static str; 2]) -> Result<&'a str, WebhookError> {
    names
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::MissingHeader(names[0]))
}

impl WebhookVerifier {
    /// Accepts the secret with or without its `whsec_` prefix
    pub fn new(secret: &str) -> Result<Self, WebhookError> {
        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| WebhookError::InvalidSecret)?;
        if key.is_empty() {
            return Err(WebhookError::InvalidSecret);
        }
        Ok(Self { key })
    }

    fn mac(&self, msg_id: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|_| WebhookError::InvalidSecret)?;
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }

    /// Produce a `v1,<signature>` entry, as the provider would send it
    pub fn sign(&self, msg_id: &str, timestamp: i64, payload: &[u8]) -> Result<String, WebhookError> {
        let mac = self.mac(msg_id, &timestamp.to_string(), payload)?;
        Ok(format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes())))
    }

    pub fn verify(&self, headers: &HeaderMap, payload: &[u8]) -> Result<(), WebhookError> {
        self.verify_at(headers, payload, Utc::now().timestamp())
    }

    pub fn verify_at(&self, headers: &HeaderMap, payload: &[u8], now: i64) -> Result<(), WebhookError> {
        let msg_id = header(headers, ID_HEADERS)?;
        let timestamp = header(headers, TIMESTAMP_HEADERS)?;
        let signatures = header(headers, SIGNATURE_HEADERS)?;

        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| WebhookError::InvalidTimestamp)?;
        if now.abs_diff(sent_at) > TIMESTAMP_TOLERANCE_SECS {
            return Err(WebhookError::TimestampOutOfTolerance);
        }

        let mac = self.mac(msg_id, timestamp.trim(), payload)?;
        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .filter_map(|(_, sig)| STANDARD.decode(sig).ok())
            // verify_slice compares in constant time
            .any(|sig| mac.clone().verify_slice(&sig).is_ok());

        if matched {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }
}

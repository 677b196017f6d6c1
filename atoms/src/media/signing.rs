//! Request signing for the image store's authenticated endpoints.
//!
//! The signature is `hex(sha1(canonical_params + api_secret))`, where the
//! canonical string is the signed parameters sorted by key and joined as
//! `k1=v1&k2=v2`. Empty values are left out. The service recomputes the same
//! digest and refuses requests whose timestamp is outside its window.

use constant_time_eq::constant_time_eq;
use sha1::{Digest, Sha1};

/// Canonical `k=v&k=v` string over the non-empty params, sorted by key.
pub fn canonical_params(params: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(canonical_params(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Server-side check: signature matches and the timestamp is at most
/// `max_age_secs` old (and not from the future by more than the same margin).
pub fn verify_signature(
    params: &[(&str, String)],
    api_secret: &str,
    signature: &str,
    timestamp: i64,
    now: i64,
    max_age_secs: u64,
) -> bool {
    if now.abs_diff(timestamp) > max_age_secs {
        return false;
    }
    let expected = sign_params(params, api_secret);
    constant_time_eq(expected.as_bytes(), signature.to_ascii_lowercase().as_bytes())
}

/// Form fields for a signed destroy call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDestroy {
    pub public_id: String,
    pub timestamp: i64,
    pub api_key: String,
    pub signature: String,
}

impl SignedDestroy {
    pub fn new(public_id: &str, timestamp: i64, api_key: &str, api_secret: &str) -> Self {
        let signature = sign_params(
            &[("public_id", public_id.to_string()), ("timestamp", timestamp.to_string())],
            api_secret,
        );
        Self {
            public_id: public_id.to_string(),
            timestamp,
            api_key: api_key.to_string(),
            signature,
        }
    }

    pub fn form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("public_id", self.public_id.clone()),
            ("timestamp", self.timestamp.to_string()),
            ("api_key", self.api_key.clone()),
            ("signature", self.signature.clone()),
        ]
    }
}

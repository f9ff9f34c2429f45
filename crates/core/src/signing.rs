//! Time-limited signed access tokens for privately stored media.
//!
//! A token grants read access to one resource path until its expiry. The
//! signature is an HMAC-SHA256 over [`canonicalize`]`(path, expires_at)`,
//! hex-encoded. Nothing is persisted: verification recomputes the MAC from the
//! presented fields and the keyring.
//!
//! The keyring holds one active key used for issuing plus any number of
//! retired keys still accepted for verification, each addressed by a key id
//! carried alongside the token. Rotation is done out of band by restarting
//! with a new active key and listing the previous one as retired.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::error::CoreError;
use crate::types::Timestamp;

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default lifetime of an issued media URL (1 hour).
pub const DEFAULT_URL_TTL_SECS: u64 = 3600;

/// Maximum length of a key identifier.
pub const MAX_KEY_ID_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// A versioned HMAC secret.
#[derive(Clone)]
pub struct SigningKey {
    key_id: String,
    secret: Vec<u8>,
}

impl SigningKey {
    /// Create a key. The id must be 1..=64 chars of `[A-Za-z0-9_-]` so it can
    /// travel in a query string unescaped; the secret must be non-empty.
    pub fn new(key_id: impl Into<String>, secret: impl AsRef<[u8]>) -> Result<Self, CoreError> {
        let key_id = key_id.into();
        let secret = secret.as_ref().to_vec();

        if key_id.is_empty() || key_id.len() > MAX_KEY_ID_LEN {
            return Err(CoreError::Validation(format!(
                "signing key id must be 1..={MAX_KEY_ID_LEN} characters"
            )));
        }
        if !key_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::Validation(format!(
                "signing key id '{key_id}' may only contain letters, digits, '-' and '_'"
            )));
        }
        if secret.is_empty() {
            return Err(CoreError::Validation(
                "signing secret must not be empty".to_string(),
            ));
        }

        Ok(Self { key_id, secret })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tokens and verdicts
// ---------------------------------------------------------------------------

/// An issued access grant. Transient: rebuilt from URL parameters on verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedAccessToken {
    pub resource_path: String,
    pub key_id: String,
    pub issued_at: Timestamp,
    /// Expiry as Unix epoch seconds.
    pub expires_at: i64,
    /// Lowercase hex HMAC-SHA256.
    pub signature: String,
}

impl SignedAccessToken {
    /// Expiry as a UTC timestamp.
    pub fn expires_at_time(&self) -> Timestamp {
        Utc.timestamp_opt(self.expires_at, 0)
            .single()
            .unwrap_or(self.issued_at)
    }

    /// Render as `<base>/<path>?expires=<secs>&sig=<hex>&kid=<id>`.
    pub fn to_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}?expires={}&sig={}&kid={}",
            base_url.trim_end_matches('/'),
            self.resource_path,
            self.expires_at,
            self.signature,
            self.key_id,
        )
    }
}

/// Outcome of checking a presented token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Expired,
    Invalid,
}

/// Why access was refused. Never says which field failed to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    Expired,
    Invalid,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::Expired => "expired",
            DenyReason::Invalid => "invalid",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Expired => f.write_str("access token has expired"),
            DenyReason::Invalid => f.write_str("access token is invalid"),
        }
    }
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

/// Issues and verifies signed access tokens. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Signer {
    active_key_id: String,
    keys: HashMap<String, SigningKey>,
}

impl Signer {
    /// Create a signer that issues with `active`.
    pub fn new(active: SigningKey) -> Self {
        let active_key_id = active.key_id.clone();
        let mut keys = HashMap::new();
        keys.insert(active_key_id.clone(), active);
        Self {
            active_key_id,
            keys,
        }
    }

    /// Accept tokens signed with a previous key. Ids must be unique.
    pub fn with_retired_key(mut self, key: SigningKey) -> Result<Self, CoreError> {
        if self.keys.contains_key(&key.key_id) {
            return Err(CoreError::Validation(format!(
                "duplicate signing key id '{}'",
                key.key_id
            )));
        }
        self.keys.insert(key.key_id.clone(), key);
        Ok(self)
    }

    pub fn active_key_id(&self) -> &str {
        &self.active_key_id
    }

    /// Issue a token for `resource_path` valid for `ttl` from now.
    pub fn issue(&self, resource_path: &str, ttl: Duration) -> SignedAccessToken {
        self.issue_at(resource_path, ttl, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, resource_path: &str, ttl: Duration, now: Timestamp) -> SignedAccessToken {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = now.timestamp().saturating_add(ttl_secs);

        let active = &self.keys[&self.active_key_id];
        let mac = keyed_mac(&active.secret, resource_path, expires_at);
        let signature = hex::encode(mac.finalize().into_bytes());

        SignedAccessToken {
            resource_path: resource_path.to_string(),
            key_id: self.active_key_id.clone(),
            issued_at: now,
            expires_at,
            signature,
        }
    }

    /// Verify a presented token against the current time.
    ///
    /// `key_id` selects the key; `None` means the active key.
    pub fn verify(
        &self,
        resource_path: &str,
        expires_at: i64,
        signature: &str,
        key_id: Option<&str>,
    ) -> Verification {
        self.verify_at(resource_path, expires_at, signature, key_id, Utc::now())
    }

    /// Verify as if the current time were `now`.
    ///
    /// The MAC is checked first in constant time; only an authentic token can
    /// be reported as [`Verification::Expired`]. Malformed input is `Invalid`.
    pub fn verify_at(
        &self,
        resource_path: &str,
        expires_at: i64,
        signature: &str,
        key_id: Option<&str>,
        now: Timestamp,
    ) -> Verification {
        let key_id = key_id.unwrap_or(&self.active_key_id);
        let Some(key) = self.keys.get(key_id) else {
            return Verification::Invalid;
        };
        let Some(presented) = hex::decode(signature) else {
            return Verification::Invalid;
        };

        let mac = keyed_mac(&key.secret, resource_path, expires_at);
        if mac.verify_slice(&presented).is_err() {
            return Verification::Invalid;
        }

        if now.timestamp() > expires_at {
            return Verification::Expired;
        }
        Verification::Valid
    }
}

/// The exact byte string covered by the MAC.
///
/// The expiry is all digits (optionally signed) and comes last, so splitting
/// at the final newline recovers a unique `(path, expires)` pair.
pub fn canonicalize(resource_path: &str, expires_at: i64) -> String {
    format!("{resource_path}\n{expires_at}")
}

fn keyed_mac(secret: &[u8], resource_path: &str, expires_at: i64) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(canonicalize(resource_path, expires_at).as_bytes());
    mac
}

// ---------------------------------------------------------------------------
// hex encoding helper (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decode a lowercase hex string. Uppercase, odd length and any other
    /// character yield `None`, so each signature has one spelling.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        let bytes = s.as_bytes();
        if bytes.len() % 2 != 0 {
            return None;
        }
        bytes
            .chunks_exact(2)
            .map(|pair| Some(nibble(pair[0])? << 4 | nibble(pair[1])?))
            .collect()
    }

    fn nibble(c: u8) -> Option<u8> {
        match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'a'..=b'f' => Some(c - b'a' + 10),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const PATH: &str = "photos/sunset.jpg";
    const HOUR: Duration = Duration::from_secs(3600);

    fn signer() -> Signer {
        Signer::new(SigningKey::new("k1", "test-secret").unwrap())
    }

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    // -- Issue / verify ------------------------------------------------------

    #[test]
    fn fresh_token_verifies() {
        let signer = signer();
        let token = signer.issue(PATH, HOUR);
        assert_eq!(
            signer.verify(PATH, token.expires_at, &token.signature, None),
            Verification::Valid
        );
    }

    #[test]
    fn expiry_is_now_plus_ttl() {
        let token = signer().issue_at(PATH, HOUR, at(1_700_000_000));
        assert_eq!(token.expires_at, 1_700_003_600);
        assert_eq!(token.key_id, "k1");
        assert_eq!(token.signature.len(), 64);
    }

    #[test]
    fn token_is_valid_up_to_and_including_expiry_second() {
        let signer = signer();
        let token = signer.issue_at(PATH, HOUR, at(1_000));
        let verdict = |now| signer.verify_at(PATH, token.expires_at, &token.signature, None, at(now));
        assert_eq!(verdict(1_000), Verification::Valid);
        assert_eq!(verdict(4_600), Verification::Valid);
        assert_eq!(verdict(4_601), Verification::Expired);
    }

    #[test]
    fn elapsed_token_is_expired_not_invalid() {
        let signer = signer();
        let token = signer.issue_at(PATH, HOUR, at(1_000));
        assert_eq!(
            signer.verify_at(PATH, token.expires_at, &token.signature, None, at(1_000 + 7_200)),
            Verification::Expired
        );
    }

    #[test]
    fn every_single_bit_flip_is_invalid() {
        let signer = signer();
        let token = signer.issue_at(PATH, HOUR, at(1_000));
        let raw = hex::decode(&token.signature).unwrap();

        for byte in 0..raw.len() {
            for bit in 0..8 {
                let mut mutated = raw.clone();
                mutated[byte] ^= 1 << bit;
                let forged = hex::encode(&mutated);
                assert_eq!(
                    signer.verify_at(PATH, token.expires_at, &forged, None, at(1_000)),
                    Verification::Invalid,
                    "flipping bit {bit} of byte {byte} should invalidate"
                );
            }
        }
    }

    #[test]
    fn changed_path_or_expiry_is_invalid() {
        let signer = signer();
        let token = signer.issue_at(PATH, HOUR, at(1_000));
        assert_eq!(
            signer.verify_at("photos/sunset.jpeg", token.expires_at, &token.signature, None, at(1_000)),
            Verification::Invalid
        );
        assert_eq!(
            signer.verify_at(PATH, token.expires_at + 1, &token.signature, None, at(1_000)),
            Verification::Invalid
        );
    }

    #[test]
    fn forged_token_with_past_expiry_is_invalid_not_expired() {
        let signer = signer();
        assert_eq!(
            signer.verify_at(PATH, 10, &"0".repeat(64), None, at(1_000)),
            Verification::Invalid
        );
    }

    #[test]
    fn malformed_signatures_are_invalid() {
        let signer = signer();
        let token = signer.issue_at(PATH, HOUR, at(1_000));
        let upper = token.signature.to_uppercase();
        for bad in ["", "zz", "abc", upper.as_str(), &token.signature[..62]] {
            assert_eq!(
                signer.verify_at(PATH, token.expires_at, bad, None, at(1_000)),
                Verification::Invalid,
                "signature {bad:?} should be invalid"
            );
        }
    }

    #[test]
    fn different_secret_is_invalid() {
        let token = signer().issue_at(PATH, HOUR, at(1_000));
        let other = Signer::new(SigningKey::new("k1", "other-secret").unwrap());
        assert_eq!(
            other.verify_at(PATH, token.expires_at, &token.signature, None, at(1_000)),
            Verification::Invalid
        );
    }

    // -- Keyring -------------------------------------------------------------

    #[test]
    fn retired_key_still_verifies_by_id() {
        let old = signer();
        let token = old.issue_at(PATH, HOUR, at(1_000));

        let rotated = Signer::new(SigningKey::new("k2", "new-secret").unwrap())
            .with_retired_key(SigningKey::new("k1", "test-secret").unwrap())
            .unwrap();

        assert_eq!(rotated.active_key_id(), "k2");
        assert_eq!(
            rotated.verify_at(PATH, token.expires_at, &token.signature, Some("k1"), at(1_000)),
            Verification::Valid
        );
        // Without the id the active key is used, which did not sign it.
        assert_eq!(
            rotated.verify_at(PATH, token.expires_at, &token.signature, None, at(1_000)),
            Verification::Invalid
        );
    }

    #[test]
    fn unknown_key_id_is_invalid() {
        let signer = signer();
        let token = signer.issue_at(PATH, HOUR, at(1_000));
        assert_eq!(
            signer.verify_at(PATH, token.expires_at, &token.signature, Some("nope"), at(1_000)),
            Verification::Invalid
        );
    }

    #[test]
    fn duplicate_key_ids_are_rejected() {
        let result = signer().with_retired_key(SigningKey::new("k1", "x").unwrap());
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn key_validation() {
        assert_matches!(SigningKey::new("", "s"), Err(CoreError::Validation(_)));
        assert_matches!(SigningKey::new("k 1", "s"), Err(CoreError::Validation(_)));
        assert_matches!(SigningKey::new("k1", ""), Err(CoreError::Validation(_)));
        assert!(SigningKey::new("2026-q1_primary", "s").is_ok());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let key = SigningKey::new("k1", "super-secret").unwrap();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("k1"));
    }

    // -- Encoding ------------------------------------------------------------

    #[test]
    fn canonical_form_separates_path_and_expiry() {
        assert_eq!(canonicalize("a/b.jpg", 12), "a/b.jpg\n12");
        assert_ne!(canonicalize("a1", 23), canonicalize("a", 123));
    }

    #[test]
    fn url_contains_expiry_signature_and_key() {
        let token = signer().issue_at(PATH, HOUR, at(1_000));
        let url = token.to_url("https://cdn.example.com/media/");
        assert_eq!(
            url,
            format!(
                "https://cdn.example.com/media/photos/sunset.jpg?expires=4600&sig={}&kid=k1",
                token.signature
            )
        );
        assert_eq!(token.expires_at_time(), at(4_600));
    }
}

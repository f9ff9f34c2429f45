use std::fmt;
use std::time::Duration;

use photoshare_core::error::CoreError;
use photoshare_core::gateway::GatewayConfig;
use photoshare_core::signing::{Signer, SigningKey, DEFAULT_URL_TTL_SECS};

/// Server configuration loaded from environment variables.
///
/// Everything except the media signing key has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// PostgreSQL URL. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    /// Signed media URL settings.
    pub media: MediaConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `DATABASE_URL`         | unset (in-memory store)    |
    ///
    /// Panics on malformed values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let media = MediaConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_url,
            media,
        }
    }
}

// ---------------------------------------------------------------------------
// Media signing
// ---------------------------------------------------------------------------

/// Signing keyring and URL settings for media access.
#[derive(Clone)]
pub struct MediaConfig {
    /// Secret for newly issued URLs.
    pub signing_key: String,
    /// Id recorded in the `kid` URL parameter (default: `primary`).
    pub signing_key_id: String,
    /// Previous `(id, secret)` pairs still accepted for verification.
    pub retired_keys: Vec<(String, String)>,
    /// Prefix of issued URLs (default: `http://localhost:3000/media`).
    pub base_url: String,
    /// Lifetime of issued URLs in seconds (default: `3600`).
    pub url_ttl_secs: u64,
}

impl MediaConfig {
    /// Load media settings from environment variables.
    ///
    /// | Env Var                | Default                        |
    /// |------------------------|--------------------------------|
    /// | `MEDIA_SIGNING_KEY`    | required                       |
    /// | `MEDIA_SIGNING_KEY_ID` | `primary`                      |
    /// | `MEDIA_RETIRED_KEYS`   | empty, `id:secret,id:secret`   |
    /// | `MEDIA_BASE_URL`       | `http://localhost:3000/media`  |
    /// | `MEDIA_URL_TTL_SECS`   | `3600`                         |
    pub fn from_env() -> Self {
        let signing_key = std::env::var("MEDIA_SIGNING_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .expect("MEDIA_SIGNING_KEY must be set");

        let signing_key_id =
            std::env::var("MEDIA_SIGNING_KEY_ID").unwrap_or_else(|_| "primary".into());

        let retired_keys = parse_retired_keys(
            &std::env::var("MEDIA_RETIRED_KEYS").unwrap_or_default(),
        )
        .unwrap_or_else(|e| panic!("MEDIA_RETIRED_KEYS is invalid: {e}"));

        let base_url = std::env::var("MEDIA_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000/media".into());

        let url_ttl_secs: u64 = std::env::var("MEDIA_URL_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_URL_TTL_SECS.to_string())
            .parse()
            .expect("MEDIA_URL_TTL_SECS must be a valid u64");
        assert!(url_ttl_secs > 0, "MEDIA_URL_TTL_SECS must be positive");

        Self {
            signing_key,
            signing_key_id,
            retired_keys,
            base_url,
            url_ttl_secs,
        }
    }

    /// Build the signer: the active key plus every retired key.
    pub fn build_signer(&self) -> Result<Signer, CoreError> {
        let active = SigningKey::new(&self.signing_key_id, &self.signing_key)?;
        self.retired_keys
            .iter()
            .try_fold(Signer::new(active), |signer, (id, secret)| {
                signer.with_retired_key(SigningKey::new(id, secret)?)
            })
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            media_base_url: self.base_url.clone(),
            url_ttl: Duration::from_secs(self.url_ttl_secs),
        }
    }
}

impl fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let retired: Vec<&str> = self.retired_keys.iter().map(|(id, _)| id.as_str()).collect();
        f.debug_struct("MediaConfig")
            .field("signing_key", &"<redacted>")
            .field("signing_key_id", &self.signing_key_id)
            .field("retired_keys", &retired)
            .field("base_url", &self.base_url)
            .field("url_ttl_secs", &self.url_ttl_secs)
            .finish()
    }
}

/// Parse `id:secret,id:secret`. Blank entries are skipped.
pub fn parse_retired_keys(raw: &str) -> Result<Vec<(String, String)>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((id, secret)) if !id.is_empty() && !secret.is_empty() => {
                Ok((id.to_string(), secret.to_string()))
            }
            _ => Err(format!("expected 'id:secret', got '{entry}'")),
        })
        .collect()
}

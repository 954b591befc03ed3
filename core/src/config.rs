//! Client configuration resolved at startup.
//!
//! Debug and release deployments talk to different hosts. Instead of
//! compiling the host in, the embedding application supplies it, either
//! through the builder methods or from the environment:
//!
//! - `API_BASE_URL` (optional): scheme, domain and port, e.g. `https://api.example.com:8443`
//! - `API_TIMEOUT_SECS` (optional): request timeout in seconds
//! - `API_TLS_ACCEPT_INVALID_CERTS` (optional): `true`/`1` disables certificate checks
//! - `API_FIXTURES_DIR` (optional): directory holding mock JSON fixtures

use std::path::PathBuf;
use std::time::Duration;

use url::{Host, Url};

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Applied uniformly to every endpoint.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_FIXTURES_DIR: &str = "fixtures";

/// Certificate trust for the configured host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrustPolicy {
    /// Standard certificate verification.
    #[default]
    Verify,
    /// Accept any certificate. Only for test servers with self-signed certs.
    AcceptInvalidCerts,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    pub timeout: Duration,
    pub trust: TrustPolicy,
    pub fixtures_dir: PathBuf,
}

impl ClientConfig {
    /// Validates `base_url` and fills the remaining fields with defaults.
    pub fn new(base_url: &str) -> ApiResult<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ApiError::Configuration(format!("invalid base URL {base_url:?}: {e}")))?;
        if parsed.host_str().is_none() {
            return Err(ApiError::Configuration(format!(
                "base URL {base_url:?} has no host"
            )));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            trust: TrustPolicy::default(),
            fixtures_dir: PathBuf::from(DEFAULT_FIXTURES_DIR),
        })
    }

    /// Reads the `API_*` environment variables.
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;

        if let Some(raw) = lookup("API_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                ApiError::Configuration(format!("API_TIMEOUT_SECS must be an integer, got {raw:?}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup("API_TLS_ACCEPT_INVALID_CERTS") {
            if matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                config.trust = TrustPolicy::AcceptInvalidCerts;
            }
        }

        if let Some(dir) = lookup("API_FIXTURES_DIR") {
            config.fixtures_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_trust(mut self, trust: TrustPolicy) -> Self {
        self.trust = trust;
        self
    }

    pub fn with_fixtures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixtures_dir = dir.into();
        self
    }

    /// Scheme, domain and port without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Host and port of the base URL, with the scheme's default port filled in.
    /// IPv6 literals come back without brackets, ready for socket resolution.
    pub fn host_and_port(&self) -> Option<(String, u16)> {
        let url = Url::parse(&self.base_url).ok()?;
        let host = match url.host()? {
            Host::Domain(domain) => domain.to_string(),
            Host::Ipv4(addr) => addr.to_string(),
            Host::Ipv6(addr) => addr.to_string(),
        };
        let port = url.port_or_known_default()?;
        Some((host, port))
    }
}

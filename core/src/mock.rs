//! Offline responses read from JSON fixture files.
//!
//! `MockLoader` stands in for the live path during development: it decodes
//! `<fixtures_dir>/<name>.json` into the same models `ApiClient` returns,
//! and reports every failure as the same connection error.

use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult, FailureKind};

#[derive(Debug, Clone)]
pub struct MockLoader {
    root: PathBuf,
}

impl MockLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.fixtures_dir.clone())
    }

    /// Path a fixture name resolves to. A name without an extension gets `.json`.
    pub fn fixture_path(&self, name: &str) -> PathBuf {
        let path = self.root.join(name);
        if path.extension().is_some() {
            path
        } else {
            path.with_extension("json")
        }
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> ApiResult<T> {
        let path = self.fixture_path(name);
        let bytes = fs::read(&path).map_err(|e| {
            debug!(path = %path.display(), error = %e, "fixture unavailable");
            ApiError::connection(FailureKind::Fixture(format!("{}: {e}", path.display())))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            debug!(path = %path.display(), error = %e, "fixture did not decode");
            ApiError::connection(FailureKind::Decode(e.to_string()))
        })
    }
}

//! Token interceptor applied to every endpoint that requires one.
//!
//! The interceptor has two hooks, both driven by `ApiClient`:
//!
//! - `adapt` runs before each send and overwrites the `token` header with
//!   the credential provider's current value.
//! - `retry` runs after a response fails validation and decides whether the
//!   request goes out again.
//!
//! With the default `RetryPolicy::Never` the interceptor never retries, even
//! for 401/403/500. `RetryPolicy::RefreshOnce` asks the provider to refresh
//! and allows exactly one more attempt.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::endpoint::TOKEN_HEADER;
use crate::error::ApiResult;
use crate::http::{HttpRequest, HttpStatus};

/// Value written by `PlaceholderCredential`. Not a real credential.
pub const PLACEHOLDER_REFRESH_TOKEN: &str = "refresh-token";

/// Source of the token the interceptor writes into requests.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Token to send with the next request.
    fn current(&self) -> String;

    /// Obtain a new token; called at most once per request.
    async fn refresh(&self) -> ApiResult<()>;
}

/// Always hands out `PLACEHOLDER_REFRESH_TOKEN`; refreshing is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderCredential;

#[async_trait]
impl CredentialProvider for PlaceholderCredential {
    fn current(&self) -> String {
        PLACEHOLDER_REFRESH_TOKEN.to_string()
    }

    async fn refresh(&self) -> ApiResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Surface every validation failure as-is.
    #[default]
    Never,
    /// On 401/403/500, refresh the credential and send once more.
    RefreshOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    DoNotRetry,
}

#[derive(Clone)]
pub struct TokenInterceptor {
    provider: Arc<dyn CredentialProvider>,
    policy: RetryPolicy,
}

impl TokenInterceptor {
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            provider,
            policy: RetryPolicy::Never,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Overwrites the `token` header, whatever it held before.
    pub fn adapt(&self, request: &mut HttpRequest) {
        request.set_header(TOKEN_HEADER, &self.provider.current());
    }

    /// Decides whether a request that failed with `status` is sent again.
    /// `attempts` counts sends already made for this request.
    pub async fn retry(&self, status: u16, attempts: u32) -> RetryDecision {
        let refreshable = matches!(
            HttpStatus::try_from(status),
            Ok(HttpStatus::Unauthorized | HttpStatus::Forbidden | HttpStatus::InternalServerError)
        );
        if !refreshable {
            return RetryDecision::DoNotRetry;
        }

        match self.policy {
            RetryPolicy::Never => RetryDecision::DoNotRetry,
            RetryPolicy::RefreshOnce if attempts > 1 => RetryDecision::DoNotRetry,
            RetryPolicy::RefreshOnce => match self.provider.refresh().await {
                Ok(()) => {
                    debug!(status, "credential refreshed, retrying once");
                    RetryDecision::Retry
                }
                Err(err) => {
                    warn!(status, error = %err, "credential refresh failed");
                    RetryDecision::DoNotRetry
                }
            },
        }
    }
}

impl Default for TokenInterceptor {
    fn default() -> Self {
        Self::new(Arc::new(PlaceholderCredential))
    }
}

impl fmt::Debug for TokenInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenInterceptor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

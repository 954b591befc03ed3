//! Debug-build request/response diagnostics.

use crate::http::HttpMethod;

/// Emits one line for a completed request/response pair, labelled with the
/// calling site. `status` is `None` when no response arrived.
///
/// Compiled to nothing in release builds.
#[inline]
pub fn log_exchange(context: &str, method: HttpMethod, url: &str, status: Option<u16>) {
    #[cfg(debug_assertions)]
    {
        use chrono::{SecondsFormat, Utc};

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let outcome = status.map_or_else(|| "no response".to_string(), |s| s.to_string());
        tracing::debug!(
            target: "api_core::exchange",
            "[{timestamp}] {context}: {method} {url} -> {outcome}"
        );
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = (context, method, url, status);
    }
}

//! Typed endpoint client.
//!
//! # Overview
//! A closed set of API endpoints (`Endpoint`) each derive a full request
//! configuration: URL, method, parameter encoding, headers, acceptable
//! status range and whether the token interceptor applies. `ApiClient`
//! turns endpoints into requests, sends them through a `Transport`, and
//! decodes JSON responses into typed models. `MockLoader` serves the same
//! models from fixture files for offline work.
//!
//! # Design
//! - Building and parsing are pure (`ApiClient::build`, `ApiClient::parse`),
//!   so every mapping rule is testable without I/O.
//! - All request-path failures are `ApiError::Connection` with one message.
//! - Host, timeout and TLS trust come from `ClientConfig`, resolved at
//!   startup rather than compiled in.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod logging;
pub mod mock;
pub mod reachability;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use config::{ClientConfig, TrustPolicy};
pub use endpoint::{Endpoint, RequestConfig, TOKEN_HEADER};
pub use error::{ApiError, ApiResult, FailureKind, DEFAULT_CONNECTION_MESSAGE};
pub use http::{BodyEncoding, HttpMethod, HttpRequest, HttpResponse, HttpStatus, RequestBody};
pub use interceptor::{CredentialProvider, PlaceholderCredential, RetryDecision, RetryPolicy, TokenInterceptor};
pub use logging::log_exchange;
pub use mock::MockLoader;
pub use reachability::Reachability;
pub use transport::{ReqwestTransport, Transport};
pub use types::{DeleteResult, Record, RecordList, UploadReceipt};

//! Request building, response parsing and execution for `Endpoint` values.
//!
//! # Design
//! `ApiClient` keeps the teacher's split between pure and effectful work.
//! `build*` turns an `Endpoint` into an `HttpRequest` and `parse` validates
//! and decodes an `HttpResponse`, both without touching the network.
//! `execute*` wires them together through a `Transport` and the
//! `TokenInterceptor`.
//!
//! The client carries no mutable state between calls. Concurrent calls on
//! one client are independent of each other.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use tracing::warn;
use url::Url;

use crate::config::ClientConfig;
use crate::endpoint::{Endpoint, RequestConfig};
use crate::error::{ApiError, ApiResult, FailureKind};
use crate::http::{BodyEncoding, FilePart, HttpRequest, HttpResponse, MultipartForm, RequestBody};
use crate::interceptor::{RetryDecision, TokenInterceptor};
use crate::logging::log_exchange;
use crate::transport::{ReqwestTransport, Transport};

/// Multipart field carrying the image bytes.
pub const UPLOAD_FIELD_NAME: &str = "file";
pub const UPLOAD_FILE_NAME: &str = "image.jpg";
pub const UPLOAD_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone)]
pub struct ApiClient<T = ReqwestTransport> {
    config: ClientConfig,
    transport: T,
    interceptor: TokenInterceptor,
}

impl ApiClient<ReqwestTransport> {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Client configured from the `API_*` environment variables.
    pub fn from_env() -> ApiResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            interceptor: TokenInterceptor::default(),
        }
    }

    pub fn with_interceptor(mut self, interceptor: TokenInterceptor) -> Self {
        self.interceptor = interceptor;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn request_config(&self, endpoint: &Endpoint) -> RequestConfig {
        endpoint.config(self.config.base_url(), self.config.timeout)
    }

    /// Builds the request for `endpoint`. Uploads carry no extra fields.
    pub fn build(&self, endpoint: &Endpoint) -> ApiResult<HttpRequest> {
        if let Endpoint::UploadImage(_) = endpoint {
            return self.build_upload(endpoint, &BTreeMap::new());
        }

        let config = self.request_config(endpoint);
        let mut url = config.url.clone();
        let body = match (config.encoding, &config.parameters) {
            (_, None) => RequestBody::Empty,
            (BodyEncoding::Query, Some(params)) => {
                let mut parsed = Url::parse(&url)
                    .map_err(|e| ApiError::Configuration(format!("invalid URL {url:?}: {e}")))?;
                parsed.query_pairs_mut().extend_pairs(params.iter());
                url = parsed.into();
                RequestBody::Empty
            }
            (BodyEncoding::FormUrlEncoded, Some(params)) => {
                RequestBody::Form(serde_urlencoded::to_string(params).map_err(|e| {
                    ApiError::Configuration(format!("failed to encode form body: {e}"))
                })?)
            }
            (BodyEncoding::Json, Some(params)) => {
                RequestBody::Json(serde_json::to_string(params).map_err(|e| {
                    ApiError::Configuration(format!("failed to encode JSON body: {e}"))
                })?)
            }
        };

        Ok(HttpRequest {
            method: config.method,
            url,
            headers: header_list(&config),
            body,
        })
    }

    /// Builds a multipart upload. An empty image still produces a request,
    /// just without a file part.
    pub fn build_upload(
        &self,
        endpoint: &Endpoint,
        fields: &BTreeMap<String, String>,
    ) -> ApiResult<HttpRequest> {
        let Endpoint::UploadImage(bytes) = endpoint else {
            return Err(ApiError::Configuration(format!(
                "{} does not accept multipart fields",
                endpoint.path()
            )));
        };

        let config = self.request_config(endpoint);
        let file = (!bytes.is_empty()).then(|| FilePart {
            field_name: UPLOAD_FIELD_NAME.to_string(),
            file_name: UPLOAD_FILE_NAME.to_string(),
            mime_type: UPLOAD_MIME_TYPE.to_string(),
            bytes: bytes.clone(),
        });

        Ok(HttpRequest {
            method: config.method,
            url: config.url.clone(),
            headers: header_list(&config),
            body: RequestBody::Multipart(MultipartForm {
                fields: fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                file,
            }),
        })
    }

    /// Validates `response` against the endpoint's status range and decodes it.
    pub fn parse<R: DeserializeOwned>(&self, endpoint: &Endpoint, response: HttpResponse) -> ApiResult<R> {
        parse_response(&self.request_config(endpoint), response)
    }

    /// Sends `endpoint` and decodes the response as `R`.
    pub async fn execute<R: DeserializeOwned>(&self, endpoint: &Endpoint) -> ApiResult<R> {
        let request = self.build(endpoint)?;
        self.run(endpoint, request).await
    }

    /// Sends an image upload with extra scalar fields.
    pub async fn execute_upload<R: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        fields: &BTreeMap<String, String>,
    ) -> ApiResult<R> {
        let request = self.build_upload(endpoint, fields)?;
        self.run(endpoint, request).await
    }

    async fn run<R: DeserializeOwned>(&self, endpoint: &Endpoint, request: HttpRequest) -> ApiResult<R> {
        let config = self.request_config(endpoint);
        let mut attempts = 0;

        loop {
            let mut outgoing = request.clone();
            if config.requires_interceptor {
                self.interceptor.adapt(&mut outgoing);
            }
            attempts += 1;

            let response = match self.transport.send(outgoing).await {
                Ok(response) => response,
                Err(err) => {
                    log_exchange(endpoint.name(), request.method, &request.url, None);
                    return Err(err);
                }
            };
            log_exchange(endpoint.name(), request.method, &request.url, Some(response.status));

            if config.requires_interceptor
                && !config.accepts(response.status)
                && self.interceptor.retry(response.status, attempts).await == RetryDecision::Retry
            {
                continue;
            }

            return parse_response(&config, response);
        }
    }
}

fn header_list(config: &RequestConfig) -> Vec<(String, String)> {
    config
        .headers
        .iter()
        .flatten()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Reject statuses outside the acceptable range.
fn check_status(config: &RequestConfig, response: &HttpResponse) -> ApiResult<()> {
    if config.accepts(response.status) {
        return Ok(());
    }
    warn!(
        url = %config.url,
        status = response.status,
        "response status outside {}..{}",
        config.acceptable_status.start,
        config.acceptable_status.end
    );
    Err(ApiError::connection(FailureKind::Status(response.status)))
}

fn parse_response<R: DeserializeOwned>(config: &RequestConfig, response: HttpResponse) -> ApiResult<R> {
    check_status(config, &response)?;
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::connection(FailureKind::MissingValue));
    }
    serde_json::from_slice(&response.body)
        .map_err(|e| ApiError::connection(FailureKind::Decode(e.to_string())))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::endpoint::TOKEN_HEADER;
    use crate::error::DEFAULT_CONNECTION_MESSAGE;
    use crate::http::HttpMethod;
    use crate::interceptor::{CredentialProvider, RetryPolicy, PLACEHOLDER_REFRESH_TOKEN};
    use crate::types::{DeleteResult, Record, RecordList};

    /// Replies with queued responses and records what it was sent.
    #[derive(Default, Clone)]
    struct ScriptedTransport {
        replies: Arc<Mutex<Vec<(u16, String)>>>,
        sent: Arc<Mutex<Vec<HttpRequest>>>,
    }

    impl ScriptedTransport {
        fn replying(replies: &[(u16, &str)]) -> Self {
            let transport = Self::default();
            transport
                .replies
                .lock()
                .unwrap()
                .extend(replies.iter().rev().map(|(s, b)| (*s, b.to_string())));
            transport
        }

        fn sent(&self) -> Vec<HttpRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
            self.sent.lock().unwrap().push(request);
            let (status, body) = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ApiError::connection(FailureKind::Transport("no reply queued".into())))?;
            Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.into_bytes(),
            })
        }
    }

    fn client_with(transport: ScriptedTransport) -> ApiClient<ScriptedTransport> {
        ApiClient::with_transport(ClientConfig::new("http://localhost:3000").unwrap(), transport)
    }

    fn client() -> ApiClient<ScriptedTransport> {
        client_with(ScriptedTransport::default())
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    const RECORD: &str = r#"{"id":"00000000-0000-0000-0000-000000000001","field1":"a","field2":3}"#;

    #[test]
    fn build_get_has_no_body_or_headers() {
        let req = client().build(&Endpoint::Get).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/apiGet");
        assert!(req.headers.is_empty());
        assert!(req.body.is_empty());
    }

    #[test]
    fn build_post_sends_stringified_json() {
        let endpoint = Endpoint::Post {
            field1: "a".to_string(),
            field2: 3,
        };
        let req = client().build(&endpoint).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.header(TOKEN_HEADER), Some("post"));
        let RequestBody::Json(body) = &req.body else {
            panic!("expected JSON body, got {:?}", req.body);
        };
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body, serde_json::json!({"field1": "a", "field2": "3"}));
    }

    #[test]
    fn build_delete_has_token_and_no_params() {
        let req = client().build(&Endpoint::Delete).unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, "http://localhost:3000/apiDelete");
        assert_eq!(req.header(TOKEN_HEADER), Some("delete"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn build_upload_attaches_file_part() {
        let req = client().build(&Endpoint::UploadImage(vec![1, 2, 3])).unwrap();
        assert_eq!(req.url, "http://localhost:3000/uploadImage");
        assert_eq!(req.header(TOKEN_HEADER), Some("image"));
        let RequestBody::Multipart(form) = &req.body else {
            panic!("expected multipart body");
        };
        let file = form.file.as_ref().unwrap();
        assert_eq!(file.field_name, "file");
        assert_eq!(file.mime_type, "image/jpeg");
        assert_eq!(file.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn build_upload_with_empty_blob_omits_file_part() {
        let fields = BTreeMap::from([("caption".to_string(), "cat".to_string())]);
        let req = client()
            .build_upload(&Endpoint::UploadImage(Vec::new()), &fields)
            .unwrap();
        let RequestBody::Multipart(form) = &req.body else {
            panic!("expected multipart body");
        };
        assert!(form.file.is_none());
        assert_eq!(form.fields, vec![("caption".to_string(), "cat".to_string())]);
    }

    #[test]
    fn build_upload_rejects_other_endpoints() {
        let err = client().build_upload(&Endpoint::Delete, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[test]
    fn parse_get_accepts_404() {
        let list: RecordList = client()
            .parse(&Endpoint::Get, response(404, r#"{"records":[]}"#))
            .unwrap();
        assert!(list.records.is_empty());
    }

    #[test]
    fn parse_post_rejects_404() {
        let endpoint = Endpoint::Post {
            field1: "a".to_string(),
            field2: 3,
        };
        let err = client()
            .parse::<Record>(&endpoint, response(404, RECORD))
            .unwrap_err();
        assert!(matches!(err, ApiError::Connection { .. }));
        assert_eq!(err.to_string(), DEFAULT_CONNECTION_MESSAGE);
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn parse_get_rejects_500() {
        let err = client()
            .parse::<RecordList>(&Endpoint::Get, response(500, r#"{"records":[]}"#))
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn parse_bad_json_is_connection_error() {
        let err = client()
            .parse::<DeleteResult>(&Endpoint::Delete, response(200, "not json"))
            .unwrap_err();
        assert!(matches!(err.kind(), Some(FailureKind::Decode(_))));
        assert_eq!(err.to_string(), DEFAULT_CONNECTION_MESSAGE);
    }

    #[test]
    fn parse_empty_body_is_missing_value() {
        let err = client()
            .parse::<DeleteResult>(&Endpoint::Delete, response(204, ""))
            .unwrap_err();
        assert_eq!(err.kind(), Some(&FailureKind::MissingValue));
    }

    #[test]
    fn parse_json_null_is_decode_error() {
        let err = client()
            .parse::<DeleteResult>(&Endpoint::Delete, response(200, "null"))
            .unwrap_err();
        assert!(matches!(err.kind(), Some(FailureKind::Decode(_))));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = ApiClient::with_transport(
            ClientConfig::new("http://localhost:3000/").unwrap(),
            ScriptedTransport::default(),
        );
        let req = client.build(&Endpoint::Get).unwrap();
        assert_eq!(req.url, "http://localhost:3000/apiGet");
    }

    #[tokio::test]
    async fn execute_overwrites_token_on_intercepted_endpoints() {
        let transport = ScriptedTransport::replying(&[(201, RECORD), (200, r#"{"records":[]}"#)]);
        let client = client_with(transport.clone());

        let endpoint = Endpoint::Post {
            field1: "a".to_string(),
            field2: 3,
        };
        let record: Record = client.execute(&endpoint).await.unwrap();
        assert_eq!(record.field1, "a");
        let _: RecordList = client.execute(&Endpoint::Get).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].header(TOKEN_HEADER), Some(PLACEHOLDER_REFRESH_TOKEN));
        assert_eq!(sent[1].header(TOKEN_HEADER), None);
    }

    #[tokio::test]
    async fn execute_does_not_retry_by_default() {
        let transport = ScriptedTransport::replying(&[(401, "{}"), (200, r#"{"deleted":0}"#)]);
        let client = client_with(transport.clone());

        let err = client.execute::<DeleteResult>(&Endpoint::Delete).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(transport.sent().len(), 1);
    }

    struct Rotating(Mutex<u32>);

    #[async_trait]
    impl CredentialProvider for Rotating {
        fn current(&self) -> String {
            format!("gen-{}", self.0.lock().unwrap())
        }

        async fn refresh(&self) -> ApiResult<()> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn refresh_once_policy_retries_a_single_time() {
        let transport = ScriptedTransport::replying(&[(401, "{}"), (200, r#"{"deleted":2}"#)]);
        let interceptor = TokenInterceptor::new(Arc::new(Rotating(Mutex::new(0))))
            .with_policy(RetryPolicy::RefreshOnce);
        let client = client_with(transport.clone()).with_interceptor(interceptor);

        let result: DeleteResult = client.execute(&Endpoint::Delete).await.unwrap();
        assert_eq!(result.deleted, 2);

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].header(TOKEN_HEADER), Some("gen-0"));
        assert_eq!(sent[1].header(TOKEN_HEADER), Some("gen-1"));
    }

    #[tokio::test]
    async fn refresh_once_policy_gives_up_after_second_failure() {
        let transport = ScriptedTransport::replying(&[(403, "{}"), (403, "{}"), (200, "{}")]);
        let interceptor = TokenInterceptor::new(Arc::new(Rotating(Mutex::new(0))))
            .with_policy(RetryPolicy::RefreshOnce);
        let client = client_with(transport.clone()).with_interceptor(interceptor);

        let err = client.execute::<DeleteResult>(&Endpoint::Delete).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_connection_error() {
        let client = client();
        let err = client.execute::<RecordList>(&Endpoint::Get).await.unwrap_err();
        assert!(matches!(err.kind(), Some(FailureKind::Transport(_))));
    }
}

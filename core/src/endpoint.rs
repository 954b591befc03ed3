//! The closed set of API endpoints and the configuration each one derives.
//!
//! # Design
//! Every per-variant rule lives in a `match` with no wildcard arm, so adding
//! a variant without deciding its path, method, encoding, headers, status
//! range and interceptor requirement fails to compile.

use std::collections::BTreeMap;
use std::ops::Range;
use std::time::Duration;

use crate::http::{BodyEncoding, HttpMethod};

/// Header carrying the per-endpoint token.
pub const TOKEN_HEADER: &str = "token";

/// A single request to the API. Built at the call site, used once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Get,
    Post { field1: String, field2: i64 },
    Delete,
    UploadImage(Vec<u8>),
}

/// Everything needed to put an `Endpoint` on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    pub url: String,
    pub method: HttpMethod,
    pub encoding: BodyEncoding,
    pub parameters: Option<BTreeMap<String, String>>,
    pub headers: Option<BTreeMap<String, String>>,
    pub acceptable_status: Range<u16>,
    pub requires_interceptor: bool,
    pub timeout: Duration,
}

impl RequestConfig {
    pub fn accepts(&self, status: u16) -> bool {
        self.acceptable_status.contains(&status)
    }
}

impl Endpoint {
    /// Short label used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Get => "get",
            Endpoint::Post { .. } => "post",
            Endpoint::Delete => "delete",
            Endpoint::UploadImage(_) => "upload_image",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Get => "/apiGet",
            Endpoint::Post { .. } => "/apiPost",
            Endpoint::Delete => "/apiDelete",
            Endpoint::UploadImage(_) => "/uploadImage",
        }
    }

    pub fn method(&self) -> HttpMethod {
        match self {
            Endpoint::Get => HttpMethod::Get,
            Endpoint::Post { .. } | Endpoint::UploadImage(_) => HttpMethod::Post,
            Endpoint::Delete => HttpMethod::Delete,
        }
    }

    /// Declared parameter encoding. Uploads declare JSON for their (absent)
    /// parameters; their body is always sent as multipart.
    pub fn encoding(&self) -> BodyEncoding {
        match self {
            Endpoint::Get => BodyEncoding::Query,
            Endpoint::Post { .. } | Endpoint::UploadImage(_) => BodyEncoding::Json,
            Endpoint::Delete => BodyEncoding::FormUrlEncoded,
        }
    }

    /// Parameters with every value stringified.
    pub fn parameters(&self) -> Option<BTreeMap<String, String>> {
        match self {
            Endpoint::Get | Endpoint::Delete | Endpoint::UploadImage(_) => None,
            Endpoint::Post { field1, field2 } => Some(BTreeMap::from([
                ("field1".to_string(), field1.clone()),
                ("field2".to_string(), field2.to_string()),
            ])),
        }
    }

    pub fn headers(&self) -> Option<BTreeMap<String, String>> {
        let token = match self {
            Endpoint::Get => return None,
            Endpoint::Post { .. } => "post",
            Endpoint::Delete => "delete",
            Endpoint::UploadImage(_) => "image",
        };
        Some(BTreeMap::from([(TOKEN_HEADER.to_string(), token.to_string())]))
    }

    /// Statuses treated as success; anything else fails validation.
    pub fn acceptable_status(&self) -> Range<u16> {
        match self {
            Endpoint::Get => 200..500,
            Endpoint::Post { .. } | Endpoint::Delete | Endpoint::UploadImage(_) => 200..400,
        }
    }

    pub fn requires_interceptor(&self) -> bool {
        match self {
            Endpoint::Get => false,
            Endpoint::Post { .. } | Endpoint::Delete | Endpoint::UploadImage(_) => true,
        }
    }

    /// Derives the full configuration against `base_url` (no trailing slash).
    pub fn config(&self, base_url: &str, timeout: Duration) -> RequestConfig {
        RequestConfig {
            url: format!("{base_url}{}", self.path()),
            method: self.method(),
            encoding: self.encoding(),
            parameters: self.parameters(),
            headers: self.headers(),
            acceptable_status: self.acceptable_status(),
            requires_interceptor: self.requires_interceptor(),
            timeout,
        }
    }
}

//! Response models decoded from the API.
//!
//! # Design
//! These mirror the mock-server's schema but are defined independently.
//! Integration tests catch any drift between the two crates. Fixtures under
//! `fixtures/` decode into the same types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored record, as created through `/apiPost`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub id: Uuid,
    pub field1: String,
    pub field2: i64,
}

/// Response of `/apiGet`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordList {
    pub records: Vec<Record>,
}

/// Response of `/apiDelete`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted: usize,
}

/// Response of `/uploadImage`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadReceipt {
    pub id: Uuid,
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<(String, String)>,
}

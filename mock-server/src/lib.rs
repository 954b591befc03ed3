use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub use axum::http::StatusCode as Status;

/// Token value the server treats as expired.
pub const STALE_TOKEN: &str = "stale";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub field1: String,
    pub field2: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordList {
    pub records: Vec<Record>,
}

/// Body of `/apiPost`. Every value arrives as a string.
#[derive(Deserialize)]
pub struct CreateRecord {
    pub field1: String,
    pub field2: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteResult {
    pub deleted: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub id: Uuid,
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<(String, String)>,
}

pub type Db = Arc<RwLock<Vec<Record>>>;

/// Shared server state. Clones share storage, so a test can keep one handle
/// and inspect what the server saw.
#[derive(Clone, Default)]
pub struct AppState {
    db: Db,
    last_token: Arc<RwLock<Option<String>>>,
    forced_status: Option<StatusCode>,
}

impl AppState {
    /// Makes `/apiGet` and `/apiPost` answer with `status`. `/apiGet` keeps
    /// its body; `/apiPost` still checks the token but stores nothing unless
    /// `status` is a success.
    pub fn with_forced_status(mut self, status: StatusCode) -> Self {
        self.forced_status = Some(status);
        self
    }

    /// Most recent `token` header received on an authenticated route.
    pub async fn last_token(&self) -> Option<String> {
        self.last_token.read().await.clone()
    }

    pub async fn records(&self) -> Vec<Record> {
        self.db.read().await.clone()
    }
}

pub fn app() -> Router {
    app_with_state(AppState::default())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/apiGet", get(list_records))
        .route("/apiPost", post(create_record))
        .route("/apiDelete", delete(delete_records))
        .route("/uploadImage", post(upload_image))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::default()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

/// Requires a non-empty, non-stale `token` header and remembers it.
async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), StatusCode> {
    let token = headers
        .get("token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    *state.last_token.write().await = Some(token.clone());
    if token.is_empty() || token == STALE_TOKEN {
        debug!(token = %token, "rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(())
}

async fn list_records(State(state): State<AppState>) -> (StatusCode, Json<RecordList>) {
    let records = state.db.read().await.clone();
    let status = state.forced_status.unwrap_or(StatusCode::OK);
    (status, Json(RecordList { records }))
}

async fn create_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateRecord>,
) -> Result<(StatusCode, Json<Record>), StatusCode> {
    authorize(&state, &headers).await?;
    let field2 = input
        .field2
        .parse::<i64>()
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    if let Some(status) = state.forced_status.filter(|s| !s.is_success()) {
        return Err(status);
    }
    let record = Record {
        id: Uuid::new_v4(),
        field1: input.field1,
        field2,
    };
    state.db.write().await.push(record.clone());
    info!(id = %record.id, "record created");
    let status = state.forced_status.unwrap_or(StatusCode::CREATED);
    Ok((status, Json(record)))
}

async fn delete_records(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DeleteResult>, StatusCode> {
    authorize(&state, &headers).await?;
    let mut records = state.db.write().await;
    let deleted = records.len();
    records.clear();
    info!(deleted, "records deleted");
    Ok(Json(DeleteResult { deleted }))
}

async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadReceipt>), StatusCode> {
    authorize(&state, &headers).await?;

    let mut receipt = UploadReceipt {
        id: Uuid::new_v4(),
        size: 0,
        file_name: None,
        fields: Vec::new(),
    };
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            receipt.file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            receipt.size = bytes.len();
        } else {
            let value = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            receipt.fields.push((name, value));
        }
    }
    info!(id = %receipt.id, size = receipt.size, "image uploaded");
    Ok((StatusCode::CREATED, Json(receipt)))
}

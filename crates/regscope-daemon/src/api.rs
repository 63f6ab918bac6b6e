//! REST API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use regscope_core::{DefinitionError, DumpError, DumpId, RegisterDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::state::{AppState, GenerateMode, StateError};

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

impl IntoResponse for StateError {
    fn into_response(self) -> Response {
        let status = match &self {
            StateError::Definition(DefinitionError::IndexOutOfRange { .. })
            | StateError::Dump(DumpError::NotFound(_)) => StatusCode::NOT_FOUND,
            StateError::Definition(_) | StateError::Dump(_) => StatusCode::BAD_REQUEST,
            StateError::Store(e) => {
                warn!(error = %e, "Workspace persistence failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ApiError::new(self.to_string()))).into_response()
    }
}

// ----------------------------------------------------------------------------
// Definitions

/// Definition form body
#[derive(Deserialize)]
pub struct DefinitionRequest {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// List the definition table
pub async fn list_definitions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.definitions().await)
}

/// Add a definition to the end of the table
pub async fn add_definition(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DefinitionRequest>,
) -> Result<impl IntoResponse, StateError> {
    let definition = state
        .add_definition(&req.address, &req.name, req.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(definition)))
}

/// Replace the definition at an index
pub async fn update_definition(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    Json(req): Json<DefinitionRequest>,
) -> Result<impl IntoResponse, StateError> {
    let definition = state
        .update_definition(index, &req.address, &req.name, req.description.as_deref())
        .await?;
    Ok(Json(definition))
}

/// Remove the definition at an index
pub async fn remove_definition(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, StateError> {
    state.remove_definition(index).await?;
    Ok(Json(serde_json::json!({
        "status": "removed",
        "index": index
    })))
}

/// Replace the whole definition table
pub async fn replace_definitions(
    State(state): State<Arc<AppState>>,
    Json(definitions): Json<Vec<RegisterDefinition>>,
) -> Result<impl IntoResponse, StateError> {
    state.replace_definitions(definitions).await?;
    Ok(Json(state.definitions().await))
}

/// Generator request body
#[derive(Deserialize)]
pub struct GenerateRequest {
    /// Start address in hex; unparseable input counts as zero
    #[serde(default)]
    pub start: String,
    pub count: usize,
    /// Address step in bytes
    #[serde(default = "default_stride")]
    pub stride: u64,
    #[serde(default)]
    pub mode: GenerateMode,
}

fn default_stride() -> u64 {
    4
}

/// Bulk-create sequential definitions
pub async fn generate_definitions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, StateError> {
    let table = state
        .generate_definitions(&req.start, req.count, req.stride, req.mode)
        .await?;
    Ok(Json(table))
}

// ----------------------------------------------------------------------------
// Dumps

/// Dump upload body
#[derive(Deserialize)]
pub struct DumpRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
}

/// List stored dumps without their content
pub async fn list_dumps(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.dumps().await)
}

/// Get a full dump, including raw content and parsed data
pub async fn get_dump(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.get_dump(&DumpId(id)).await {
        Some(dump) => Json(dump).into_response(),
        None => (StatusCode::NOT_FOUND, Json(ApiError::new("Dump not found"))).into_response(),
    }
}

/// Parse and store a dump
pub async fn add_dump(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DumpRequest>,
) -> Result<impl IntoResponse, StateError> {
    let summary = state.add_dump(&req.name, &req.content).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Replace a dump's name and content
pub async fn update_dump(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<DumpRequest>,
) -> Result<impl IntoResponse, StateError> {
    let summary = state.update_dump(&DumpId(id), &req.name, &req.content).await?;
    Ok(Json(summary))
}

/// Remove a dump
pub async fn remove_dump(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StateError> {
    info!(dump = %id, "Remove dump requested");
    let id = DumpId(id);
    state.remove_dump(&id).await?;
    Ok(Json(serde_json::json!({
        "status": "removed",
        "id": id
    })))
}

// ----------------------------------------------------------------------------
// Comparison

/// Comparison request body
#[derive(Deserialize)]
pub struct CompareRequest {
    /// Selected dump ids
    #[serde(default)]
    pub dumps: Vec<DumpId>,
    /// Only return mismatching rows
    #[serde(default)]
    pub diff_only: bool,
}

/// Compare the selected dumps against the definition table
pub async fn compare(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompareRequest>,
) -> impl IntoResponse {
    Json(state.compare(&req.dumps, req.diff_only).await)
}

/// Get current configuration
pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.clone())
}

/// Persist the workspace now
pub async fn save(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, StateError> {
    state.save().await?;
    Ok(Json(serde_json::json!({"status": "saved"})))
}

//! JSON merge route - base64 files in, base64 PDF out.

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use doc_merger_core::InputFile;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use super::{REQUEST_ID_HEADER, request_id, run_merge};
use crate::helpers::{ResultExt, RouteResult, api_error};
use crate::state::AppState;

/// Request body: files in merge order.
#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub files: Vec<FilePayload>,
}

#[derive(Debug, Deserialize)]
pub struct FilePayload {
    pub name: String,
    /// Base64-encoded file bytes
    pub content: String,
}

impl FilePayload {
    fn decode(&self) -> RouteResult<InputFile> {
        let bytes = STANDARD.decode(self.content.trim()).map_err(|e| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("{}: invalid base64 content: {e}", self.name),
            )
        })?;
        Ok(InputFile::new(self.name.clone(), bytes))
    }
}

/// Merge files sent as JSON and return the PDF as base64 `text/plain`.
pub async fn merge_json(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MergeRequest>, JsonRejection>,
) -> RouteResult<Response> {
    let request_id = request_id();

    let Json(request) = payload.map_err(|e| {
        warn!("[{}] Rejected request body: {}", request_id, e);
        api_error(e.status(), e.body_text())
    })?;

    let files = request
        .files
        .iter()
        .map(FilePayload::decode)
        .collect::<RouteResult<Vec<_>>>()?;

    let output = run_merge(&state, &request_id, &files).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(REQUEST_ID_HEADER, &request_id)
        .body(Body::from(STANDARD.encode(&output.bytes)))
        .or_internal_error()
}

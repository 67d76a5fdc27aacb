//! Supported format listing, for filtering file pickers.

use axum::{Json, extract::State};
use doc_merger_core::InputFormat;
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FormatInfo {
    pub format: InputFormat,
    pub label: &'static str,
    pub extensions: &'static [&'static str],
    pub mime_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    pub formats: Vec<FormatInfo>,
    /// `accept` attribute value for an `<input type="file">`
    pub accept: String,
    pub max_payload_bytes: usize,
}

pub async fn list_formats(State(state): State<Arc<AppState>>) -> Json<FormatsResponse> {
    let formats: Vec<FormatInfo> = InputFormat::ALL
        .iter()
        .map(|&format| FormatInfo {
            format,
            label: format.label(),
            extensions: format.extensions(),
            mime_type: format.mime_type(),
        })
        .collect();

    let accept = formats
        .iter()
        .flat_map(|f| f.extensions.iter().map(|ext| format!(".{ext}")))
        .collect::<Vec<_>>()
        .join(",");

    Json(FormatsResponse {
        formats,
        accept,
        max_payload_bytes: state.config.limits.max_payload_bytes,
    })
}

//! Upload route - multipart files in, PDF attachment out.

use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::Response,
};
use axum_extra::extract::Multipart;
use doc_merger_core::InputFile;
use std::sync::Arc;
use tracing::debug;

use super::{REQUEST_ID_HEADER, request_id, run_merge};
use crate::helpers::{OptionExt, ResultExt, RouteResult};
use crate::state::AppState;

/// Name of the attachment returned to the browser
const DOWNLOAD_NAME: &str = "merged.pdf";

/// Merge uploaded files and return the PDF as a download.
///
/// Every `file` (or `files`) field is one input; fields are merged in the
/// order they appear in the form.
pub async fn merge_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> RouteResult<Response> {
    let request_id = request_id();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.or_bad_request()? {
        let name = field.name().unwrap_or("").to_string();
        if name != "file" && name != "files" {
            debug!("[{}] Ignoring form field '{}'", request_id, name);
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .or_bad_request("file field without a file name")?;
        let data = field.bytes().await.or_bad_request()?;

        files.push(InputFile::new(filename, data));
    }

    let output = run_merge(&state, &request_id, &files).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{DOWNLOAD_NAME}\""),
        )
        .header(REQUEST_ID_HEADER, &request_id)
        .body(Body::from(output.bytes))
        .or_internal_error()
}

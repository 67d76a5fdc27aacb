//! HTTP route handlers for the document merger web service.
//!
//! All routes return JSON, base64 text or PDF bytes; failures are JSON
//! `{"error": "..."}` bodies.

mod formats;
mod merge;
mod upload;

pub use formats::list_formats;
pub use merge::merge_json;
pub use upload::merge_upload;

use doc_merger_core::{InputFile, MergeOutput};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::helpers::{RouteResult, merge_error};
use crate::state::AppState;

/// Response header carrying the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Fresh id used to correlate the log lines of one request.
pub fn request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Enforce the payload limit and run the merge.
async fn run_merge(
    state: &Arc<AppState>,
    request_id: &str,
    files: &[InputFile],
) -> RouteResult<MergeOutput> {
    let total: usize = files.iter().map(InputFile::len).sum();
    state
        .config
        .limits
        .check(total)
        .map_err(|e| merge_error(request_id, &e))?;

    info!(
        "[{}] Merging {} files ({} bytes)",
        request_id,
        files.len(),
        total
    );

    let output = state
        .merger
        .merge_with_progress(files, None)
        .await
        .map_err(|e| merge_error(request_id, &e))?;

    info!(
        "[{}] Merged into {} pages ({} bytes)",
        request_id,
        output.page_count,
        output.bytes.len()
    );

    Ok(output)
}

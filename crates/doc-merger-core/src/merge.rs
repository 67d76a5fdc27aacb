use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::AppConfig;
use crate::convert::convert;
use crate::docx::{DocxHtmlConverter, MarkupConverter};
use crate::error::{Error, Result};
use crate::input::{InputFile, InputFormat};
use crate::pdf::{MergedDocument, PageDocument};
use crate::render::{HtmlRenderer, RenderScope, create_renderer};

/// Called after each file is converted with `(files_done, files_total)`
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Per-file entry of a merge report
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub format: InputFormat,
    pub pages: usize,
}

/// Result of merging a list of files
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// Serialized merged PDF
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// One entry per input file, in input order
    pub files: Vec<FileSummary>,
}

/// High-level merger that converts every input and concatenates the pages
pub struct Merger {
    renderer: Arc<dyn HtmlRenderer>,
    markup: Arc<dyn MarkupConverter>,
}

impl Merger {
    /// Create a merger backed by headless Chromium and the built-in DOCX converter
    pub fn new(config: &AppConfig) -> Self {
        Self {
            renderer: create_renderer(&config.render),
            markup: Arc::new(DocxHtmlConverter::new()),
        }
    }

    /// Create with custom collaborators
    pub fn with_components(
        renderer: Arc<dyn HtmlRenderer>,
        markup: Arc<dyn MarkupConverter>,
    ) -> Self {
        Self { renderer, markup }
    }

    /// Merge files in order and return the PDF bytes.
    pub async fn merge(&self, files: &[InputFile]) -> Result<Vec<u8>> {
        Ok(self.merge_with_progress(files, None).await?.bytes)
    }

    /// Merge files in order, reporting progress after each file.
    ///
    /// Fails on the first file that cannot be converted; nothing is returned
    /// for the files before it. A render session is started only if some
    /// file needs one, and is stopped before returning on every path.
    pub async fn merge_with_progress(
        &self,
        files: &[InputFile],
        progress_callback: Option<ProgressCallback>,
    ) -> Result<MergeOutput> {
        if files.is_empty() {
            return Err(Error::NoInputs);
        }

        info!("Merging {} files", files.len());

        let mut scope = RenderScope::new(self.renderer.as_ref());
        let result = self.merge_all(files, &mut scope, progress_callback.as_ref()).await;

        // Stop failures are logged by the scope and never replace the merge result
        scope.close().await.ok();

        let (merged, summaries) = result?;

        let page_count = merged.page_count();
        let bytes = tokio::task::spawn_blocking(move || merged.save())
            .await
            .map_err(|e| Error::PdfSave(format!("save task failed: {e}")))??;

        info!(
            "Merged {} files into {} pages ({} bytes)",
            files.len(),
            page_count,
            bytes.len()
        );

        Ok(MergeOutput {
            bytes,
            page_count,
            files: summaries,
        })
    }

    async fn merge_all(
        &self,
        files: &[InputFile],
        scope: &mut RenderScope<'_>,
        progress_callback: Option<&ProgressCallback>,
    ) -> Result<(MergedDocument, Vec<FileSummary>)> {
        // Reject unknown extensions before any conversion work or renderer start
        let formats = files
            .iter()
            .map(|file| file.format().map_err(|e| Error::convert(&file.name, e)))
            .collect::<Result<Vec<_>>>()
            .inspect_err(|e| error!("{}", e))?;

        let rendered = formats.iter().filter(|f| f.needs_renderer()).count();
        if rendered > 0 {
            debug!(
                "{} of {} files go through the {} renderer",
                rendered,
                files.len(),
                self.renderer.name()
            );
        }

        let mut merged = MergedDocument::new();
        let mut summaries = Vec::with_capacity(files.len());
        let total = files.len();

        for (index, (file, format)) in files.iter().zip(formats).enumerate() {
            let doc = convert(file, &self.markup, scope)
                .await
                .map_err(|e| Error::convert(&file.name, e))
                .inspect_err(|e| error!("{}", e))?;

            let (next, pages) = append_blocking(merged, doc).await?;
            merged = next;
            debug!("Appended {} ({}, {} pages)", file.name, format, pages);

            summaries.push(FileSummary {
                name: file.name.clone(),
                format,
                pages,
            });

            if let Some(callback) = progress_callback {
                callback(index + 1, total);
            }
        }

        Ok((merged, summaries))
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    pub fn markup_name(&self) -> &'static str {
        self.markup.name()
    }
}

/// Append on the blocking pool; renumbering and flattening walk every object.
async fn append_blocking(
    mut merged: MergedDocument,
    doc: PageDocument,
) -> Result<(MergedDocument, usize)> {
    tokio::task::spawn_blocking(move || {
        let pages = merged.append(doc)?;
        Ok((merged, pages))
    })
    .await
    .map_err(|e| Error::Lopdf(format!("append task failed: {e}")))?
}

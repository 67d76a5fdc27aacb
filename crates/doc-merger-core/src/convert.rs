//! Per-file conversion to the common page model.

use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

use crate::docx::MarkupConverter;
use crate::error::ConvertError;
use crate::input::{InputFile, InputFormat};
use crate::pdf::{PageDocument, image_document, text_document};
use crate::render::RenderScope;

/// Convert one input file into a page document.
///
/// The format is chosen from the file extension before any bytes are
/// inspected. Parsing, decoding and markup conversion run on the blocking
/// pool; DOCX goes through `markup` and then the request's render session,
/// which is started on first use.
pub async fn convert(
    file: &InputFile,
    markup: &Arc<dyn MarkupConverter>,
    scope: &mut RenderScope<'_>,
) -> Result<PageDocument, ConvertError> {
    let format = file.format()?;
    debug!("Converting {} as {}", file.name, format);

    match format {
        InputFormat::Pdf => {
            run_blocking(file.bytes.clone(), |bytes| PageDocument::from_bytes(&bytes)).await
        }
        InputFormat::Png => {
            run_blocking(file.bytes.clone(), |bytes| {
                image_document(&bytes, image::ImageFormat::Png)
            })
            .await
        }
        InputFormat::Jpeg => {
            run_blocking(file.bytes.clone(), |bytes| {
                image_document(&bytes, image::ImageFormat::Jpeg)
            })
            .await
        }
        InputFormat::Text => {
            run_blocking(file.bytes.clone(), |bytes| Ok(text_document(&decode_text(&bytes)))).await
        }
        InputFormat::Docx => {
            let markup = Arc::clone(markup);
            let html = run_blocking(file.bytes.clone(), move |bytes| markup.to_html(&bytes)).await?;
            let pdf = scope.session().await?.render(&html).await?;
            run_blocking(Bytes::from(pdf), |bytes| {
                PageDocument::from_bytes(&bytes).map_err(|e| {
                    ConvertError::rendering(format!("renderer produced an unreadable PDF: {e}"))
                })
            })
            .await
        }
    }
}

/// Decode text file contents as UTF-8, replacing invalid sequences.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

async fn run_blocking<T, F>(bytes: Bytes, job: F) -> Result<T, ConvertError>
where
    T: Send + 'static,
    F: FnOnce(Bytes) -> Result<T, ConvertError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || job(bytes))
        .await
        .map_err(|e| ConvertError::corrupt("input", format!("conversion task failed: {e}")))?
}

//! Document Merger Core Library
//!
//! This library converts heterogeneous documents to PDF and concatenates them:
//! - PDF passthrough, PNG/JPEG pages, paginated plain text
//! - DOCX via HTML, rendered by headless Chromium
//! - Order-preserving page merge with per-file failure reporting

pub mod config;
pub mod convert;
pub mod docx;
pub mod error;
pub mod input;
pub mod merge;
pub mod pdf;
pub mod render;
pub mod util;

pub use config::{AppConfig, LimitsConfig, Paper, RenderConfig, ServerConfig};
pub use convert::convert;
pub use docx::{DocxHtmlConverter, MarkupConverter};
pub use error::{ConvertError, Error, ErrorKind, Result};
pub use input::{InputFile, InputFormat, SUPPORTED_EXTENSIONS};
pub use merge::{FileSummary, MergeOutput, Merger, ProgressCallback};
pub use pdf::{MergedDocument, PageDocument, PageSize, TextLayout};
pub use render::{ChromeRenderer, HtmlRenderer, RenderScope, RenderSession, create_renderer};

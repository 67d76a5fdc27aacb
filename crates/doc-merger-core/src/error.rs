use thiserror::Error;

/// Coarse error classification used at transport boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedFormat,
    CorruptInput,
    RenderingFailed,
    PayloadTooLarge,
    NoInputs,
    Internal,
}

/// Failure converting a single input file.
///
/// These never carry the file name themselves; the sequencer wraps them in
/// [`Error::Convert`] together with the name of the offending file.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Extension is not one of pdf, jpg, jpeg, png, txt, docx
    #[error("unsupported file type{}", extension_suffix(.extension))]
    UnsupportedFormat { extension: String },

    /// Bytes do not parse as the format the extension claims
    #[error("corrupt {format} input: {reason}")]
    CorruptInput { format: &'static str, reason: String },

    /// External renderer error or timeout
    #[error("rendering failed: {0}")]
    RenderingFailed(String),
}

impl ConvertError {
    pub fn corrupt(format: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::CorruptInput {
            format,
            reason: reason.to_string(),
        }
    }

    pub fn rendering(reason: impl std::fmt::Display) -> Self {
        Self::RenderingFailed(reason.to_string())
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::CorruptInput { .. } => ErrorKind::CorruptInput,
            Self::RenderingFailed(_) => ErrorKind::RenderingFailed,
        }
    }
}

/// Unified error type for doc-merger-core
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Request Errors
    // ==========================================================================
    /// A file failed to convert; the whole merge is aborted
    #[error("{file}: {source}")]
    Convert {
        file: String,
        #[source]
        source: ConvertError,
    },

    /// Merge was invoked with an empty file list
    #[error("no files to merge")]
    NoInputs,

    /// Request payload exceeds the configured limit
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to serialize the merged document
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library while assembling pages
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn convert(file: impl Into<String>, source: ConvertError) -> Self {
        Self::Convert {
            file: file.into(),
            source,
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Convert { source, .. } => source.kind(),
            Self::NoInputs => ErrorKind::NoInputs,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            _ => ErrorKind::Internal,
        }
    }

    /// Name of the file that caused the failure, if any.
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::Convert { file, .. } => Some(file),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Self::ConfigLoad(e.to_string())
    }
}

fn extension_suffix(extension: &str) -> String {
    if extension.is_empty() {
        String::new()
    } else {
        format!(" '.{extension}'")
    }
}

pub type Result<T> = std::result::Result<T, Error>;

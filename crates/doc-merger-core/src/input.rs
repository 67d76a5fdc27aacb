use bytes::Bytes;
use serde::Serialize;

use crate::error::ConvertError;
use crate::util::extension_of;

/// One user-supplied document: original file name plus raw bytes.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Bytes,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lowercased extension of the file name, empty if there is none.
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }

    pub fn format(&self) -> Result<InputFormat, ConvertError> {
        InputFormat::detect(&self.name)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Input formats the converter knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Pdf,
    Png,
    Jpeg,
    Text,
    Docx,
}

/// Accepted extensions, lowercase and without the dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "txt", "docx"];

impl InputFormat {
    pub const ALL: [Self; 5] = [Self::Pdf, Self::Png, Self::Jpeg, Self::Text, Self::Docx];

    /// Map a lowercase extension to its format.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "txt" => Some(Self::Text),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Detect the format of a file from its name.
    pub fn detect(name: &str) -> Result<Self, ConvertError> {
        let extension = extension_of(name);
        Self::from_extension(&extension).ok_or(ConvertError::UnsupportedFormat { extension })
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Text => "text",
            Self::Docx => "DOCX",
        }
    }

    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Pdf => &["pdf"],
            Self::Png => &["png"],
            Self::Jpeg => &["jpg", "jpeg"],
            Self::Text => &["txt"],
            Self::Docx => &["docx"],
        }
    }

    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Text => "text/plain",
            Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        }
    }

    /// Whether converting this format needs the headless renderer.
    pub const fn needs_renderer(self) -> bool {
        matches!(self, Self::Docx)
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{ConvertError, Error, Result};

/// US Letter, used when a page carries no usable MediaBox.
pub const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Page dimensions in PDF user-space units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// In-memory page-based document, the common form every input is converted to.
pub struct PageDocument {
    doc: Document,
}

impl PageDocument {
    /// Parse existing PDF bytes.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, ConvertError> {
        let doc = Document::load_mem(bytes).map_err(|e| ConvertError::corrupt("PDF", e))?;

        if doc.is_encrypted() {
            return Err(ConvertError::corrupt("PDF", "encrypted documents are not supported"));
        }

        doc.catalog()
            .map_err(|e| ConvertError::corrupt("PDF", format!("missing document catalog: {e}")))?;

        Ok(Self { doc })
    }

    pub(crate) const fn from_document(doc: Document) -> Self {
        Self { doc }
    }

    pub(crate) fn into_inner(self) -> Document {
        self.doc
    }

    /// Page object ids in page order.
    fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Size of every page, in page order.
    pub fn page_sizes(&self) -> Vec<PageSize> {
        self.page_ids()
            .into_iter()
            .map(|id| {
                let [x0, y0, x1, y1] = self
                    .doc
                    .get_dictionary(id)
                    .map_or(DEFAULT_MEDIA_BOX, |dict| media_box(&self.doc, dict));
                PageSize {
                    width: x1 - x0,
                    height: y1 - y0,
                }
            })
            .collect()
    }

    /// Decoded content stream of every page, in page order.
    pub fn page_contents(&self) -> Result<Vec<Vec<u8>>> {
        self.page_ids()
            .into_iter()
            .map(|id| {
                self.doc
                    .get_page_content(id)
                    .map_err(|e| Error::Lopdf(format!("Failed to read page content: {e}")))
            })
            .collect()
    }

    /// Serialize to PDF bytes.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to save PDF: {e}")))?;
        Ok(output)
    }
}

impl std::fmt::Debug for PageDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageDocument")
            .field("page_count", &self.page_count())
            .field("objects", &self.doc.objects.len())
            .finish()
    }
}

/// Media box of a page, following `Parent` links for inherited values.
pub(crate) fn media_box(doc: &Document, page: &Dictionary) -> [f32; 4] {
    inherited(doc, page, b"MediaBox")
        .and_then(|obj| rect_values(doc, &obj))
        .unwrap_or(DEFAULT_MEDIA_BOX)
}

/// Look up a page attribute on the page itself or the nearest ancestor.
pub(crate) fn inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    if let Ok(value) = page.get(key) {
        return Some(value.clone());
    }

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    // Bounded so a cyclic page tree cannot hang us
    for _ in 0..64 {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

fn rect_values(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };

    let Object::Array(arr) = obj else {
        return None;
    };

    let values: Vec<f32> = arr
        .iter()
        .filter_map(|o| match o {
            #[allow(clippy::cast_precision_loss)]
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        })
        .collect();

    match values[..] {
        [x0, y0, x1, y1] => Some([x0, y0, x1, y1]),
        _ => None,
    }
}

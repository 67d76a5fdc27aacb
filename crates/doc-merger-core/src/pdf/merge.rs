//! Page concatenation.
//!
//! Each appended document is renumbered into a fresh object id range, its
//! page dictionaries are lifted out of its page tree, and every other object
//! (content streams, fonts, images) is carried over untouched. On save a
//! single flat page tree is built over all collected pages.
//!
//! Page-tree nodes are discarded, so attributes a page inherits from them
//! (`Resources`, `MediaBox`, `CropBox`, `Rotate`) are copied onto the page
//! itself before the tree goes away.

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};
use super::document::{DEFAULT_MEDIA_BOX, PageDocument, inherited};

/// Page attributes that may live on an ancestor `Pages` node.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Accumulates pages from many documents, in append order.
pub struct MergedDocument {
    document: Document,
    /// Next free object number
    next_id: u32,
    pages: Vec<(ObjectId, Dictionary)>,
}

impl MergedDocument {
    pub fn new() -> Self {
        Self {
            document: Document::with_version("1.7"),
            next_id: 1,
            pages: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Move every page of `source` to the end, keeping its internal order.
    ///
    /// Returns the number of pages appended.
    pub fn append(&mut self, source: PageDocument) -> Result<usize> {
        let mut doc = source.into_inner();

        doc.renumber_objects_with(self.next_id);
        self.next_id = doc.max_id + 1;

        // get_pages is keyed by page number, so this is reading order
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

        let mut appended = 0;
        for page_id in page_ids {
            let page = flatten_page(&doc, page_id)?;
            self.pages.push((page_id, page));
            appended += 1;
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    self.document.objects.insert(object_id, object);
                }
            }
        }

        Ok(appended)
    }

    /// Build the page tree and serialize.
    pub fn save(mut self) -> Result<Vec<u8>> {
        self.document.max_id = self.next_id - 1;
        let pages_id = self.document.new_object_id();

        let mut kids = Vec::with_capacity(self.pages.len());
        for (page_id, mut page) in self.pages {
            page.set("Parent", Object::Reference(pages_id));
            self.document.objects.insert(page_id, Object::Dictionary(page));
            kids.push(Object::Reference(page_id));
        }

        let count = i64::try_from(kids.len())
            .map_err(|_| Error::Lopdf("too many pages".to_string()))?;

        let pages_dict = lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ]);
        self.document.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let catalog_id = self.document.add_object(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        self.document.trailer.set("Root", Object::Reference(catalog_id));

        self.document.renumber_objects();
        self.document.compress();

        let mut output = Vec::new();
        self.document
            .save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to save merged PDF: {e}")))?;

        Ok(output)
    }
}

impl Default for MergedDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy a page dictionary with inherited attributes made explicit.
fn flatten_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let source = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page object: {e}")))?;

    let mut page = source.clone();
    for key in INHERITABLE {
        if !page.has(key)
            && let Some(value) = inherited(doc, source, key)
        {
            page.set(key.to_vec(), value);
        }
    }

    if !page.has(b"MediaBox") {
        page.set(
            "MediaBox",
            DEFAULT_MEDIA_BOX.iter().map(|v| Object::Real(*v)).collect::<Vec<_>>(),
        );
    }
    page.set("Type", Object::Name(b"Page".to_vec()));

    Ok(page)
}

// =============================================================================
// Tests
// =============================================================================

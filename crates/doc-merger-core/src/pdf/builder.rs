//! Assembly of synthetic documents (text layout, image pages).

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use super::document::PageDocument;

/// Builds a fresh single-level page tree, one page at a time.
pub struct DocumentBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Add an arbitrary object (fonts, image XObjects) and return its id.
    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        self.doc.add_object(object)
    }

    /// Append a page of the given size with a raw content stream.
    pub fn add_page(
        &mut self,
        width: impl Into<Object>,
        height: impl Into<Object>,
        content: String,
        resources: Dictionary,
    ) -> ObjectId {
        let content_id = self.doc.add_object(Object::Stream(Stream::new(
            Dictionary::new(),
            content.into_bytes(),
        )));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.kids.push(page_id);
        page_id
    }

    /// Close the page tree and hand back the document.
    pub fn finish(mut self) -> PageDocument {
        let count = i64::try_from(self.kids.len()).unwrap_or(i64::MAX);
        let kids = self.kids.into_iter().map(Object::Reference).collect::<Vec<_>>();

        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        PageDocument::from_document(self.doc)
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

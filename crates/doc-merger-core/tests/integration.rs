//! Integration tests for doc-merger-core
//!
//! These tests verify the end-to-end merge workflow:
//! - Conversion of every supported format
//! - Page order and page counts across files
//! - Fail-fast error reporting naming the offending file
//! - Render session lifecycle with a mock renderer

use async_trait::async_trait;
use doc_merger_core::{
    ConvertError, Error, ErrorKind, HtmlRenderer, InputFile, InputFormat, MarkupConverter,
    Merger, PageDocument, PageSize, RenderSession,
};
use lopdf::{Document, Object, Stream, dictionary};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// =============================================================================
// Mock Collaborators
// =============================================================================

/// Shared counters observed by the tests
#[derive(Default)]
struct Counters {
    starts: AtomicUsize,
    stops: AtomicUsize,
    renders: AtomicUsize,
}

/// A mock renderer that turns each line of its HTML into one labelled page.
/// Rendering fails for any document containing `FAIL`.
struct MockRenderer {
    counters: Arc<Counters>,
}

struct MockSession {
    counters: Arc<Counters>,
}

#[async_trait]
impl HtmlRenderer for MockRenderer {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn start(&self) -> Result<Box<dyn RenderSession>, ConvertError> {
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            counters: Arc::clone(&self.counters),
        }))
    }
}

#[async_trait]
impl RenderSession for MockSession {
    async fn render(&mut self, html: &str) -> Result<Vec<u8>, ConvertError> {
        self.counters.renders.fetch_add(1, Ordering::SeqCst);
        if html.contains("FAIL") {
            return Err(ConvertError::RenderingFailed("mock render failure".to_string()));
        }
        let labels: Vec<&str> = html.lines().collect();
        Ok(pdf_fixture(&labels))
    }

    async fn stop(&mut self) -> Result<(), ConvertError> {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Passes the document bytes through as "HTML"; rejects documents starting with `BAD`
struct MockMarkup;

impl MarkupConverter for MockMarkup {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn to_html(&self, document: &[u8]) -> Result<String, ConvertError> {
        if document.starts_with(b"BAD") {
            return Err(ConvertError::corrupt("DOCX", "mock markup failure"));
        }
        Ok(String::from_utf8_lossy(document).into_owned())
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

fn mock_merger() -> (Merger, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let renderer = Arc::new(MockRenderer {
        counters: Arc::clone(&counters),
    });
    (Merger::with_components(renderer, Arc::new(MockMarkup)), counters)
}

/// PDF with one Letter page per label; each page's content is `% label`
fn pdf_fixture(labels: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for label in labels {
        let content_id = doc.add_object(Stream::new(
            lopdf::Dictionary::new(),
            format!("% {label}\n").into_bytes(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = i64::try_from(kids.len()).unwrap();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Jpeg).unwrap();
    buf.into_inner()
}

fn contents(pdf: &[u8]) -> Vec<String> {
    PageDocument::from_bytes(pdf)
        .unwrap()
        .page_contents()
        .unwrap()
        .into_iter()
        .map(|c| String::from_utf8_lossy(&c).into_owned())
        .collect()
}

fn page_count(pdf: &[u8]) -> usize {
    PageDocument::from_bytes(pdf).unwrap().page_count()
}

// =============================================================================
// Single File Tests
// =============================================================================

#[tokio::test]
async fn test_single_pdf_keeps_page_count() {
    let (merger, _) = mock_merger();
    let files = [InputFile::new("report.pdf", pdf_fixture(&["p1", "p2", "p3"]))];

    let merged = merger.merge(&files).await.unwrap();
    assert_eq!(page_count(&merged), 3);
    assert_eq!(contents(&merged), vec!["% p1\n", "% p2\n", "% p3\n"]);
}

#[tokio::test]
async fn test_empty_text_file_is_one_page() {
    let (merger, _) = mock_merger();
    let files = [InputFile::new("empty.txt", Vec::<u8>::new())];

    let merged = merger.merge(&files).await.unwrap();
    assert_eq!(page_count(&merged), 1);
}

#[tokio::test]
async fn test_png_page_matches_pixel_size() {
    let (merger, _) = mock_merger();
    let files = [InputFile::new("scan.PNG", png_fixture(40, 30))];

    let merged = merger.merge(&files).await.unwrap();
    let doc = PageDocument::from_bytes(&merged).unwrap();
    assert_eq!(doc.page_sizes(), vec![PageSize { width: 40.0, height: 30.0 }]);

    let content = &contents(&merged)[0];
    assert!(content.contains("40 0 0 30 0 0 cm"), "image should fill the page: {content}");
    assert!(content.contains("Do"));
}

#[tokio::test]
async fn test_jpeg_page_matches_pixel_size() {
    let (merger, _) = mock_merger();
    let files = [InputFile::new("photo.jpeg", jpeg_fixture(64, 48))];

    let merged = merger.merge(&files).await.unwrap();
    let doc = PageDocument::from_bytes(&merged).unwrap();
    assert_eq!(doc.page_sizes(), vec![PageSize { width: 64.0, height: 48.0 }]);
}

#[tokio::test]
async fn test_long_text_paginates_deterministically() {
    let (merger, _) = mock_merger();
    let text = (1..=40).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
    let files = [InputFile::new("notes.txt", text)];

    let first = merger.merge(&files).await.unwrap();
    let second = merger.merge(&files).await.unwrap();

    assert_eq!(page_count(&first), 2);
    assert_eq!(contents(&first), contents(&second));
}

// =============================================================================
// Multi-File Ordering Tests
// =============================================================================

#[tokio::test]
async fn test_pages_concatenated_in_file_order() {
    let (merger, counters) = mock_merger();
    let files = [
        InputFile::new("a.pdf", pdf_fixture(&["a1", "a2"])),
        InputFile::new("b.txt", "hello"),
        InputFile::new("c.png", png_fixture(10, 20)),
        InputFile::new("d.docx", "d1\nd2"),
        InputFile::new("e.pdf", pdf_fixture(&["e1"])),
    ];

    let output = merger.merge_with_progress(&files, None).await.unwrap();
    assert_eq!(output.page_count, 2 + 1 + 1 + 2 + 1);
    assert_eq!(page_count(&output.bytes), output.page_count);

    let pages = contents(&output.bytes);
    assert_eq!(pages[0], "% a1\n");
    assert_eq!(pages[1], "% a2\n");
    assert!(pages[2].contains("<68656C6C6F> Tj"), "text page: {}", pages[2]);
    assert!(pages[3].contains("10 0 0 20 0 0 cm"), "image page: {}", pages[3]);
    assert_eq!(pages[4], "% d1\n");
    assert_eq!(pages[5], "% d2\n");
    assert_eq!(pages[6], "% e1\n");

    let summary: Vec<(&str, InputFormat, usize)> = output
        .files
        .iter()
        .map(|f| (f.name.as_str(), f.format, f.pages))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("a.pdf", InputFormat::Pdf, 2),
            ("b.txt", InputFormat::Text, 1),
            ("c.png", InputFormat::Png, 1),
            ("d.docx", InputFormat::Docx, 2),
            ("e.pdf", InputFormat::Pdf, 1),
        ]
    );

    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_same_pdf_twice_is_duplicated_not_shared() {
    let (merger, _) = mock_merger();
    let pdf = pdf_fixture(&["x1", "x2"]);
    let files = [
        InputFile::new("x.pdf", pdf.clone()),
        InputFile::new("x-again.pdf", pdf),
    ];

    let merged = merger.merge(&files).await.unwrap();
    assert_eq!(contents(&merged), vec!["% x1\n", "% x2\n", "% x1\n", "% x2\n"]);
}

#[tokio::test]
async fn test_progress_reports_each_file() {
    let (merger, _) = mock_merger();
    let files = [
        InputFile::new("1.txt", "one"),
        InputFile::new("2.txt", "two"),
        InputFile::new("3.pdf", pdf_fixture(&["three"])),
    ];

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    merger
        .merge_with_progress(
            &files,
            Some(Box::new(move |done, total| {
                recorder.lock().unwrap().push((done, total));
            })),
        )
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[tokio::test]
async fn test_no_files_rejected() {
    let (merger, counters) = mock_merger();
    let err = merger.merge(&[]).await.unwrap_err();

    assert!(matches!(err, Error::NoInputs));
    assert_eq!(err.kind(), ErrorKind::NoInputs);
    assert_eq!(counters.starts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unsupported_extension_anywhere_fails() {
    for position in 0..3 {
        let (merger, counters) = mock_merger();
        let mut files = vec![
            InputFile::new("first.docx", "page"),
            InputFile::new("second.pdf", pdf_fixture(&["s"])),
        ];
        files.insert(position, InputFile::new("slides.pptx", b"PK".to_vec()));

        let err = merger.merge(&files).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(err.file(), Some("slides.pptx"));
        assert!(err.to_string().contains("slides.pptx"));

        // Rejected before any conversion, so the renderer never starts
        assert_eq!(counters.starts.load(Ordering::SeqCst), 0);
        assert_eq!(counters.renders.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_corrupt_pdf_names_file() {
    let (merger, counters) = mock_merger();
    let files = [
        InputFile::new("intro.docx", "intro"),
        InputFile::new("good.pdf", pdf_fixture(&["g"])),
        InputFile::new("broken.pdf", b"%PDF-1.4\nthis is not a pdf".to_vec()),
        InputFile::new("never.docx", "never"),
    ];

    let err = merger.merge(&files).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptInput);
    assert_eq!(err.file(), Some("broken.pdf"));

    // Session was started for the first DOCX and released on the failure path
    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    assert_eq!(counters.renders.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_corrupt_image_names_file() {
    let (merger, _) = mock_merger();
    let files = [
        InputFile::new("ok.txt", "fine"),
        InputFile::new("photo.jpg", png_fixture(4, 4)),
    ];

    let err = merger.merge(&files).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptInput);
    assert_eq!(err.file(), Some("photo.jpg"));
}

#[tokio::test]
async fn test_markup_failure_is_corrupt_input() {
    let (merger, counters) = mock_merger();
    let files = [InputFile::new("letter.docx", "BAD document")];

    let err = merger.merge(&files).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptInput);
    assert_eq!(err.file(), Some("letter.docx"));
    assert_eq!(counters.starts.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Render Session Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_two_docx_share_one_session() {
    let (merger, counters) = mock_merger();
    let files = [
        InputFile::new("one.docx", "one"),
        InputFile::new("two.docx", "two-a\ntwo-b"),
    ];

    let merged = merger.merge(&files).await.unwrap();
    assert_eq!(contents(&merged), vec!["% one\n", "% two-a\n", "% two-b\n"]);

    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
    assert_eq!(counters.renders.load(Ordering::SeqCst), 2);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_session_stopped_when_second_docx_fails() {
    let (merger, counters) = mock_merger();
    let files = [
        InputFile::new("one.docx", "one"),
        InputFile::new("two.docx", "FAIL"),
    ];

    let err = merger.merge(&files).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RenderingFailed);
    assert_eq!(err.file(), Some("two.docx"));

    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_no_docx_never_starts_renderer() {
    let (merger, counters) = mock_merger();
    let files = [
        InputFile::new("a.pdf", pdf_fixture(&["a"])),
        InputFile::new("b.txt", "b"),
        InputFile::new("c.png", png_fixture(2, 2)),
    ];

    merger.merge(&files).await.unwrap();
    assert_eq!(counters.starts.load(Ordering::SeqCst), 0);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_each_merge_gets_its_own_session() {
    let (merger, counters) = mock_merger();
    let files = [InputFile::new("one.docx", "one")];

    merger.merge(&files).await.unwrap();
    merger.merge(&files).await.unwrap();

    assert_eq!(counters.starts.load(Ordering::SeqCst), 2);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 2);
}

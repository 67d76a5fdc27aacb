//! DOCX to HTML conversion.
//!
//! A WordprocessingML package is a zip archive; the body lives in
//! `word/document.xml` and references media and hyperlinks by relationship
//! id through `word/_rels/document.xml.rels`. The body is walked as an XML
//! event stream and mapped onto a small HTML vocabulary:
//!
//! | WordprocessingML | HTML |
//! |---|---|
//! | paragraph (`Heading1`..`Heading6`, `Title`) | `h1`..`h6` |
//! | paragraph with numbering | `li` inside `ul` |
//! | other paragraphs | `p` (empty ones dropped) |
//! | bold / italic / underline / strike runs | `strong` / `em` / `u` / `s` |
//! | tab, break | tab character, `br` |
//! | table / row / cell | `table` / `tr` / `td` |
//! | embedded picture | `img` with a base64 data URI |
//! | hyperlink to an external target | `a` |
//!
//! Everything else (headers, footers, footnotes, fields, comments) is
//! ignored.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::fmt::Display;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::ConvertError;
use crate::util::extension_of;

const DOCUMENT_PART: &str = "word/document.xml";
const RELATIONSHIPS_PART: &str = "word/_rels/document.xml.rels";

/// English Metric Units per CSS pixel (914400 per inch, 96 px per inch)
const EMU_PER_PIXEL: u64 = 9525;

const STYLESHEET: &str = "body { font-family: 'Times New Roman', serif; font-size: 12pt; line-height: 1.4; }
table { border-collapse: collapse; margin: 0.5em 0; }
td { border: 1px solid #999; padding: 4px 6px; vertical-align: top; }
img { max-width: 100%; height: auto; }";

/// Converts a word-processing document into a standalone HTML page
pub trait MarkupConverter: Send + Sync {
    /// Human-readable converter name
    fn name(&self) -> &'static str;

    /// Produce a complete HTML document from the raw file bytes.
    fn to_html(&self, document: &[u8]) -> Result<String, ConvertError>;
}

/// Office Open XML (`.docx`) converter
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxHtmlConverter;

impl DocxHtmlConverter {
    pub const fn new() -> Self {
        Self
    }
}

impl MarkupConverter for DocxHtmlConverter {
    fn name(&self) -> &'static str {
        "docx"
    }

    fn to_html(&self, document: &[u8]) -> Result<String, ConvertError> {
        let mut package = Package::open(document)?;

        let body_xml = package
            .read(DOCUMENT_PART)?
            .ok_or_else(|| corrupt(format!("missing {DOCUMENT_PART}")))?;

        let relationships = match package.read(RELATIONSHIPS_PART)? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };

        let mut writer = HtmlWriter::new(package, relationships);
        writer.convert(&body_xml)?;
        Ok(wrap_document(&writer.finish()))
    }
}

fn corrupt(reason: impl Display) -> ConvertError {
    ConvertError::corrupt("DOCX", reason)
}

fn wrap_document(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n{STYLESHEET}\n</style>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

// =============================================================================
// Package access
// =============================================================================

struct Package<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Package<'a> {
    fn open(bytes: &'a [u8]) -> Result<Self, ConvertError> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| corrupt(format!("not a zip package: {e}")))?;
        Ok(Self { archive })
    }

    /// Read a part by path; `None` if the package has no such entry.
    fn read(&mut self, path: &str) -> Result<Option<Vec<u8>>, ConvertError> {
        let mut entry = match self.archive.by_name(path) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(corrupt(format!("failed to open {path}: {e}"))),
        };

        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| corrupt(format!("failed to read {path}: {e}")))?;
        Ok(Some(data))
    }
}

#[derive(Debug, Clone)]
struct Relationship {
    target: String,
    external: bool,
}

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, Relationship>, ConvertError> {
    let mut reader = Reader::from_reader(xml);
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event().map_err(corrupt)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let (Some(id), Some(target)) = (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                else {
                    continue;
                };
                let external = attribute(&e, b"TargetMode")?.is_some_and(|m| m == "External");
                relationships.insert(id, Relationship { target, external });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(relationships)
}

/// Value of the attribute with the given local name, ignoring its prefix.
fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, ConvertError> {
    for attr in element.attributes() {
        let attr = attr.map_err(corrupt)?;
        if attr.key.local_name().as_ref() == name {
            let value = attr.unescape_value().map_err(corrupt)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Resolve a relationship target against the `word/` directory.
fn resolve_part(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = vec!["word"];
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn image_mime(path: &str) -> Option<&'static str> {
    match extension_of(path).as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

// =============================================================================
// Body conversion
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Block {
    #[default]
    Paragraph,
    Heading(u8),
    ListItem,
}

impl Block {
    fn from_style(style: &str) -> Self {
        let style = style.to_lowercase().replace(' ', "");
        if style == "title" {
            return Self::Heading(1);
        }
        style
            .strip_prefix("heading")
            .and_then(|level| level.parse::<u8>().ok())
            .filter(|level| (1..=6).contains(level))
            .map_or(Self::Paragraph, Self::Heading)
    }
}

#[derive(Debug, Default)]
struct Paragraph {
    block: Block,
    numbered: bool,
    align: Option<&'static str>,
    content: String,
}

#[derive(Debug, Default)]
struct Run {
    bold: bool,
    italic: bool,
    underline: bool,
    strike: bool,
    content: String,
}

impl Run {
    fn into_html(self) -> String {
        let mut html = self.content;
        if self.strike {
            html = format!("<s>{html}</s>");
        }
        if self.underline {
            html = format!("<u>{html}</u>");
        }
        if self.italic {
            html = format!("<em>{html}</em>");
        }
        if self.bold {
            html = format!("<strong>{html}</strong>");
        }
        html
    }
}

struct HtmlWriter<'a> {
    package: Package<'a>,
    relationships: HashMap<String, Relationship>,
    out: String,
    /// Open paragraphs; text boxes nest a paragraph inside a run of another
    paragraphs: Vec<Paragraph>,
    runs: Vec<Run>,
    in_list: bool,
    in_paragraph_props: bool,
    in_run_props: bool,
    in_text: bool,
    /// Size of the drawing currently being read, in EMU
    extent: Option<(u64, u64)>,
    /// One entry per open hyperlink; whether an anchor tag was emitted for it
    links: Vec<bool>,
    /// One entry per open `mc:AlternateContent`; whether a choice was read
    alternates: Vec<bool>,
    /// Depth inside a fallback branch that is being skipped
    skipped: usize,
}

impl<'a> HtmlWriter<'a> {
    fn new(package: Package<'a>, relationships: HashMap<String, Relationship>) -> Self {
        Self {
            package,
            relationships,
            out: String::new(),
            paragraphs: Vec::new(),
            runs: Vec::new(),
            in_list: false,
            in_paragraph_props: false,
            in_run_props: false,
            in_text: false,
            extent: None,
            links: Vec::new(),
            alternates: Vec::new(),
            skipped: 0,
        }
    }

    fn convert(&mut self, xml: &[u8]) -> Result<(), ConvertError> {
        let mut reader = Reader::from_reader(xml);

        loop {
            let event = reader.read_event().map_err(corrupt)?;

            if self.skipped > 0 {
                match event {
                    Event::Start(_) => self.skipped += 1,
                    Event::End(_) => self.skipped -= 1,
                    Event::Eof => break,
                    _ => {}
                }
                continue;
            }

            match event {
                // The fallback repeats the content of the choice already read
                Event::Start(e)
                    if e.local_name().as_ref() == b"Fallback"
                        && self.alternates.last() == Some(&true) =>
                {
                    self.skipped = 1;
                }
                Event::Start(e) => self.open(&e)?,
                Event::Empty(e) => {
                    self.open(&e)?;
                    self.close(e.local_name().as_ref());
                }
                Event::End(e) => self.close(e.local_name().as_ref()),
                Event::Text(t) if self.in_text => {
                    let text = t.unescape().map_err(corrupt)?;
                    self.push_run(&html_escape::encode_text(&text));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(())
    }

    fn finish(mut self) -> String {
        self.close_list();
        self.out
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Result<(), ConvertError> {
        match e.local_name().as_ref() {
            b"p" => self.paragraphs.push(Paragraph::default()),
            b"pPr" => self.in_paragraph_props = true,
            b"pStyle" if self.in_paragraph_props => {
                if let (Some(style), Some(paragraph)) = (attribute(e, b"val")?, self.paragraphs.last_mut()) {
                    paragraph.block = Block::from_style(&style);
                }
            }
            b"numPr" if self.in_paragraph_props => {
                if let Some(paragraph) = self.paragraphs.last_mut() {
                    paragraph.numbered = true;
                }
            }
            b"jc" if self.in_paragraph_props => {
                let align = attribute(e, b"val")?.and_then(|v| text_align(&v));
                if let Some(paragraph) = self.paragraphs.last_mut() {
                    paragraph.align = align;
                }
            }
            b"r" => self.runs.push(Run::default()),
            b"rPr" if !self.runs.is_empty() && !self.in_paragraph_props => {
                self.in_run_props = true;
            }
            name @ (b"b" | b"i" | b"u" | b"strike" | b"dstrike") if self.in_run_props => {
                let on = attribute(e, b"val")?.is_none_or(|v| is_enabled(&v));
                if let Some(run) = self.runs.last_mut() {
                    match name {
                        b"b" => run.bold = on,
                        b"i" => run.italic = on,
                        b"u" => run.underline = on,
                        _ => run.strike = on,
                    }
                }
            }
            b"t" if !self.runs.is_empty() => self.in_text = true,
            b"tab" if !self.in_paragraph_props => self.push_run("\t"),
            b"br" => self.push_run("<br />"),
            b"extent" => {
                let cx = attribute(e, b"cx")?.and_then(|v| v.parse().ok());
                let cy = attribute(e, b"cy")?.and_then(|v| v.parse().ok());
                self.extent = cx.zip(cy);
            }
            b"blip" => {
                if let Some(id) = attribute(e, b"embed")? {
                    self.push_image(&id)?;
                }
            }
            b"hyperlink" => {
                let href = attribute(e, b"id")?
                    .and_then(|id| self.relationships.get(&id))
                    .filter(|rel| rel.external)
                    .map(|rel| rel.target.clone());
                match href {
                    Some(href) => {
                        self.push_paragraph(&format!(
                            "<a href=\"{}\">",
                            html_escape::encode_double_quoted_attribute(&href)
                        ));
                        self.links.push(true);
                    }
                    None => self.links.push(false),
                }
            }
            b"AlternateContent" => self.alternates.push(false),
            b"Choice" => {
                if let Some(chosen) = self.alternates.last_mut() {
                    *chosen = true;
                }
            }
            b"tbl" => {
                self.flush_paragraph();
                self.close_list();
                self.out.push_str("<table>\n");
            }
            b"tr" => self.out.push_str("<tr>\n"),
            b"tc" => self.out.push_str("<td>\n"),
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"p" => self.flush_paragraph(),
            b"pPr" => self.in_paragraph_props = false,
            b"r" => {
                if let Some(run) = self.runs.pop() {
                    if !run.content.is_empty() {
                        self.push_paragraph(&run.into_html());
                    }
                }
                self.in_run_props = false;
                self.in_text = false;
            }
            b"rPr" => self.in_run_props = false,
            b"t" => self.in_text = false,
            b"drawing" => self.extent = None,
            b"AlternateContent" => {
                self.alternates.pop();
            }
            b"hyperlink" => {
                if self.links.pop() == Some(true) {
                    self.push_paragraph("</a>");
                }
            }
            b"tbl" => self.out.push_str("</table>\n"),
            b"tr" => self.out.push_str("</tr>\n"),
            b"tc" => {
                self.close_list();
                self.out.push_str("</td>\n");
            }
            _ => {}
        }
    }

    fn push_run(&mut self, html: &str) {
        if let Some(run) = self.runs.last_mut() {
            run.content.push_str(html);
        }
    }

    fn push_paragraph(&mut self, html: &str) {
        if let Some(paragraph) = self.paragraphs.last_mut() {
            paragraph.content.push_str(html);
        }
    }

    fn push_image(&mut self, id: &str) -> Result<(), ConvertError> {
        let Some(rel) = self.relationships.get(id).filter(|rel| !rel.external) else {
            debug!("Skipping image with unresolved relationship {}", id);
            return Ok(());
        };

        let path = resolve_part(&rel.target);
        let Some(mime) = image_mime(&path) else {
            debug!("Skipping image {} with unsupported type", path);
            return Ok(());
        };
        let Some(data) = self.package.read(&path)? else {
            debug!("Skipping missing image {}", path);
            return Ok(());
        };

        let size = self
            .extent
            .map(|(cx, cy)| {
                format!(
                    " width=\"{}\" height=\"{}\"",
                    cx / EMU_PER_PIXEL,
                    cy / EMU_PER_PIXEL
                )
            })
            .unwrap_or_default();

        let img = format!("<img src=\"data:{mime};base64,{}\"{size} />", STANDARD.encode(data));
        // Pictures sit inside a run, outside any w:t
        if self.runs.is_empty() {
            self.push_paragraph(&img);
        } else {
            self.push_run(&img);
        }
        Ok(())
    }

    fn flush_paragraph(&mut self) {
        let Some(paragraph) = self.paragraphs.pop() else {
            return;
        };
        if paragraph.content.trim().is_empty() {
            return;
        }

        let style = paragraph
            .align
            .map(|align| format!(" style=\"text-align: {align}\""))
            .unwrap_or_default();

        let block = match paragraph.block {
            Block::Paragraph if paragraph.numbered => Block::ListItem,
            other => other,
        };

        match block {
            Block::ListItem => {
                if !self.in_list {
                    self.out.push_str("<ul>\n");
                    self.in_list = true;
                }
                self.out.push_str(&format!("<li{style}>{}</li>\n", paragraph.content));
            }
            Block::Heading(level) => {
                self.close_list();
                self.out
                    .push_str(&format!("<h{level}{style}>{}</h{level}>\n", paragraph.content));
            }
            Block::Paragraph => {
                self.close_list();
                self.out.push_str(&format!("<p{style}>{}</p>\n", paragraph.content));
            }
        }
    }

    fn close_list(&mut self) {
        if self.in_list {
            self.out.push_str("</ul>\n");
            self.in_list = false;
        }
    }
}

/// Toggle properties are on unless explicitly switched off.
fn is_enabled(value: &str) -> bool {
    !matches!(value, "0" | "false" | "off" | "none")
}

fn text_align(value: &str) -> Option<&'static str> {
    match value {
        "center" => Some("center"),
        "right" | "end" => Some("right"),
        "both" | "distribute" => Some("justify"),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================

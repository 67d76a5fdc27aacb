//! Plain-text pagination.
//!
//! Text is laid out with a fixed-pitch approximation: every character is
//! assumed to be `font_size * 0.6` wide, so a line holds a fixed number of
//! characters regardless of the actual glyphs. Lines longer than that are
//! hard-wrapped mid-word. Page breaks must stay stable, so this is not
//! replaced by real glyph metrics.
//!
//! # Coordinate System
//!
//! PDF user space has its origin at the bottom-left corner, so the cursor
//! starts at `page_height - margin` and moves *down* by decreasing `y`.

use std::fmt::Write;

use lopdf::{Object, dictionary};

use super::builder::DocumentBuilder;
use super::document::PageDocument;

// =============================================================================
// Layout Constants
// =============================================================================

/// Font size for all text, in points.
pub const FONT_SIZE: f64 = 12.0;

/// Margin on all four sides, in points.
pub const MARGIN: f64 = 50.0;

/// Extra space below each drawn segment, on top of the font size.
pub const SEGMENT_GAP: f64 = 5.0;

/// Extra space after each source line.
pub const LINE_GAP: f64 = 5.0;

/// Assumed average character width as a fraction of the font size.
pub const CHAR_WIDTH_FACTOR: f64 = 0.6;

/// Default page width (US Letter).
pub const PAGE_WIDTH: f64 = 612.0;

/// Default page height (US Letter).
pub const PAGE_HEIGHT: f64 = 792.0;

/// Resource name of the text font inside each page.
const FONT_RESOURCE: &str = "F1";

// =============================================================================
// Layout Types
// =============================================================================

/// One drawn segment of text and where it sits on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// Segments drawn on one page, top to bottom.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextPage {
    pub lines: Vec<PlacedLine>,
}

/// Pagination parameters.
#[derive(Debug, Clone, Copy)]
pub struct TextLayout {
    pub page_width: f64,
    pub page_height: f64,
    pub font_size: f64,
    pub margin: f64,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            page_width: PAGE_WIDTH,
            page_height: PAGE_HEIGHT,
            font_size: FONT_SIZE,
            margin: MARGIN,
        }
    }
}

impl TextLayout {
    /// Characters that fit on one line under the fixed-pitch approximation.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn chars_per_line(&self) -> usize {
        let text_width = 2.0f64.mul_add(-self.margin, self.page_width);
        let per_line = (text_width / (self.font_size * CHAR_WIDTH_FACTOR)).floor();
        // Never zero, otherwise a non-empty line would never be consumed
        per_line.max(1.0) as usize
    }

    /// Split text into pages of positioned segments.
    ///
    /// Always returns at least one page, even for empty input.
    pub fn paginate(&self, text: &str) -> Vec<TextPage> {
        let chars_per_line = self.chars_per_line();
        let top = self.page_height - self.margin;

        let mut pages = vec![TextPage::default()];
        let mut y = top;

        for line in text.split('\n') {
            let chars: Vec<char> = line.chars().collect();

            for segment in chars.chunks(chars_per_line) {
                if y < self.font_size + self.margin {
                    pages.push(TextPage::default());
                    y = top;
                }

                if let Some(page) = pages.last_mut() {
                    page.lines.push(PlacedLine {
                        x: self.margin,
                        y,
                        text: segment.iter().collect(),
                    });
                }

                y -= self.font_size + SEGMENT_GAP;
            }

            y -= LINE_GAP;
        }

        pages
    }

    /// Lay out text and draw it into a new document.
    pub fn render(&self, text: &str) -> PageDocument {
        let mut builder = DocumentBuilder::new();

        let font_id = builder.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        for page in self.paginate(text) {
            let resources = dictionary! {
                "Font" => dictionary! {
                    FONT_RESOURCE => Object::Reference(font_id),
                },
            };
            builder.add_page(
                Object::Real(as_real(self.page_width)),
                Object::Real(as_real(self.page_height)),
                self.page_content(&page),
                resources,
            );
        }

        builder.finish()
    }

    /// Content stream drawing every segment of one page in black.
    fn page_content(&self, page: &TextPage) -> String {
        let mut content = String::new();

        content.push_str("q\n");
        content.push_str("0 0 0 rg\n");

        for line in &page.lines {
            content.push_str("BT\n");
            let _ = writeln!(content, "/{FONT_RESOURCE} {} Tf", self.font_size);
            let _ = writeln!(content, "{} {} Td", line.x, line.y);
            let _ = writeln!(content, "<{}> Tj", hex(&encode_win_ansi(&line.text)));
            content.push_str("ET\n");
        }

        content.push_str("Q\n");
        content
    }
}

/// Paginate and render with the default layout.
pub fn text_document(text: &str) -> PageDocument {
    TextLayout::default().render(text)
}

#[allow(clippy::cast_possible_truncation)]
const fn as_real(value: f64) -> f32 {
    value as f32
}

// =============================================================================
// Text Encoding
// =============================================================================

/// Encode text for a standard Type1 font with WinAnsiEncoding.
///
/// Control characters are dropped (a stray `\r` from CRLF files must not
/// show up as a glyph), tabs become spaces, and characters outside the
/// encoding become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| match c {
            '\t' => Some(b' '),
            c if c.is_control() => None,
            c => Some(win_ansi_byte(c).unwrap_or(b'?')),
        })
        .collect()
}

fn win_ansi_byte(c: char) -> Option<u8> {
    let code = u32::from(c);
    if (0x20..=0x7E).contains(&code) || (0xA0..=0xFF).contains(&code) {
        return u8::try_from(code).ok();
    }

    // The 0x80-0x9F block where cp1252 departs from Latin-1
    let byte = match c {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02X}");
    }
    out
}

// =============================================================================
// Tests
// =============================================================================

mod builder;
mod document;
mod layout;
mod merge;
mod raster;

pub use builder::DocumentBuilder;
pub use document::{PageDocument, PageSize};
pub use layout::{PlacedLine, TextLayout, TextPage, encode_win_ansi, text_document};
pub use merge::MergedDocument;
pub use raster::image_document;

//! Markdown report rendering and artifact persistence.

pub mod blocks;
pub mod pdf;
pub mod persist;

use deepresearch_shared::Result;

pub use blocks::{Block, Run, parse_blocks};
pub use pdf::PdfRenderer;
pub use persist::{write_document, write_markdown};

/// Turns assembled markdown into a paginated document.
pub trait DocumentRenderer: Send + Sync {
    /// File extension of the produced document, without the dot.
    fn extension(&self) -> &str;

    /// Render `markdown` to document bytes; `title` goes into the document
    /// metadata.
    fn render(&self, title: &str, markdown: &str) -> Result<Vec<u8>>;
}

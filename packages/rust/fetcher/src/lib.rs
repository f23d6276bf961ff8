//! Page fetching and plain-text extraction.
//!
//! [`PageFetcher::fetch_text`] never fails: any error is folded into a
//! bracketed placeholder so that every link still yields some text.

mod extract;
mod http;

use async_trait::async_trait;

pub use extract::{extract_text, truncate_chars};
pub use http::{HttpFetcher, is_ssrf_target};

/// Build the placeholder text used when a page cannot be fetched.
pub fn error_placeholder(url: &str, cause: &str) -> String {
    format!("[Error fetching {url}: {cause}]")
}

/// Whether `text` is a placeholder produced by [`error_placeholder`].
pub fn is_error_placeholder(text: &str) -> bool {
    text.starts_with("[Error fetching ") && text.ends_with(']')
}

/// Fetches a page and returns its visible text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return plain text.
    ///
    /// A missing URL yields an empty string; failures yield
    /// `[Error fetching <url>: <cause>]`.
    async fn fetch_text(&self, url: Option<&str>) -> String;
}

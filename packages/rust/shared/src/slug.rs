//! Filesystem-safe artifact names derived from a research topic.

use std::sync::LazyLock;

use chrono::Local;
use regex::Regex;

/// Maximum slug length in characters (without extension).
pub const MAX_SLUG_LEN: usize = 80;

/// Build a filesystem-safe file stem from `topic`.
///
/// Path-hostile characters become spaces, whitespace runs collapse to one
/// space, and the result is cut to `max_len` characters. An empty result
/// falls back to `research_report_<timestamp>`.
pub fn safe_filename(topic: &str, max_len: usize) -> String {
    static HOSTILE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"[/\\:"*?<>|\r\n]+"#).expect("valid regex"));
    static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    let replaced = HOSTILE_RE.replace_all(topic, " ");
    let collapsed = SPACE_RE.replace_all(&replaced, " ");
    let mut name = collapsed.trim().to_string();

    if name.chars().count() > max_len {
        name = name.chars().take(max_len).collect::<String>().trim().to_string();
    }

    if name.is_empty() {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        return format!("research_report_{timestamp}");
    }

    name
}

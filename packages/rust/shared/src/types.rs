//! Core domain types for a research run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum number of whitespace-separated tokens in a usable search query.
pub const MIN_QUERY_TOKENS: usize = 3;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for research run identifiers (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Language the report is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ru,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ru => "ru",
            Self::En => "en",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ru" | "ru-ru" | "russian" => Ok(Self::Ru),
            "en" | "en-us" | "en-gb" | "english" => Ok(Self::En),
            other => Err(format!("unsupported language '{other}': expected 'ru' or 'en'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// A validated search phrase: trimmed, non-empty, at least
/// [`MIN_QUERY_TOKENS`] whitespace-separated tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Validate a raw candidate. Returns `None` when it is not a usable query.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.split_whitespace().count() < MIN_QUERY_TOKENS {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Link / Summary
// ---------------------------------------------------------------------------

/// A search result kept as a candidate source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Absent when the provider returned a result without a link.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Topic-focused condensation of one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Model output, or the summary of an error placeholder if the fetch failed.
    pub text: String,
}

// ---------------------------------------------------------------------------
// SectionDraft
// ---------------------------------------------------------------------------

/// Drafted body text for one outline section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDraft {
    /// 1-based position in the outline.
    pub index: usize,
    pub title: String,
    /// Empty means the section is omitted from the report.
    pub text: String,
}

impl SectionDraft {
    /// Whether this draft contributes nothing to the report.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Terminal artifact of one research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Assembled markdown body.
    pub content: String,
    /// Titles of the sections present in `content`, in order.
    #[serde(default)]
    pub sections: Vec<String>,
    /// Links in query-then-rank order.
    pub references: Vec<Link>,
    pub summaries: Vec<Summary>,
    /// Rendered document, `None` when rendering was disabled or failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_path: Option<PathBuf>,
    /// Saved markdown copy of `content`, if requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown_path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Pipeline milestone labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    CollectLinks,
    Summarize,
    Outline,
    Report,
    Pdf,
    Done,
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::CollectLinks => "collect_links",
            Self::Summarize => "summarize",
            Self::Outline => "outline",
            Self::Report => "report",
            Self::Pdf => "pdf",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Whether no further milestones follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot reported at each milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    /// 0–100, never decreasing within a run.
    pub percent: u8,
    pub stage: Stage,
    pub detail: String,
}

impl RunProgress {
    pub fn new(percent: u8, stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            stage,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn query_requires_three_tokens() {
        assert!(Query::new("AI diagnostics 2025").is_some());
        assert!(Query::new("  healthcare AI trends 2024 ").is_some());
        assert!(Query::new("AI 2025").is_none());
        assert!(Query::new("   ").is_none());
        assert!(Query::new("").is_none());
    }

    #[test]
    fn query_is_trimmed() {
        let q = Query::new("\t latest AI news \n").unwrap();
        assert_eq!(q.as_str(), "latest AI news");
    }

    #[test]
    fn language_parsing() {
        assert_eq!("ru".parse::<Language>().unwrap(), Language::Ru);
        assert_eq!("en-US".parse::<Language>().unwrap(), Language::En);
        assert!("de".parse::<Language>().is_err());
    }

    #[test]
    fn section_draft_whitespace_is_empty() {
        let draft = SectionDraft {
            index: 1,
            title: "Overview".into(),
            text: " \n\t".into(),
        };
        assert!(draft.is_empty());
    }

    #[test]
    fn stage_serializes_snake_case() {
        let json = serde_json::to_string(&Stage::CollectLinks).unwrap();
        assert_eq!(json, r#""collect_links""#);
        assert!(Stage::Done.is_terminal());
        assert!(!Stage::Pdf.is_terminal());
    }

    #[test]
    fn progress_percent_is_capped() {
        let p = RunProgress::new(250, Stage::Done, "");
        assert_eq!(p.percent, 100);
    }

    #[test]
    fn link_without_url_deserializes() {
        let link: Link = serde_json::from_str(r#"{"title":"No link"}"#).unwrap();
        assert!(link.url.is_none());
        assert_eq!(link.title.as_deref(), Some("No link"));
    }
}

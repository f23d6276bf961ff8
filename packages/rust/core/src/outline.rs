//! Outline generation.

use tracing::{info, instrument, warn};

use deepresearch_shared::Summary;

use crate::context::StageContext;
use crate::parse::{ListParser, first_match, parse_embedded_json_list, parse_json_list, parse_numbered_list};
use crate::prompts;

/// Title used when no section can be recovered from the model reply.
pub const FALLBACK_SECTION: &str = "Full Report";

/// Parsers tried on the outline reply, in order.
const OUTLINE_PARSERS: &[ListParser] = &[
    parse_json_list,
    parse_embedded_json_list,
    parse_numbered_list,
];

/// Ordered section titles for a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    pub titles: Vec<String>,
}

impl Outline {
    /// Parse a model reply, falling back to a single synthetic section.
    pub fn parse(raw: &str) -> Self {
        match first_match(raw, OUTLINE_PARSERS) {
            Some(titles) => Self { titles },
            None => {
                warn!("outline reply had no recognisable section list, using a single section");
                Self::fallback()
            }
        }
    }

    pub fn fallback() -> Self {
        Self {
            titles: vec![FALLBACK_SECTION.to_string()],
        }
    }

    /// `1. Title` lines joined by newlines, as shown to the model.
    pub fn numbered(&self) -> String {
        self.titles
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {t}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

/// Ask the model for section titles derived from the summaries.
#[instrument(skip_all, fields(summaries = summaries.len()))]
pub async fn generate_outline(
    ctx: &StageContext<'_>,
    topic: &str,
    summaries: &[Summary],
    max_sections: usize,
) -> Outline {
    let prompt = prompts::outline(ctx.language, topic, summaries, max_sections, ctx.year);
    let raw = ctx.ask(prompt).await;
    let outline = Outline::parse(&raw);
    info!(sections = outline.len(), "outline generated");
    outline
}

//! Report assembly.

use deepresearch_shared::{Language, SectionDraft};

use crate::prompts;

/// Join non-empty drafts under numbered headings, in outline order, below the
/// report title line. Output depends only on the inputs.
pub fn assemble(language: Language, topic: &str, drafts: &[SectionDraft]) -> String {
    let mut ordered: Vec<&SectionDraft> = drafts.iter().filter(|d| !d.is_empty()).collect();
    ordered.sort_by_key(|d| d.index);

    let title = prompts::report_title(language, topic);
    if ordered.is_empty() {
        return title;
    }

    let sections = ordered
        .iter()
        .map(|d| format!("## {}. {}\n\n{}", d.index, d.title, d.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{title}\n\n{sections}")
}

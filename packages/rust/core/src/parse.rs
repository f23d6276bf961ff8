//! Recovering structured lists from free-form model output.
//!
//! Models wrap JSON in code fences, surround it with prose, or ignore the
//! requested format entirely. Parsers here are small and fallible; callers
//! compose them with [`first_match`].

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*```[A-Za-z0-9_-]*\s*$").unwrap());

static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.\s+(.+?)\s*$").unwrap());

/// A parser that either recognises the input or declines.
pub type ListParser = fn(&str) -> Option<Vec<String>>;

/// Remove markdown code-fence lines.
pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw.trim(), "").trim().to_string()
}

/// Collect the items of every JSON array embedded in `text`.
///
/// Each `[` is tried as the start of a JSON value; a successful parse skips
/// past the whole array, so brackets inside its strings are never rescanned.
pub fn extract_json_arrays(text: &str) -> Vec<Value> {
    let mut items = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find('[') {
        let start = cursor + offset;
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Array(values))) => {
                items.extend(values);
                cursor = start + stream.byte_offset();
            }
            Some(Err(e)) => {
                debug!(error = %e, at = start, "skipping unparsable bracketed fragment");
                cursor = start + 1;
            }
            _ => cursor = start + 1,
        }
    }
    items
}

/// Keep string items only, trimmed and non-empty.
pub fn string_items(values: impl IntoIterator<Item = Value>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(items: Vec<String>) -> Option<Vec<String>> {
    (!items.is_empty()).then_some(items)
}

/// The whole (fence-stripped) response is a JSON array of strings.
pub fn parse_json_list(raw: &str) -> Option<Vec<String>> {
    match serde_json::from_str::<Value>(&strip_code_fences(raw)) {
        Ok(Value::Array(values)) => non_empty(string_items(values)),
        _ => None,
    }
}

/// One or more JSON arrays embedded in surrounding prose.
pub fn parse_embedded_json_list(raw: &str) -> Option<Vec<String>> {
    non_empty(string_items(extract_json_arrays(&strip_code_fences(raw))))
}

/// A markdown numbered list (`1. Title` lines).
pub fn parse_numbered_list(raw: &str) -> Option<Vec<String>> {
    non_empty(
        NUMBERED_LINE
            .captures_iter(raw)
            .map(|c| c[1].to_string())
            .collect(),
    )
}

/// Run parsers left to right and return the first match.
pub fn first_match(raw: &str, parsers: &[ListParser]) -> Option<Vec<String>> {
    parsers.iter().find_map(|parse| parse(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fences() {
        let raw = "```json\n[\"a b c\"]\n```";
        assert_eq!(strip_code_fences(raw), "[\"a b c\"]");
    }

    #[test]
    fn collects_every_array_in_prose() {
        let raw = "Russian: [\"запрос один два\"] and English: [\"query one two\", 3]";
        let items = string_items(extract_json_arrays(raw));
        assert_eq!(items, vec!["запрос один два", "query one two"]);
    }

    #[test]
    fn broken_fragments_are_skipped() {
        let raw = "[not json] then [\"ok\"]";
        assert_eq!(string_items(extract_json_arrays(raw)), vec!["ok"]);
    }

    #[test]
    fn json_list_requires_whole_array() {
        assert_eq!(
            parse_json_list("[\"Раздел A\", \"Раздел B\"]"),
            Some(vec!["Раздел A".to_string(), "Раздел B".to_string()])
        );
        assert_eq!(parse_json_list("ответ: [\"Раздел A\"]"), None);
        assert_eq!(parse_json_list("{\"a\": 1}"), None);
        assert_eq!(parse_json_list("[]"), None);
    }

    #[test]
    fn brackets_inside_strings_do_not_split_arrays() {
        let raw = r#"Outline: ["Market [2025]", "Risks"] and [["nested"], "tail]"]"#;
        let items = string_items(extract_json_arrays(raw));
        assert_eq!(items, vec!["Market [2025]", "Risks", "tail]"]);
    }

    #[test]
    fn unterminated_array_yields_nothing() {
        assert!(extract_json_arrays("[\"open\", \"never closed").is_empty());
    }

    #[test]
    fn embedded_list_ignores_prose() {
        assert_eq!(
            parse_embedded_json_list("ответ: [\"Раздел A\",\"Раздел B\"]"),
            Some(vec!["Раздел A".to_string(), "Раздел B".to_string()])
        );
    }

    #[test]
    fn numbered_list() {
        let raw = "Plan:\n1. Market size\n  2. Key players  \nnot numbered\n3) wrong style";
        assert_eq!(
            parse_numbered_list(raw),
            Some(vec!["Market size".to_string(), "Key players".to_string()])
        );
        assert_eq!(parse_numbered_list("no list here"), None);
    }

    #[test]
    fn chain_takes_first_success() {
        let chain: &[ListParser] = &[parse_json_list, parse_numbered_list];
        assert_eq!(
            first_match("1. Only numbered", chain),
            Some(vec!["Only numbered".to_string()])
        );
        assert_eq!(first_match("nothing", chain), None);
    }
}

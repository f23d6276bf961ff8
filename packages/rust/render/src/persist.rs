//! Writing rendered artifacts to the output directory.

use std::path::{Path, PathBuf};

use tracing::info;

use deepresearch_shared::{MAX_SLUG_LEN, ResearchError, Result, safe_filename};

fn write_file(output_dir: &Path, topic: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| ResearchError::io(output_dir, e))?;

    let name = format!("{}.{extension}", safe_filename(topic, MAX_SLUG_LEN));
    let path = output_dir.join(name);
    std::fs::write(&path, bytes).map_err(|e| ResearchError::io(&path, e))?;

    info!(path = %path.display(), bytes = bytes.len(), "artifact written");
    Ok(path)
}

/// Write the markdown report as `<output_dir>/<slug>.md`.
pub fn write_markdown(output_dir: &Path, topic: &str, markdown: &str) -> Result<PathBuf> {
    write_file(output_dir, topic, "md", markdown.as_bytes())
}

/// Write a rendered document as `<output_dir>/<slug>.<extension>`.
pub fn write_document(
    output_dir: &Path,
    topic: &str,
    extension: &str,
    bytes: &[u8],
) -> Result<PathBuf> {
    write_file(output_dir, topic, extension, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_lands_under_slug() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("reports");

        let path = write_markdown(&out, "AI/ML: Trends? <2025>", "# Report").unwrap();

        assert_eq!(path, out.join("AI ML Trends 2025.md"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Report");
    }

    #[test]
    fn document_uses_given_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_document(tmp.path(), "quantum computing", "pdf", b"%PDF-1.4").unwrap();
        assert_eq!(path.file_name().unwrap(), "quantum computing.pdf");
    }

    #[test]
    fn empty_topic_falls_back_to_timestamp_name() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_markdown(tmp.path(), "???", "x").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("research_report_"));
        assert!(name.ends_with(".md"));
    }

    #[test]
    fn unwritable_directory_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("occupied");
        std::fs::write(&file, "x").unwrap();

        let err = write_markdown(&file, "topic", "x").unwrap_err();
        assert!(matches!(err, ResearchError::Io { .. }));
    }
}

//! PDF rendering with genpdf.

use std::path::PathBuf;

use genpdf::elements::{Break, FrameCellDecorator, LinearLayout, Paragraph, TableLayout, UnorderedList};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::style::{Style, StyledString};
use genpdf::{Alignment, Document, Element, SimplePageDecorator};
use tracing::{debug, instrument};

use deepresearch_shared::{RenderConfig, ResearchError, Result};

use crate::DocumentRenderer;
use crate::blocks::{Block, Run, parse_blocks};

const BODY_SIZE: u8 = 11;
const CODE_SIZE: u8 = 9;

/// Renders report markdown to an A4 PDF.
///
/// Fonts are loaded from `font_dir` using genpdf's family naming
/// (`<name>-Regular.ttf`, `<name>-Bold.ttf`, `<name>-Italic.ttf`,
/// `<name>-BoldItalic.ttf`).
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    font_dir: PathBuf,
    font_name: String,
}

impl PdfRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            font_dir: PathBuf::from(&config.font_dir),
            font_name: config.font_name.clone(),
        }
    }

    fn load_fonts(&self) -> Result<FontFamily<FontData>> {
        genpdf::fonts::from_files(&self.font_dir, &self.font_name, None).map_err(|e| {
            ResearchError::Render(format!(
                "font family {} not found in {}: {e}",
                self.font_name,
                self.font_dir.display()
            ))
        })
    }
}

fn heading_size(level: u8) -> u8 {
    match level {
        1 => 18,
        2 => 15,
        _ => 13,
    }
}

fn rich_paragraph(runs: &[Run], base: Style) -> Paragraph {
    let mut paragraph = Paragraph::new("");
    for run in runs {
        let mut style = base;
        if run.bold {
            style = style.bold();
        }
        if run.italic {
            style = style.italic();
        }
        paragraph.push(StyledString::new(run.text.clone(), style));
    }
    paragraph
}

fn table_element(rows: &[Vec<Vec<Run>>]) -> Result<TableLayout> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let mut table = TableLayout::new(vec![1; columns]);
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    for (i, row) in rows.iter().enumerate() {
        let base = if i == 0 {
            Style::new().bold().with_font_size(10)
        } else {
            Style::new().with_font_size(10)
        };
        let mut table_row = table.row();
        for col in 0..columns {
            let cell = row.get(col).map(Vec::as_slice).unwrap_or_default();
            table_row.push_element(rich_paragraph(cell, base).padded(1));
        }
        table_row
            .push()
            .map_err(|e| ResearchError::Render(format!("table row: {e}")))?;
    }
    Ok(table)
}

fn code_element(lines: &[String]) -> Result<TableLayout> {
    let mut body = LinearLayout::vertical();
    let style = Style::new().with_font_size(CODE_SIZE);
    for line in lines {
        body.push(Paragraph::new(StyledString::new(line.clone(), style)));
    }

    let mut frame = TableLayout::new(vec![1]);
    frame.set_cell_decorator(FrameCellDecorator::new(false, true, false));
    frame
        .row()
        .element(body.padded(2))
        .push()
        .map_err(|e| ResearchError::Render(format!("code block: {e}")))?;
    Ok(frame)
}

impl DocumentRenderer for PdfRenderer {
    fn extension(&self) -> &str {
        "pdf"
    }

    #[instrument(skip_all, fields(title = %title, chars = markdown.len()))]
    fn render(&self, title: &str, markdown: &str) -> Result<Vec<u8>> {
        let mut doc = Document::new(self.load_fonts()?);
        doc.set_title(title);
        doc.set_font_size(BODY_SIZE);

        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(20);
        decorator.set_header(|page| {
            let mut header = LinearLayout::vertical();
            header.push(
                Paragraph::new(format!("{page}"))
                    .aligned(Alignment::Right)
                    .styled(Style::new().with_font_size(8)),
            );
            header.push(Break::new(1));
            header
        });
        doc.set_page_decorator(decorator);

        let mut bullets: Option<UnorderedList> = None;
        let blocks = parse_blocks(markdown);
        debug!(blocks = blocks.len(), "rendering document");

        for block in blocks {
            if !matches!(block, Block::Bullet(_)) {
                if let Some(list) = bullets.take() {
                    doc.push(list);
                    doc.push(Break::new(0.5));
                }
            }

            match block {
                Block::Heading { level, runs } => {
                    let style = Style::new().bold().with_font_size(heading_size(level));
                    doc.push(Break::new(0.5));
                    doc.push(rich_paragraph(&runs, style));
                    doc.push(Break::new(0.5));
                }
                Block::Paragraph(runs) => {
                    doc.push(rich_paragraph(&runs, Style::new()));
                    doc.push(Break::new(0.5));
                }
                Block::Bullet(runs) => {
                    bullets
                        .get_or_insert_with(UnorderedList::new)
                        .push(rich_paragraph(&runs, Style::new()));
                }
                Block::Numbered { number, runs } => {
                    let mut numbered = vec![Run::plain(format!("{number}. "))];
                    numbered.extend(runs);
                    doc.push(rich_paragraph(&numbered, Style::new()));
                }
                Block::Table(rows) => {
                    doc.push(table_element(&rows)?);
                    doc.push(Break::new(0.5));
                }
                Block::Code(lines) => {
                    doc.push(code_element(&lines)?);
                    doc.push(Break::new(0.5));
                }
                Block::Rule => doc.push(Break::new(1)),
            }
        }
        if let Some(list) = bullets {
            doc.push(list);
        }

        let mut out = Vec::new();
        doc.render(&mut out)
            .map_err(|e| ResearchError::Render(e.to_string()))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fonts_is_render_error() {
        let tmp = tempfile::tempdir().unwrap();
        let renderer = PdfRenderer::new(&RenderConfig {
            enabled: true,
            font_dir: tmp.path().display().to_string(),
            font_name: "NoSuchFont".into(),
        });
        let err = renderer.render("Title", "# Title").unwrap_err();
        assert!(matches!(err, ResearchError::Render(_)));
        assert!(err.to_string().contains("NoSuchFont"));
    }

    #[test]
    fn renders_report_when_fonts_are_installed() {
        let config = RenderConfig::default();
        let renderer = PdfRenderer::new(&config);
        if renderer.load_fonts().is_err() {
            // font family not installed on this machine
            return;
        }

        let md = "# Research report: AI in healthcare\n\n## 1. Diagnostics\n\n\
                  Models read **X-rays**, see [WHO](https://who.int) and *recent* work.\n\n\
                  - imaging\n- triage\n\n1. first\n2. second\n\n---\n\n\
                  | Source | Year |\n|---|---|\n| WHO | 2024 |\n\n```\nlet x = 1;\n```";
        let bytes = renderer.render("Research report: AI in healthcare", md).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn extension_is_pdf() {
        assert_eq!(PdfRenderer::new(&RenderConfig::default()).extension(), "pdf");
    }
}

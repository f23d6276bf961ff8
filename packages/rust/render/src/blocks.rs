//! Markdown to layout blocks.
//!
//! The CommonMark event stream from `pulldown-cmark` is folded into a flat
//! list of [`Block`]s that the PDF writer lays out one by one. Inline markup
//! is reduced to styled [`Run`]s; links keep their target in parentheses.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// A piece of inline text with its emphasis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// A rendered unit of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Heading with level clamped to 1..=3.
    Heading { level: u8, runs: Vec<Run> },
    Paragraph(Vec<Run>),
    Bullet(Vec<Run>),
    Numbered { number: u64, runs: Vec<Run> },
    /// Table rows, header first. Each cell is a list of runs.
    Table(Vec<Vec<Vec<Run>>>),
    /// Lines of a code block, verbatim.
    Code(Vec<String>),
    /// Thematic break.
    Rule,
}

fn runs_text(runs: &[Run]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

/// Parse markdown into blocks.
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut builder = BlockBuilder::default();
    for event in Parser::new_ext(markdown, options) {
        builder.event(event);
    }
    builder.finish()
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    runs: Vec<Run>,
    bold: usize,
    italic: usize,
    /// Target of the open link and the byte offset of its label in the
    /// collected text.
    link: Option<(String, usize)>,
    /// Open lists; `Some(n)` is the next number of an ordered list.
    lists: Vec<Option<u64>>,
    /// Marker of the list item whose text is collecting in `runs`.
    item: Option<Option<u64>>,
    table: Option<Vec<Vec<Vec<Run>>>>,
    row: Vec<Vec<Run>>,
    code: Option<String>,
}

impl BlockBuilder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => match self.code.as_mut() {
                Some(code) => code.push_str(&text),
                None => self.push_text(&text),
            },
            Event::Code(text) => self.push_text(&text),
            Event::SoftBreak | Event::HardBreak => self.push_text(" "),
            Event::Rule => {
                self.flush_paragraph();
                self.blocks.push(Block::Rule);
            }
            Event::TaskListMarker(done) => self.push_text(if done { "[x] " } else { "[ ] " }),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                // loose list items hold several paragraphs
                if self.item.is_some() && !self.runs.is_empty() {
                    self.push_text(" ");
                }
            }
            Tag::List(first) => {
                self.flush_item();
                self.lists.push(first);
            }
            Tag::Item => {
                let marker = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let number = *next;
                        *next += 1;
                        Some(number)
                    }
                    _ => None,
                };
                self.runs.clear();
                self.item = Some(marker);
            }
            Tag::Table(_) => self.table = Some(Vec::new()),
            Tag::TableHead | Tag::TableRow => self.row.clear(),
            Tag::TableCell => self.runs.clear(),
            Tag::CodeBlock(_) => {
                self.flush_paragraph();
                self.code = Some(String::new());
            }
            Tag::Strong => self.bold += 1,
            Tag::Emphasis => self.italic += 1,
            Tag::Link { dest_url, .. } => {
                let label_start = self.runs.iter().map(|r| r.text.len()).sum();
                self.link = Some((dest_url.to_string(), label_start));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.item.is_none() && self.table.is_none() {
                    self.flush_paragraph();
                }
            }
            TagEnd::Heading(level) => {
                let level = (level as u8).min(3);
                let runs = std::mem::take(&mut self.runs);
                if !runs.is_empty() {
                    self.blocks.push(Block::Heading { level, runs });
                }
            }
            TagEnd::Item => self.flush_item(),
            TagEnd::List(_) => {
                self.lists.pop();
            }
            TagEnd::TableCell => self.row.push(std::mem::take(&mut self.runs)),
            TagEnd::TableHead | TagEnd::TableRow => {
                let row = std::mem::take(&mut self.row);
                if let Some(table) = self.table.as_mut() {
                    table.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(rows) = self.table.take() {
                    self.blocks.push(Block::Table(rows));
                }
            }
            TagEnd::CodeBlock => {
                if let Some(code) = self.code.take() {
                    let lines = code.trim_end_matches('\n').lines().map(str::to_string).collect();
                    self.blocks.push(Block::Code(lines));
                }
            }
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Link => {
                if let Some((url, label_start)) = self.link.take() {
                    let text = runs_text(&self.runs);
                    let label = text.get(label_start..).unwrap_or_default();
                    if !url.is_empty() && label.trim() != url {
                        self.push_plain(&format!(" ({url})"));
                    }
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        let (bold, italic) = (self.bold > 0, self.italic > 0);
        self.push_styled(text, bold, italic);
    }

    fn push_plain(&mut self, text: &str) {
        self.push_styled(text, false, false);
    }

    fn push_styled(&mut self, text: &str, bold: bool, italic: bool) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.runs.last_mut() {
            if last.bold == bold && last.italic == italic {
                last.text.push_str(text);
                return;
            }
        }
        self.runs.push(Run {
            text: text.to_string(),
            bold,
            italic,
        });
    }

    fn flush_paragraph(&mut self) {
        let runs = std::mem::take(&mut self.runs);
        if runs.iter().any(|r| !r.text.trim().is_empty()) {
            self.blocks.push(Block::Paragraph(runs));
        }
    }

    /// Emit the open list item. Text with no open item (after a nested list)
    /// becomes a paragraph.
    fn flush_item(&mut self) {
        let runs = std::mem::take(&mut self.runs);
        if runs.iter().all(|r| r.text.trim().is_empty()) {
            self.item = None;
            return;
        }
        let block = match self.item.take() {
            Some(Some(number)) => Block::Numbered { number, runs },
            Some(None) => Block::Bullet(runs),
            None => Block::Paragraph(runs),
        };
        self.blocks.push(block);
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush_item();
        self.blocks
    }
}

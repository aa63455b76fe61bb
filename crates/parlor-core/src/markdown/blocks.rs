//! Line model and block-level stages.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use super::inline;

const FENCE: &str = "```";
const DEFAULT_LANGUAGE: &str = "plain";

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6}) (.+)$").expect("valid regex"));
static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s+(.+)$").expect("valid regex"));
static UNORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*]\s+(.+)$").expect("valid regex"));
static BLOCKQUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^&gt;\s(.+)$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListKind {
    Ordered,
    Unordered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind {
    /// Not yet claimed by any stage.
    Plain,
    Blank,
    Heading(usize),
    Item {
        list: ListKind,
        /// First number of an ordered item; `None` when unordered or too large.
        number: Option<u64>,
    },
    Quote,
    Paragraph,
}

#[derive(Debug, Clone)]
pub(crate) struct Line {
    pub(crate) kind: LineKind,
    pub(crate) text: String,
    pub(crate) code_spans: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) enum Block {
    /// Fenced code. `body` is already escaped and is final.
    Code { language: String, body: String },
    Line(Line),
}

/// Intermediate representation shared by all stages.
#[derive(Debug, Default)]
pub(crate) struct Document {
    pub(crate) blocks: Vec<Block>,
}

impl Document {
    /// Splits raw text into unclassified lines. `\r\n` counts as one break.
    pub(crate) fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        let blocks = text
            .split('\n')
            .map(|raw| {
                Block::Line(Line {
                    kind: LineKind::Plain,
                    text: raw.strip_suffix('\r').unwrap_or(raw).to_string(),
                    code_spans: Vec::new(),
                })
            })
            .collect();
        Self { blocks }
    }

    fn lines_mut(&mut self) -> impl Iterator<Item = &mut Line> {
        self.blocks.iter_mut().filter_map(|block| match block {
            Block::Line(line) => Some(line),
            Block::Code { .. } => None,
        })
    }

    fn plain_lines_mut(&mut self) -> impl Iterator<Item = &mut Line> {
        self.lines_mut().filter(|line| line.kind == LineKind::Plain)
    }
}

pub(crate) fn escape(doc: &mut Document) {
    for line in doc.lines_mut() {
        if let Cow::Owned(escaped) = inline::escape_html(&line.text) {
            line.text = escaped;
        }
    }
}

/// Language tag of a fence opener, or `None` if the line does not open a fence.
///
/// The tag is any run of non-whitespace without backticks. Characters that
/// cannot appear in a class name are dropped; an empty result is `plain`.
fn fence_language(line: &str) -> Option<String> {
    let tag = line.trim().strip_prefix(FENCE)?;
    if tag.contains(|c: char| c.is_whitespace() || c == '`') {
        return None;
    }
    let language: String = tag
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '#' | '.' | '-'))
        .collect();
    Some(if language.is_empty() {
        DEFAULT_LANGUAGE.to_string()
    } else {
        language
    })
}

fn is_fence_close(line: &str) -> bool {
    line.trim() == FENCE
}

/// Folds fenced regions into [`Block::Code`]. Runs on escaped text, so the
/// code body is escaped exactly once.
pub(crate) fn fold_fenced_code(doc: &mut Document) {
    let mut out = Vec::with_capacity(doc.blocks.len());
    let mut blocks = std::mem::take(&mut doc.blocks).into_iter();

    while let Some(block) = blocks.next() {
        let Block::Line(line) = block else {
            out.push(block);
            continue;
        };
        let Some(language) = fence_language(&line.text) else {
            out.push(Block::Line(line));
            continue;
        };

        let mut body_lines = Vec::new();
        for next in blocks.by_ref() {
            match next {
                Block::Line(inner) if is_fence_close(&inner.text) => break,
                Block::Line(inner) => body_lines.push(inner.text),
                Block::Code { .. } => {}
            }
        }
        out.push(Block::Code {
            language,
            body: trim_blank_lines(&body_lines),
        });
    }

    doc.blocks = out;
}

/// Drops leading and trailing blank lines; indentation inside is kept.
fn trim_blank_lines(lines: &[String]) -> String {
    let is_blank = |line: &String| line.trim().is_empty();
    let start = lines.iter().position(|l| !is_blank(l)).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !is_blank(l)).map_or(start, |i| i + 1);
    lines[start..end].join("\n")
}

pub(crate) fn extract_inline_code(doc: &mut Document) {
    for line in doc.lines_mut() {
        if line.text.contains('`') {
            line.text = inline::extract_code_spans(&line.text, &mut line.code_spans);
        }
    }
}

pub(crate) fn classify_headings(doc: &mut Document) {
    for line in doc.plain_lines_mut() {
        let Some((level, content)) = HEADING
            .captures(&line.text)
            .map(|caps| (caps[1].len(), caps[2].to_string()))
        else {
            continue;
        };
        line.kind = LineKind::Heading(level);
        line.text = content;
    }
}

/// Leading indentation is ignored: nested items flatten into one level.
pub(crate) fn classify_list_items(doc: &mut Document) {
    for line in doc.plain_lines_mut() {
        let candidate = line.text.trim_start();
        let classified = if let Some(caps) = ORDERED_ITEM.captures(candidate) {
            Some((
                LineKind::Item {
                    list: ListKind::Ordered,
                    number: caps[1].parse().ok(),
                },
                caps[2].to_string(),
            ))
        } else {
            UNORDERED_ITEM.captures(candidate).map(|caps| {
                (
                    LineKind::Item {
                        list: ListKind::Unordered,
                        number: None,
                    },
                    caps[1].to_string(),
                )
            })
        };
        if let Some((kind, content)) = classified {
            line.kind = kind;
            line.text = content;
        }
    }
}

pub(crate) fn classify_blockquotes(doc: &mut Document) {
    for line in doc.plain_lines_mut() {
        let Some(content) = BLOCKQUOTE.captures(&line.text).map(|caps| caps[1].to_string())
        else {
            continue;
        };
        line.kind = LineKind::Quote;
        line.text = content;
    }
}

pub(crate) fn apply_emphasis(doc: &mut Document) {
    for line in doc.lines_mut() {
        if line.text.contains(['*', '_']) {
            line.text = inline::apply_emphasis(&line.text);
        }
    }
}

pub(crate) fn classify_paragraphs(doc: &mut Document) {
    for line in doc.plain_lines_mut() {
        line.kind = if line.text.trim().is_empty() {
            LineKind::Blank
        } else {
            LineKind::Paragraph
        };
    }
}

/// Serializes the document, grouping list items into containers.
pub(crate) fn emit(doc: &Document) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut open_list: Option<ListKind> = None;

    let close = |parts: &mut Vec<String>, list: ListKind| {
        parts.push(match list {
            ListKind::Ordered => "</ol>".to_string(),
            ListKind::Unordered => "</ul>".to_string(),
        });
    };

    for block in &doc.blocks {
        let line = match block {
            Block::Code { language, body } => {
                if let Some(list) = open_list.take() {
                    close(&mut parts, list);
                }
                parts.push(format!(
                    "<pre><code class=\"language-{language}\">{body}</code></pre>"
                ));
                continue;
            }
            Block::Line(line) => line,
        };

        // Blank lines neither render nor end a list run.
        if line.kind == LineKind::Blank {
            continue;
        }

        let content = inline::restore_code_spans(&line.text, &line.code_spans);
        if let LineKind::Item { list, number } = line.kind {
            if open_list != Some(list) {
                if let Some(previous) = open_list.take() {
                    close(&mut parts, previous);
                }
                parts.push(match (list, number) {
                    (ListKind::Ordered, Some(n)) if n != 1 => format!("<ol start=\"{n}\">"),
                    (ListKind::Ordered, _) => "<ol>".to_string(),
                    (ListKind::Unordered, _) => "<ul>".to_string(),
                });
                open_list = Some(list);
            }
            parts.push(format!("<li>{content}</li>"));
            continue;
        }

        if let Some(list) = open_list.take() {
            close(&mut parts, list);
        }
        parts.push(match line.kind {
            LineKind::Heading(level) => format!("<h{level}>{content}</h{level}>"),
            LineKind::Quote => format!("<blockquote>{content}</blockquote>"),
            // Paragraph, and anything a stage left unclassified.
            _ => format!("<p>{content}</p>"),
        });
    }

    if let Some(list) = open_list {
        close(&mut parts, list);
    }
    parts.join("\n")
}

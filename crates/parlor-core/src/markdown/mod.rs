//! Markdown to HTML renderer for assistant replies.
//!
//! A deliberately small dialect: fenced code, inline code, ATX headings,
//! bold and italic, flat lists, single-line blockquotes and paragraphs.
//! Input is untrusted; everything is escaped before any markup is produced.
//!
//! [`render`] is a pure function of its input. Streaming callers re-render
//! the whole transcript on every update instead of patching earlier output.

mod blocks;
mod inline;

use std::fmt;

pub use inline::escape_html;

use blocks::Document;

/// Sanitized markup derived from one transcript snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedMarkup(String);

impl RenderedMarkup {
    /// Wraps markup that is known to be safe (crate-internal constants only).
    pub(crate) fn from_trusted(markup: &str) -> Self {
        Self(markup.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RenderedMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RenderedMarkup {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

struct Stage {
    name: &'static str,
    apply: fn(&mut Document),
}

/// Ordered stages; each sees only what earlier stages left as line text.
/// Code blocks leave the line model at `fenced_code` and inline code spans
/// move to a side table at `inline_code`.
const PIPELINE: &[Stage] = &[
    Stage {
        name: "escape",
        apply: blocks::escape,
    },
    Stage {
        name: "fenced_code",
        apply: blocks::fold_fenced_code,
    },
    Stage {
        name: "inline_code",
        apply: blocks::extract_inline_code,
    },
    Stage {
        name: "headings",
        apply: blocks::classify_headings,
    },
    Stage {
        name: "list_items",
        apply: blocks::classify_list_items,
    },
    Stage {
        name: "blockquotes",
        apply: blocks::classify_blockquotes,
    },
    Stage {
        name: "emphasis",
        apply: blocks::apply_emphasis,
    },
    Stage {
        name: "paragraphs",
        apply: blocks::classify_paragraphs,
    },
];

/// Renders markdown text to sanitized HTML.
pub fn render(text: &str) -> RenderedMarkup {
    let mut doc = Document::from_text(text);
    for stage in PIPELINE {
        (stage.apply)(&mut doc);
        tracing::trace!(stage = stage.name, blocks = doc.blocks.len(), "render stage");
    }
    RenderedMarkup(blocks::emit(&doc))
}

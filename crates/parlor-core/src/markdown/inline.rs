//! Inline passes: HTML escaping, code spans, emphasis.
//!
//! Code span contents are lifted out of the line text into a side table and
//! replaced with `\0<index>\0` placeholders. Escaping maps NUL to U+FFFD, so
//! every NUL left in an escaped line is one of ours and no later pass can see
//! (or forge) code content.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

const PLACEHOLDER: char = '\0';

static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));

/// Bold before italic, so `*x*` never eats half of a `**x**` span. Spans
/// never contain `<` or `>`: input brackets are escaped by then, so any bracket
/// is a tag emitted by an earlier rule and must not be crossed.
static EMPHASIS_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"\*\*([^*<>]+)\*\*").expect("valid regex"),
            "<strong>${1}</strong>",
        ),
        (
            Regex::new(r"__([^_<>]+)__").expect("valid regex"),
            "<strong>${1}</strong>",
        ),
        (
            Regex::new(r"\*([^*<>]+)\*").expect("valid regex"),
            "<em>${1}</em>",
        ),
        (Regex::new(r"_([^_<>]+)_").expect("valid regex"), "<em>${1}</em>"),
    ]
});

/// Escapes `&`, `<` and `>`; NUL becomes U+FFFD.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', PLACEHOLDER]) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            PLACEHOLDER => out.push(char::REPLACEMENT_CHARACTER),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Moves backtick spans of an escaped line into `spans`.
pub(crate) fn extract_code_spans(text: &str, spans: &mut Vec<String>) -> String {
    INLINE_CODE
        .replace_all(text, |caps: &Captures<'_>| {
            let index = spans.len();
            spans.push(caps[1].to_string());
            format!("{PLACEHOLDER}{index}{PLACEHOLDER}")
        })
        .into_owned()
}

/// Applies bold and italic rules, in order.
pub(crate) fn apply_emphasis(text: &str) -> String {
    let mut out = Cow::Borrowed(text);
    for (pattern, replacement) in EMPHASIS_RULES.iter() {
        if let Cow::Owned(replaced) = pattern.replace_all(&out, *replacement) {
            out = Cow::Owned(replaced);
        }
    }
    out.into_owned()
}

/// Puts the code spans back as `<code>` elements.
pub(crate) fn restore_code_spans(text: &str, spans: &[String]) -> String {
    if spans.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + spans.iter().map(String::len).sum::<usize>());
    let mut rest = text;
    while let Some(start) = rest.find(PLACEHOLDER) {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find(PLACEHOLDER) else {
            rest = after;
            break;
        };
        if let Some(code) = after[..end].parse::<usize>().ok().and_then(|i| spans.get(i)) {
            out.push_str("<code>");
            out.push_str(code);
            out.push_str("</code>");
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

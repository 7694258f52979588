//! Splitting template source into text and tag segments.
//!
//! Whitespace control is applied here, before parsing, so the tree the
//! parser builds already holds the final literal text.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{TemplateError, TemplateResult};

/// Options controlling how template source is tokenized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhitespaceOptions {
    /// Drop the first newline after a block tag.
    pub trim_blocks: bool,
    /// Strip spaces and tabs from the start of a line up to a block tag.
    pub lstrip_blocks: bool,
    /// Keep a single trailing newline at the end of the source.
    pub keep_trailing_newline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Expr,
    Block,
    Comment,
}

/// A raw piece of template source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Text(String),
    Tag {
        kind: TagKind,
        body: String,
        line: usize,
    },
}

struct RawTag {
    kind: TagKind,
    body: String,
    line: usize,
    strip_before: bool,
    strip_after: bool,
}

enum Raw {
    Text(String),
    Tag(RawTag),
}

fn opener() -> &'static Regex {
    static OPENER: OnceLock<Regex> = OnceLock::new();
    OPENER.get_or_init(|| Regex::new(r"\{[{%#]").expect("static regex"))
}

/// Split source into segments with whitespace control applied.
pub(crate) fn tokenize(
    template: &str,
    source: &str,
    options: WhitespaceOptions,
) -> TemplateResult<Vec<Segment>> {
    let source = if options.keep_trailing_newline {
        source
    } else {
        source
            .strip_suffix("\r\n")
            .or_else(|| source.strip_suffix('\n'))
            .unwrap_or(source)
    };

    let raw = split(template, source)?;
    Ok(apply_whitespace(raw, options))
}

fn split(template: &str, source: &str) -> TemplateResult<Vec<Raw>> {
    let mut out = Vec::new();
    let mut pos = 0;
    let mut line = 1;

    while let Some(m) = opener().find_at(source, pos) {
        let start = m.start();
        if start > pos {
            let text = &source[pos..start];
            line += text.matches('\n').count();
            out.push(Raw::Text(text.to_string()));
        }

        let kind = match &source[start + 1..start + 2] {
            "{" => TagKind::Expr,
            "%" => TagKind::Block,
            _ => TagKind::Comment,
        };
        let close = match kind {
            TagKind::Expr => "}}",
            TagKind::Block => "%}",
            TagKind::Comment => "#}",
        };

        let mut inner_start = start + 2;
        let strip_before = source[inner_start..].starts_with('-');
        if strip_before {
            inner_start += 1;
        }

        let end = find_close(source, inner_start, close, kind).ok_or_else(|| {
            TemplateError::syntax(template, line, format!("unterminated tag, expected '{}'", close))
        })?;

        let mut inner_end = end;
        let strip_after = inner_end > inner_start && source[..inner_end].ends_with('-');
        if strip_after {
            inner_end -= 1;
        }

        let body = source[inner_start..inner_end].trim().to_string();
        out.push(Raw::Tag(RawTag {
            kind,
            body,
            line,
            strip_before,
            strip_after,
        }));

        line += source[start..end + 2].matches('\n').count();
        pos = end + 2;
    }

    if pos < source.len() {
        out.push(Raw::Text(source[pos..].to_string()));
    }
    Ok(out)
}

/// Find the closing delimiter, skipping quoted strings inside expressions.
fn find_close(source: &str, from: usize, close: &str, kind: TagKind) -> Option<usize> {
    if kind == TagKind::Comment {
        return source[from..].find(close).map(|i| from + i);
    }

    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => {
                if b == b'\'' || b == b'"' {
                    quote = Some(b);
                } else if bytes[i..].starts_with(close.as_bytes()) {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

fn apply_whitespace(raw: Vec<Raw>, options: WhitespaceOptions) -> Vec<Segment> {
    let mut texts: Vec<Option<String>> = Vec::with_capacity(raw.len());
    let mut tags: Vec<Option<RawTag>> = Vec::with_capacity(raw.len());
    for item in raw {
        match item {
            Raw::Text(t) => {
                texts.push(Some(t));
                tags.push(None);
            }
            Raw::Tag(tag) => {
                texts.push(None);
                tags.push(Some(tag));
            }
        }
    }

    for i in 0..tags.len() {
        let Some(tag) = &tags[i] else { continue };
        let is_block = tag.kind != TagKind::Expr;

        if i > 0 {
            if let Some(prev) = texts[i - 1].as_mut() {
                if tag.strip_before {
                    let trimmed = prev.trim_end().len();
                    prev.truncate(trimmed);
                } else if is_block && options.lstrip_blocks {
                    lstrip_line(prev, i - 1 == 0);
                }
            }
        }

        if let Some(Some(next)) = texts.get_mut(i + 1) {
            if tag.strip_after {
                *next = next.trim_start().to_string();
            } else if is_block && options.trim_blocks {
                if let Some(rest) = next.strip_prefix("\r\n").or_else(|| next.strip_prefix('\n')) {
                    *next = rest.to_string();
                }
            }
        }
    }

    texts
        .into_iter()
        .zip(tags)
        .filter_map(|pair| match pair {
            (Some(text), None) if !text.is_empty() => Some(Segment::Text(text)),
            (None, Some(tag)) => Some(Segment::Tag {
                kind: tag.kind,
                body: tag.body,
                line: tag.line,
            }),
            _ => None,
        })
        .collect()
}

/// Remove trailing spaces and tabs when they are all that precede a tag on
/// its line.
fn lstrip_line(text: &mut String, at_template_start: bool) {
    let tail_start = match text.rfind('\n') {
        Some(idx) => idx + 1,
        None if at_template_start => 0,
        None => return,
    };
    if text[tail_start..].chars().all(|c| c == ' ' || c == '\t') {
        text.truncate(tail_start);
    }
}

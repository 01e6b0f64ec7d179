//! Splitting markdown text into literal (code) and non-literal spans.
//!
//! Block code (fenced and indented) is located from comrak's source
//! positions. Inline code spans are found by scanning the remaining text for
//! matching backtick runs, the same way CommonMark pairs them.

use std::ops::Range;

use comrak::nodes::NodeValue;
use comrak::{Arena, Options, parse_document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Ordinary markdown text.
    Text,
    /// Code block or inline code; never rewritten or scanned.
    Literal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub range: Range<usize>,
}

impl Span {
    pub fn slice<'t>(&self, text: &'t str) -> &'t str {
        &text[self.range.clone()]
    }
}

/// Partition `text` into consecutive spans covering every byte exactly once.
pub fn partition(text: &str) -> Vec<Span> {
    let mut literal = code_block_ranges(text);

    let mut inline = Vec::new();
    let mut cursor = 0;
    for block in &literal {
        inline_code_ranges(&text[cursor..block.start], cursor, &mut inline);
        cursor = block.end;
    }
    inline_code_ranges(&text[cursor..], cursor, &mut inline);

    literal.extend(inline);
    literal.sort_by_key(|r| r.start);

    let mut spans = Vec::new();
    let mut pos = 0;
    for range in literal {
        if range.start > pos {
            spans.push(Span { kind: SpanKind::Text, range: pos..range.start });
        }
        match spans.last_mut() {
            Some(last) if last.kind == SpanKind::Literal && last.range.end >= range.start => {
                last.range.end = last.range.end.max(range.end);
            }
            _ => spans.push(Span { kind: SpanKind::Literal, range: range.start..range.end }),
        }
        pos = pos.max(range.end);
    }
    if pos < text.len() {
        spans.push(Span { kind: SpanKind::Text, range: pos..text.len() });
    }
    spans
}

/// Apply `f` to every non-literal span and keep literal spans verbatim.
pub fn rewrite_text_spans(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    for span in partition(text) {
        match span.kind {
            SpanKind::Text => out.push_str(&f(span.slice(text))),
            SpanKind::Literal => out.push_str(span.slice(text)),
        }
    }
    out
}

/// Byte ranges of whole lines covered by fenced or indented code blocks.
fn code_block_ranges(text: &str) -> Vec<Range<usize>> {
    let arena = Arena::new();
    let options = Options::default();
    let root = parse_document(&arena, text, &options);

    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect();
    let line_start = |line: usize| line_starts.get(line.saturating_sub(1)).copied();

    let mut ranges = Vec::new();
    for node in root.descendants() {
        let data = node.data.borrow();
        if let NodeValue::CodeBlock(_) = data.value {
            let Some(start) = line_start(data.sourcepos.start.line) else {
                continue;
            };
            let end = line_start(data.sourcepos.end.line + 1).unwrap_or(text.len()).min(text.len());
            if start < end {
                ranges.push(start..end);
            }
        }
    }
    ranges.sort_by_key(|r| r.start);
    ranges
}

/// Inline code spans in `text`, shifted by `offset`.
fn inline_code_ranges(text: &str, offset: usize, out: &mut Vec<Range<usize>>) {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        if start > 0 && bytes[start - 1] == b'\\' {
            continue;
        }
        if let Some(end) = closing_run(bytes, i, i - start) {
            out.push(offset + start..offset + end);
            i = end;
        }
    }
}

/// End of the next backtick run of exactly `run` ticks, without crossing a
/// blank line.
fn closing_run(bytes: &[u8], from: usize, run: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        match bytes[j] {
            b'`' => {
                let s = j;
                while j < bytes.len() && bytes[j] == b'`' {
                    j += 1;
                }
                if j - s == run {
                    return Some(j);
                }
            }
            b'\n' => {
                let rest = &bytes[j + 1..];
                let line_end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
                if rest[..line_end].iter().all(u8::is_ascii_whitespace) {
                    return None;
                }
                j += 1;
            }
            _ => j += 1,
        }
    }
    None
}

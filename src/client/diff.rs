//! Display diff between a block's current content and a proposal.
//!
//! Purely presentational: inputs are borrowed and never changed. Adjacent
//! changes of the same kind are merged so renderers get the fewest spans.

use similar::{ChangeTag, TextDiff};

/// Diff resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    #[default]
    Line,
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Added,
    Removed,
    Unchanged,
}

/// A run of text tagged with how it changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSpan {
    pub kind: SpanKind,
    pub text: String,
}

impl DiffSpan {
    fn new(kind: SpanKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }
}

/// Diff `current` (absent means empty) against `proposed`
pub fn compute(current: Option<&str>, proposed: &str, granularity: Granularity) -> Vec<DiffSpan> {
    let current = current.unwrap_or("");
    let diff = match granularity {
        Granularity::Line => TextDiff::from_lines(current, proposed),
        Granularity::Word => TextDiff::from_words(current, proposed),
    };

    let mut spans: Vec<DiffSpan> = Vec::new();
    for change in diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Insert => SpanKind::Added,
            ChangeTag::Delete => SpanKind::Removed,
            ChangeTag::Equal => SpanKind::Unchanged,
        };
        match spans.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(change.value()),
            _ => spans.push(DiffSpan::new(kind, change.value())),
        }
    }
    spans
}

/// Reassemble one side of a diff
pub fn side(spans: &[DiffSpan], proposed: bool) -> String {
    let skip = if proposed { SpanKind::Removed } else { SpanKind::Added };
    spans
        .iter()
        .filter(|span| span.kind != skip)
        .map(|span| span.text.as_str())
        .collect()
}

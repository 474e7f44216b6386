//! Property-based tests for display diffs

use proptest::prelude::*;
use structured_chat::client::diff::{compute, side};
use structured_chat::client::{Granularity, SpanKind};

fn text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof!["[a-c]{1,3}", Just(" ".to_string()), Just("\n".to_string())], 0..24)
        .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn test_sides_reassemble(current in text(), proposed in text(), words in any::<bool>()) {
        let granularity = if words { Granularity::Word } else { Granularity::Line };
        let spans = compute(Some(&current), &proposed, granularity);
        prop_assert_eq!(side(&spans, false), current);
        prop_assert_eq!(side(&spans, true), proposed);
    }

    #[test]
    fn test_adjacent_spans_differ(current in text(), proposed in text()) {
        let spans = compute(Some(&current), &proposed, Granularity::Word);
        for pair in spans.windows(2) {
            prop_assert_ne!(pair[0].kind, pair[1].kind);
        }
        prop_assert!(spans.iter().all(|s| !s.text.is_empty()));
    }

    #[test]
    fn test_identical_text_is_unchanged(current in text()) {
        let spans = compute(Some(&current), &current, Granularity::Line);
        prop_assert!(spans.iter().all(|s| s.kind == SpanKind::Unchanged));
    }
}

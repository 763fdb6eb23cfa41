use formstate::path::{Segment, array_ancestors, format_path, is_indexed_descendant, parse_path};
use proptest::prelude::*;

/// Strategy for well-formed segment lists starting with a key.
fn arb_segments() -> impl Strategy<Value = Vec<Segment>> {
    let key = "[a-z][a-z0-9_]{0,6}".prop_map(Segment::Key);
    let index = (0usize..50).prop_map(Segment::Index);
    (
        key.clone(),
        prop::collection::vec(prop_oneof![key, index], 0..6),
    )
        .prop_map(|(head, tail)| {
            let mut segments = vec![head];
            segments.extend(tail);
            segments
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn format_then_parse_is_identity(segments in arb_segments()) {
        let name = format_path(&segments);
        prop_assert_eq!(parse_path(&name), segments);
    }

    #[test]
    fn parse_never_panics_and_is_never_empty(name in "\\PC{0,40}") {
        let segments = parse_path(&name);
        prop_assert!(!segments.is_empty());
    }

    #[test]
    fn plain_names_are_single_segments(name in "[a-zA-Z_][a-zA-Z0-9_-]{0,12}") {
        prop_assert_eq!(parse_path(&name), vec![Segment::Key(name.clone())]);
    }

    #[test]
    fn non_numeric_brackets_stay_literal(key in "[a-z]{1,6}", inner in "[a-z]{1,4}") {
        let name = format!("{}[{}]", key, inner);
        prop_assert_eq!(parse_path(&name), vec![Segment::Key(name.clone())]);
    }

    #[test]
    fn ancestors_are_index_prefixes(segments in arb_segments()) {
        let ancestors = array_ancestors(&segments);
        for pair in ancestors.windows(2) {
            prop_assert!(pair[0].len() > pair[1].len(), "innermost first");
        }
        for ancestor in ancestors {
            prop_assert!(segments[ancestor.len()].is_index());
            prop_assert!(segments.starts_with(ancestor));
        }
    }

    #[test]
    fn descendants_follow_segments(
        container in "[a-z]{1,5}",
        suffix in "[a-z]{1,3}",
        index in 0usize..20,
    ) {
        let child = format!("{}[{}].x", container, index);
        prop_assert!(is_indexed_descendant(&container, &child));

        let lookalike = format!("{}{}[{}]", container, suffix, index);
        prop_assert!(!is_indexed_descendant(&container, &lookalike));
        prop_assert!(!is_indexed_descendant(&container, &container));
    }
}

fn k(key: &str) -> Segment {
    Segment::Key(key.to_string())
}

#[test]
fn parse_examples() {
    let cases = [
        ("a", vec![k("a")]),
        ("a.b[0].c", vec![k("a"), k("b"), Segment::Index(0), k("c")]),
        ("list[0][1]", vec![k("list"), Segment::Index(0), Segment::Index(1)]),
        (
            "addresses[2].street",
            vec![k("addresses"), Segment::Index(2), k("street")],
        ),
        ("a[x]", vec![k("a[x]")]),
        ("a[-1]", vec![k("a[-1]")]),
    ];
    for (name, expected) in cases {
        assert_eq!(parse_path(name), expected, "parse_path({:?})", name);
    }
}

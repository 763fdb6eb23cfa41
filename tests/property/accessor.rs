use formstate::accessor::{MAX_PADDING, get, get_or, merge, set};
use formstate::path::Segment;
use proptest::prelude::*;
use serde_json::{Map, Value, json};

/// Strategy for arbitrary JSON values nested up to `depth` levels.
fn arb_json(depth: u32) -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|i| json!(i)),
        "[a-z]{1,8}".prop_map(Value::String),
    ];

    leaf.prop_recursive(depth, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z][a-z0-9]{0,5}", inner), 1..5).prop_map(|pairs| {
                let map: Map<String, Value> = pairs.into_iter().collect();
                Value::Object(map)
            }),
        ]
    })
}

fn arb_path() -> impl Strategy<Value = Vec<Segment>> {
    prop::collection::vec(
        prop_oneof![
            "[a-z]{1,4}".prop_map(Segment::Key),
            (0usize..5).prop_map(Segment::Index),
        ],
        0..5,
    )
}

/// Paths whose indices range over all of `usize`.
fn arb_wide_path() -> impl Strategy<Value = Vec<Segment>> {
    prop::collection::vec(
        prop_oneof![
            "[a-z]{1,4}".prop_map(Segment::Key),
            (0usize..5).prop_map(Segment::Index),
            any::<usize>().prop_map(Segment::Index),
            Just(Segment::Index(usize::MAX)),
        ],
        1..5,
    )
}

/// Number of array slots anywhere in `value`.
fn slots(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len() + items.iter().map(slots).sum::<usize>(),
        Value::Object(map) => map.values().map(slots).sum(),
        _ => 0,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn set_with_any_index_stays_small(
        container in arb_json(2),
        path in arb_wide_path(),
        value in arb_json(1),
    ) {
        let written = set(&container, &path, value.clone());
        prop_assert_eq!(get(&written, &path), Some(&value));
        let budget = slots(&container) + slots(&value) + path.len() * (MAX_PADDING + 1);
        prop_assert!(slots(&written) <= budget);
    }

    #[test]
    fn set_then_get_returns_value(
        container in arb_json(3),
        path in arb_path(),
        value in arb_json(2),
    ) {
        let written = set(&container, &path, value.clone());
        prop_assert_eq!(get(&written, &path), Some(&value));
    }

    #[test]
    fn set_leaves_input_untouched(
        container in arb_json(3),
        path in arb_path(),
        value in arb_json(1),
    ) {
        let before = container.clone();
        let _ = set(&container, &path, value);
        prop_assert_eq!(container, before);
    }

    #[test]
    fn empty_path_returns_root(value in arb_json(3)) {
        prop_assert_eq!(get(&value, &[]), Some(&value));
    }

    #[test]
    fn merge_keeps_other_keys(
        a in any::<i64>(),
        b in any::<i64>(),
        c in any::<i64>(),
    ) {
        let container = json!({ "user": { "a": a, "b": b } });
        let mut partial = Map::new();
        partial.insert("b".to_string(), json!(c));

        let merged = merge(&container, &[Segment::from("user")], &partial);
        prop_assert_eq!(merged, json!({ "user": { "a": a, "b": c } }));
        prop_assert_eq!(container, json!({ "user": { "a": a, "b": b } }));
    }
}

#[test]
fn set_creates_intermediates_by_segment_kind() {
    let path = vec![Segment::from("a"), Segment::Index(1), Segment::from("b")];
    let written = set(&json!({}), &path, json!("x"));
    assert_eq!(written, json!({ "a": [null, { "b": "x" }] }));
}

#[test]
fn far_out_index_turns_list_into_map() {
    let list = json!(["a", "b"]);
    let near = set(&list, &[Segment::Index(MAX_PADDING + 1)], json!("z"));
    assert_eq!(near.as_array().map(Vec::len), Some(MAX_PADDING + 2));

    let far = set(&list, &[Segment::Index(MAX_PADDING + 2)], json!("z"));
    let mut expected = Map::new();
    expected.insert("0".to_string(), json!("a"));
    expected.insert("1".to_string(), json!("b"));
    expected.insert((MAX_PADDING + 2).to_string(), json!("z"));
    assert_eq!(far, Value::Object(expected));

    let top = set(&json!(null), &[Segment::Index(usize::MAX), Segment::from("k")], json!(1));
    assert_eq!(get(&top, &[Segment::Index(usize::MAX), Segment::from("k")]), Some(&json!(1)));
}

#[test]
fn get_or_falls_back() {
    let path = vec![Segment::from("missing")];
    assert_eq!(get_or(&json!({}), &path, json!(3)), json!(3));
    assert_eq!(get(&json!({ "0": "k" }), &[Segment::Index(0)]), Some(&json!("k")));
}

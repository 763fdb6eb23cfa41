use formstate::{Action, FormConfig, FormError, FormReducer, InputConfig, InputState, RootState};
use serde_json::{Value, json};
use std::sync::Arc;

fn run(actions: &[Action]) -> Arc<RootState> {
    FormReducer::default()
        .replay(&Arc::new(RootState::new()), actions)
        .expect("transitions should succeed")
}

fn input<'a>(state: &'a RootState, name: &str) -> &'a InputState {
    state
        .form("f")
        .and_then(|f| f.input(name))
        .unwrap_or_else(|| panic!("input {} should be registered", name))
}

fn array(name: &str, items: Value) -> Action {
    Action::register_input("f", name, InputConfig::new().array(), Some(items), None)
}

fn form_valid(state: &RootState) -> bool {
    state.form("f").map(|f| f.valid).unwrap_or(false)
}

fn setup(actions: &[Action]) -> Arc<RootState> {
    let mut all = vec![Action::register_form("f", FormConfig::default())];
    all.extend_from_slice(actions);
    run(&all)
}

// ─── Container mutations ────────────────────────────────────────────────────

#[test]
fn list_operations() {
    let reducer = FormReducer::default();
    let state = setup(&[array("list", json!(["b", "c"]))]);

    let steps: Vec<(Action, Value)> = vec![
        (Action::array_push("f", "list", json!("d")), json!(["b", "c", "d"])),
        (Action::array_unshift("f", "list", json!("a")), json!(["a", "b", "c", "d"])),
        (Action::array_pop("f", "list"), json!(["a", "b", "c"])),
        (Action::array_shift("f", "list"), json!(["b", "c"])),
        (Action::array_insert("f", "list", 1, json!("x")), json!(["b", "x", "c"])),
        (Action::array_insert("f", "list", 3, json!("end")), json!(["b", "x", "c", "end"])),
        (Action::array_remove("f", "list", 0), json!(["x", "c", "end"])),
        (Action::array_remove_all("f", "list"), json!([])),
    ];

    let mut current = state;
    for (action, expected) in steps {
        current = reducer.reduce(&current, &action).unwrap();
        let items = input(&current, "list").items().unwrap().to_vec();
        assert_eq!(
            Value::Array(items),
            expected,
            "after {}",
            action.action_type()
        );
    }

    let list = input(&current, "list");
    assert!(!list.pristine);
    assert!(list.dirty);
}

#[test]
fn pop_and_shift_on_empty_list_change_nothing() {
    let reducer = FormReducer::default();
    let state = setup(&[array("list", json!([]))]);

    for action in [Action::array_pop("f", "list"), Action::array_shift("f", "list")] {
        let next = reducer.reduce(&state, &action).unwrap();
        assert!(Arc::ptr_eq(&state, &next), "{}", action.action_type());
    }
}

#[test]
fn array_actions_require_an_array_input() {
    let reducer = FormReducer::default();
    let state = setup(&[Action::register_input(
        "f",
        "scalar",
        InputConfig::new(),
        None,
        None,
    )]);

    for name in ["scalar", "missing"] {
        let err = reducer
            .reduce(&state, &Action::array_push("f", name, json!(1)))
            .unwrap_err();
        assert_eq!(
            err,
            FormError::NotAnArray {
                name: name.to_string()
            }
        );
    }
}

#[test]
fn invalid_indices_are_rejected() {
    let reducer = FormReducer::default();
    let state = setup(&[array("list", json!(["a", "b"]))]);

    let err = reducer
        .reduce(&state, &Action::array_remove("f", "list", 5))
        .unwrap_err();
    assert_eq!(
        err,
        FormError::IndexOutOfRange {
            name: "list".to_string(),
            index: 5,
            len: 2
        }
    );
    assert_eq!(input(&state, "list").items().unwrap().len(), 2);

    let err = reducer
        .reduce(&state, &Action::array_remove("f", "list", 2))
        .unwrap_err();
    assert!(matches!(err, FormError::IndexOutOfRange { .. }));

    let err = reducer
        .reduce(&state, &Action::array_insert("f", "list", 3, json!("z")))
        .unwrap_err();
    assert!(matches!(err, FormError::IndexOutOfRange { .. }));

    let err = reducer
        .reduce(&state, &Action::array_insert("f", "list", -1, json!("z")))
        .unwrap_err();
    assert_eq!(
        err,
        FormError::NegativeIndex {
            name: "list".to_string(),
            index: -1
        }
    );
}

#[test]
fn change_on_container_requires_a_list() {
    let reducer = FormReducer::default();
    let state = setup(&[array("list", json!(["a"]))]);

    let replaced = reducer
        .reduce(&state, &Action::input_change("f", false, "list", Some(json!(["x", "y"]))))
        .unwrap();
    assert_eq!(input(&replaced, "list").items().unwrap(), &[json!("x"), json!("y")]);

    let err = reducer
        .reduce(&state, &Action::input_change("f", false, "list", Some(json!("x"))))
        .unwrap_err();
    assert!(matches!(err, FormError::NotAnArray { .. }));
}

// ─── Container synchronization ──────────────────────────────────────────────

#[test]
fn required_container_is_invalid_until_pushed() {
    let reducer = FormReducer::default();
    let state = setup(&[Action::register_input(
        "f",
        "list",
        InputConfig::new().array().required(),
        None,
        None,
    )]);
    assert!(!input(&state, "list").valid);
    assert_eq!(input(&state, "list").errors, Some(vec!["required".to_string()]));
    assert!(!form_valid(&state));

    let pushed = reducer
        .reduce(&state, &Action::array_push("f", "list", json!({})))
        .unwrap();
    assert!(input(&pushed, "list").valid);
    assert_eq!(input(&pushed, "list").errors, None);
    assert!(form_valid(&pushed));
}

#[test]
fn invalid_descendant_keeps_container_invalid() {
    let reducer = FormReducer::default();
    let state = setup(&[
        Action::register_input("f", "list", InputConfig::new().array().required(), None, None),
        Action::register_input("f", "list[0].name", InputConfig::new().required(), None, None),
        Action::array_push("f", "list", json!({})),
    ]);

    let list = input(&state, "list");
    assert_eq!(list.errors, None, "own validators pass");
    assert!(!list.valid, "descendant list[0].name is still empty");

    let named = reducer
        .reduce(
            &state,
            &Action::input_change("f", false, "list[0].name", Some(json!("Ada"))),
        )
        .unwrap();
    let list = input(&named, "list");
    assert!(list.valid);
    assert_eq!(list.items().unwrap(), &[json!({ "name": "Ada" })]);
    assert!(form_valid(&named));
}

#[test]
fn descendants_past_the_end_are_ignored() {
    let state = setup(&[
        array("list", json!([])),
        Action::register_input("f", "list[0]", InputConfig::new().required(), None, None),
    ]);

    assert!(!input(&state, "list[0]").valid);
    assert!(input(&state, "list").valid);
    assert!(!form_valid(&state));
}

#[test]
fn descendants_match_by_segment_not_by_string_prefix() {
    let state = setup(&[
        array("addr", json!(["x"])),
        Action::register_input("f", "address[0]", InputConfig::new().required(), None, None),
    ]);
    assert!(input(&state, "addr").valid);

    let reducer = FormReducer::default();
    let next = reducer
        .reduce(
            &state,
            &Action::register_input("f", "addr[0]", InputConfig::new().required(), None, None),
        )
        .unwrap();
    assert!(!input(&next, "addr").valid);
}

#[test]
fn touched_descendant_touches_container() {
    let state = setup(&[
        array("list", json!(["a"])),
        Action::register_input("f", "list[0]", InputConfig::new(), None, None),
        Action::input_blur("f", true, "list[0]"),
    ]);

    let list = input(&state, "list");
    assert!(list.touched);
    assert!(list.pristine);
}

#[test]
fn removing_descendant_resyncs_container() {
    let reducer = FormReducer::default();
    let state = setup(&[
        array("list", json!([{}])),
        Action::register_input("f", "list[0].name", InputConfig::new().required(), None, None),
    ]);
    assert!(!input(&state, "list").valid);

    let next = reducer
        .reduce(&state, &Action::remove_input("f", "list[0].name"))
        .unwrap();
    assert!(input(&next, "list").valid);
    assert!(form_valid(&next));
}

#[test]
fn nested_containers_converge_bottom_up() {
    let reducer = FormReducer::default();
    let state = setup(&[
        array("groups", json!([{ "members": [] }])),
        Action::register_input(
            "f",
            "groups[0].members",
            InputConfig::new().array().required(),
            None,
            None,
        ),
    ]);
    assert!(!input(&state, "groups[0].members").valid);
    assert!(!input(&state, "groups").valid);

    let next = reducer
        .reduce(&state, &Action::array_push("f", "groups[0].members", json!("ada")))
        .unwrap();
    assert!(input(&next, "groups[0].members").valid);

    let groups = input(&next, "groups");
    assert!(groups.valid);
    assert!(!groups.pristine);
    assert!(groups.dirty);
    assert_eq!(groups.items().unwrap(), &[json!({ "members": ["ada"] })]);

    assert_eq!(
        next.form("f").unwrap().values(),
        json!({ "groups": [{ "members": ["ada"] }] })
    );
}

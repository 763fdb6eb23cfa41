use formstate::{Action, FormConfig, FormReducer, InputConfig, Meta, RootState};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

/// One generated field: whether it is required, the value typed into it,
/// and whether the change carried touch.
#[derive(Clone, Debug)]
struct Field {
    required: bool,
    value: Option<String>,
    touch: bool,
}

fn arb_field() -> impl Strategy<Value = Field> {
    (any::<bool>(), prop::option::of("[a-z]{0,3}"), any::<bool>()).prop_map(
        |(required, value, touch)| Field {
            required,
            value,
            touch,
        },
    )
}

fn script(fields: &[Field]) -> Vec<Action> {
    let mut actions = vec![Action::register_form("f", FormConfig::default())];
    for (i, field) in fields.iter().enumerate() {
        let config = if field.required {
            InputConfig::new().required()
        } else {
            InputConfig::new()
        };
        actions.push(Action::register_input("f", &format!("field{}", i), config, None, None));
    }
    for (i, field) in fields.iter().enumerate() {
        if let Some(value) = &field.value {
            actions.push(Action::input_change(
                "f",
                field.touch,
                &format!("field{}", i),
                Some(json!(value)),
            ));
        }
    }
    actions
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn form_flags_aggregate_inputs(fields in prop::collection::vec(arb_field(), 0..8)) {
        let state = FormReducer::default()
            .replay(&Arc::new(RootState::new()), &script(&fields))
            .unwrap();
        let form = state.form("f").unwrap();

        prop_assert_eq!(form.inputs.len(), fields.len());
        prop_assert_eq!(form.valid, form.inputs.values().all(|i| i.valid));
        prop_assert_eq!(form.pristine, form.inputs.values().all(|i| i.pristine));
        prop_assert_eq!(form.touched, form.inputs.values().any(|i| i.touched));

        let expected_valid = fields
            .iter()
            .all(|f| !f.required || f.value.as_deref().is_some_and(|v| !v.is_empty()));
        prop_assert_eq!(form.valid, expected_valid);

        for (i, field) in fields.iter().enumerate() {
            let input = form.input(&format!("field{}", i)).unwrap();
            prop_assert_eq!(input.dirty, field.value.is_some());
            prop_assert_eq!(input.pristine, !input.dirty);
        }
    }

    #[test]
    fn foreign_actions_are_identity(
        fields in prop::collection::vec(arb_field(), 0..4),
        action_type in "\\PC{0,24}",
        form in prop::option::of("[a-z]{1,3}"),
    ) {
        let reducer = FormReducer::default();
        let state = reducer
            .replay(&Arc::new(RootState::new()), &script(&fields))
            .unwrap();

        let meta = Meta { form, name: None, touch: false };
        let next = reducer.reduce(&state, &Action::foreign(&action_type, meta)).unwrap();
        prop_assert!(Arc::ptr_eq(&state, &next));
    }

    #[test]
    fn failed_transitions_leave_state_untouched(index in 2i64..100) {
        let reducer = FormReducer::default();
        let state = reducer
            .replay(
                &Arc::new(RootState::new()),
                &[
                    Action::register_form("f", FormConfig::default()),
                    Action::register_input("f", "list", InputConfig::new().array(), Some(json!([1, 2])), None),
                ],
            )
            .unwrap();
        let before = RootState::clone(&state);

        prop_assert!(reducer.reduce(&state, &Action::array_remove("f", "list", index)).is_err());
        prop_assert_eq!(&*state, &before);
    }
}

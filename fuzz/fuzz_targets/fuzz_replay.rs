#![no_main]

use formstate::{FormReducer, RootState, parse_actions};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);

    let actions = match parse_actions(&s) {
        Ok(a) => a,
        Err(_) => return,
    };

    // Transitions may fail on bad payloads but must never panic.
    let reducer = FormReducer::default();
    let mut state = Arc::new(RootState::new());
    for action in &actions {
        if let Ok(next) = reducer.reduce(&state, action) {
            state = next;
        }
    }

    // SubmitSuccess forces `valid` until the next input-affecting action.
    for (_, form) in state.forms() {
        if !form.submit_success {
            assert_eq!(form.valid, form.inputs.values().all(|i| i.valid));
        }
    }
});

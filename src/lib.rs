//! Deterministic, immutable state-transition engine for multi-field forms.
//!
//! Every registered form keeps per-field values, validation results,
//! interaction flags, async-validation state and submission status. Actions
//! are applied by a pure reducer that returns a new snapshot:
//!
//! ```text
//! (Arc<RootState>, Action) → FormReducer::reduce → Arc<RootState>
//! ```
//!
//! A transition that changes nothing returns the very same `Arc`, so callers
//! can detect no-ops with [`Arc::ptr_eq`](std::sync::Arc::ptr_eq).
//!
//! # Quick Start
//!
//! ```rust
//! use formstate::{Action, FormConfig, FormReducer, InputConfig, RootState};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let reducer = FormReducer::default();
//! let state = Arc::new(RootState::new());
//!
//! let state = reducer
//!     .replay(
//!         &state,
//!         &[
//!             Action::register_form("signup", FormConfig::default()),
//!             Action::register_input("signup", "email", InputConfig::new().required(), None, None),
//!             Action::input_change("signup", false, "email", Some(json!("a@b.c"))),
//!         ],
//!     )
//!     .expect("valid transitions");
//!
//! let form = state.form("signup").expect("registered");
//! assert!(form.valid);
//! assert_eq!(form.values(), json!({ "email": "a@b.c" }));
//! ```
//!
//! # Feature Flags
//!
//! | Feature    | Default | Description |
//! |------------|---------|-------------|
//! | `cel-eval` | yes     | CEL expression schemas via the [`cel`] crate. Enables [`validators::CelSchema`]. |

pub mod accessor;
pub mod action;
pub mod error;
pub mod parse;
pub mod path;
pub mod reducer;
pub mod serialize;
pub mod state;
pub mod validators;

pub use action::{
    Action, ActionKind, ActionType, FormConfig, InputConfig, InputRegistration, Meta,
};
pub use error::*;
pub use reducer::FormReducer;
pub use state::{FormState, InputKind, InputState, RootState};
pub use validators::{Validator, ValidatorRef, ValidatorRegistry};

pub use parse::{parse_action, parse_actions, parse_validators};

use std::sync::Arc;

/// Applies `action` with a reducer holding only the built-in validators.
///
/// Use a configured [`FormReducer`] when inputs reference custom validators.
pub fn reduce(state: &Arc<RootState>, action: &Action) -> Result<Arc<RootState>, FormError> {
    FormReducer::default().reduce(state, action)
}

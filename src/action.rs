//! Action vocabulary.
//!
//! Every action the reducer understands has a type string carrying the
//! reserved [`PREFIX`]. Anything else is represented as
//! [`ActionKind::Foreign`] and passes through the reducer untouched.

use crate::validators::{REQUIRED, ValidatorRef};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Reserved prefix shared by every form action type.
pub const PREFIX: &str = "@@mrf";

/// Known action types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionType {
    RegisterForm,
    RemoveForm,
    RegisterInput,
    RemoveInput,
    InputChange,
    InputBlur,
    Submitting,
    SubmitSuccess,
    SubmitError,
    AsyncValidateStart,
    AsyncValidateFinished,
    ArrayPush,
    ArrayPop,
    ArrayShift,
    ArrayUnshift,
    ArrayInsert,
    ArrayRemove,
    ArrayRemoveAll,
}

impl ActionType {
    pub const ALL: [ActionType; 18] = [
        ActionType::RegisterForm,
        ActionType::RemoveForm,
        ActionType::RegisterInput,
        ActionType::RemoveInput,
        ActionType::InputChange,
        ActionType::InputBlur,
        ActionType::Submitting,
        ActionType::SubmitSuccess,
        ActionType::SubmitError,
        ActionType::AsyncValidateStart,
        ActionType::AsyncValidateFinished,
        ActionType::ArrayPush,
        ActionType::ArrayPop,
        ActionType::ArrayShift,
        ActionType::ArrayUnshift,
        ActionType::ArrayInsert,
        ActionType::ArrayRemove,
        ActionType::ArrayRemoveAll,
    ];

    /// The full, prefixed type string.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::RegisterForm => "@@mrf/REGISTER_FORM",
            ActionType::RemoveForm => "@@mrf/REMOVE_FORM",
            ActionType::RegisterInput => "@@mrf/REGISTER_INPUT",
            ActionType::RemoveInput => "@@mrf/REMOVE_INPUT",
            ActionType::InputChange => "@@mrf/INPUT_CHANGE",
            ActionType::InputBlur => "@@mrf/INPUT_BLUR",
            ActionType::Submitting => "@@mrf/SUBMITTING",
            ActionType::SubmitSuccess => "@@mrf/SUBMIT_SUCCESS",
            ActionType::SubmitError => "@@mrf/SUBMIT_ERROR",
            ActionType::AsyncValidateStart => "@@mrf/ASYNC_VALIDATE_START",
            ActionType::AsyncValidateFinished => "@@mrf/ASYNC_VALIDATE_FINISHED",
            ActionType::ArrayPush => "@@mrf/ARRAY_PUSH",
            ActionType::ArrayPop => "@@mrf/ARRAY_POP",
            ActionType::ArrayShift => "@@mrf/ARRAY_SHIFT",
            ActionType::ArrayUnshift => "@@mrf/ARRAY_UNSHIFT",
            ActionType::ArrayInsert => "@@mrf/ARRAY_INSERT",
            ActionType::ArrayRemove => "@@mrf/ARRAY_REMOVE",
            ActionType::ArrayRemoveAll => "@@mrf/ARRAY_REMOVE_ALL",
        }
    }

    /// Looks up a prefixed type string.
    pub fn from_type(action_type: &str) -> Option<ActionType> {
        ActionType::ALL
            .into_iter()
            .find(|t| t.as_str() == action_type)
    }
}

/// Whether `action_type` carries the reserved prefix.
pub fn is_form_action_type(action_type: &str) -> bool {
    action_type.len() > PREFIX.len() && action_type.starts_with(PREFIX)
}

// ─── Meta and payloads ──────────────────────────────────────────────────────

/// Routing information of an action.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Target form. Actions without it are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    /// Target input, for input-level actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the action marks its input touched. `null` reads as `false`.
    #[serde(default, deserialize_with = "null_as_false")]
    pub touch: bool,
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl Meta {
    pub fn form(form: impl Into<String>) -> Self {
        Meta {
            form: Some(form.into()),
            ..Default::default()
        }
    }

    pub fn input(form: impl Into<String>, name: impl Into<String>) -> Self {
        Meta {
            form: Some(form.into()),
            name: Some(name.into()),
            touch: false,
        }
    }

    pub fn touched(mut self, touch: bool) -> Self {
        self.touch = touch;
        self
    }
}

/// Payload of `RegisterForm`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_values: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_form_errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_input_errors: Option<Value>,
}

/// Per-input configuration given at registration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputConfig {
    /// Prepends the `required` validator.
    pub required: bool,
    /// Registers an array container instead of a scalar input.
    pub is_array: bool,
    pub validate: Vec<ValidatorRef>,
}

impl InputConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn validator(mut self, validator: ValidatorRef) -> Self {
        self.validate.push(validator);
        self
    }

    /// The effective validator list: `required` first when requested.
    pub(crate) fn validators(&self) -> Vec<ValidatorRef> {
        let mut validators = Vec::with_capacity(self.validate.len() + 1);
        if self.required {
            validators.push(ValidatorRef::Named(REQUIRED.to_string()));
        }
        validators.extend(self.validate.iter().cloned());
        validators
    }
}

/// Payload of `RegisterInput`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputRegistration {
    pub name: String,
    pub config: InputConfig,
    pub initial_value: Option<Value>,
    pub initial_errors: Option<Vec<String>>,
}

// ─── Action ─────────────────────────────────────────────────────────────────

/// What an action does, with its payload.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionKind {
    RegisterForm(FormConfig),
    RemoveForm,
    RegisterInput(InputRegistration),
    RemoveInput { name: String },
    /// Input name and touch flag travel in [`Meta`].
    InputChange { value: Option<Value> },
    InputBlur,
    Submitting,
    SubmitSuccess,
    SubmitError { error: Option<Value> },
    AsyncValidateStart,
    /// `errors` maps input names to a string or a list of strings.
    AsyncValidateFinished { errors: Option<Value> },
    ArrayPush { value: Value },
    ArrayPop,
    ArrayShift,
    ArrayUnshift { value: Value },
    ArrayInsert { index: i64, value: Value },
    ArrayRemove { index: i64 },
    ArrayRemoveAll,
    /// An action from another part of the host application.
    Foreign { action_type: String },
}

impl ActionKind {
    pub fn action_type(&self) -> Option<ActionType> {
        Some(match self {
            ActionKind::RegisterForm(_) => ActionType::RegisterForm,
            ActionKind::RemoveForm => ActionType::RemoveForm,
            ActionKind::RegisterInput(_) => ActionType::RegisterInput,
            ActionKind::RemoveInput { .. } => ActionType::RemoveInput,
            ActionKind::InputChange { .. } => ActionType::InputChange,
            ActionKind::InputBlur => ActionType::InputBlur,
            ActionKind::Submitting => ActionType::Submitting,
            ActionKind::SubmitSuccess => ActionType::SubmitSuccess,
            ActionKind::SubmitError { .. } => ActionType::SubmitError,
            ActionKind::AsyncValidateStart => ActionType::AsyncValidateStart,
            ActionKind::AsyncValidateFinished { .. } => ActionType::AsyncValidateFinished,
            ActionKind::ArrayPush { .. } => ActionType::ArrayPush,
            ActionKind::ArrayPop => ActionType::ArrayPop,
            ActionKind::ArrayShift => ActionType::ArrayShift,
            ActionKind::ArrayUnshift { .. } => ActionType::ArrayUnshift,
            ActionKind::ArrayInsert { .. } => ActionType::ArrayInsert,
            ActionKind::ArrayRemove { .. } => ActionType::ArrayRemove,
            ActionKind::ArrayRemoveAll => ActionType::ArrayRemoveAll,
            ActionKind::Foreign { .. } => return None,
        })
    }
}

/// A dispatched event.
#[derive(Clone, Debug, PartialEq)]
pub struct Action {
    pub meta: Meta,
    pub kind: ActionKind,
}

impl Action {
    pub fn new(meta: Meta, kind: ActionKind) -> Self {
        Action { meta, kind }
    }

    /// The wire type string.
    pub fn action_type(&self) -> &str {
        match &self.kind {
            ActionKind::Foreign { action_type } => action_type,
            kind => kind.action_type().map(ActionType::as_str).unwrap_or_default(),
        }
    }

    pub fn register_form(form: &str, config: FormConfig) -> Self {
        Action::new(Meta::form(form), ActionKind::RegisterForm(config))
    }

    pub fn remove_form(form: &str) -> Self {
        Action::new(Meta::form(form), ActionKind::RemoveForm)
    }

    pub fn register_input(
        form: &str,
        name: &str,
        config: InputConfig,
        initial_value: Option<Value>,
        initial_errors: Option<Vec<String>>,
    ) -> Self {
        Action::new(
            Meta::form(form),
            ActionKind::RegisterInput(InputRegistration {
                name: name.to_string(),
                config,
                initial_value,
                initial_errors,
            }),
        )
    }

    pub fn remove_input(form: &str, name: &str) -> Self {
        Action::new(
            Meta::form(form),
            ActionKind::RemoveInput {
                name: name.to_string(),
            },
        )
    }

    pub fn input_change(form: &str, touch: bool, name: &str, value: Option<Value>) -> Self {
        Action::new(
            Meta::input(form, name).touched(touch),
            ActionKind::InputChange { value },
        )
    }

    pub fn input_blur(form: &str, touch: bool, name: &str) -> Self {
        Action::new(Meta::input(form, name).touched(touch), ActionKind::InputBlur)
    }

    pub fn submitting(form: &str) -> Self {
        Action::new(Meta::form(form), ActionKind::Submitting)
    }

    pub fn submit_success(form: &str) -> Self {
        Action::new(Meta::form(form), ActionKind::SubmitSuccess)
    }

    pub fn submit_error(form: &str, error: Option<Value>) -> Self {
        Action::new(Meta::form(form), ActionKind::SubmitError { error })
    }

    pub fn async_validate_start(form: &str, name: Option<&str>) -> Self {
        let meta = Meta {
            name: name.map(str::to_string),
            ..Meta::form(form)
        };
        Action::new(meta, ActionKind::AsyncValidateStart)
    }

    pub fn async_validate_finished(form: &str, name: Option<&str>, errors: Option<Value>) -> Self {
        let meta = Meta {
            name: name.map(str::to_string),
            ..Meta::form(form)
        };
        Action::new(meta, ActionKind::AsyncValidateFinished { errors })
    }

    pub fn array_push(form: &str, name: &str, value: Value) -> Self {
        Action::new(Meta::input(form, name), ActionKind::ArrayPush { value })
    }

    pub fn array_pop(form: &str, name: &str) -> Self {
        Action::new(Meta::input(form, name), ActionKind::ArrayPop)
    }

    pub fn array_shift(form: &str, name: &str) -> Self {
        Action::new(Meta::input(form, name), ActionKind::ArrayShift)
    }

    pub fn array_unshift(form: &str, name: &str, value: Value) -> Self {
        Action::new(Meta::input(form, name), ActionKind::ArrayUnshift { value })
    }

    pub fn array_insert(form: &str, name: &str, index: i64, value: Value) -> Self {
        Action::new(
            Meta::input(form, name),
            ActionKind::ArrayInsert { index, value },
        )
    }

    pub fn array_remove(form: &str, name: &str, index: i64) -> Self {
        Action::new(Meta::input(form, name), ActionKind::ArrayRemove { index })
    }

    pub fn array_remove_all(form: &str, name: &str) -> Self {
        Action::new(Meta::input(form, name), ActionKind::ArrayRemoveAll)
    }

    pub fn foreign(action_type: &str, meta: Meta) -> Self {
        Action::new(
            meta,
            ActionKind::Foreign {
                action_type: action_type.to_string(),
            },
        )
    }
}

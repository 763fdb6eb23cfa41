//! Immutable form state snapshots.
//!
//! Snapshots share structure through [`Arc`]: a transition copies only the
//! path from the root to what it changed, and every untouched form and input
//! keeps its previous allocation.

use crate::accessor;
use crate::validators::ValidatorRef;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

// ─── RootState ──────────────────────────────────────────────────────────────

/// All registered forms, keyed by form identifier.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RootState {
    pub(crate) forms: BTreeMap<String, Arc<FormState>>,
}

impl RootState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(&self, form: &str) -> Option<&FormState> {
        self.forms.get(form).map(Arc::as_ref)
    }

    /// The shared handle of a form, for identity comparisons across snapshots.
    pub fn form_handle(&self, form: &str) -> Option<&Arc<FormState>> {
        self.forms.get(form)
    }

    pub fn forms(&self) -> impl Iterator<Item = (&str, &FormState)> {
        self.forms.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

// ─── FormState ──────────────────────────────────────────────────────────────

/// State of one form.
///
/// `valid`, `pristine` and `touched` are derived from the inputs and are
/// recomputed by the reducer after every input-affecting transition.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub pristine: bool,
    pub valid: bool,
    pub touched: bool,
    pub submitting: bool,
    pub submitted: bool,
    pub submit_success: bool,
    /// `None` until the first async validation starts.
    pub async_validation: Option<bool>,
    pub initial_values: Value,
    pub initial_form_errors: Option<Vec<String>>,
    /// Either a list of errors or a map of `input name -> errors`.
    pub initial_input_errors: Option<Value>,
    pub submit_error: bool,
    pub submit_error_messages: Option<Vec<String>>,
    pub inputs: BTreeMap<String, Arc<InputState>>,
}

impl Default for FormState {
    fn default() -> Self {
        FormState {
            pristine: true,
            valid: true,
            touched: false,
            submitting: false,
            submitted: false,
            submit_success: false,
            async_validation: None,
            initial_values: Value::Object(Map::new()),
            initial_form_errors: None,
            initial_input_errors: None,
            submit_error: false,
            submit_error_messages: None,
            inputs: BTreeMap::new(),
        }
    }
}

impl FormState {
    pub fn input(&self, name: &str) -> Option<&InputState> {
        self.inputs.get(name).map(Arc::as_ref)
    }

    /// Nested values of the form, built from its inputs.
    ///
    /// See [`accessor::form_values`].
    pub fn values(&self) -> Value {
        accessor::form_values(self)
    }
}

// ─── InputState ─────────────────────────────────────────────────────────────

/// What an input holds: a single value or a repeating group.
#[derive(Clone, Debug, PartialEq)]
pub enum InputKind {
    /// `None` is "unset", distinct from an empty string.
    Scalar { value: Option<Value> },
    Array { items: Vec<Value> },
}

impl Serialize for InputKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            InputKind::Scalar { value } => {
                map.serialize_entry("isArray", &false)?;
                map.serialize_entry("value", value)?;
            }
            InputKind::Array { items } => {
                map.serialize_entry("isArray", &true)?;
                map.serialize_entry("items", items)?;
            }
        }
        map.end()
    }
}

/// State of one field.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputState {
    pub name: String,
    #[serde(flatten)]
    pub kind: InputKind,
    pub pristine: bool,
    pub dirty: bool,
    pub touched: bool,
    pub valid: bool,
    /// Failure tokens of the last synchronous validation, `None` when it passed.
    pub errors: Option<Vec<String>>,
    pub validate: Vec<ValidatorRef>,
    pub async_validation: bool,
    pub async_errors: Vec<String>,
    pub initial_errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<Value>,
}

impl InputState {
    pub(crate) fn new(
        name: &str,
        kind: InputKind,
        validate: Vec<ValidatorRef>,
        initial_value: Option<Value>,
        initial_errors: Option<Vec<String>>,
    ) -> Self {
        InputState {
            name: name.to_string(),
            kind,
            pristine: true,
            dirty: false,
            touched: false,
            valid: true,
            errors: None,
            validate,
            async_validation: false,
            async_errors: Vec::new(),
            initial_errors,
            initial_value,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, InputKind::Array { .. })
    }

    /// The stored value of a scalar input; `None` for unset and for arrays.
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            InputKind::Scalar { value } => value.as_ref(),
            InputKind::Array { .. } => None,
        }
    }

    pub fn items(&self) -> Option<&[Value]> {
        match &self.kind {
            InputKind::Array { items } => Some(items),
            InputKind::Scalar { .. } => None,
        }
    }

    /// The value validators run against: the stored value, or the item list
    /// of an array container.
    pub fn validation_value(&self) -> Option<Value> {
        match &self.kind {
            InputKind::Scalar { value } => value.clone(),
            InputKind::Array { items } => Some(Value::Array(items.clone())),
        }
    }

    pub fn has_initial_value(&self) -> bool {
        self.initial_value.is_some()
    }
}

//! The state-transition engine.
//!
//! [`FormReducer::reduce`] routes an action to the form named in its meta,
//! applies the transition to a working copy of that form, and returns the
//! new root snapshot. When the transition leaves the form structurally equal
//! to what it was, the previous root handle is returned instead, so callers
//! can skip downstream work with [`Arc::ptr_eq`].

use crate::accessor;
use crate::action::{Action, ActionKind, FormConfig, InputRegistration, Meta};
use crate::error::{FormError, type_name};
use crate::path::{Segment, array_ancestors, format_path, indexed_child_index, parse_path};
use crate::state::{FormState, InputKind, InputState, RootState};
use crate::validators::ValidatorRegistry;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Applies actions to form state using an owned validator registry.
#[derive(Clone, Debug, Default)]
pub struct FormReducer {
    validators: ValidatorRegistry,
}

impl FormReducer {
    pub fn new(validators: ValidatorRegistry) -> Self {
        FormReducer { validators }
    }

    pub fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    pub fn validators_mut(&mut self) -> &mut ValidatorRegistry {
        &mut self.validators
    }

    /// Applies one action.
    ///
    /// Foreign actions, actions without `meta.form`, and actions for a form
    /// that is not registered return `state` itself. On error the previous
    /// snapshot is untouched.
    pub fn reduce(
        &self,
        state: &Arc<RootState>,
        action: &Action,
    ) -> Result<Arc<RootState>, FormError> {
        let Some(action_type) = action.kind.action_type() else {
            tracing::debug!(action = action.action_type(), "ignoring foreign action");
            return Ok(Arc::clone(state));
        };
        let Some(form) = action.meta.form.as_deref() else {
            tracing::debug!(action = action_type.as_str(), "ignoring action without form");
            return Ok(Arc::clone(state));
        };

        tracing::debug!(form, action = action_type.as_str(), "applying action");

        match &action.kind {
            ActionKind::RegisterForm(config) => {
                let mut root = RootState::clone(state);
                root.forms
                    .insert(form.to_string(), Arc::new(register_form(config)));
                return Ok(Arc::new(root));
            }
            ActionKind::RemoveForm => {
                if !state.forms.contains_key(form) {
                    return Ok(Arc::clone(state));
                }
                let mut root = RootState::clone(state);
                root.forms.remove(form);
                return Ok(Arc::new(root));
            }
            _ => {}
        }

        let Some(current) = state.forms.get(form) else {
            tracing::debug!(form, "form is not registered");
            return Ok(Arc::clone(state));
        };

        let mut transition = Transition {
            validators: &self.validators,
            form: FormState::clone(current),
        };
        transition.apply(&action.meta, &action.kind)?;

        if transition.form == **current {
            tracing::trace!(form, action = action_type.as_str(), "transition was a no-op");
            return Ok(Arc::clone(state));
        }

        let mut root = RootState::clone(state);
        root.forms.insert(form.to_string(), Arc::new(transition.form));
        Ok(Arc::new(root))
    }

    /// Applies `actions` in order, stopping at the first error.
    pub fn replay<'a, I>(&self, state: &Arc<RootState>, actions: I) -> Result<Arc<RootState>, FormError>
    where
        I: IntoIterator<Item = &'a Action>,
    {
        let mut current = Arc::clone(state);
        for action in actions {
            current = self.reduce(&current, action)?;
        }
        Ok(current)
    }
}

fn register_form(config: &FormConfig) -> FormState {
    FormState {
        initial_values: config
            .initial_values
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new())),
        initial_form_errors: non_empty(config.initial_form_errors.clone().unwrap_or_default()),
        initial_input_errors: config
            .initial_input_errors
            .clone()
            .filter(|errors| !is_empty_value(errors)),
        ..FormState::default()
    }
}

fn non_empty(errors: Vec<String>) -> Option<Vec<String>> {
    if errors.is_empty() { None } else { Some(errors) }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Flattens an error payload entry into a list of messages.
fn error_list(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().map(error_message).collect(),
        other => vec![error_message(other)],
    }
}

fn error_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn check_index(name: &str, index: i64, len: usize, allow_end: bool) -> Result<usize, FormError> {
    if index < 0 {
        return Err(FormError::NegativeIndex {
            name: name.to_string(),
            index,
        });
    }
    let bound = if allow_end { len + 1 } else { len };
    match usize::try_from(index) {
        Ok(i) if i < bound => Ok(i),
        _ => Err(FormError::IndexOutOfRange {
            name: name.to_string(),
            index,
            len,
        }),
    }
}

// ─── Per-form transition ────────────────────────────────────────────────────

/// A working copy of one form while an action is applied to it.
struct Transition<'a> {
    validators: &'a ValidatorRegistry,
    form: FormState,
}

impl Transition<'_> {
    fn apply(&mut self, meta: &Meta, kind: &ActionKind) -> Result<(), FormError> {
        let name = meta.name.as_deref();

        match kind {
            ActionKind::RegisterInput(registration) => self.register_input(registration),
            ActionKind::RemoveInput { name } => self.remove_input(name),
            ActionKind::InputChange { value } => match name {
                Some(name) => self.input_change(name, value.clone(), meta.touch),
                None => Ok(()),
            },
            ActionKind::InputBlur => match name {
                Some(name) => self.input_blur(name, meta.touch),
                None => Ok(()),
            },
            ActionKind::Submitting => {
                self.form.submitting = true;
                self.form.submit_error = false;
                Ok(())
            }
            ActionKind::SubmitSuccess => {
                self.form.submitting = false;
                self.form.submitted = true;
                self.form.submit_success = true;
                self.form.valid = true;
                self.form.submit_error = false;
                Ok(())
            }
            ActionKind::SubmitError { error } => self.submit_error(error.as_ref()),
            ActionKind::AsyncValidateStart => {
                self.async_validate_start(name);
                Ok(())
            }
            ActionKind::AsyncValidateFinished { errors } => {
                self.async_validate_finished(name, errors.as_ref())
            }
            ActionKind::ArrayPush { .. }
            | ActionKind::ArrayPop
            | ActionKind::ArrayShift
            | ActionKind::ArrayUnshift { .. }
            | ActionKind::ArrayInsert { .. }
            | ActionKind::ArrayRemove { .. }
            | ActionKind::ArrayRemoveAll => self.array_action(name.unwrap_or_default(), kind),
            // Routed by FormReducer::reduce, never reach a form.
            ActionKind::RegisterForm(_) | ActionKind::RemoveForm | ActionKind::Foreign { .. } => {
                Ok(())
            }
        }
    }

    // ─── Inputs ─────────────────────────────────────────────────────────────

    fn register_input(&mut self, registration: &InputRegistration) -> Result<(), FormError> {
        let name = registration.name.as_str();
        let path = parse_path(name);

        if !self.form.inputs.contains_key(name) {
            let input = self.new_input(registration, &path);
            self.form.inputs.insert(name.to_string(), Arc::new(input));
        }

        let all_values = self.form.values();
        self.refresh(name, &path, &all_values)?;
        self.sync_ancestors(&path, &all_values)?;
        self.recompute_aggregates();
        Ok(())
    }

    fn new_input(&self, registration: &InputRegistration, path: &[Segment]) -> InputState {
        let initial_value = registration
            .initial_value
            .clone()
            .or_else(|| accessor::get(&self.form.initial_values, path).cloned());

        let kind = if registration.config.is_array {
            let items = match &initial_value {
                Some(Value::Array(items)) => items.clone(),
                _ => Vec::new(),
            };
            InputKind::Array { items }
        } else {
            InputKind::Scalar {
                value: initial_value.clone(),
            }
        };

        let initial_errors = registration
            .initial_errors
            .clone()
            .and_then(non_empty)
            .or_else(|| match &self.form.initial_input_errors {
                Some(Value::Object(map)) => map
                    .get(&registration.name)
                    .map(error_list)
                    .and_then(non_empty),
                _ => None,
            });

        InputState::new(
            &registration.name,
            kind,
            registration.config.validators(),
            initial_value,
            initial_errors,
        )
    }

    fn remove_input(&mut self, name: &str) -> Result<(), FormError> {
        if self.form.inputs.remove(name).is_none() {
            return Ok(());
        }
        let path = parse_path(name);
        let all_values = self.form.values();
        self.sync_ancestors(&path, &all_values)?;
        self.recompute_aggregates();
        Ok(())
    }

    fn input_change(&mut self, name: &str, value: Option<Value>, touch: bool) -> Result<(), FormError> {
        let Some(current) = self.form.inputs.get(name) else {
            tracing::debug!(input = name, "change for unregistered input");
            return Ok(());
        };

        let revalidate_everything = touch || current.touched || !current.valid;

        // An emptied field with nothing to fall back to becomes unset.
        let value = match value {
            Some(Value::String(s)) if s.is_empty() && !current.has_initial_value() => None,
            other => other,
        };

        let mut input = InputState::clone(current);
        input.kind = match &input.kind {
            InputKind::Scalar { .. } => InputKind::Scalar {
                value: value.clone(),
            },
            InputKind::Array { .. } => match &value {
                None | Some(Value::Null) => InputKind::Array { items: Vec::new() },
                Some(Value::Array(items)) => InputKind::Array {
                    items: items.clone(),
                },
                Some(_) => {
                    return Err(FormError::NotAnArray {
                        name: name.to_string(),
                    });
                }
            },
        };
        input.pristine = false;
        input.dirty = true;
        input.touched = touch || input.touched;
        input.async_errors.clear();

        let written = input.validation_value().unwrap_or(Value::Null);
        self.put(input);

        let path = parse_path(name);
        self.propagate_to_containers(&path, &written);

        let all_values = self.form.values();
        self.refresh(name, &path, &all_values)?;
        if revalidate_everything {
            self.revalidate_all(&all_values)?;
        } else {
            self.sync_ancestors(&path, &all_values)?;
        }
        self.recompute_aggregates();
        Ok(())
    }

    fn input_blur(&mut self, name: &str, touch: bool) -> Result<(), FormError> {
        let Some(current) = self.form.inputs.get(name) else {
            tracing::debug!(input = name, "blur for unregistered input");
            return Ok(());
        };

        let path = parse_path(name);
        let all_values = self.form.values();

        if touch {
            let mut input = InputState::clone(current);
            input.touched = true;
            self.put(input);
            self.refresh(name, &path, &all_values)?;
            self.sync_ancestors(&path, &all_values)?;
        }

        self.revalidate_all(&all_values)?;
        self.recompute_aggregates();
        Ok(())
    }

    // ─── Submission and async validation ────────────────────────────────────

    fn submit_error(&mut self, error: Option<&Value>) -> Result<(), FormError> {
        self.form.submitting = false;
        self.form.submitted = true;
        self.form.submit_success = false;
        self.form.submit_error = true;
        self.form.submit_error_messages = match error {
            Some(Value::String(message)) => Some(vec![message.clone()]),
            Some(Value::Array(messages)) => Some(messages.iter().map(error_message).collect()),
            _ => None,
        };

        let Some(Value::Object(inputs)) = error.and_then(|e| e.get("inputs")) else {
            return Ok(());
        };

        let mut touched_paths = Vec::new();
        for (name, errors) in inputs {
            let Some(current) = self.form.inputs.get(name) else {
                continue;
            };
            // Server-reported errors override client-side validity.
            let mut input = InputState::clone(current);
            input.async_errors = error_list(errors);
            input.valid = false;
            self.put(input);
            touched_paths.push(parse_path(name));
        }

        if !touched_paths.is_empty() {
            let all_values = self.form.values();
            for path in &touched_paths {
                self.sync_ancestors(path, &all_values)?;
            }
        }
        self.recompute_aggregates();
        Ok(())
    }

    fn async_validate_start(&mut self, name: Option<&str>) {
        self.form.async_validation = Some(true);

        if let Some(current) = name.and_then(|n| self.form.inputs.get(n)) {
            let mut input = InputState::clone(current);
            input.async_validation = true;
            self.put(input);
        }
    }

    fn async_validate_finished(
        &mut self,
        name: Option<&str>,
        errors: Option<&Value>,
    ) -> Result<(), FormError> {
        self.form.async_validation = Some(false);

        if let Some(current) = name.and_then(|n| self.form.inputs.get(n)) {
            let mut input = InputState::clone(current);
            input.async_validation = false;
            self.put(input);
        }

        let entries: Vec<(String, Value)> = match errors {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(map)) => match name {
                Some(name) => vec![(
                    name.to_string(),
                    map.get(name).cloned().unwrap_or(Value::Null),
                )],
                None => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            },
            Some(other) => {
                return Err(FormError::InvalidAsyncErrorType {
                    input: name.unwrap_or_default().to_string(),
                    found: type_name(other).to_string(),
                });
            }
        };

        let mut updated = Vec::new();
        for (key, input_errors) in entries {
            let Some(current) = self.form.inputs.get(&key) else {
                continue;
            };
            let async_errors = match &input_errors {
                Value::Null => Vec::new(),
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items.iter().map(error_message).collect(),
                other => {
                    return Err(FormError::InvalidAsyncErrorType {
                        input: key,
                        found: type_name(other).to_string(),
                    });
                }
            };

            let mut input = InputState::clone(current);
            input.async_validation = false;
            if !async_errors.is_empty() {
                input.valid = false;
            }
            input.async_errors = async_errors;
            self.put(input);
            updated.push(parse_path(&key));
        }

        if !updated.is_empty() {
            let all_values = self.form.values();
            for path in &updated {
                self.sync_ancestors(path, &all_values)?;
            }
        }
        self.recompute_aggregates();
        Ok(())
    }

    // ─── Array containers ───────────────────────────────────────────────────

    fn array_action(&mut self, name: &str, kind: &ActionKind) -> Result<(), FormError> {
        let not_an_array = || FormError::NotAnArray {
            name: name.to_string(),
        };
        let current = self.form.inputs.get(name).ok_or_else(not_an_array)?;
        let mut items = current.items().ok_or_else(not_an_array)?.to_vec();
        let before = items.len();

        match kind {
            ActionKind::ArrayPush { value } => items.push(value.clone()),
            ActionKind::ArrayPop => {
                items.pop();
            }
            ActionKind::ArrayShift => {
                if !items.is_empty() {
                    items.remove(0);
                }
            }
            ActionKind::ArrayUnshift { value } => items.insert(0, value.clone()),
            ActionKind::ArrayInsert { index, value } => {
                let at = check_index(name, *index, before, true)?;
                items.insert(at, value.clone());
            }
            ActionKind::ArrayRemove { index } => {
                let at = check_index(name, *index, before, false)?;
                items.remove(at);
            }
            ActionKind::ArrayRemoveAll => items.clear(),
            _ => return Ok(()),
        }

        let path = parse_path(name);
        if current.items() != Some(items.as_slice()) {
            let mut input = InputState::clone(current);
            input.kind = InputKind::Array {
                items: items.clone(),
            };
            input.pristine = false;
            input.dirty = true;
            self.put(input);
            self.propagate_to_containers(&path, &Value::Array(items));
        }

        let all_values = self.form.values();
        self.sync_container(&path, &all_values)?;
        self.sync_ancestors(&path, &all_values)?;
        self.recompute_aggregates();
        Ok(())
    }

    /// Writes a descendant's new value into the `items` of every enclosing
    /// container whose list already covers that index.
    fn propagate_to_containers(&mut self, path: &[Segment], value: &Value) {
        for ancestor in array_ancestors(path) {
            let Some(container_name) = self.find_input(ancestor) else {
                continue;
            };
            let container = &self.form.inputs[&container_name];
            let Some(items) = container.items() else {
                continue;
            };
            let relative = &path[ancestor.len()..];
            let in_range = relative
                .first()
                .and_then(Segment::as_index)
                .is_some_and(|i| i < items.len());
            if !in_range {
                continue;
            }

            let written = accessor::set(&Value::Array(items.to_vec()), relative, value.clone());
            let Value::Array(items) = written else {
                continue;
            };
            let mut next = InputState::clone(container);
            next.kind = InputKind::Array { items };
            self.put(next);
        }
    }

    /// Recomputes a container's state from its own validators and from every
    /// registered input under `container[<index>]` with the index inside the
    /// current item list.
    fn sync_container(&mut self, container_path: &[Segment], all_values: &Value) -> Result<(), FormError> {
        let Some(name) = self.find_input(container_path) else {
            return Ok(());
        };
        let container = Arc::clone(&self.form.inputs[&name]);
        let Some(items) = container.items() else {
            return Ok(());
        };

        let own_value = Value::Array(items.to_vec());
        let errors = self
            .validators
            .validate(&container.validate, Some(&own_value), all_values)?;

        let mut valid = errors.is_empty() && container.async_errors.is_empty();
        let mut pristine = container.pristine;
        let mut touched = container.touched;

        for (other, input) in &self.form.inputs {
            if *other == name {
                continue;
            }
            let other_path = parse_path(other);
            match indexed_child_index(container_path, &other_path) {
                Some(i) if i < items.len() => {
                    valid &= input.valid;
                    pristine &= input.pristine;
                    touched |= input.touched;
                }
                _ => {}
            }
        }

        let mut next = InputState::clone(&container);
        next.errors = non_empty(errors);
        next.valid = valid;
        next.pristine = pristine;
        next.dirty = !pristine;
        next.touched = touched;
        self.put(next);
        Ok(())
    }

    /// Synchronizes every container enclosing `path`, innermost first.
    fn sync_ancestors(&mut self, path: &[Segment], all_values: &Value) -> Result<(), FormError> {
        for ancestor in array_ancestors(path) {
            self.sync_container(ancestor, all_values)?;
        }
        Ok(())
    }

    // ─── Validation and aggregates ──────────────────────────────────────────

    /// Re-validates one input: scalars against their value, containers
    /// through [`Self::sync_container`].
    fn refresh(&mut self, name: &str, path: &[Segment], all_values: &Value) -> Result<(), FormError> {
        let Some(current) = self.form.inputs.get(name) else {
            return Ok(());
        };
        if current.is_array() {
            return self.sync_container(path, all_values);
        }

        let errors = self
            .validators
            .validate(&current.validate, current.value(), all_values)?;
        let mut input = InputState::clone(current);
        input.valid = errors.is_empty() && input.async_errors.is_empty();
        input.errors = non_empty(errors);
        self.put(input);
        Ok(())
    }

    /// Re-validates every scalar, then every container deepest first.
    fn revalidate_all(&mut self, all_values: &Value) -> Result<(), FormError> {
        let mut containers = Vec::new();
        let names: Vec<String> = self.form.inputs.keys().cloned().collect();

        for name in names {
            let path = parse_path(&name);
            if self.form.inputs[&name].is_array() {
                containers.push(path);
            } else {
                self.refresh(&name, &path, all_values)?;
            }
        }

        containers.sort_by_key(|path| std::cmp::Reverse(path.len()));
        for path in &containers {
            self.sync_container(path, all_values)?;
        }
        Ok(())
    }

    fn recompute_aggregates(&mut self) {
        let inputs = self.form.inputs.values();
        self.form.valid = inputs.clone().all(|input| input.valid);
        self.form.pristine = inputs.clone().all(|input| input.pristine);
        self.form.touched = inputs.into_iter().any(|input| input.touched);
    }

    // ─── Helpers ────────────────────────────────────────────────────────────

    /// Stores `input`, keeping the previous allocation when nothing changed.
    fn put(&mut self, input: InputState) {
        if let Some(existing) = self.form.inputs.get(&input.name)
            && **existing == input
        {
            return;
        }
        self.form.inputs.insert(input.name.clone(), Arc::new(input));
    }

    /// Name of the input registered at `path`, whatever spelling it used.
    fn find_input(&self, path: &[Segment]) -> Option<String> {
        let canonical = format_path(path);
        if self.form.inputs.contains_key(&canonical) {
            return Some(canonical);
        }
        self.form
            .inputs
            .keys()
            .find(|name| parse_path(name) == path)
            .cloned()
    }
}

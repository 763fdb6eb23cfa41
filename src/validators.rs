//! Validator pipeline.
//!
//! An input carries an ordered list of [`ValidatorRef`]s. Running the pipeline
//! resolves each reference, invokes it with the candidate value and the whole
//! form's values, and collects the failure token of every validator that does
//! not pass, in declaration order.
//!
//! Registered names are resolved against the [`ValidatorRegistry`] owned by
//! the reducer.

use crate::error::{FormError, type_name};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Failure token reported for a schema object that declares no label.
pub const UNLABELED_SCHEMA: &str = "UnlabeledSchema";

/// Name of the built-in presence validator.
pub const REQUIRED: &str = "required";

/// Signature of a predicate validator.
///
/// Receives the candidate value (`None` when unset) and the form's current
/// nested values. `Ok(true)` passes, `Ok(false)` fails. `Err` is treated as a
/// failure of this validator only; it never aborts the transition.
pub type PredicateFn = dyn Fn(Option<&Value>, &Value) -> Result<bool, String> + Send + Sync;

// ─── Schema ─────────────────────────────────────────────────────────────────

/// An opaque schema object evaluated by an external schema engine.
pub trait Schema: Send + Sync + fmt::Debug {
    /// Declared label, used as the failure token.
    fn label(&self) -> Option<&str>;

    /// Checks `value` against the schema. Same contract as [`PredicateFn`].
    fn check(&self, value: Option<&Value>, all_values: &Value) -> Result<bool, String>;
}

// ─── Inline validators ──────────────────────────────────────────────────────

/// A predicate supplied directly in an input's configuration.
#[derive(Clone)]
pub struct InlineValidator {
    name: String,
    predicate: Arc<PredicateFn>,
}

impl InlineValidator {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Option<&Value>, &Value) -> Result<bool, String> + Send + Sync + 'static,
    {
        InlineValidator {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for InlineValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineValidator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ─── ValidatorRef ───────────────────────────────────────────────────────────

/// One entry of an input's `validate` list.
#[derive(Clone, Debug)]
pub enum ValidatorRef {
    /// Resolved against the [`ValidatorRegistry`] at validation time.
    Named(String),
    Inline(InlineValidator),
    Schema(Arc<dyn Schema>),
}

impl ValidatorRef {
    pub fn named(name: impl Into<String>) -> Self {
        ValidatorRef::Named(name.into())
    }

    pub fn inline<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Option<&Value>, &Value) -> Result<bool, String> + Send + Sync + 'static,
    {
        ValidatorRef::Inline(InlineValidator::new(name, predicate))
    }

    pub fn schema<S: Schema + 'static>(schema: S) -> Self {
        ValidatorRef::Schema(Arc::new(schema))
    }

    /// The token reported when this validator fails.
    pub fn token(&self) -> String {
        match self {
            ValidatorRef::Named(name) => name.clone(),
            ValidatorRef::Inline(inline) => inline.name.clone(),
            ValidatorRef::Schema(schema) => schema_token(schema.as_ref()),
        }
    }
}

impl PartialEq for ValidatorRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValidatorRef::Named(a), ValidatorRef::Named(b)) => a == b,
            (ValidatorRef::Inline(a), ValidatorRef::Inline(b)) => {
                a.name == b.name && Arc::ptr_eq(&a.predicate, &b.predicate)
            }
            (ValidatorRef::Schema(a), ValidatorRef::Schema(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Serialize for ValidatorRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.token())
    }
}

/// A string deserializes to a named reference, a map to a schema object.
impl<'de> Deserialize<'de> for ValidatorRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(name) => Ok(ValidatorRef::Named(name)),
            Value::Object(_) => schema_from_value(&value)
                .map(ValidatorRef::Schema)
                .map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::custom(format!(
                "validator must be a name or a schema object, {} was given",
                type_name(&other)
            ))),
        }
    }
}

fn schema_token(schema: &dyn Schema) -> String {
    match schema.label() {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => {
            tracing::warn!(schema = ?schema, "unlabelled schema validator");
            UNLABELED_SCHEMA.to_string()
        }
    }
}

/// Decodes the `validate` entry of an input configuration.
///
/// Accepts a list of names and schema objects, a single schema object, or
/// `null`. Anything else is an [`FormError::InvalidConfig`].
pub fn validator_refs_from_value(value: &Value) -> Result<Vec<ValidatorRef>, FormError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(_) => Ok(vec![ValidatorRef::Schema(schema_from_value(value)?)]),
        Value::Array(entries) => entries
            .iter()
            .enumerate()
            .map(|(i, entry)| match entry {
                Value::String(name) => Ok(ValidatorRef::Named(name.clone())),
                Value::Object(_) => Ok(ValidatorRef::Schema(schema_from_value(entry)?)),
                other => Err(FormError::invalid_config(format!(
                    "validate[{}] must be a validator name or a schema object, {} was given",
                    i,
                    type_name(other)
                ))),
            })
            .collect(),
        other => Err(FormError::invalid_config(format!(
            "validate must be a list or a single validator, {} was given",
            type_name(other)
        ))),
    }
}

// ─── Registry ───────────────────────────────────────────────────────────────

/// A validator that can be registered under a name.
#[derive(Clone)]
pub enum Validator {
    Predicate(Arc<PredicateFn>),
    Schema(Arc<dyn Schema>),
}

impl Validator {
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(Option<&Value>, &Value) -> Result<bool, String> + Send + Sync + 'static,
    {
        Validator::Predicate(Arc::new(predicate))
    }

    pub fn schema<S: Schema + 'static>(schema: S) -> Self {
        Validator::Schema(Arc::new(schema))
    }

    fn run(&self, value: Option<&Value>, all_values: &Value) -> Result<bool, String> {
        match self {
            Validator::Predicate(predicate) => predicate(value, all_values),
            Validator::Schema(schema) => schema.check(value, all_values),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Predicate(_) => f.write_str("Predicate(..)"),
            Validator::Schema(schema) => f.debug_tuple("Schema").field(schema).finish(),
        }
    }
}

/// Named validators available to a reducer, and the pipeline that runs them.
#[derive(Clone, Debug)]
pub struct ValidatorRegistry {
    entries: HashMap<String, Validator>,
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorRegistry {
    /// A registry holding only the built-in `required` validator.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(REQUIRED.to_string(), Validator::predicate(required));
        ValidatorRegistry { entries }
    }

    /// A registry with no validators at all, not even `required`.
    pub fn empty() -> Self {
        ValidatorRegistry {
            entries: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, validator: Validator) -> &mut Self {
        self.entries.insert(name.into(), validator);
        self
    }

    /// Registers every entry, replacing validators of the same name.
    pub fn register_validators<I, K>(&mut self, validators: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, Validator)>,
        K: Into<String>,
    {
        for (name, validator) in validators {
            self.entries.insert(name.into(), validator);
        }
        self
    }

    /// Registers schema validators from a configuration mapping of
    /// `name -> schema definition`.
    ///
    /// Fails without registering anything when `config` is not a mapping or
    /// when any definition is malformed.
    pub fn register_from_value(&mut self, config: &Value) -> Result<&mut Self, FormError> {
        let Value::Object(map) = config else {
            return Err(FormError::invalid_config(format!(
                "validators must be a mapping, {} was provided",
                type_name(config)
            )));
        };

        let mut parsed = Vec::with_capacity(map.len());
        for (name, definition) in map {
            if !definition.is_object() {
                return Err(FormError::invalid_config(format!(
                    "validator \"{}\" must be a schema object, {} was provided",
                    name,
                    type_name(definition)
                )));
            }
            parsed.push((name.clone(), Validator::Schema(schema_from_value(definition)?)));
        }

        tracing::debug!(count = parsed.len(), "registering configured validators");
        Ok(self.register_validators(parsed))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Runs `validators` in order and returns the failure tokens.
    ///
    /// Returns an empty list when everything passes. Fails only when a named
    /// reference is not registered.
    pub fn validate(
        &self,
        validators: &[ValidatorRef],
        value: Option<&Value>,
        all_values: &Value,
    ) -> Result<Vec<String>, FormError> {
        let mut errors = Vec::new();

        for reference in validators {
            let outcome = match reference {
                ValidatorRef::Named(name) => self
                    .entries
                    .get(name)
                    .ok_or_else(|| FormError::UnknownValidator { name: name.clone() })?
                    .run(value, all_values),
                ValidatorRef::Inline(inline) => (inline.predicate)(value, all_values),
                ValidatorRef::Schema(schema) => schema.check(value, all_values),
            };

            match outcome {
                Ok(true) => {}
                Ok(false) => errors.push(reference.token()),
                Err(message) => {
                    let token = reference.token();
                    tracing::warn!(validator = %token, error = %message, "validator failed to run");
                    errors.push(token);
                }
            }
        }

        Ok(errors)
    }
}

/// Presence check: fails for unset, `null`, `false`, `0`, `""` and `[]`.
pub fn required(value: Option<&Value>, _all_values: &Value) -> Result<bool, String> {
    Ok(match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(_)) => true,
    })
}

// ─── MatchSchema ────────────────────────────────────────────────────────────

/// Built-in declarative schema.
///
/// Every present operator must hold. With `target`, the operators apply to
/// each node the JSONPath selects inside the value; an empty selection
/// passes. An unset value passes unless `required` is set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
}

impl MatchSchema {
    pub fn labelled(label: impl Into<String>) -> Self {
        MatchSchema {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// Rejects regexes and JSONPath targets that do not compile.
    pub fn verify(&self) -> Result<(), FormError> {
        if let Some(pattern) = &self.regex {
            Regex::new(pattern).map_err(|e| {
                FormError::invalid_config(format!("invalid regex '{}': {}", pattern, e))
            })?;
        }
        if let Some(target) = &self.target {
            serde_json_path::JsonPath::parse(target).map_err(|e| {
                FormError::invalid_config(format!("invalid JSONPath target '{}': {}", target, e))
            })?;
        }
        Ok(())
    }

    fn node_matches(&self, node: &Value) -> Result<bool, String> {
        if self.required == Some(true) && !required(Some(node), &Value::Null)? {
            return Ok(false);
        }

        if let Some(ref s) = self.contains {
            match node.as_str() {
                Some(v) if v.contains(s.as_str()) => {}
                _ => return Ok(false),
            }
        }

        if let Some(ref s) = self.starts_with {
            match node.as_str() {
                Some(v) if v.starts_with(s.as_str()) => {}
                _ => return Ok(false),
            }
        }

        if let Some(ref s) = self.ends_with {
            match node.as_str() {
                Some(v) if v.ends_with(s.as_str()) => {}
                _ => return Ok(false),
            }
        }

        if let Some(ref pattern) = self.regex {
            let re = Regex::new(pattern).map_err(|e| e.to_string())?;
            match node.as_str() {
                Some(v) if re.is_match(v) => {}
                _ => return Ok(false),
            }
        }

        if self.min_length.is_some() || self.max_length.is_some() {
            let len = match node {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                _ => return Ok(false),
            };
            if self.min_length.is_some_and(|min| len < min)
                || self.max_length.is_some_and(|max| len > max)
            {
                return Ok(false);
            }
        }

        if let Some(ref options) = self.any_of
            && !options.contains(node)
        {
            return Ok(false);
        }

        let bounds: [(Option<f64>, fn(f64, f64) -> bool); 4] = [
            (self.gt, |v, t| v > t),
            (self.lt, |v, t| v < t),
            (self.gte, |v, t| v >= t),
            (self.lte, |v, t| v <= t),
        ];
        for (threshold, cmp) in bounds {
            if let Some(threshold) = threshold {
                match node.as_f64() {
                    Some(v) if cmp(v, threshold) => {}
                    _ => return Ok(false),
                }
            }
        }

        Ok(true)
    }
}

impl Schema for MatchSchema {
    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn check(&self, value: Option<&Value>, _all_values: &Value) -> Result<bool, String> {
        let value = match value {
            None | Some(Value::Null) => return Ok(self.required != Some(true)),
            Some(v) => v,
        };

        match &self.target {
            Some(target) => {
                let path = serde_json_path::JsonPath::parse(target).map_err(|e| e.to_string())?;
                for node in path.query(value).all() {
                    if !self.node_matches(node)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            None => self.node_matches(value),
        }
    }
}

// ─── CelSchema (behind `cel-eval` feature) ──────────────────────────────────

/// Schema whose predicate is a CEL expression.
///
/// The expression sees two variables: `value` (the candidate, `null` when
/// unset) and `values` (the whole form). It must evaluate to a boolean.
#[cfg(feature = "cel-eval")]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CelSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub cel: String,
}

#[cfg(feature = "cel-eval")]
impl CelSchema {
    pub fn new(label: impl Into<String>, expression: impl Into<String>) -> Self {
        CelSchema {
            label: Some(label.into()),
            cel: expression.into(),
        }
    }

    pub fn verify(&self) -> Result<(), FormError> {
        cel::Program::compile(&self.cel)
            .map(|_| ())
            .map_err(|e| FormError::invalid_config(format!("CEL compile error: {}", e)))
    }

    /// Binds `value` (null when unset) and `values` for evaluation.
    fn context(value: Option<&Value>, values: &Value) -> cel::Context<'static> {
        let mut context = cel::Context::default();
        context.add_variable_from_value("value", value.map_or(cel::Value::Null, to_cel));
        context.add_variable_from_value("values", to_cel(values));
        context
    }
}

#[cfg(feature = "cel-eval")]
impl Schema for CelSchema {
    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn check(&self, value: Option<&Value>, all_values: &Value) -> Result<bool, String> {
        let program =
            cel::Program::compile(&self.cel).map_err(|e| format!("CEL compile error: {}", e))?;

        match program.execute(&Self::context(value, all_values)) {
            Ok(cel::Value::Bool(b)) => Ok(b),
            Ok(other) => Err(format!("CEL expression returned non-boolean result: {:?}", other)),
            // Missing fields fail the check instead of erroring.
            Err(cel::ExecutionError::NoSuchKey(_)) => Ok(false),
            Err(cel::ExecutionError::UndeclaredReference(_)) => Ok(false),
            Err(e) => Err(format!("CEL execution error: {}", e)),
        }
    }
}

#[cfg(feature = "cel-eval")]
fn to_cel(value: &Value) -> cel::Value {
    match value {
        Value::Null => cel::Value::Null,
        Value::Bool(b) => cel::Value::Bool(*b),
        Value::Number(n) => n
            .as_i64()
            .map(cel::Value::Int)
            .or_else(|| n.as_u64().map(cel::Value::UInt))
            .or_else(|| n.as_f64().map(cel::Value::Float))
            .unwrap_or(cel::Value::Null),
        Value::String(s) => s.clone().into(),
        Value::Array(items) => items.iter().map(to_cel).collect::<Vec<_>>().into(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), to_cel(v)))
            .collect::<HashMap<String, cel::Value>>()
            .into(),
    }
}

/// Builds a schema object from its configuration form.
///
/// A map with a `cel` key is a [`CelSchema`]; any other map is a
/// [`MatchSchema`].
pub fn schema_from_value(value: &Value) -> Result<Arc<dyn Schema>, FormError> {
    if value.get("cel").is_some() {
        return cel_schema_from_value(value);
    }

    let schema: MatchSchema = serde_json::from_value(value.clone())
        .map_err(|e| FormError::invalid_config(format!("invalid schema: {}", e)))?;
    schema.verify()?;
    Ok(Arc::new(schema))
}

#[cfg(feature = "cel-eval")]
fn cel_schema_from_value(value: &Value) -> Result<Arc<dyn Schema>, FormError> {
    let schema: CelSchema = serde_json::from_value(value.clone())
        .map_err(|e| FormError::invalid_config(format!("invalid CEL schema: {}", e)))?;
    schema.verify()?;
    Ok(Arc::new(schema))
}

#[cfg(not(feature = "cel-eval"))]
fn cel_schema_from_value(_value: &Value) -> Result<Arc<dyn Schema>, FormError> {
    Err(FormError::invalid_config(
        "CEL schemas require the `cel-eval` feature",
    ))
}

//! Wire decoding of actions and validator configuration.
//!
//! Actions travel as `{ type, meta: { form, name?, touch? }, payload }`
//! records, the shape the binding layer dispatches. Scripts of actions and
//! validator configurations can be written in YAML.

use crate::action::{
    Action, ActionKind, ActionType, FormConfig, InputConfig, InputRegistration, Meta,
    is_form_action_type,
};
use crate::error::{FormError, ParseError, ParseErrorKind, type_name};
use crate::validators::{ValidatorRegistry, validator_refs_from_value};
use serde_json::{Map, Value};

/// Decodes one action record.
///
/// A type without the reserved prefix, or with the prefix but unknown to this
/// crate, decodes to [`ActionKind::Foreign`].
pub fn parse_action(record: &Value) -> Result<Action, FormError> {
    let Value::Object(fields) = record else {
        return Err(mismatch(format!(
            "action must be a mapping, {} was given",
            type_name(record)
        ))
        .into());
    };

    let action_type = match fields.get("type") {
        Some(Value::String(t)) => t.as_str(),
        Some(other) => {
            return Err(mismatch(format!(
                "action type must be a string, {} was given",
                type_name(other)
            ))
            .at("type")
            .into());
        }
        None => return Err(mismatch("action is missing its type").at("type").into()),
    };

    let meta: Meta = match fields.get("meta") {
        None | Some(Value::Null) => Meta::default(),
        Some(meta) => serde_json::from_value(meta.clone())
            .map_err(|e| ParseError::new(classify_json_error(&e.to_string()), e.to_string()).at("meta"))?,
    };

    let known = if is_form_action_type(action_type) {
        ActionType::from_type(action_type)
    } else {
        None
    };
    let Some(known) = known else {
        return Ok(Action::foreign(action_type, meta));
    };

    let payload = fields.get("payload").filter(|p| !p.is_null());
    let kind = match known {
        ActionType::RegisterForm => ActionKind::RegisterForm(match payload {
            Some(p) => serde_json::from_value::<FormConfig>(p.clone()).map_err(|e| {
                ParseError::new(classify_json_error(&e.to_string()), e.to_string()).at("payload")
            })?,
            None => FormConfig::default(),
        }),
        ActionType::RemoveForm => ActionKind::RemoveForm,
        ActionType::RegisterInput => ActionKind::RegisterInput(parse_registration(payload)?),
        ActionType::RemoveInput => ActionKind::RemoveInput {
            name: required_string(payload, "name")?,
        },
        ActionType::InputChange => ActionKind::InputChange {
            value: field(payload, "value").cloned(),
        },
        ActionType::InputBlur => ActionKind::InputBlur,
        ActionType::Submitting => ActionKind::Submitting,
        ActionType::SubmitSuccess => ActionKind::SubmitSuccess,
        ActionType::SubmitError => ActionKind::SubmitError {
            error: payload.cloned(),
        },
        ActionType::AsyncValidateStart => ActionKind::AsyncValidateStart,
        ActionType::AsyncValidateFinished => ActionKind::AsyncValidateFinished {
            errors: payload.cloned(),
        },
        ActionType::ArrayPush => ActionKind::ArrayPush {
            value: field(payload, "value").cloned().unwrap_or(Value::Null),
        },
        ActionType::ArrayPop => ActionKind::ArrayPop,
        ActionType::ArrayShift => ActionKind::ArrayShift,
        ActionType::ArrayUnshift => ActionKind::ArrayUnshift {
            value: field(payload, "value").cloned().unwrap_or(Value::Null),
        },
        ActionType::ArrayInsert => ActionKind::ArrayInsert {
            index: required_index(payload)?,
            value: field(payload, "value").cloned().unwrap_or(Value::Null),
        },
        ActionType::ArrayRemove => ActionKind::ArrayRemove {
            index: required_index(payload)?,
        },
        ActionType::ArrayRemoveAll => ActionKind::ArrayRemoveAll,
    };

    Ok(Action::new(meta, kind))
}

/// Decodes a YAML (or JSON) sequence of action records.
pub fn parse_actions(input: &str) -> Result<Vec<Action>, FormError> {
    let value = parse_document(input)?;
    let Value::Array(records) = value else {
        return Err(mismatch(format!(
            "action script must be a sequence, {} was given",
            type_name(&value)
        ))
        .into());
    };

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            parse_action(record).map_err(|e| match e {
                FormError::Parse(p) => {
                    let path = match &p.path {
                        Some(inner) => format!("[{}].{}", i, inner),
                        None => format!("[{}]", i),
                    };
                    FormError::Parse(p.at(path))
                }
                other => other,
            })
        })
        .collect()
}

/// Builds a registry holding the built-in validators plus the schema
/// validators declared in a YAML mapping of `name -> schema definition`.
pub fn parse_validators(input: &str) -> Result<ValidatorRegistry, FormError> {
    let config = parse_document(input)?;
    let mut registry = ValidatorRegistry::new();
    registry.register_from_value(&config)?;
    Ok(registry)
}

fn parse_document(input: &str) -> Result<Value, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::new(ParseErrorKind::Syntax, "empty input"));
    }
    // Untyped documents only fail on malformed YAML.
    serde_saphyr::from_str(input).map_err(|e| ParseError::new(ParseErrorKind::Syntax, e.to_string()))
}

fn parse_registration(payload: Option<&Value>) -> Result<InputRegistration, FormError> {
    let name = required_string(payload, "name")?;

    let config = match field(payload, "config") {
        None | Some(Value::Null) => InputConfig::default(),
        Some(Value::Object(config)) => parse_input_config(config)?,
        Some(other) => {
            return Err(FormError::invalid_config(format!(
                "config of \"{}\" must be a mapping, {} was given",
                name,
                type_name(other)
            )));
        }
    };

    let initial_errors = match field(payload, "initialErrors") {
        None | Some(Value::Null) => None,
        Some(Value::Array(errors)) => Some(
            errors
                .iter()
                .map(|e| match e {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        Some(Value::String(error)) => Some(vec![error.clone()]),
        Some(other) => {
            return Err(mismatch(format!(
                "initialErrors must be a list, {} was given",
                type_name(other)
            ))
            .at("payload.initialErrors")
            .into());
        }
    };

    Ok(InputRegistration {
        name,
        config,
        initial_value: field(payload, "initialValue").cloned(),
        initial_errors,
    })
}

fn parse_input_config(config: &Map<String, Value>) -> Result<InputConfig, FormError> {
    let flag = |key: &str| -> Result<bool, FormError> {
        match config.get(key) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(FormError::invalid_config(format!(
                "config.{} must be a boolean, {} was given",
                key,
                type_name(other)
            ))),
        }
    };

    Ok(InputConfig {
        required: flag("required")?,
        is_array: flag("isArray")?,
        validate: match config.get("validate") {
            Some(validate) => validator_refs_from_value(validate)?,
            None => Vec::new(),
        },
    })
}

fn field<'a>(payload: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    payload.and_then(|p| p.get(key))
}

fn required_string(payload: Option<&Value>, key: &str) -> Result<String, ParseError> {
    match field(payload, key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(mismatch(format!(
            "{} must be a string, {} was given",
            key,
            type_name(other)
        ))
        .at(format!("payload.{}", key))),
        None => Err(mismatch(format!("payload is missing {}", key)).at(format!("payload.{}", key))),
    }
}

fn required_index(payload: Option<&Value>) -> Result<i64, ParseError> {
    match field(payload, "index") {
        Some(v) => v.as_i64().ok_or_else(|| {
            mismatch(format!("index must be an integer, {} was given", v)).at("payload.index")
        }),
        None => Err(mismatch("payload is missing index").at("payload.index")),
    }
}

fn mismatch(message: impl Into<String>) -> ParseError {
    ParseError::new(ParseErrorKind::TypeMismatch, message)
}

fn classify_json_error(msg: &str) -> ParseErrorKind {
    let lower = msg.to_lowercase();
    if lower.contains("unknown variant") || lower.contains("unknown field") {
        ParseErrorKind::UnknownVariant
    } else {
        ParseErrorKind::TypeMismatch
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kind for wire-decoding failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    Syntax,
    TypeMismatch,
    UnknownVariant,
}

/// Produced by the `parse` module when an action record or a validator
/// configuration cannot be decoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{}", render_parse_error(.path, .message))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        ParseError {
            kind,
            message: message.into(),
            path: None,
        }
    }

    pub(crate) fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

fn render_parse_error(path: &Option<String>, message: &str) -> String {
    match path {
        Some(p) => format!("{}: {}", p, message),
        None => message.to_string(),
    }
}

/// Produced by the `serialize` module when a snapshot cannot be rendered.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SerializeError {
    pub message: String,
}

/// Every error a transition can raise.
///
/// A transition that fails leaves the previous snapshot untouched: all state
/// is built functionally, so nothing has been written when the error surfaces.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum FormError {
    /// A named validator reference has no registry entry.
    #[error("no validator registered under \"{name}\"")]
    UnknownValidator { name: String },

    /// Malformed `validate`/config shape at registration time.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// An async error payload was neither a string nor a list.
    #[error("async errors for \"{input}\" must be a string or a list, {found} was given")]
    InvalidAsyncErrorType { input: String, found: String },

    /// Array action aimed at a missing input or a scalar input.
    #[error("input \"{name}\" is not an array")]
    NotAnArray { name: String },

    #[error("index {index} is out of range for array \"{name}\" of length {len}")]
    IndexOutOfRange {
        name: String,
        index: i64,
        len: usize,
    },

    #[error("negative index {index} given for array \"{name}\"")]
    NegativeIndex { name: String, index: i64 },

    /// Raised by binding layers when a field is mounted outside of a form.
    /// The reducer itself never produces it.
    #[error("{component} has to be inside a connected form")]
    MissingFormContext { component: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl FormError {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        FormError::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Short human-readable name of a JSON value's type, used in error messages.
pub(crate) fn type_name(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//! Immutable, path-addressed access into nested values.
//!
//! `get`, `set` and `merge` never touch their input; `set` and `merge` return a
//! new value with the addressed location replaced. Missing intermediate
//! containers are materialized from the kind of the segment that addresses
//! into them: an index segment creates a list, a key segment creates a map.

use crate::path::{Segment, parse_path};
use crate::state::{FormState, InputKind};
use serde_json::{Map, Value};

/// Most `null` slots [`set`] inserts to reach an index past the end of a list.
pub const MAX_PADDING: usize = 1024;

/// Returns the value at `path`, or `None` if any segment fails to resolve.
///
/// An empty path returns the container itself. An index segment applied to a
/// map looks up the decimal key.
pub fn get<'a>(container: &'a Value, path: &[Segment]) -> Option<&'a Value> {
    let mut current = container;
    for seg in path {
        current = match (seg, current) {
            (Segment::Key(k), Value::Object(map)) => map.get(k)?,
            (Segment::Index(i), Value::Array(items)) => items.get(*i)?,
            (Segment::Index(i), Value::Object(map)) => map.get(&i.to_string())?,
            _ => return None,
        };
    }
    Some(current)
}

/// Like [`get`], falling back to `default` when the path does not resolve.
pub fn get_or(container: &Value, path: &[Segment], default: Value) -> Value {
    get(container, path).cloned().unwrap_or(default)
}

/// Returns a copy of `container` with `value` written at `path`.
///
/// Scalars standing where a container is needed are replaced. Writing past
/// the end of a list pads the gap with `null`, up to [`MAX_PADDING`] slots.
/// An index further out turns the list into a map keyed by decimal index,
/// which [`get`] still resolves.
pub fn set(container: &Value, path: &[Segment], value: Value) -> Value {
    set_in(Some(container), path, value)
}

fn set_in(current: Option<&Value>, path: &[Segment], value: Value) -> Value {
    let Some((head, rest)) = path.split_first() else {
        return value;
    };

    match head {
        Segment::Key(key) => {
            let mut map = match current {
                Some(Value::Object(map)) => map.clone(),
                _ => Map::new(),
            };
            let child = set_in(map.get(key), rest, value);
            map.insert(key.clone(), child);
            Value::Object(map)
        }
        Segment::Index(index) => match current {
            Some(Value::Object(map)) => set_keyed(map.clone(), *index, rest, value),
            other => {
                let mut items = match other {
                    Some(Value::Array(items)) => items.clone(),
                    _ => Vec::new(),
                };
                let limit = items.len().saturating_add(MAX_PADDING);
                match index.checked_add(1) {
                    Some(len) if len <= limit => {
                        if items.len() < len {
                            items.resize(len, Value::Null);
                        }
                        let child = set_in(items.get(*index), rest, value);
                        items[*index] = child;
                        Value::Array(items)
                    }
                    _ => {
                        let map = items
                            .into_iter()
                            .enumerate()
                            .map(|(i, item)| (i.to_string(), item))
                            .collect();
                        set_keyed(map, *index, rest, value)
                    }
                }
            }
        },
    }
}

fn set_keyed(mut map: Map<String, Value>, index: usize, rest: &[Segment], value: Value) -> Value {
    let key = index.to_string();
    let child = set_in(map.get(&key), rest, value);
    map.insert(key, child);
    Value::Object(map)
}

/// Returns a copy of `container` with `partial` shallow-merged into the map at
/// `path`. A missing or non-map target is treated as an empty map.
pub fn merge(container: &Value, path: &[Segment], partial: &Map<String, Value>) -> Value {
    let mut target = match get(container, path) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    for (key, value) in partial {
        target.insert(key.clone(), value.clone());
    }
    set(container, path, Value::Object(target))
}

/// Nested values of a form, built from its inputs.
///
/// Array containers are written first, outermost to innermost, and scalar
/// inputs overlay them. Unset scalars are left out.
pub fn form_values(form: &FormState) -> Value {
    let mut entries: Vec<_> = form
        .inputs
        .iter()
        .map(|(name, input)| (parse_path(name), input.as_ref()))
        .collect();
    entries.sort_by_key(|(path, input)| (!input.is_array(), path.len()));

    let mut data = Value::Object(Map::new());
    for (path, input) in entries {
        match &input.kind {
            InputKind::Array { items } => {
                data = set(&data, &path, Value::Array(items.clone()));
            }
            InputKind::Scalar { value: Some(value) } => {
                data = set(&data, &path, value.clone());
            }
            InputKind::Scalar { value: None } => {}
        }
    }
    data
}

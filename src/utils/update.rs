// src/utils/update.rs
//! Non-destructive updates of JSON state.
//!
//! [`update`] never touches its input; it returns a new value with the
//! directive applied. Directives can be built in code or parsed from the
//! `$set`/`$push`/`$unshift`/`$splice`/`$merge` command objects.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use serde_json::{Map, Value};
use thiserror::Error;

/// Function applied by [`Directive::Apply`]
pub type ApplyFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

#[derive(Clone)]
pub enum Directive {
    /// Replace the target entirely
    Set(Value),
    /// Append items to an array
    Push(Vec<Value>),
    /// Prepend items to an array, keeping their order
    Unshift(Vec<Value>),
    /// Apply each splice in turn to an array
    Splice(Vec<Splice>),
    /// Shallow-merge keys into an object
    Merge(Map<String, Value>),
    /// Replace the target with the function's result
    Apply(ApplyFn),
    /// Update children by key; numeric keys index into arrays
    Nested(BTreeMap<String, Directive>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Splice {
    pub start: usize,
    pub delete_count: usize,
    pub items: Vec<Value>,
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Set(value) => f.debug_tuple("Set").field(value).finish(),
            Directive::Push(items) => f.debug_tuple("Push").field(items).finish(),
            Directive::Unshift(items) => f.debug_tuple("Unshift").field(items).finish(),
            Directive::Splice(splices) => f.debug_tuple("Splice").field(splices).finish(),
            Directive::Merge(map) => f.debug_tuple("Merge").field(map).finish(),
            Directive::Apply(_) => f.write_str("Apply(<fn>)"),
            Directive::Nested(children) => f.debug_tuple("Nested").field(children).finish(),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UpdateError {
    #[error("Cannot apply {command} at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        command: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Index {index} out of range at '{path}' (length {len})")]
    OutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("Invalid directive: {0}")]
    InvalidDirective(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

impl UpdateError {
    fn within(self, key: &str) -> Self {
        let prefix = |path: String| {
            if path.is_empty() {
                key.to_string()
            } else {
                format!("{}.{}", key, path)
            }
        };

        match self {
            UpdateError::TypeMismatch { path, command, expected, found } => UpdateError::TypeMismatch {
                path: prefix(path),
                command,
                expected,
                found,
            },
            UpdateError::OutOfRange { path, index, len } => UpdateError::OutOfRange {
                path: prefix(path),
                index,
                len,
            },
            other => other,
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expect_array<'a>(state: &'a Value, command: &'static str) -> Result<&'a Vec<Value>, UpdateError> {
    state.as_array().ok_or_else(|| UpdateError::TypeMismatch {
        path: String::new(),
        command,
        expected: "array",
        found: kind(state),
    })
}

/// Return a copy of `state` with `directive` applied
pub fn update(state: &Value, directive: &Directive) -> Result<Value, UpdateError> {
    match directive {
        Directive::Set(value) => Ok(value.clone()),
        Directive::Push(items) => {
            let mut array = expect_array(state, "$push")?.clone();
            array.extend(items.iter().cloned());
            Ok(Value::Array(array))
        }
        Directive::Unshift(items) => {
            let existing = expect_array(state, "$unshift")?;
            let array = items.iter().chain(existing.iter()).cloned().collect();
            Ok(Value::Array(array))
        }
        Directive::Splice(splices) => {
            let mut array = expect_array(state, "$splice")?.clone();
            for splice in splices {
                if splice.start > array.len() {
                    return Err(UpdateError::OutOfRange {
                        path: String::new(),
                        index: splice.start,
                        len: array.len(),
                    });
                }
                let end = splice.start + splice.delete_count.min(array.len() - splice.start);
                array.splice(splice.start..end, splice.items.iter().cloned());
            }
            Ok(Value::Array(array))
        }
        Directive::Merge(entries) => {
            let mut object = state
                .as_object()
                .ok_or_else(|| UpdateError::TypeMismatch {
                    path: String::new(),
                    command: "$merge",
                    expected: "object",
                    found: kind(state),
                })?
                .clone();
            object.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(Value::Object(object))
        }
        Directive::Apply(function) => Ok(function(state)),
        Directive::Nested(children) => update_children(state, children),
    }
}

fn update_children(state: &Value, children: &BTreeMap<String, Directive>) -> Result<Value, UpdateError> {
    match state {
        Value::Object(object) => {
            let mut updated = object.clone();
            for (key, directive) in children {
                let child = object.get(key).unwrap_or(&Value::Null);
                let value = update(child, directive).map_err(|e| e.within(key))?;
                updated.insert(key.clone(), value);
            }
            Ok(Value::Object(updated))
        }
        Value::Array(array) => {
            let mut updated = array.clone();
            for (key, directive) in children {
                let index: usize = key
                    .parse()
                    .map_err(|_| UpdateError::InvalidDirective(format!("'{}' is not an array index", key)))?;
                let child = array.get(index).ok_or(UpdateError::OutOfRange {
                    path: String::new(),
                    index,
                    len: array.len(),
                })?;
                updated[index] = update(child, directive).map_err(|e| e.within(key))?;
            }
            Ok(Value::Array(updated))
        }
        other => Err(UpdateError::TypeMismatch {
            path: String::new(),
            command: "nested update",
            expected: "object or array",
            found: kind(other),
        }),
    }
}

impl Directive {
    /// Parse a command object such as `{"items": {"$push": [1]}}`.
    ///
    /// `$apply` has no JSON form and is rejected.
    pub fn from_json(value: &Value) -> Result<Self, UpdateError> {
        let object = value
            .as_object()
            .ok_or_else(|| UpdateError::InvalidDirective(format!("expected an object, found {}", kind(value))))?;

        let commands = object.keys().filter(|key| key.starts_with('$')).count();
        if commands == 0 {
            let children = object
                .iter()
                .map(|(key, child)| Ok((key.clone(), Directive::from_json(child)?)))
                .collect::<Result<BTreeMap<_, _>, UpdateError>>()?;
            return Ok(Directive::Nested(children));
        }

        if object.len() != 1 {
            return Err(UpdateError::InvalidDirective(
                "a command must be the only key of its object".to_string(),
            ));
        }

        let (command, argument) = object.iter().next().ok_or_else(|| {
            UpdateError::InvalidDirective("empty command object".to_string())
        })?;

        match command.as_str() {
            "$set" => Ok(Directive::Set(argument.clone())),
            "$push" => Ok(Directive::Push(array_argument(command, argument)?.clone())),
            "$unshift" => Ok(Directive::Unshift(array_argument(command, argument)?.clone())),
            "$splice" => array_argument(command, argument)?
                .iter()
                .map(parse_splice)
                .collect::<Result<Vec<_>, _>>()
                .map(Directive::Splice),
            "$merge" => argument
                .as_object()
                .cloned()
                .map(Directive::Merge)
                .ok_or_else(|| UpdateError::InvalidDirective("$merge expects an object".to_string())),
            "$apply" => Err(UpdateError::InvalidDirective(
                "$apply takes a function and cannot be parsed from JSON".to_string(),
            )),
            other => Err(UpdateError::UnknownCommand(other.to_string())),
        }
    }
}

fn array_argument<'a>(command: &str, argument: &'a Value) -> Result<&'a Vec<Value>, UpdateError> {
    argument
        .as_array()
        .ok_or_else(|| UpdateError::InvalidDirective(format!("{} expects an array", command)))
}

fn parse_splice(entry: &Value) -> Result<Splice, UpdateError> {
    let invalid = || UpdateError::InvalidDirective(format!("invalid $splice entry: {}", entry));

    let parts = entry.as_array().ok_or_else(invalid)?;
    let start = parts.first().and_then(Value::as_u64).ok_or_else(invalid)?;
    let delete_count = match parts.get(1) {
        Some(count) => count.as_u64().ok_or_else(invalid)?,
        None => 0,
    };

    Ok(Splice {
        start: start as usize,
        delete_count: delete_count as usize,
        items: parts.iter().skip(2).cloned().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_leaves_input_untouched() {
        let state = json!([1, 2]);

        let updated = update(&state, &Directive::Push(vec![json!(3), json!(4)])).unwrap();

        assert_eq!(updated, json!([1, 2, 3, 4]));
        assert_eq!(state, json!([1, 2]));
    }

    #[test]
    fn test_unshift_keeps_item_order() {
        let updated = update(&json!([3]), &Directive::Unshift(vec![json!(1), json!(2)])).unwrap();
        assert_eq!(updated, json!([1, 2, 3]));
    }

    #[test]
    fn test_splices_apply_in_sequence() {
        let splices = vec![
            Splice { start: 1, delete_count: 1, items: vec![json!("x"), json!("y")] },
            Splice { start: 0, delete_count: 10, items: vec![] },
        ];
        let state = json!(["a", "b", "c"]);

        let first_only = update(&state, &Directive::Splice(splices[..1].to_vec())).unwrap();
        assert_eq!(first_only, json!(["a", "x", "y", "c"]));

        let both = update(&state, &Directive::Splice(splices)).unwrap();
        assert_eq!(both, json!([]));
    }

    #[test]
    fn test_splice_past_end_is_rejected() {
        let splices = vec![Splice { start: 4, delete_count: 0, items: vec![] }];

        assert_eq!(
            update(&json!([1]), &Directive::Splice(splices)),
            Err(UpdateError::OutOfRange { path: String::new(), index: 4, len: 1 })
        );
    }

    #[test]
    fn test_nested_update_with_merge_and_apply() {
        let state = json!({
            "user": {"name": "ada", "langs": ["en"]},
            "count": 1
        });

        let directive = Directive::Nested(BTreeMap::from([
            (
                "user".to_string(),
                Directive::Nested(BTreeMap::from([
                    ("langs".to_string(), Directive::Push(vec![json!("fr")])),
                ])),
            ),
            (
                "count".to_string(),
                Directive::Apply(Arc::new(|v: &Value| json!(v.as_i64().unwrap_or(0) + 1))),
            ),
        ]));

        let updated = update(&state, &directive).unwrap();

        assert_eq!(updated, json!({
            "user": {"name": "ada", "langs": ["en", "fr"]},
            "count": 2
        }));
        assert_eq!(state["count"], json!(1));

        let merged = update(&updated["user"], &Directive::Merge(
            json!({"name": "grace", "admin": true}).as_object().unwrap().clone(),
        )).unwrap();
        assert_eq!(merged, json!({"name": "grace", "langs": ["en", "fr"], "admin": true}));
    }

    #[test]
    fn test_type_mismatch_reports_path() {
        let directive = Directive::from_json(&json!({"a": {"b": {"$push": [1]}}})).unwrap();

        let err = update(&json!({"a": {"b": "text"}}), &directive).unwrap_err();

        assert_eq!(err, UpdateError::TypeMismatch {
            path: "a.b".to_string(),
            command: "$push",
            expected: "array",
            found: "string",
        });
    }

    #[test]
    fn test_from_json_commands() {
        let directive = Directive::from_json(&json!({
            "items": {"0": {"$set": "first"}},
            "tags": {"$splice": [[0, 1, "new"]]},
            "meta": {"$merge": {"seen": true}}
        }))
        .unwrap();

        let state = json!({"items": ["a", "b"], "tags": ["old", "kept"], "meta": {}});
        let updated = update(&state, &directive).unwrap();

        assert_eq!(updated, json!({
            "items": ["first", "b"],
            "tags": ["new", "kept"],
            "meta": {"seen": true}
        }));
    }

    #[test]
    fn test_from_json_rejects_bad_commands() {
        assert_eq!(
            Directive::from_json(&json!({"$frobnicate": 1})).unwrap_err(),
            UpdateError::UnknownCommand("$frobnicate".to_string())
        );
        assert!(matches!(
            Directive::from_json(&json!({"$apply": null})),
            Err(UpdateError::InvalidDirective(_))
        ));
        assert!(matches!(
            Directive::from_json(&json!({"$set": 1, "other": {}})),
            Err(UpdateError::InvalidDirective(_))
        ));
    }
}

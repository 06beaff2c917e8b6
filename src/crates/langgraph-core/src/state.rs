//! State schema and reducers
//!
//! Graph state is a JSON object. Nodes never mutate it directly: each node
//! returns a *partial update* (an object holding only the fields it changed)
//! and the executor folds that update into the authoritative state through the
//! [`StateSchema`].
//!
//! Every field is combined by a [`Reducer`]:
//!
//! | reducer | behaviour | typical fields |
//! |---|---|---|
//! | [`OverwriteReducer`] | last write wins (default) | `task_plan`, `next_task_index` |
//! | [`AppendReducer`] | concatenates, never shrinks | `worker_reports`, `gathered_data` |
//! | [`KeepNonEmptyReducer`] | overwrite, but ignores null/empty writes | `topic`, `research_plan` |
//!
//! Updates produced by concurrent nodes in one superstep are applied one after
//! another in task order, so appends keep a deterministic order without any
//! shared mutable structure between the nodes.
//!
//! ```rust
//! use langgraph_core::state::{AppendReducer, StateSchema};
//! use serde_json::json;
//!
//! let mut schema = StateSchema::new();
//! schema.add_field("worker_reports", Box::new(AppendReducer));
//!
//! let mut state = json!({"worker_reports": [{"worker": "research"}]});
//! schema.apply(&mut state, &json!({"worker_reports": [{"worker": "content"}]})).unwrap();
//! assert_eq!(state["worker_reports"].as_array().unwrap().len(), 2);
//! ```

use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StateError {
    /// State or update is not a JSON object
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Reducer could not combine the values
    #[error("Reducer error on field '{field}': {message}")]
    ReducerError { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, StateError>;

/// Combines the current value of a field with a new write
pub trait Reducer: Send + Sync {
    /// `current` is `Value::Null` when the field has never been written
    fn reduce(&self, current: &Value, update: &Value) -> std::result::Result<Value, String>;

    fn name(&self) -> &str;
}

/// Replaces the current value with the update
#[derive(Debug, Clone)]
pub struct OverwriteReducer;

impl Reducer for OverwriteReducer {
    fn reduce(&self, _current: &Value, update: &Value) -> std::result::Result<Value, String> {
        Ok(update.clone())
    }

    fn name(&self) -> &str {
        "overwrite"
    }
}

/// Appends the update to the current array
///
/// Arrays are concatenated, scalars are pushed as one element, and a null
/// update leaves the field unchanged.
#[derive(Debug, Clone)]
pub struct AppendReducer;

impl Reducer for AppendReducer {
    fn reduce(&self, current: &Value, update: &Value) -> std::result::Result<Value, String> {
        match (current, update) {
            (current, Value::Null) => Ok(match current {
                Value::Null => Value::Array(Vec::new()),
                other => other.clone(),
            }),
            (Value::Array(curr), Value::Array(upd)) => {
                let mut result = curr.clone();
                result.extend_from_slice(upd);
                Ok(Value::Array(result))
            }
            (Value::Null, Value::Array(upd)) => Ok(Value::Array(upd.clone())),
            (Value::Array(curr), single) => {
                let mut result = curr.clone();
                result.push(single.clone());
                Ok(Value::Array(result))
            }
            (Value::Null, single) => Ok(Value::Array(vec![single.clone()])),
            _ => Err("append requires an array field".to_string()),
        }
    }

    fn name(&self) -> &str {
        "append"
    }
}

/// Overwrites, except that null or empty-string writes keep the current value
///
/// Used for identity fields that must survive partial updates such as resume
/// calls which do not re-supply them.
#[derive(Debug, Clone)]
pub struct KeepNonEmptyReducer;

impl Reducer for KeepNonEmptyReducer {
    fn reduce(&self, current: &Value, update: &Value) -> std::result::Result<Value, String> {
        let empty = match update {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        };
        if empty && !current.is_null() {
            Ok(current.clone())
        } else {
            Ok(update.clone())
        }
    }

    fn name(&self) -> &str {
        "keep_non_empty"
    }
}

/// Field reducers plus initial values
#[derive(Default)]
pub struct StateSchema {
    fields: HashMap<String, Box<dyn Reducer>>,
    defaults: Map<String, Value>,
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reducer for a field. Unregistered fields are overwritten.
    pub fn add_field(&mut self, field_name: impl Into<String>, reducer: Box<dyn Reducer>) {
        self.fields.insert(field_name.into(), reducer);
    }

    /// Builder form of [`add_field`](Self::add_field)
    pub fn with_field(mut self, field_name: impl Into<String>, reducer: Box<dyn Reducer>) -> Self {
        self.add_field(field_name, reducer);
        self
    }

    /// Value a field holds before anything writes it
    pub fn with_default(mut self, field_name: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(field_name.into(), value);
        self
    }

    pub fn reducer_name(&self, field_name: &str) -> &str {
        self.fields
            .get(field_name)
            .map(|r| r.name())
            .unwrap_or("overwrite")
    }

    /// Build the starting state of a run: defaults first, then the input
    /// folded in through the reducers.
    pub fn initial_state(&self, input: &Value) -> Result<Value> {
        let mut state = Value::Object(self.defaults.clone());
        self.apply(&mut state, input)?;
        Ok(state)
    }

    /// Fold a partial update into `state`
    pub fn apply(&self, state: &mut Value, update: &Value) -> Result<()> {
        let state_obj = state
            .as_object_mut()
            .ok_or_else(|| StateError::InvalidState("state must be an object".to_string()))?;

        let update_obj = match update {
            Value::Object(obj) => obj,
            Value::Null => return Ok(()),
            _ => {
                return Err(StateError::InvalidState(
                    "update must be an object".to_string(),
                ))
            }
        };

        for (field_name, update_value) in update_obj {
            let current = state_obj.get(field_name).unwrap_or(&Value::Null);

            let reduced = match self.fields.get(field_name) {
                Some(reducer) => reducer.reduce(current, update_value).map_err(|message| {
                    StateError::ReducerError {
                        field: field_name.clone(),
                        message,
                    }
                })?,
                None => update_value.clone(),
            };

            state_obj.insert(field_name.clone(), reduced);
        }

        Ok(())
    }
}

impl std::fmt::Debug for StateSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: HashMap<&str, &str> = self
            .fields
            .iter()
            .map(|(k, r)| (k.as_str(), r.name()))
            .collect();
        f.debug_struct("StateSchema")
            .field("fields", &fields)
            .field("defaults", &self.defaults)
            .finish()
    }
}

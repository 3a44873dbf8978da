//! Scripted edits applied to a loaded form.
//!
//! Text forms, as accepted on the command line:
//! - set `PATH=JSON`: a leaf gets a user edit, a subtree gets a write
//! - append `PATH=JSON`: one new collection element
//! - remove `PATH:INDEX`: drop one collection element
//!
//! A value that is not valid JSON is taken as a plain string.

use serde_json::Value;
use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{FieldPath, Form, FormResult, NodeKindName};

#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Set { path: FieldPath, value: Value },
    Append { path: FieldPath, value: Value },
    Remove { path: FieldPath, index: usize },
}

fn invalid(edit: &str, message: impl Into<String>) -> ApplicationError {
    ApplicationError::InvalidEdit {
        edit: edit.to_string(),
        message: message.into(),
    }
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn split_assignment(raw: &str) -> ApplicationResult<(FieldPath, Value)> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| invalid(raw, "expected PATH=VALUE"))?;
    let path = path
        .parse::<FieldPath>()
        .map_err(|e| invalid(raw, e.to_string()))?;
    Ok((path, parse_value(value)))
}

impl Edit {
    pub fn parse_set(raw: &str) -> ApplicationResult<Self> {
        let (path, value) = split_assignment(raw)?;
        Ok(Edit::Set { path, value })
    }

    pub fn parse_append(raw: &str) -> ApplicationResult<Self> {
        let (path, value) = split_assignment(raw)?;
        Ok(Edit::Append { path, value })
    }

    pub fn parse_remove(raw: &str) -> ApplicationResult<Self> {
        let (path, index) = raw
            .rsplit_once(':')
            .ok_or_else(|| invalid(raw, "expected PATH:INDEX"))?;
        let index = index
            .trim()
            .parse::<usize>()
            .map_err(|e| invalid(raw, e.to_string()))?;
        let path = path
            .parse::<FieldPath>()
            .map_err(|e| invalid(raw, e.to_string()))?;
        Ok(Edit::Remove { path, index })
    }

    /// Leaves get a user edit (dirty, remap on discriminants); groups and
    /// collections get a programmatic write.
    pub fn apply(&self, form: &mut Form) -> FormResult<()> {
        debug!(edit = ?self, "applying edit");
        match self {
            Edit::Set { path, value } => match form.kind_at(path)? {
                NodeKindName::Leaf => form.set_value(path, value.clone()),
                _ => form.write_at(path, value),
            },
            Edit::Append { path, value } => form.append(path, value).map(|_| ()),
            Edit::Remove { path, index } => form.remove_at(path, *index).map(|_| ()),
        }
    }
}

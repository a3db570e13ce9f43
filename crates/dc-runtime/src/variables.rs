use std::collections::BTreeMap;

use dc_core::{DialogueError, Value};
use serde::{Deserialize, Serialize};

/// Typed key-value store for `$`-prefixed dialogue variables.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableStorage {
    values: BTreeMap<String, Value>,
}

fn validate_variable_name(name: &str) -> Result<(), DialogueError> {
    let Some(rest) = name.strip_prefix('$') else {
        return Err(DialogueError::new(
            "VARIABLE_NAME_INVALID",
            format!("Variable name \"{}\" must start with \"$\".", name),
        ));
    };
    let mut chars = rest.chars();
    let valid_head = matches!(chars.next(), Some(ch) if ch.is_ascii_alphabetic() || ch == '_');
    if !valid_head || !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err(DialogueError::new(
            "VARIABLE_NAME_INVALID",
            format!("Variable name \"{}\" is not a valid identifier.", name),
        ));
    }
    Ok(())
}

impl VariableStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> Result<(), DialogueError> {
        validate_variable_name(name)?;
        self.values.insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get_value(name).and_then(Value::as_bool)
    }

    pub fn get_number(&self, name: &str) -> Option<f64> {
        self.get_value(name).and_then(Value::as_number)
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get_value(name).and_then(Value::as_string)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dc_core::{DialogueError, Value};

use crate::registry::Registration;

pub const MAX_FUNCTION_ARITY: usize = 4;

pub type FunctionImpl = Arc<dyn Fn(&[Value]) -> Result<Value, DialogueError> + Send + Sync>;

#[derive(Clone)]
pub struct FunctionDescriptor {
    name: String,
    arity: usize,
    implementation: FunctionImpl,
}

impl FunctionDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub(crate) fn implementation(&self) -> &FunctionImpl {
        &self.implementation
    }
}

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Value-returning host functions callable from script expressions. Kept apart
/// from commands, so a function and a command may share a name.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDescriptor>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_function<F>(
        &mut self,
        name: &str,
        arity: usize,
        implementation: F,
    ) -> Result<Registration, DialogueError>
    where
        F: Fn(&[Value]) -> Result<Value, DialogueError> + Send + Sync + 'static,
    {
        if !is_identifier(name) {
            return Err(DialogueError::new(
                "REGISTRY_FUNCTION_NAME_INVALID",
                format!("Function name \"{}\" must be an identifier.", name),
            ));
        }
        if arity > MAX_FUNCTION_ARITY {
            return Err(DialogueError::new(
                "REGISTRY_FUNCTION_ARITY",
                format!(
                    "Function \"{}\" takes {} parameters; at most {} are supported.",
                    name, arity, MAX_FUNCTION_ARITY
                ),
            ));
        }
        if self.functions.contains_key(name) {
            tracing::warn!(function = name, "function is already registered; keeping the existing implementation");
            return Ok(Registration::Duplicate);
        }

        tracing::debug!(function = name, arity, "registered function");
        self.functions.insert(
            name.to_string(),
            FunctionDescriptor {
                name: name.to_string(),
                arity,
                implementation: Arc::new(implementation),
            },
        );
        Ok(Registration::Added)
    }

    pub fn unregister_function(&mut self, name: &str) -> bool {
        if self.functions.remove(name).is_some() {
            tracing::debug!(function = name, "unregistered function");
            return true;
        }
        tracing::warn!(function = name, "cannot unregister unknown function");
        false
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, DialogueError> {
        let descriptor = self.functions.get(name).ok_or_else(|| {
            DialogueError::new(
                "FUNCTION_UNKNOWN",
                format!("Function \"{}\" is not registered.", name),
            )
        })?;
        if args.len() != descriptor.arity {
            return Err(DialogueError::new(
                "FUNCTION_ARITY",
                format!(
                    "Function \"{}\" expects {} arguments, got {}.",
                    name,
                    descriptor.arity,
                    args.len()
                ),
            ));
        }
        (descriptor.implementation)(args)
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn clear(&mut self) {
        self.functions.clear();
    }
}

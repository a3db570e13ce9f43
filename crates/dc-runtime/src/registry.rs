use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use dc_core::{
    ArgValue, CommandSignature, DialogueError, NodeHandle, ParamSpec, ReturnShape,
};

use crate::convert::{build_converters, Converter};
use crate::pending::PendingOperation;
use crate::scene::SceneLookup;

/// What a command handler hands back to the dispatcher.
#[derive(Debug)]
pub enum CommandReturn {
    Done,
    Pending(PendingOperation),
}

impl From<PendingOperation> for CommandReturn {
    fn from(operation: PendingOperation) -> Self {
        Self::Pending(operation)
    }
}

/// Converted arguments for one invocation, positionally matching the
/// command's declared parameters. Unsupplied optionals hold `ArgValue::Default`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandArgs {
    command: String,
    values: Vec<ArgValue>,
}

impl CommandArgs {
    pub fn new(command: impl Into<String>, values: Vec<ArgValue>) -> Self {
        Self {
            command: command.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[ArgValue] {
        &self.values
    }

    fn mismatch(&self, index: usize, expected: &str) -> DialogueError {
        let found = match self.values.get(index) {
            None => "nothing",
            Some(ArgValue::String(_)) => "string",
            Some(ArgValue::Boolean(_)) => "bool",
            Some(ArgValue::Integer(_)) => "int",
            Some(ArgValue::Number(_)) => "float",
            Some(ArgValue::Node(_)) => "Node",
            Some(ArgValue::Default) => "default",
        };
        DialogueError::new(
            "COMMAND_ARG_TYPE",
            format!(
                "Command \"{}\" expected {} at argument {}, found {}.",
                self.command, expected, index, found
            ),
        )
    }

    pub fn string(&self, index: usize) -> Result<&str, DialogueError> {
        match self.values.get(index) {
            Some(ArgValue::String(value)) => Ok(value.as_str()),
            _ => Err(self.mismatch(index, "string")),
        }
    }

    pub fn boolean(&self, index: usize) -> Result<bool, DialogueError> {
        match self.values.get(index) {
            Some(ArgValue::Boolean(value)) => Ok(*value),
            _ => Err(self.mismatch(index, "bool")),
        }
    }

    pub fn integer(&self, index: usize) -> Result<i64, DialogueError> {
        match self.values.get(index) {
            Some(ArgValue::Integer(value)) => Ok(*value),
            _ => Err(self.mismatch(index, "int")),
        }
    }

    /// Accepts integer arguments as well.
    pub fn number(&self, index: usize) -> Result<f64, DialogueError> {
        match self.values.get(index) {
            Some(ArgValue::Number(value)) => Ok(*value),
            Some(ArgValue::Integer(value)) => Ok(*value as f64),
            _ => Err(self.mismatch(index, "float")),
        }
    }

    pub fn node(&self, index: usize) -> Result<Option<NodeHandle>, DialogueError> {
        match self.values.get(index) {
            Some(ArgValue::Node(value)) => Ok(*value),
            _ => Err(self.mismatch(index, "Node")),
        }
    }

    fn is_default(&self, index: usize) -> bool {
        matches!(self.values.get(index), None | Some(ArgValue::Default))
    }

    pub fn string_or<'a>(&'a self, index: usize, default: &'a str) -> Result<&'a str, DialogueError> {
        if self.is_default(index) {
            return Ok(default);
        }
        self.string(index)
    }

    pub fn boolean_or(&self, index: usize, default: bool) -> Result<bool, DialogueError> {
        if self.is_default(index) {
            return Ok(default);
        }
        self.boolean(index)
    }

    pub fn integer_or(&self, index: usize, default: i64) -> Result<i64, DialogueError> {
        if self.is_default(index) {
            return Ok(default);
        }
        self.integer(index)
    }

    pub fn number_or(&self, index: usize, default: f64) -> Result<f64, DialogueError> {
        if self.is_default(index) {
            return Ok(default);
        }
        self.number(index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandInvocation {
    /// Bound or resolved receiver; `None` for static commands.
    pub receiver: Option<NodeHandle>,
    pub args: CommandArgs,
}

pub type CommandHandler =
    Arc<dyn Fn(CommandInvocation) -> Result<CommandReturn, DialogueError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandTarget {
    Static,
    /// Receiver fixed when the command was registered.
    Bound(NodeHandle),
    /// Receiver named by the first script argument; it must carry `component`.
    Component(String),
}

pub struct CommandDescriptor {
    name: String,
    signature: CommandSignature,
    target: CommandTarget,
    converters: Vec<Converter>,
    handler: CommandHandler,
}

impl CommandDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.signature.params
    }

    pub fn returns(&self) -> ReturnShape {
        self.signature.returns
    }

    pub fn target(&self) -> &CommandTarget {
        &self.target
    }

    pub fn is_static(&self) -> bool {
        self.target == CommandTarget::Static
    }

    /// Bounds on the number of script arguments, counting the target slot of
    /// component commands.
    pub fn arity(&self) -> (usize, usize) {
        let target_slot = usize::from(matches!(self.target, CommandTarget::Component(_)));
        (
            self.signature.required_count() + target_slot,
            self.signature.total_count() + target_slot,
        )
    }

    pub(crate) fn converters(&self) -> &[Converter] {
        &self.converters
    }

    pub(crate) fn invoke(
        &self,
        invocation: CommandInvocation,
    ) -> Result<CommandReturn, DialogueError> {
        (self.handler)(invocation)
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("target", &self.target)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    /// The name was taken; the existing entry was kept.
    Duplicate,
}

pub(crate) fn validate_name(kind: &str, name: &str) -> Result<(), DialogueError> {
    if name.is_empty() {
        return Err(DialogueError::new(
            "REGISTRY_NAME_EMPTY",
            format!("{} name must not be empty.", kind),
        ));
    }
    if name.chars().any(|ch| ch.is_whitespace() || ch == '"') {
        return Err(DialogueError::new(
            "REGISTRY_NAME_INVALID",
            format!(
                "{} name \"{}\" must not contain whitespace or quotes.",
                kind, name
            ),
        ));
    }
    Ok(())
}

fn validate_signature(name: &str, signature: &CommandSignature) -> Result<(), DialogueError> {
    if signature.returns == ReturnShape::Invalid {
        return Err(DialogueError::new(
            "REGISTRY_RETURN_INVALID",
            format!("Command \"{}\" has an invalid return shape.", name),
        ));
    }

    let mut seen_optional = false;
    let mut names = BTreeSet::new();
    for param in &signature.params {
        if param.optional {
            seen_optional = true;
        } else if seen_optional {
            return Err(DialogueError::new(
                "REGISTRY_PARAM_ORDER",
                format!(
                    "Command \"{}\" declares required parameter \"{}\" after an optional one.",
                    name, param.name
                ),
            ));
        }
        if !names.insert(param.name.as_str()) {
            return Err(DialogueError::new(
                "REGISTRY_PARAM_DUPLICATE",
                format!(
                    "Command \"{}\" declares parameter \"{}\" more than once.",
                    name, param.name
                ),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a static command. A taken name is logged and left untouched.
    pub fn register_command<F>(
        &mut self,
        name: &str,
        signature: CommandSignature,
        handler: F,
    ) -> Result<Registration, DialogueError>
    where
        F: Fn(CommandInvocation) -> Result<CommandReturn, DialogueError> + Send + Sync + 'static,
    {
        self.insert(name, signature, CommandTarget::Static, Arc::new(handler))
    }

    /// Registers a command bound to the node at `target_path`. The path must
    /// resolve now; an unresolved receiver is a setup error.
    pub fn register_method<F>(
        &mut self,
        name: &str,
        target_path: &str,
        scene: &dyn SceneLookup,
        signature: CommandSignature,
        handler: F,
    ) -> Result<Registration, DialogueError>
    where
        F: Fn(CommandInvocation) -> Result<CommandReturn, DialogueError> + Send + Sync + 'static,
    {
        let Some(node) = scene.find_node(target_path) else {
            return Err(DialogueError::new(
                "REGISTRY_TARGET_UNRESOLVED",
                format!(
                    "Command \"{}\" is bound to \"{}\", which is not in the scene.",
                    name, target_path
                ),
            ));
        };
        self.insert(name, signature, CommandTarget::Bound(node), Arc::new(handler))
    }

    /// Registers a command whose first script argument names the receiving
    /// node, which must carry `component`.
    pub fn register_component_command<F>(
        &mut self,
        name: &str,
        component: &str,
        signature: CommandSignature,
        handler: F,
    ) -> Result<Registration, DialogueError>
    where
        F: Fn(CommandInvocation) -> Result<CommandReturn, DialogueError> + Send + Sync + 'static,
    {
        if component.is_empty() {
            return Err(DialogueError::new(
                "REGISTRY_COMPONENT_EMPTY",
                format!("Command \"{}\" needs a component name.", name),
            ));
        }
        self.insert(
            name,
            signature,
            CommandTarget::Component(component.to_string()),
            Arc::new(handler),
        )
    }

    fn insert(
        &mut self,
        name: &str,
        signature: CommandSignature,
        target: CommandTarget,
        handler: CommandHandler,
    ) -> Result<Registration, DialogueError> {
        validate_name("Command", name)?;
        validate_signature(name, &signature)?;

        if self.commands.contains_key(name) {
            tracing::warn!(command = name, "command is already registered; keeping the existing handler");
            return Ok(Registration::Duplicate);
        }

        let converters = build_converters(&signature.params);
        tracing::debug!(command = name, params = signature.params.len(), "registered command");
        self.commands.insert(
            name.to_string(),
            CommandDescriptor {
                name: name.to_string(),
                signature,
                target,
                converters,
                handler,
            },
        );
        Ok(Registration::Added)
    }

    /// Removes a command. Returns false (after logging) if it was not registered.
    pub fn unregister_command(&mut self, name: &str) -> bool {
        if self.commands.remove(name).is_some() {
            tracing::debug!(command = name, "unregistered command");
            return true;
        }
        tracing::warn!(command = name, "cannot unregister unknown command");
        false
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

use dc_core::{ArgValue, DialogueError, DispatchStatus, NodeHandle, ReturnShape};

use crate::pending::PendingOperation;
use crate::registry::{
    CommandArgs, CommandDescriptor, CommandInvocation, CommandRegistry, CommandReturn,
    CommandTarget,
};
use crate::scene::SceneLookup;
use crate::tokenizer::tokenize;

/// Outcome of one dispatch. `pending` is set only for `SucceededAsync`.
#[derive(Debug)]
pub struct DispatchResult {
    pub status: DispatchStatus,
    pub message: Option<String>,
    pub pending: Option<PendingOperation>,
}

impl DispatchResult {
    fn failed(status: DispatchStatus, message: String) -> Self {
        Self {
            status,
            message: Some(message),
            pending: None,
        }
    }

    fn succeeded(outcome: CommandReturn) -> Self {
        match outcome {
            CommandReturn::Done => Self {
                status: DispatchStatus::SucceededSync,
                message: None,
                pending: None,
            },
            CommandReturn::Pending(operation) => Self {
                status: DispatchStatus::SucceededAsync,
                message: None,
                pending: Some(operation),
            },
        }
    }

    pub fn into_parts(self) -> (DispatchStatus, Option<String>, Option<PendingOperation>) {
        (self.status, self.message, self.pending)
    }
}

fn plural(count: usize, singular: &'static str, plural: &'static str) -> &'static str {
    if count == 1 {
        singular
    } else {
        plural
    }
}

pub(crate) fn arity_message(command: &str, min: usize, max: usize, provided: usize) -> String {
    let requirement = if min == max {
        format!("{} {}", min, plural(min, "parameter", "parameters"))
    } else if min == 0 {
        format!("at most {} {}", max, plural(max, "parameter", "parameters"))
    } else {
        format!("between {} and {} parameters", min, max)
    };
    format!(
        "{} requires {}, but {} {} provided.",
        command,
        requirement,
        provided,
        plural(provided, "was", "were")
    )
}

/// A handler must return what its signature declared: `Done` for
/// fire-and-forget commands, `Pending` for async ones.
fn check_return_shape(
    command: &str,
    declared: ReturnShape,
    outcome: &CommandReturn,
) -> Result<(), DialogueError> {
    let matches = matches!(
        (declared, outcome),
        (ReturnShape::FireAndForget, CommandReturn::Done)
            | (ReturnShape::AsyncCompletion, CommandReturn::Pending(_))
    );
    if matches {
        return Ok(());
    }
    let returned = match outcome {
        CommandReturn::Done => "Done",
        CommandReturn::Pending(_) => "Pending",
    };
    Err(DialogueError::new(
        "DISPATCH_RETURN_MISMATCH",
        format!(
            "Command \"{}\" is declared {:?} but its handler returned {}.",
            command, declared, returned
        ),
    ))
}

/// Resolves command text against a registry and invokes the matching handler.
pub struct Dispatcher<'a> {
    registry: &'a CommandRegistry,
    scene: &'a dyn SceneLookup,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a CommandRegistry, scene: &'a dyn SceneLookup) -> Self {
        Self { registry, scene }
    }

    /// Argument-level problems come back as a failed `DispatchResult`; an
    /// error returned by the handler itself is passed through as `Err`.
    pub fn dispatch(&self, text: &str) -> Result<DispatchResult, DialogueError> {
        let mut tokens = tokenize(text).into_iter();
        let Some(name) = tokens.next() else {
            return Ok(DispatchResult::failed(
                DispatchStatus::CommandUnknown,
                "No command name was given.".to_string(),
            ));
        };
        let Some(descriptor) = self.registry.get(&name) else {
            return Ok(DispatchResult::failed(
                DispatchStatus::CommandUnknown,
                format!("No command named \"{}\" is registered.", name),
            ));
        };

        let raw_args: Vec<String> = tokens.collect();
        let (min, max) = descriptor.arity();
        if raw_args.len() < min || raw_args.len() > max {
            return Ok(DispatchResult::failed(
                DispatchStatus::InvalidParameterCount,
                arity_message(&name, min, max, raw_args.len()),
            ));
        }

        let mut raw_args = raw_args.into_iter();
        let receiver = match descriptor.target() {
            CommandTarget::Static => None,
            CommandTarget::Bound(node) => Some(*node),
            CommandTarget::Component(component) => {
                let target_name = raw_args.next().unwrap_or_default();
                match self.resolve_target(&name, &target_name, component) {
                    Ok(node) => Some(node),
                    Err(failure) => return Ok(failure),
                }
            }
        };

        let values = match self.convert_arguments(descriptor, raw_args.collect()) {
            Ok(values) => values,
            Err(message) => {
                return Ok(DispatchResult::failed(
                    DispatchStatus::InvalidParameterCount,
                    message,
                ))
            }
        };

        tracing::debug!(command = name.as_str(), "dispatching command");
        let outcome = descriptor.invoke(CommandInvocation {
            receiver,
            args: CommandArgs::new(name, values),
        })?;
        check_return_shape(descriptor.name(), descriptor.returns(), &outcome)?;
        Ok(DispatchResult::succeeded(outcome))
    }

    fn resolve_target(
        &self,
        command: &str,
        target_name: &str,
        component: &str,
    ) -> Result<NodeHandle, DispatchResult> {
        let Some(node) = self.scene.find_node(target_name) else {
            return Err(DispatchResult::failed(
                DispatchStatus::NoTargetFound,
                format!(
                    "{} failed because no node named \"{}\" was found.",
                    command, target_name
                ),
            ));
        };
        if !self.scene.has_component(node, component) {
            return Err(DispatchResult::failed(
                DispatchStatus::TargetMissingComponent,
                format!(
                    "{} failed because node \"{}\" has no {} component.",
                    command, target_name, component
                ),
            ));
        }
        Ok(node)
    }

    fn convert_arguments(
        &self,
        descriptor: &CommandDescriptor,
        raw_args: Vec<String>,
    ) -> Result<Vec<ArgValue>, String> {
        let converters = descriptor.converters();
        let mut values = Vec::with_capacity(converters.len());
        for (index, converter) in converters.iter().enumerate() {
            let Some(token) = raw_args.get(index) else {
                values.push(ArgValue::Default);
                continue;
            };
            let value = converter(token, self.scene).map_err(|error| {
                format!(
                    "Can't convert parameter {} to {}: {}",
                    index,
                    descriptor.params()[index].kind.type_name(),
                    error
                )
            })?;
            values.push(value);
        }
        Ok(values)
    }
}

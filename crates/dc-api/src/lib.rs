mod builtins;
mod runner;

pub use builtins::{register_builtin_commands, WAIT_COMMAND};
pub use runner::{DialogueRunner, DialogueRunnerOptions, UnhandledCommandHandler};

pub use dc_core::{
    ArgValue, CommandSignature, DialogueError, DispatchStatus, NodeHandle, ParamKind, ParamSpec,
    ReturnShape, Value,
};
pub use dc_runtime::{
    await_completion, pending_operation, CommandArgs, CommandInvocation, CommandRegistry,
    CommandReturn, Completer, DispatchResult, EmptyScene, FunctionRegistry, PendingOperation,
    Registration, Resolution, SceneGraph, SceneLookup, Timers, VariableStorage,
};

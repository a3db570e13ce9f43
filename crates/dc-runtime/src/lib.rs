mod convert;
mod dispatch;
mod expr;
mod functions;
mod pending;
mod registry;
mod scene;
mod timers;
mod tokenizer;
mod variables;

pub use convert::{build_converter, build_converters, ConversionError, Converter};
pub use dispatch::{DispatchResult, Dispatcher};
pub use expr::{evaluate_expression, render_text};
pub use functions::{FunctionDescriptor, FunctionImpl, FunctionRegistry, MAX_FUNCTION_ARITY};
pub use pending::{await_completion, pending_operation, Completer, PendingOperation, Resolution};
pub use registry::{
    CommandArgs, CommandDescriptor, CommandHandler, CommandInvocation, CommandRegistry,
    CommandReturn, CommandTarget, Registration,
};
pub use scene::{EmptyScene, SceneGraph, SceneLookup};
pub use timers::Timers;
pub use tokenizer::tokenize;
pub use variables::VariableStorage;

#[cfg(test)]
mod tests;

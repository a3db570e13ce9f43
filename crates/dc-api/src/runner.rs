use dc_core::{CommandSignature, DialogueError, DispatchStatus, Value};
use dc_runtime::{
    await_completion, evaluate_expression, render_text, CommandInvocation, CommandRegistry,
    CommandReturn, DispatchResult, Dispatcher, EmptyScene, FunctionRegistry, PendingOperation,
    Registration, SceneLookup, Timers, VariableStorage,
};

use crate::builtins::register_builtin_commands;

#[derive(Debug, Clone)]
pub struct DialogueRunnerOptions {
    /// Seconds an async command may stay pending before the runner gives up on
    /// it and resumes. `None` waits forever.
    pub command_timeout: Option<f64>,
    pub register_builtins: bool,
}

impl Default for DialogueRunnerOptions {
    fn default() -> Self {
        Self {
            command_timeout: None,
            register_builtins: true,
        }
    }
}

pub type UnhandledCommandHandler = Box<dyn FnMut(&str) + Send>;

#[derive(Debug)]
struct InFlight {
    command: String,
    operation: PendingOperation,
    elapsed: f64,
}

/// One dialogue session: owns the registries, variables, scene and timers,
/// and runs one command at a time.
pub struct DialogueRunner {
    commands: CommandRegistry,
    functions: FunctionRegistry,
    variables: VariableStorage,
    scene: Box<dyn SceneLookup>,
    timers: Timers,
    options: DialogueRunnerOptions,
    unhandled_command: Option<UnhandledCommandHandler>,
    in_flight: Option<InFlight>,
}

impl DialogueRunner {
    pub fn new(options: DialogueRunnerOptions) -> Result<Self, DialogueError> {
        Self::with_scene(options, Box::new(EmptyScene))
    }

    pub fn with_scene(
        options: DialogueRunnerOptions,
        scene: Box<dyn SceneLookup>,
    ) -> Result<Self, DialogueError> {
        if let Some(timeout) = options.command_timeout {
            if !timeout.is_finite() || timeout <= 0.0 {
                return Err(DialogueError::new(
                    "RUNNER_TIMEOUT_INVALID",
                    format!("Command timeout must be a positive number of seconds, got {}.", timeout),
                ));
            }
        }

        let mut runner = Self {
            commands: CommandRegistry::new(),
            functions: FunctionRegistry::new(),
            variables: VariableStorage::new(),
            scene,
            timers: Timers::new(),
            options,
            unhandled_command: None,
            in_flight: None,
        };
        if runner.options.register_builtins {
            register_builtin_commands(&mut runner.commands, &runner.timers)?;
        }
        Ok(runner)
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandRegistry {
        &mut self.commands
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    pub fn variables(&self) -> &VariableStorage {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut VariableStorage {
        &mut self.variables
    }

    pub fn scene(&self) -> &dyn SceneLookup {
        self.scene.as_ref()
    }

    pub fn set_scene(&mut self, scene: Box<dyn SceneLookup>) {
        self.scene = scene;
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn set_unhandled_command_handler(&mut self, handler: UnhandledCommandHandler) {
        self.unhandled_command = Some(handler);
    }

    /// Registers a command bound to a node of the runner's current scene.
    pub fn register_method<F>(
        &mut self,
        name: &str,
        target_path: &str,
        signature: CommandSignature,
        handler: F,
    ) -> Result<Registration, DialogueError>
    where
        F: Fn(CommandInvocation) -> Result<CommandReturn, DialogueError> + Send + Sync + 'static,
    {
        self.commands
            .register_method(name, target_path, self.scene.as_ref(), signature, handler)
    }

    /// Drops every registered command, then re-adds the built-ins. Used when
    /// switching to another dialogue program.
    pub fn reset_commands(&mut self) -> Result<(), DialogueError> {
        self.ensure_idle()?;
        self.commands.clear();
        if self.options.register_builtins {
            register_builtin_commands(&mut self.commands, &self.timers)?;
        }
        Ok(())
    }

    /// True while an async command has not resolved yet.
    pub fn is_waiting(&self) -> bool {
        self.in_flight
            .as_ref()
            .map(|in_flight| !in_flight.operation.is_resolved())
            .unwrap_or(false)
    }

    fn ensure_idle(&self) -> Result<(), DialogueError> {
        match &self.in_flight {
            Some(in_flight) if !in_flight.operation.is_resolved() => Err(DialogueError::new(
                "RUNNER_COMMAND_IN_FLIGHT",
                format!(
                    "Command \"{}\" is still running; wait for it before dispatching another.",
                    in_flight.command
                ),
            )),
            _ => Ok(()),
        }
    }

    /// Dispatches one command and arranges for `continuation` to run exactly
    /// once: right away unless the command went async, in which case it runs
    /// when the command's operation resolves. Handler errors are returned and
    /// the continuation is dropped.
    pub fn run_command<F>(&mut self, text: &str, continuation: F) -> Result<DispatchResult, DialogueError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.ensure_idle()?;
        self.in_flight = None;

        let result = Dispatcher::new(&self.commands, self.scene.as_ref()).dispatch(text)?;
        match result.status {
            DispatchStatus::SucceededSync => continuation(),
            DispatchStatus::SucceededAsync => {
                if let Some(operation) = &result.pending {
                    if !operation.is_resolved() {
                        self.in_flight = Some(InFlight {
                            command: text.to_string(),
                            operation: operation.clone(),
                            elapsed: 0.0,
                        });
                    }
                }
                await_completion(result.pending.as_ref(), continuation);
            }
            DispatchStatus::CommandUnknown => {
                match self.unhandled_command.as_mut() {
                    Some(handler) => handler(text),
                    None => tracing::warn!(command = text, "no command handler matched"),
                }
                continuation();
            }
            status => {
                tracing::warn!(
                    command = text,
                    status = status.as_str(),
                    message = result.message.as_deref().unwrap_or_default(),
                    "command dispatch failed"
                );
                continuation();
            }
        }
        Ok(result)
    }

    /// Advances timers by one host frame and enforces the command timeout.
    pub fn update(&mut self, delta_seconds: f64) {
        self.timers.advance(delta_seconds);

        let Some(in_flight) = self.in_flight.as_mut() else {
            return;
        };
        if in_flight.operation.is_resolved() {
            self.in_flight = None;
            return;
        }
        if delta_seconds.is_finite() && delta_seconds > 0.0 {
            in_flight.elapsed += delta_seconds;
        }
        let Some(timeout) = self.options.command_timeout else {
            return;
        };
        if in_flight.elapsed >= timeout {
            tracing::warn!(
                command = in_flight.command.as_str(),
                timeout,
                "command timed out; resuming dialogue"
            );
            in_flight.operation.time_out();
            self.in_flight = None;
        }
    }

    pub fn evaluate(&self, expr: &str) -> Result<Value, DialogueError> {
        evaluate_expression(expr, &self.functions, &self.variables)
    }

    pub fn render_line(&self, text: &str) -> Result<String, DialogueError> {
        render_text(text, &self.functions, &self.variables)
    }
}

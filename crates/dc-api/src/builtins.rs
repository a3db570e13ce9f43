use dc_core::{CommandSignature, DialogueError, ParamKind};
use dc_runtime::{CommandRegistry, CommandReturn, Timers};

pub const WAIT_COMMAND: &str = "wait";

/// Registers the commands every runner provides: `wait <seconds>`.
pub fn register_builtin_commands(
    commands: &mut CommandRegistry,
    timers: &Timers,
) -> Result<(), DialogueError> {
    let timers = timers.clone();
    commands.register_command(
        WAIT_COMMAND,
        CommandSignature::asynchronous().required("duration", ParamKind::Number),
        move |invocation| {
            let seconds = invocation.args.number(0)?;
            Ok(CommandReturn::Pending(timers.schedule(seconds)))
        },
    )?;
    Ok(())
}

use std::ffi::OsString;
use std::io::Write;

use clap::Parser;
use dc_core::DialogueError;
use dc_runtime::{CommandTarget, SceneGraph};

mod cli_args;
mod demo;
mod error_map;
mod logging;
mod models;
mod playback;
mod source_loader;

pub(crate) use cli_args::{Cli, DispatchArgs, FrameArgs, Mode, RunArgs};
pub(crate) use error_map::{
    emit_error, map_cli_json, map_cli_output, map_cli_source_read, map_cli_source_scan,
};
pub(crate) use logging::init_logging;
pub(crate) use models::{
    CommandEvent, CommandSummary, FunctionSummary, LoadedScript, PlaybackOptions,
    PlaybackSummary, ResumedEvent, ScriptLine, SetEvent,
};
pub(crate) use source_loader::{load_script_file, load_scripts_dir};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    init_logging(&cli.log_level);
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, DialogueError> {
    match cli.command {
        Mode::Run(args) => run_scripts(args),
        Mode::Dispatch(args) => run_dispatch(args),
        Mode::Commands => run_commands(),
    }
}

fn playback_options(frames: &FrameArgs) -> Result<PlaybackOptions, DialogueError> {
    if frames.frame_ms == 0 {
        return Err(DialogueError::new(
            "CLI_FRAME_INVALID",
            "--frame-ms must be at least 1.",
        ));
    }
    Ok(PlaybackOptions {
        frame_seconds: frames.frame_ms as f64 / 1000.0,
        max_frames: frames.max_frames,
        realtime: frames.realtime,
    })
}

fn run_scripts(args: RunArgs) -> Result<i32, DialogueError> {
    let scripts = match (&args.script, &args.scripts_dir) {
        (Some(path), _) => vec![load_script_file(path)?],
        (None, Some(dir)) => load_scripts_dir(dir)?,
        (None, None) => {
            return Err(DialogueError::new(
                "CLI_SOURCE_MISSING",
                "Pass --script or --scripts-dir.",
            ))
        }
    };
    let options = playback_options(&args.frames)?;
    let (mut runner, journal) = demo::build_demo_runner(args.frames.timeout)?;
    tracing::debug!(scripts = scripts.len(), "starting playback");

    let mut out = std::io::stdout().lock();
    let mut total = PlaybackSummary::default();
    for script in &scripts {
        writeln!(
            out,
            "SCRIPT:{}",
            serde_json::to_string(&script.path).map_err(map_cli_json)?
        )
        .map_err(map_cli_output)?;
        let lines = playback::parse_script(&script.source);
        let summary = playback::play_lines(&mut runner, &journal, &lines, options, &mut out)?;
        total.texts += summary.texts;
        total.commands += summary.commands;
        total.failed_commands += summary.failed_commands;
        total.frames += summary.frames;
    }
    finish(&mut out, &total)
}

fn run_dispatch(args: DispatchArgs) -> Result<i32, DialogueError> {
    let options = playback_options(&args.frames)?;
    let (mut runner, journal) = demo::build_demo_runner(args.frames.timeout)?;
    let mut out = std::io::stdout().lock();
    let summary = playback::play_lines(
        &mut runner,
        &journal,
        &[ScriptLine::Command(args.text)],
        options,
        &mut out,
    )?;
    finish(&mut out, &summary)
}

fn finish<W: Write>(out: &mut W, summary: &PlaybackSummary) -> Result<i32, DialogueError> {
    writeln!(
        out,
        "SUMMARY:{}",
        serde_json::to_string(summary).map_err(map_cli_json)?
    )
    .map_err(map_cli_output)?;
    writeln!(out, "RESULT:OK").map_err(map_cli_output)?;
    Ok(0)
}

fn target_label(scene: &SceneGraph, target: &CommandTarget) -> String {
    match target {
        CommandTarget::Static => "static".to_string(),
        CommandTarget::Bound(node) => format!(
            "bound:{}",
            scene.node_path(*node).unwrap_or("<detached>")
        ),
        CommandTarget::Component(component) => format!("component:{}", component),
    }
}

fn run_commands() -> Result<i32, DialogueError> {
    let (runner, _journal) = demo::build_demo_runner(None)?;
    let scene = demo::demo_scene();
    let mut out = std::io::stdout().lock();

    let commands = runner.commands();
    for descriptor in commands.names().into_iter().filter_map(|name| commands.get(name)) {
        let summary = CommandSummary {
            name: descriptor.name(),
            params: descriptor.params(),
            returns: descriptor.returns(),
            target: target_label(&scene, descriptor.target()),
        };
        writeln!(
            out,
            "COMMAND:{}",
            serde_json::to_string(&summary).map_err(map_cli_json)?
        )
        .map_err(map_cli_output)?;
    }
    let functions = runner.functions();
    for descriptor in functions.names().into_iter().filter_map(|name| functions.get(name)) {
        let summary = FunctionSummary {
            name: descriptor.name(),
            arity: descriptor.arity(),
        };
        writeln!(
            out,
            "FUNCTION:{}",
            serde_json::to_string(&summary).map_err(map_cli_json)?
        )
        .map_err(map_cli_output)?;
    }
    writeln!(out, "RESULT:OK").map_err(map_cli_output)?;
    Ok(0)
}

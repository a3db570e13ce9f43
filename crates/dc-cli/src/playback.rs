use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use dc_api::DialogueRunner;
use dc_core::DialogueError;
use regex::Regex;
use serde::Serialize;

use crate::demo::Journal;
use crate::{
    map_cli_json, map_cli_output, CommandEvent, PlaybackOptions, PlaybackSummary, ResumedEvent,
    ScriptLine, SetEvent,
};

fn command_line_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^\s*<<(.*)>>\s*$").expect("regex must compile"))
}

fn set_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^set\s+(\$[A-Za-z_][A-Za-z0-9_]*)\s*(?:=|to)\s*(.+)$")
            .expect("regex must compile")
    })
}

/// Splits a script into text lines and `<<...>>` commands. Blank lines and
/// `//` comments are skipped.
pub(crate) fn parse_script(source: &str) -> Vec<ScriptLine> {
    source
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                return None;
            }
            let Some(captures) = command_line_regex().captures(line) else {
                return Some(ScriptLine::Text(trimmed.to_string()));
            };
            let body = captures[1].trim();
            Some(match set_regex().captures(body) {
                Some(set) => ScriptLine::Set {
                    name: set[1].to_string(),
                    expr: set[2].trim().to_string(),
                },
                None => ScriptLine::Command(body.to_string()),
            })
        })
        .collect()
}

fn emit<W: Write, T: Serialize + ?Sized>(
    out: &mut W,
    tag: &str,
    payload: &T,
) -> Result<(), DialogueError> {
    let json = serde_json::to_string(payload).map_err(map_cli_json)?;
    writeln!(out, "EVENT:{}:{}", tag, json).map_err(map_cli_output)
}

fn emit_journal<W: Write>(out: &mut W, journal: &Journal) -> Result<(), DialogueError> {
    for entry in journal.drain() {
        emit(out, "LOG", &entry)?;
    }
    Ok(())
}

pub(crate) fn play_lines<W: Write>(
    runner: &mut DialogueRunner,
    journal: &Journal,
    lines: &[ScriptLine],
    options: PlaybackOptions,
    out: &mut W,
) -> Result<PlaybackSummary, DialogueError> {
    let mut summary = PlaybackSummary::default();
    for line in lines {
        match line {
            ScriptLine::Text(text) => {
                let rendered = runner.render_line(text)?;
                emit(out, "TEXT", &rendered)?;
                summary.texts += 1;
            }
            ScriptLine::Set { name, expr } => {
                let value = runner.evaluate(expr)?;
                runner.variables_mut().set_value(name, value.clone())?;
                emit(out, "SET", &SetEvent { name, value: &value })?;
            }
            ScriptLine::Command(command) => {
                let frames = play_command(runner, journal, command, options, out, &mut summary)?;
                summary.frames += frames;
            }
        }
    }
    Ok(summary)
}

fn play_command<W: Write>(
    runner: &mut DialogueRunner,
    journal: &Journal,
    command: &str,
    options: PlaybackOptions,
    out: &mut W,
    summary: &mut PlaybackSummary,
) -> Result<usize, DialogueError> {
    let resumed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&resumed);
    let result = runner.run_command(command, move || flag.store(true, Ordering::SeqCst))?;

    summary.commands += 1;
    if !result.status.is_success() {
        summary.failed_commands += 1;
    }
    emit(
        out,
        "COMMAND",
        &CommandEvent {
            command,
            status: result.status,
            message: result.message.as_deref(),
        },
    )?;
    emit_journal(out, journal)?;

    if resumed.load(Ordering::SeqCst) {
        return Ok(0);
    }

    let mut frames = 0;
    while !resumed.load(Ordering::SeqCst) {
        if frames >= options.max_frames {
            return Err(DialogueError::new(
                "CLI_FRAME_GUARD",
                format!(
                    "Command \"{}\" did not resume within {} frames.",
                    command, options.max_frames
                ),
            ));
        }
        if options.realtime {
            std::thread::sleep(Duration::from_secs_f64(options.frame_seconds));
        }
        runner.update(options.frame_seconds);
        frames += 1;
    }
    emit(out, "RESUMED", &ResumedEvent { command, frames })?;
    emit_journal(out, journal)?;
    Ok(frames)
}

use std::sync::{Arc, Mutex, PoisonError};

use dc_api::{DialogueRunner, DialogueRunnerOptions};
use dc_core::{CommandSignature, DialogueError, NodeHandle, ParamKind, Value};
use dc_runtime::{CommandReturn, SceneGraph};

pub(crate) const CAMERA_PATH: &str = "/root/camera";

/// Lines the demo commands report back to the player.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub(crate) fn push(&self, entry: String) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    pub(crate) fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

pub(crate) fn demo_scene() -> SceneGraph {
    let mut scene = SceneGraph::new();
    scene.add_node("/root/player", ["Walker", "Sprite"]);
    scene.add_node("/root/guard", ["Sprite"]);
    scene.add_node(CAMERA_PATH, ["Camera"]);
    scene
}

fn node_label(scene: &SceneGraph, node: Option<NodeHandle>) -> String {
    node.and_then(|node| scene.node_path(node))
        .unwrap_or("<none>")
        .to_string()
}

pub(crate) fn build_demo_runner(
    command_timeout: Option<f64>,
) -> Result<(DialogueRunner, Journal), DialogueError> {
    let scene = demo_scene();
    let mut runner = DialogueRunner::with_scene(
        DialogueRunnerOptions {
            command_timeout,
            register_builtins: true,
        },
        Box::new(scene.clone()),
    )?;
    let journal = Journal::default();

    let log_journal = journal.clone();
    runner.commands_mut().register_command(
        "log",
        CommandSignature::sync()
            .required("message", ParamKind::String)
            .optional("level", ParamKind::String),
        move |invocation| {
            let level = invocation.args.string_or(1, "info")?;
            log_journal.push(format!("[{}] {}", level, invocation.args.string(0)?));
            Ok(CommandReturn::Done)
        },
    )?;

    let walk_journal = journal.clone();
    let walk_scene = scene.clone();
    let walk_timers = runner.timers().clone();
    runner.commands_mut().register_component_command(
        "walk_to_point",
        "Walker",
        CommandSignature::asynchronous()
            .required("x", ParamKind::Number)
            .required("y", ParamKind::Number)
            .optional("speed", ParamKind::Number),
        move |invocation| {
            let x = invocation.args.number(0)?;
            let y = invocation.args.number(1)?;
            let speed = invocation.args.number_or(2, 2.0)?;
            if speed <= 0.0 {
                return Err(DialogueError::new(
                    "DEMO_SPEED_INVALID",
                    format!("walk_to_point speed must be positive, got {}.", speed),
                ));
            }
            walk_journal.push(format!(
                "{} walks to ({}, {})",
                node_label(&walk_scene, invocation.receiver),
                Value::Number(x),
                Value::Number(y)
            ));
            Ok(walk_timers.schedule(x.hypot(y) / speed).into())
        },
    )?;

    let visible_journal = journal.clone();
    let visible_scene = scene.clone();
    runner.commands_mut().register_component_command(
        "set_visible",
        "Sprite",
        CommandSignature::sync().required("visible", ParamKind::Boolean),
        move |invocation| {
            let visible = invocation.args.boolean(0)?;
            visible_journal.push(format!(
                "{} is now {}",
                node_label(&visible_scene, invocation.receiver),
                if visible { "visible" } else { "hidden" }
            ));
            Ok(CommandReturn::Done)
        },
    )?;

    let shake_journal = journal.clone();
    let shake_timers = runner.timers().clone();
    runner.register_method(
        "shake",
        CAMERA_PATH,
        CommandSignature::asynchronous()
            .required("intensity", ParamKind::Number)
            .optional("duration", ParamKind::Number),
        move |invocation| {
            let intensity = invocation.args.number(0)?;
            let duration = invocation.args.number_or(1, 0.5)?;
            shake_journal.push(format!(
                "camera shakes at {} for {}s",
                Value::Number(intensity),
                Value::Number(duration)
            ));
            Ok(shake_timers.schedule(duration).into())
        },
    )?;

    runner.functions_mut().register_function("upper", 1, |args: &[Value]| {
        Ok(Value::String(args[0].to_string().to_uppercase()))
    })?;
    runner.functions_mut().register_function("greater", 2, |args: &[Value]| {
        match (args[0].as_number(), args[1].as_number()) {
            (Some(left), Some(right)) => Ok(Value::Number(left.max(right))),
            _ => Err(DialogueError::new("DEMO_TYPE", "greater expects two numbers.")),
        }
    })?;

    Ok((runner, journal))
}

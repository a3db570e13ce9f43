use dc_core::{DispatchStatus, ParamSpec, ReturnShape, Value};
use serde::Serialize;

#[derive(Debug, Clone)]
pub(crate) struct LoadedScript {
    pub(crate) path: String,
    pub(crate) source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScriptLine {
    Text(String),
    Command(String),
    Set { name: String, expr: String },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PlaybackOptions {
    pub(crate) frame_seconds: f64,
    pub(crate) max_frames: usize,
    pub(crate) realtime: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaybackSummary {
    pub(crate) texts: usize,
    pub(crate) commands: usize,
    pub(crate) failed_commands: usize,
    pub(crate) frames: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommandEvent<'a> {
    pub(crate) command: &'a str,
    pub(crate) status: DispatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetEvent<'a> {
    pub(crate) name: &'a str,
    pub(crate) value: &'a Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResumedEvent<'a> {
    pub(crate) command: &'a str,
    pub(crate) frames: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommandSummary<'a> {
    pub(crate) name: &'a str,
    pub(crate) params: &'a [ParamSpec],
    pub(crate) returns: ReturnShape,
    pub(crate) target: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FunctionSummary<'a> {
    pub(crate) name: &'a str,
    pub(crate) arity: usize,
}

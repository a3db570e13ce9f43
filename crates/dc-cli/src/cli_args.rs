use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "dc-cli")]
#[command(about = "Plays dialogue command scripts against a demo command registry")]
pub(crate) struct Cli {
    #[arg(long = "log-level", global = true, default_value = "warn")]
    pub(crate) log_level: String,
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Run(RunArgs),
    Dispatch(DispatchArgs),
    Commands,
}

#[derive(Debug, Args)]
pub(crate) struct FrameArgs {
    #[arg(long = "frame-ms", default_value_t = 16)]
    pub(crate) frame_ms: u64,
    #[arg(long = "max-frames", default_value_t = 100_000)]
    pub(crate) max_frames: usize,
    #[arg(long = "timeout")]
    pub(crate) timeout: Option<f64>,
    #[arg(long = "realtime")]
    pub(crate) realtime: bool,
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[arg(long = "script", conflicts_with = "scripts_dir", required_unless_present = "scripts_dir")]
    pub(crate) script: Option<String>,
    #[arg(long = "scripts-dir")]
    pub(crate) scripts_dir: Option<String>,
    #[command(flatten)]
    pub(crate) frames: FrameArgs,
}

#[derive(Debug, Args)]
pub(crate) struct DispatchArgs {
    pub(crate) text: String,
    #[command(flatten)]
    pub(crate) frames: FrameArgs,
}

use dc_core::DialogueError;
use std::fmt::Display;

fn map_error(code: &'static str, error: impl Display) -> DialogueError {
    DialogueError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: DialogueError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).unwrap_or_else(|_| "\"\"".to_string())
    );
    1
}

pub(crate) fn map_cli_output(error: std::io::Error) -> DialogueError {
    map_error("CLI_OUTPUT", error)
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> DialogueError {
    map_error("CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_source_scan(error: walkdir::Error) -> DialogueError {
    map_error("CLI_SOURCE_SCAN", error)
}

pub(crate) fn map_cli_json(error: serde_json::Error) -> DialogueError {
    map_error("CLI_JSON", error)
}

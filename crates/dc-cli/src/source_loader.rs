use std::fs;
use std::path::Path;

use dc_core::DialogueError;
use walkdir::WalkDir;

use crate::{map_cli_source_read, map_cli_source_scan, LoadedScript};

pub(crate) const SCRIPT_EXTENSION: &str = "dialogue";

pub(crate) fn load_script_file(path: &str) -> Result<LoadedScript, DialogueError> {
    let source = fs::read_to_string(path).map_err(map_cli_source_read)?;
    Ok(LoadedScript {
        path: path.to_string(),
        source,
    })
}

/// Every `.dialogue` file under `dir`, sorted by path.
pub(crate) fn load_scripts_dir(dir: &str) -> Result<Vec<LoadedScript>, DialogueError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(map_cli_source_scan)?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some(SCRIPT_EXTENSION)
        {
            paths.push(path.to_path_buf());
        }
    }
    paths.sort();

    if paths.is_empty() {
        return Err(DialogueError::new(
            "CLI_SOURCE_EMPTY",
            format!("No .{} files under {}.", SCRIPT_EXTENSION, dir),
        ));
    }

    paths
        .iter()
        .map(|path| load_script_file(&path_to_string(path)))
        .collect()
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// JSON-lines file IO for `file://` sources and sinks

use pipetask_core::domain::Record;
use pipetask_core::port::ExecutionError;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;

/// URI scheme marking file-backed sources and sinks
pub const FILE_SCHEME: &str = "file://";

/// Path of a `file://` URI, `None` for anything else
pub fn file_path(uri: &str) -> Option<&Path> {
    uri.strip_prefix(FILE_SCHEME).map(Path::new)
}

/// Read one JSON value per non-blank line
pub async fn read_jsonl(path: &Path) -> Result<Vec<Record>, ExecutionError> {
    let content = fs::read_to_string(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => ExecutionError::SourceNotFound(path.display().to_string()),
        _ => ExecutionError::Io(format!("{}: {}", path.display(), e)),
    })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| {
                ExecutionError::Io(format!("{}:{}: {}", path.display(), idx + 1, e))
            })
        })
        .collect()
}

/// Write records one per line, replacing the file. Parent directories are created.
pub async fn write_jsonl(path: &Path, records: &[Record]) -> Result<(), ExecutionError> {
    let io_err = |e: std::io::Error| ExecutionError::Io(format!("{}: {}", path.display(), e));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let mut content = String::new();
    for record in records {
        let line = serde_json::to_string(record)
            .map_err(|e| ExecutionError::Io(format!("{}: {}", path.display(), e)))?;
        content.push_str(&line);
        content.push('\n');
    }
    fs::write(path, content).await.map_err(io_err)
}

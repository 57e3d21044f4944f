//! Input discovery: the files a run will convert, in a stable order.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Lists regular files directly inside `dir` whose extension is exactly
/// `extension`, sorted by file name. Subdirectories are not descended.
///
/// The match is case-sensitive: outputs are named after the file stem, so
/// `a.xml` and `a.XML` in one run would write the same output file.
pub fn discover_inputs(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, ConfigError> {
    let unreadable = |source| ConfigError::InputUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == extension);
        if matches {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Applies the optional file-count limit, keeping discovery order.
pub fn truncate_to_limit(mut files: Vec<PathBuf>, limit: Option<usize>) -> Vec<PathBuf> {
    if let Some(limit) = limit {
        files.truncate(limit);
    }
    files
}

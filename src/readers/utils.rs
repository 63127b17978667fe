use std::path::{Path, PathBuf};

use glob::glob;
use walkdir::WalkDir;

use super::types::ReadError;

/// Resolve a file pattern relative to `data_dir` into a sorted list of paths.
/// Falls back to a recursive search when a plain filename matches nothing at
/// its direct location, so files organised into subdirectories are still
/// found. No match at all is an error carrying the offending pattern.
pub fn resolve_files(data_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, ReadError> {
    let full_pattern = data_dir.join(pattern);
    let full_pattern = full_pattern.to_string_lossy();

    let mut paths: Vec<PathBuf> = glob(&full_pattern)
        .map_err(|e| ReadError::Pattern(format!("{}: {}", full_pattern, e)))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();

    if paths.is_empty() && !pattern.contains(['*', '?', '[']) {
        if let Some(found) = search_file_recursively(data_dir, pattern) {
            paths.push(found);
        }
    }

    if paths.is_empty() {
        return Err(ReadError::NoFilesMatched(full_pattern.to_string()));
    }

    paths.sort();
    Ok(paths)
}

/// Search for a file by name recursively within a directory.
fn search_file_recursively(base_dir: &Path, filename: &str) -> Option<PathBuf> {
    if !base_dir.exists() {
        return None;
    }

    let wanted = Path::new(filename).file_name()?;

    for entry in WalkDir::new(base_dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file()
            && let Some(file_name) = entry.path().file_name()
            && file_name == wanted
        {
            return Some(entry.path().to_path_buf());
        }
    }

    None
}

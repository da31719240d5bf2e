//! Utilities for input path collection and size formatting.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{MergeError, Result};

/// Expand multiple glob patterns into filesystem paths, in argument order.
///
/// Accepts anything iterable with items that convert to `&str`, e.g.:
/// `&[&str]`, `Vec<String>`, or `Vec<&str>`.
///
/// A plain path, or a pattern that matches nothing, is passed through
/// unchanged so that later validation can report it as missing.
///
/// Errors:
/// - Propagates `glob` parse errors.
/// - Propagates filesystem errors from glob iterator.
pub fn collect_paths_for_patterns<T>(patterns: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved_paths = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        if !is_glob_pattern(pattern) {
            resolved_paths.push(PathBuf::from(pattern));
            continue;
        }

        let matches = collect_paths_for_pattern(pattern)?;
        if matches.is_empty() {
            resolved_paths.push(PathBuf::from(pattern));
        } else {
            resolved_paths.extend(matches);
        }
    }

    Ok(resolved_paths)
}

/// Expand a single glob pattern into filesystem paths.
///
/// Pattern examples:
/// - `"**/*.pdf"`
/// - `"./docs/*.pdf"`
fn collect_paths_for_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|err| MergeError::invalid_config(format!("Invalid pattern '{pattern}': {err}")))?;

    paths
        .map(|entry| entry.map_err(|err| MergeError::other(err.to_string())))
        .collect()
}

fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Read input paths from a list file.
///
/// One path per line. Lines starting with `#` are comments and blank lines
/// are skipped; surrounding whitespace is trimmed.
///
/// # Errors
///
/// Returns [`MergeError::InvalidConfig`] if the list cannot be read.
pub async fn read_input_list(path: &Path) -> Result<Vec<PathBuf>> {
    let to_error = |e: std::io::Error| {
        MergeError::invalid_config(format!("Failed to read input list {}: {e}", path.display()))
    };

    let file = tokio::fs::File::open(path).await.map_err(to_error)?;
    let mut lines = BufReader::new(file).lines();
    let mut paths = Vec::new();

    while let Some(line) = lines.next_line().await.map_err(to_error)? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        paths.push(PathBuf::from(line));
    }

    Ok(paths)
}

/// Format file size as human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}

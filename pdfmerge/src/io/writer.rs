//! Writing merged output to disk.
//!
//! Writes are atomic by default: bytes go to a temporary file next to the
//! destination, which is flushed, synced and then renamed over it. A failed
//! write never leaves a partial file at the destination.
//!
//! # Examples
//!
//! ```no_run
//! use pdfmerge::io::PdfWriter;
//! use std::path::Path;
//!
//! # async fn example(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let writer = PdfWriter::new();
//! writer.save(bytes, Path::new("output.pdf")).await?;
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::debug;
use tokio::task;

use crate::error::{MergeError, Result};
use crate::utils::format_file_size;

/// Options for writing output files.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Use atomic writes (write to temp file, then rename).
    pub atomic: bool,

    /// Create missing parent directories.
    pub create_dirs: bool,

    /// Buffer size for writing (in bytes).
    pub buffer_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            atomic: true,
            create_dirs: true,
            buffer_size: 8192,
        }
    }
}

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,

    /// Whether the file was written through a temporary file.
    pub atomic: bool,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// Output writer with configurable behavior.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    options: WriteOptions,
}

impl PdfWriter {
    /// Create a new writer with default options.
    pub fn new() -> Self {
        Self {
            options: WriteOptions::default(),
        }
    }

    /// Create a writer with custom options.
    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Create a writer that writes straight to the destination.
    pub fn non_atomic() -> Self {
        Self {
            options: WriteOptions {
                atomic: false,
                ..Default::default()
            },
        }
    }

    /// Save serialized PDF bytes to a file, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Write`] if the directory cannot be created,
    /// the file cannot be written, or the final rename fails.
    pub async fn save(&self, bytes: Vec<u8>, path: &Path) -> Result<()> {
        self.save_with_stats(bytes, path).await.map(|_| ())
    }

    /// Save and return statistics about the operation.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfmerge::io::PdfWriter;
    /// # use std::path::Path;
    /// # async fn example(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
    /// let writer = PdfWriter::new();
    /// let stats = writer.save_with_stats(bytes, Path::new("output.pdf")).await?;
    /// println!("Wrote {} in {:?}", stats.format_file_size(), stats.write_time);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn save_with_stats(&self, bytes: Vec<u8>, path: &Path) -> Result<WriteStatistics> {
        let path_buf = path.to_path_buf();
        let options = self.options.clone();

        task::spawn_blocking(move || write_blocking(&bytes, path_buf, &options))
            .await
            .map_err(|e| MergeError::other(format!("Write task failed: {e}")))?
    }

    /// Check whether the parent directory of `path` accepts new files.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::InvalidConfig`] if the directory is missing
    /// (and would not be created) or is read-only.
    pub async fn can_write(&self, path: &Path) -> Result<()> {
        let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };

        match tokio::fs::metadata(parent).await {
            Ok(metadata) if metadata.permissions().readonly() => Err(MergeError::invalid_config(
                format!("Output directory is not writable: {}", parent.display()),
            )),
            Ok(_) => Ok(()),
            Err(_) if self.options.create_dirs => Ok(()),
            Err(_) => Err(MergeError::invalid_config(format!(
                "Output directory does not exist: {}",
                parent.display()
            ))),
        }
    }

    /// Check if output file exists.
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    /// Remove an output file if it exists.
    pub async fn remove_if_exists(&self, path: &Path) -> Result<()> {
        if self.exists(path).await {
            tokio::fs::remove_file(path)
                .await
                .map_err(|e| MergeError::write(path.to_path_buf(), e))?;
        }
        Ok(())
    }
}

fn write_blocking(bytes: &[u8], path: PathBuf, options: &WriteOptions) -> Result<WriteStatistics> {
    let start = Instant::now();

    if options.create_dirs
        && let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent).map_err(|e| MergeError::write(parent.to_path_buf(), e))?;
    }

    if options.atomic {
        write_atomic(bytes, &path, options.buffer_size)?;
    } else {
        write_file(bytes, &path, options.buffer_size)?;
    }

    let write_time = start.elapsed();
    debug!(
        "Wrote {} ({}) in {:?}",
        path.display(),
        format_file_size(bytes.len() as u64),
        write_time
    );

    Ok(WriteStatistics {
        write_time,
        file_size: bytes.len() as u64,
        output_path: path,
        atomic: options.atomic,
    })
}

fn write_file(bytes: &[u8], path: &Path, buffer_size: usize) -> Result<()> {
    let to_error = |e| MergeError::write(path.to_path_buf(), e);

    let file = File::create(path).map_err(to_error)?;
    let mut writer = BufWriter::with_capacity(buffer_size, file);
    writer.write_all(bytes).map_err(to_error)?;
    writer.flush().map_err(to_error)?;
    writer.get_ref().sync_all().map_err(to_error)
}

/// Writes through a uniquely named hidden sibling of `path`, so concurrent
/// writers never share a temp file and the final rename never crosses
/// filesystems. The temp file is removed whenever the write fails.
fn write_atomic(bytes: &[u8], path: &Path, buffer_size: usize) -> Result<()> {
    let to_error = |e| MergeError::write(path.to_path_buf(), e);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut temp = tempfile::Builder::new()
        .prefix(&temp_prefix(path))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(to_error)?;
    {
        let mut writer = BufWriter::with_capacity(buffer_size, temp.as_file_mut());
        writer.write_all(bytes).map_err(to_error)?;
        writer.flush().map_err(to_error)?;
    }
    temp.as_file().sync_all().map_err(to_error)?;
    temp.persist(path).map_err(|e| to_error(e.error))?;
    Ok(())
}

fn temp_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.pdf".to_string());
    format!(".{name}.")
}

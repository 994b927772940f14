//! File loading and export: the filesystem side of the seal and open pipelines.
//!
//! Content types are inferred from file extensions the way a browser file
//! picker labels a selection; unknown extensions get an empty label.

use std::path::{Path, PathBuf};

use common::EnvelopeError;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Suffix appended to every exported container.
pub const ENCRYPTED_SUFFIX: &str = ".encrypted";

/// Suffix used for opened files whose name does not end in [`ENCRYPTED_SUFFIX`].
pub const DECRYPTED_SUFFIX: &str = ".decrypted";

/// Errors raised while loading inputs or writing outputs.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The input file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The output file could not be written or moved into place.
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The path ends in `..` or is a filesystem root.
    #[error("{path} has no file name")]
    NoFileName { path: String },

    /// Another input in the same run already writes to this output path.
    #[error("{path} would write {output}, which another input in this run already writes")]
    OutputConflict { path: String, output: String },

    /// Only `image/*` inputs are sealed unless `accept_any_type` is set.
    #[error("{path} has content type {content_type:?}; only image/* files are accepted")]
    UnsupportedType { path: String, content_type: String },

    /// The seal or open pipeline failed.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// The blocking worker running the pipeline panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Task(String),
}

impl ExportError {
    /// Short machine-readable code for failure reports.
    pub fn code(&self) -> &'static str {
        match self {
            ExportError::Read { .. } => "read_failed",
            ExportError::Write { .. } => "write_failed",
            ExportError::NoFileName { .. } => "no_file_name",
            ExportError::OutputConflict { .. } => "output_conflict",
            ExportError::UnsupportedType { .. } => "unsupported_type",
            ExportError::Envelope(e) => e.code(),
            ExportError::Task(_) => "task_failed",
        }
    }
}

/// Content type for `path`, derived from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jfif" | "pjpeg" | "pjp" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "svg" | "svgz" => "image/svg+xml",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "apng" => "image/apng",
        "txt" => "text/plain",
        "json" => "application/json",
        "pdf" => "application/pdf",
        _ => "",
    }
}

/// `true` for content types a file picker restricted to `image/*` would offer.
pub fn is_image(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

/// The final path component of `path` as a string.
pub fn file_name(path: &Path) -> Result<String, ExportError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ExportError::NoFileName {
            path: path.display().to_string(),
        })
}

/// `photo.png` → `photo.png.encrypted`.
pub fn encrypted_name(name: &str) -> String {
    format!("{name}{ENCRYPTED_SUFFIX}")
}

/// `photo.png.encrypted` → `photo.png`; anything else gains [`DECRYPTED_SUFFIX`].
pub fn decrypted_name(name: &str) -> String {
    match name.strip_suffix(ENCRYPTED_SUFFIX) {
        Some(stem) if !stem.is_empty() => stem.to_owned(),
        _ => format!("{name}{DECRYPTED_SUFFIX}"),
    }
}

/// Where an output named `name` goes: `out_dir` if given, else next to `input`.
pub fn output_path(input: &Path, out_dir: Option<&Path>, name: &str) -> PathBuf {
    match out_dir {
        Some(dir) => dir.join(name),
        None => input
            .parent()
            .map(|p| p.join(name))
            .unwrap_or_else(|| PathBuf::from(name)),
    }
}

/// Human-readable size in kibibytes with two decimals, e.g. `"1.50 KB"`.
pub fn format_kb(len: u64) -> String {
    format!("{:.2} KB", len as f64 / 1024.0)
}

/// Read the whole input file.
pub async fn read_input(path: &Path) -> Result<Vec<u8>, ExportError> {
    tokio::fs::read(path).await.map_err(|source| ExportError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Write `bytes` to `path` via a uniquely named sibling temporary file and a
/// rename, so a reader never observes a partially written artifact and two
/// concurrent writers never share a temporary file.
pub async fn write_output(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let write_err = |source| ExportError::Write {
        path: path.display().to_string(),
        source,
    };
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.partial", Uuid::new_v4().simple()));
    let tmp = PathBuf::from(tmp);

    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(write_err(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(write_err(e));
    }
    debug!(path = %path.display(), size = %format_kb(bytes.len() as u64), "output written");
    Ok(())
}

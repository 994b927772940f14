//! Per-file seal and open jobs.
//!
//! Output paths are planned before anything is spawned: when two inputs map
//! to the same output (e.g. `a/cat.png` and `b/cat.png` with one `--out-dir`),
//! the first keeps it and every later one fails with `output_conflict`.
//!
//! For each remaining input the runner:
//! 1. Spawns an independent Tokio task with its own `request_id` span.
//! 2. Reads the file, then moves the CPU-bound pipeline onto the blocking pool
//!    with a freshly built [`Sealer`] (no key material or buffers are shared).
//! 3. Writes the artifact and returns an [`ExportSummary`] or a [`FailureReport`].
//!
//! A semaphore bounds how many files are in flight at once.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::protocol::{ExportSummary, FailureReport};
use common::EnvelopeError;
use envelope::{EnvelopeOptions, PlaintextInput, Sealer};
use tokio::sync::Semaphore;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::export::{self, ExportError};

/// Direction of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Encrypt,
    Decrypt,
}

/// Settings shared by every job in one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub mode: Mode,
    pub out_dir: Option<PathBuf>,
    pub options: EnvelopeOptions,
    pub accept_any_type: bool,
    pub max_concurrency: usize,
}

/// Outcome for one input file.
pub type Outcome = Result<ExportSummary, FailureReport>;

/// Process every file in `files`; results are returned in input order.
pub async fn run(files: Vec<PathBuf>, settings: RunSettings) -> Vec<Outcome> {
    let settings = Arc::new(settings);
    let permits = Arc::new(Semaphore::new(settings.max_concurrency.max(1)));

    let mut claimed = HashSet::new();
    let jobs: Vec<_> = files
        .into_iter()
        .map(|path| {
            let source = path.display().to_string();
            let planned = match output_for(&path, settings.mode, settings.out_dir.as_deref()) {
                Ok(output) if !claimed.insert(output.clone()) => Err(ExportError::OutputConflict {
                    path: source.clone(),
                    output: output.display().to_string(),
                }),
                other => other,
            };
            if let Err(e) = planned {
                return (source, Err(e));
            }

            let settings = Arc::clone(&settings);
            let permits = Arc::clone(&permits);
            let span = info_span!(
                "file",
                request_id = %Uuid::new_v4(),
                path = %path.display(),
                mode = ?settings.mode,
            );
            let handle = tokio::spawn(
                async move {
                    let _permit = match permits.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => return Err(ExportError::Task(e.to_string())),
                    };
                    match settings.mode {
                        Mode::Encrypt => encrypt_file(&path, &settings).await,
                        Mode::Decrypt => decrypt_file(&path, &settings).await,
                    }
                }
                .instrument(span),
            );
            (source, Ok(handle))
        })
        .collect();

    let mut outcomes = Vec::with_capacity(jobs.len());
    for (source, job) in jobs {
        let result = match job {
            Ok(handle) => match handle.await {
                Ok(result) => result,
                Err(e) => Err(ExportError::Task(e.to_string())),
            },
            Err(e) => Err(e),
        };
        outcomes.push(result.map_err(|e| {
            warn!(file = %source, code = e.code(), error = %e, "file failed");
            FailureReport::new(source, e.code(), e.to_string())
        }));
    }
    outcomes
}

/// Where the artifact for `path` is written in `mode`.
pub fn output_for(path: &Path, mode: Mode, out_dir: Option<&Path>) -> Result<PathBuf, ExportError> {
    let name = export::file_name(path)?;
    let name = match mode {
        Mode::Encrypt => export::encrypted_name(&name),
        Mode::Decrypt => export::decrypted_name(&name),
    };
    Ok(export::output_path(path, out_dir, &name))
}

/// Seal one file into `<name>.encrypted`.
pub async fn encrypt_file(path: &Path, settings: &RunSettings) -> Result<ExportSummary, ExportError> {
    let output = output_for(path, Mode::Encrypt, settings.out_dir.as_deref())?;
    let content_type = export::content_type_for(path);
    if !settings.accept_any_type && !export::is_image(content_type) {
        return Err(ExportError::UnsupportedType {
            path: path.display().to_string(),
            content_type: content_type.to_owned(),
        });
    }

    let bytes = export::read_input(path).await?;
    let plaintext_len = bytes.len() as u64;
    info!(size = %export::format_kb(plaintext_len), content_type, "file loaded");

    let options = settings.options;
    let json = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, EnvelopeError> {
        let mut sealer = Sealer::new(options);
        let container = sealer.seal(PlaintextInput::new(&bytes, content_type))?;
        envelope::to_json(&container)
    })
    .await
    .map_err(|e| ExportError::Task(e.to_string()))??;

    export::write_output(&output, &json).await?;
    info!(output = %output.display(), size = %export::format_kb(json.len() as u64), "container exported");

    Ok(ExportSummary {
        source: path.display().to_string(),
        output: output.display().to_string(),
        content_type: content_type.to_owned(),
        plaintext_len,
        output_len: json.len() as u64,
    })
}

/// Open one container and write its plaintext.
pub async fn decrypt_file(path: &Path, settings: &RunSettings) -> Result<ExportSummary, ExportError> {
    let output = output_for(path, Mode::Decrypt, settings.out_dir.as_deref())?;
    let bytes = export::read_input(path).await?;

    let opened = tokio::task::spawn_blocking(move || envelope::open(&bytes))
        .await
        .map_err(|e| ExportError::Task(e.to_string()))??;

    export::write_output(&output, &opened.plaintext).await?;
    info!(
        output = %output.display(),
        size = %export::format_kb(opened.plaintext.len() as u64),
        content_type = %opened.content_type,
        "container opened"
    );

    Ok(ExportSummary {
        source: path.display().to_string(),
        output: output.display().to_string(),
        content_type: opened.content_type,
        plaintext_len: opened.plaintext.len() as u64,
        output_len: opened.plaintext.len() as u64,
    })
}

//! Loading and saving of session artifacts.
//!
//! Every boundary artifact is JSON: the persisted detected-map array, the
//! known-template catalog, the disassembler export, and the relocated
//! template sidecar. Detected maps are written pretty-printed with sorted
//! keys so session files diff cleanly across runs.
//!
//! Errors here carry the offending path and split read / decode / encode /
//! write apart, because the frontends report them differently.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::hints::DisassemblerHints;
use crate::model::DetectedMap;
use crate::templates::Template;

/// Error type for session persistence.
#[derive(Debug, Error)]
pub enum PersistError {
    /// An input file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input file was not valid JSON for the expected shape.
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Session data could not be encoded for writing.
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An output file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience result type for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Read a firmware image's raw contents.
pub fn load_image_bytes(path: &Path) -> PersistResult<Vec<u8>> {
    fs::read(path).map_err(|source| PersistError::Read { path: path.to_path_buf(), source })
}

/// Load a known-template catalog (JSON array; unknown fields ignored).
pub fn load_templates(path: &Path) -> PersistResult<Vec<Template>> {
    load_json(path)
}

/// Load a disassembler export (`{functions, labels}`).
pub fn load_hints(path: &Path) -> PersistResult<DisassemblerHints> {
    load_json(path)
}

/// Load a persisted detected-map session.
pub fn load_maps(path: &Path) -> PersistResult<Vec<DetectedMap>> {
    load_json(path)
}

/// Persist detected maps as a pretty-printed JSON array with sorted keys.
pub fn save_maps(path: &Path, maps: &[DetectedMap]) -> PersistResult<()> {
    save_json(path, &maps)
}

/// Persist relocated template fragments keyed by their new offset.
pub fn save_relocated(path: &Path, relocated: &BTreeMap<usize, String>) -> PersistResult<()> {
    save_json(path, relocated)
}

/// Write a rendered XDF document.
pub fn save_xdf(path: &Path, document: &str) -> PersistResult<()> {
    fs::write(path, document)
        .map_err(|source| PersistError::Write { path: path.to_path_buf(), source })
}

fn load_json<T: DeserializeOwned>(path: &Path) -> PersistResult<T> {
    let text = fs::read_to_string(path)
        .map_err(|source| PersistError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text)
        .map_err(|source| PersistError::Decode { path: path.to_path_buf(), source })
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> PersistResult<()> {
    // Round-tripping through `Value` sorts object keys.
    let value = serde_json::to_value(value)
        .map_err(|source| PersistError::Encode { path: path.to_path_buf(), source })?;
    let mut text = serde_json::to_string_pretty(&value)
        .map_err(|source| PersistError::Encode { path: path.to_path_buf(), source })?;
    text.push('\n');
    fs::write(path, text)
        .map_err(|source| PersistError::Write { path: path.to_path_buf(), source })
}

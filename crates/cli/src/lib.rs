//! Command helpers for the rommap CLI.
//!
//! The binary stays thin; everything worth testing lives here or in
//! `rommap-core` so integration tests can call it directly.

use sha2::{Digest, Sha256};
use thiserror::Error;

use rommap_core::persist::PersistError;

pub mod commands;

/// Exit code for input-read failures.
pub const EXIT_READ_FAILURE: u8 = 2;
/// Exit code for malformed input decode failures.
pub const EXIT_DECODE_FAILURE: u8 = 3;
/// Exit code for output encode/write failures.
pub const EXIT_WRITE_FAILURE: u8 = 4;

/// Command failure carrying the process exit-code contract.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl CommandError {
    /// Map a failure onto the documented exit codes.
    pub fn exit_code(&self) -> u8 {
        match self {
            CommandError::Persist(PersistError::Read { .. }) => EXIT_READ_FAILURE,
            CommandError::Persist(PersistError::Decode { .. }) => EXIT_DECODE_FAILURE,
            CommandError::Persist(PersistError::Encode { .. }) => EXIT_WRITE_FAILURE,
            CommandError::Persist(PersistError::Write { .. }) => EXIT_WRITE_FAILURE,
        }
    }
}

/// Compute the SHA-256 hash of a byte buffer and return it as a hex string.
pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

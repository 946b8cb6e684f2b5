//! Error types for the transfer engine.
//!
//! Mirrors the shape of a typical download-engine error enum: one flat,
//! richly-contexted enum per concern rather than a tree of nested error
//! types, with helper constructors for variants that need context the
//! underlying error doesn't carry.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by a single transfer attempt (GET for Backup, PUT for Restore).
///
/// A transfer never lets one of these escape to the dispatcher; it is caught at
/// the transfer boundary and folded into the queue entry's fate (failures +=
/// 1, moved to end, dequeued, etc). The type exists so the classification
/// logic has something concrete to match on, and so tests can assert on it
/// directly.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Connection refused, DNS failure, TLS failure, or any other error the
    /// transport layer raised before a status line was received.
    #[error("network error on {path}: {source}")]
    Network {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// An I/O error reading or writing the local mirror.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The folder description body could not be parsed as JSON.
    #[error("malformed folder description at {path}: {source}")]
    MalformedFolderDescription {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TransferError {
    pub fn network(path: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            path: path.into(),
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed_folder_description(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::MalformedFolderDescription {
            path: path.into(),
            source,
        }
    }
}

/// Errors that halt the whole run rather than a single queue entry.
///
/// Per the propagation policy, only startup failures (renaming the prior
/// backup dir aside for a reason other than "it doesn't exist", or being
/// unable to read the local root for Restore) are fatal; everything else is
/// recorded on the entry and the run continues.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("could not prepare backup directory {path}: {source}")]
    BackupDirSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read local backup root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error returned by queue operations that can legitimately fail.
///
/// `enqueue` on an abandoned run is not an error in the exceptional sense
/// (it's logged and ignored by the caller), but giving it a named variant
/// keeps the call sites honest about why nothing happened.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("enqueue ignored: run has been abandoned")]
    Abandoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display_includes_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = TransferError::io("/backup/a/b", source);
        assert!(err.to_string().contains("/backup/a/b"));
    }

    #[test]
    fn queue_error_abandoned_display() {
        assert_eq!(
            QueueError::Abandoned.to_string(),
            "enqueue ignored: run has been abandoned"
        );
    }
}

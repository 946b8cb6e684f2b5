//! Per-run configuration: resolved once at startup, immutable afterward.
//!
//! Both binaries build a `Config` from parsed CLI arguments; the transfer
//! engine itself only ever reads it.

use std::path::PathBuf;

use url::Url;

use crate::digest::EtagAlgorithm;

pub const DEFAULT_BACKUP_SIMULTANEOUS: usize = 9;
pub const DEFAULT_RESTORE_SIMULTANEOUS: usize = 10;

/// Immutable configuration shared by every task in a run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base endpoint, guaranteed to end with `/` (see `Config::new`).
    pub endpoint: Url,
    pub token: String,
    pub origin: String,
    pub version: &'static str,
    pub simultaneous: usize,
    pub backup_dir: PathBuf,
    /// Single top-level category; slashes already stripped. `None` means the
    /// whole tree.
    pub category: Option<String>,
    pub include_public: bool,
    /// Restore only. Defaults to `Md5` when the CLI omits `--etag-algorithm`.
    pub etag_algorithm: Option<EtagAlgorithm>,
}

impl Config {
    /// User-Agent string sent with every request: `AdaptiveBackup/<version>`.
    pub fn user_agent(&self) -> String {
        format!("AdaptiveBackup/{}", self.version)
    }

    /// Normalizes `endpoint` so it always ends with `/`, as the path codec
    /// requires for joining.
    pub fn normalize_endpoint(mut endpoint: Url) -> Url {
        if !endpoint.path().ends_with('/') {
            let mut path = endpoint.path().to_string();
            path.push('/');
            endpoint.set_path(&path);
        }
        endpoint
    }

    /// Strips slashes from a raw `--category` value, per the CLI contract.
    pub fn normalize_category(raw: &str) -> Option<String> {
        let stripped: String = raw.chars().filter(|c| *c != '/').collect();
        if stripped.is_empty() {
            None
        } else {
            Some(stripped)
        }
    }
}

//! Adaptive Backup/Restore Core Library
//!
//! This library provides the core functionality for the backup and restore
//! tools, which move hierarchical folders of documents to and from an
//! authenticated remote storage service through an adaptive, throttled
//! transfer engine.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`queue`] - the insertion-ordered work queue shared by both directions
//! - [`dispatcher`] - the single-call "scan once, start one transfer" loop
//! - [`pause_barrier`] - the resettable, never-shrinking rate-limit pause
//! - [`retry_after`] - `Retry-After` header parsing and default-delay growth
//! - [`status_policy`] - the shared non-success status-code classification
//! - [`path_codec`] - remote-path <-> URL-path percent-encoding
//! - [`content_type`] - saved-metadata/sniff/extension content-type resolution
//! - [`digest`] - the streamed entity-tag digester
//! - [`folder_description`] - the `000_folder-description.json` format
//! - [`lifecycle`] - startup timing, signal handling, and exit codes
//! - [`config`] - immutable per-run configuration
//! - [`token_resolver`] - the bearer-token acquisition seam
//! - [`http_client`] - the `reqwest` wrapper carrying common headers
//! - [`layout`] - the remote-path <-> local-path mapping
//! - [`progress`] - the optional terminal spinner shown while a run drains
//! - [`backup`] - the Backup direction: GET and expand
//! - [`restore`] - the Restore direction: walk and PUT

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backup;
pub mod config;
pub mod content_type;
pub mod digest;
pub mod dispatcher;
pub mod error;
pub mod folder_description;
pub mod http_client;
pub mod layout;
pub mod lifecycle;
pub mod path_codec;
pub mod pause_barrier;
pub mod progress;
pub mod queue;
pub mod restore;
pub mod retry_after;
pub mod status_policy;
pub mod token_resolver;

pub use backup::BackupTransfer;
pub use config::Config;
pub use dispatcher::{Dispatcher, TransferFn};
pub use error::{FatalError, QueueError, TransferError};
pub use lifecycle::{ExitOutcome, Lifecycle, Mode};
pub use queue::{EntryMetadata, QueueEntry, WorkQueue};
pub use restore::{PutOutcome, RestoreTransfer};
pub use token_resolver::{StaticToken, TokenResolver};

//! Backup: walks the remote tree and mirrors it to a local directory.

mod transfer;
mod walker;

pub use transfer::BackupTransfer;
pub use walker::{prepare_backup_dir, seed_queue};

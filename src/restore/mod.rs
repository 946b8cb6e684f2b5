//! Restore: walks a previously produced local mirror and uploads every
//! document.

mod transfer;
mod walker;

pub use transfer::{PutOutcome, RestoreTransfer};
pub use walker::{walk_backup_dir, walk_categories};

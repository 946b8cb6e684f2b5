//! Backup's remote tree walker: seeding the queue with the starting
//! folder(s), and the startup prelude that renames any prior backup
//! directory aside.
//!
//! There is no explicit recursive-descent function here beyond the seed:
//! folder responses expand the queue themselves (`BackupTransfer::handle_folder`),
//! so "walking" the remote tree is an emergent property of the dispatcher
//! draining a queue that keeps growing until every folder has been visited.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::error::FatalError;
use crate::queue::WorkQueue;

/// Renames `backup_dir` aside to a timestamped sibling under the system temp
/// directory, if it exists. A missing directory is not an error (first run);
/// any other failure is fatal and halts the program before any network work
/// starts.
pub async fn prepare_backup_dir(backup_dir: &Path) -> Result<(), FatalError> {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let sibling = std::env::temp_dir().join(format!(
        "{}-{suffix}",
        backup_dir
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("backup")
    ));

    match tokio::fs::rename(backup_dir, &sibling).await {
        Ok(()) => {
            info!(from = %backup_dir.display(), to = %sibling.display(), "moved prior backup aside");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(FatalError::BackupDirSetup {
            path: backup_dir.to_path_buf(),
            source,
        }),
    }
}

/// Seeds the queue with `/category/` (or `/` for the whole tree), plus
/// `/public/category/` when `include_public` applies and the category isn't
/// already `public`.
pub fn seed_queue(queue: &WorkQueue, category: Option<&str>, include_public: bool) {
    let primary = match category {
        Some(category) => format!("/{category}/"),
        None => "/".to_string(),
    };
    let _ = queue.enqueue(primary, None);

    if let Some(category) = category {
        if include_public && category != "public" {
            let _ = queue.enqueue(format!("/public/{category}/"), None);
        }
    }
}

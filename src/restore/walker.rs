//! Restore's local tree walker: recurses the previously produced backup
//! directory, enqueueing every document before any network work starts
//! (unlike Backup, whose queue grows as folder responses arrive).

use std::path::Path;

use tracing::{error, warn};

use crate::error::TransferError;
use crate::folder_description::{DESCRIPTION_FILENAME, FolderDescription};
use crate::layout::child_remote_path;
use crate::queue::WorkQueue;

/// Entry point mirroring Backup's `seed_queue`: walks `/category/` (or the
/// whole backup root when no category), and, when `include_public` applies
/// and the category isn't already `public`, also walks `/public/category/`.
///
/// A missing category directory propagates as an error (there is nothing
/// useful to upload). A missing *public* directory is not an error - most
/// local mirrors never had a public category to begin with - and is logged
/// and skipped instead.
pub async fn walk_categories(
    queue: &WorkQueue,
    backup_dir: &Path,
    category: Option<&str>,
    include_public: bool,
) -> std::io::Result<()> {
    match category {
        None => walk_backup_dir(queue, backup_dir, "/").await?,
        Some(category) => {
            walk_backup_dir(queue, &backup_dir.join(category), &format!("/{category}/")).await?;

            if include_public && category != "public" {
                let public_dir = backup_dir.join("public").join(category);
                match walk_backup_dir(queue, &public_dir, &format!("/public/{category}/")).await {
                    Ok(()) => {}
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                        warn!(dir = %public_dir.display(), "no public category directory, skipping");
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    }
    Ok(())
}

/// Recurses `dir` (mapped to `folder_remote_path`, which ends with `/`),
/// reading each directory's saved `000_folder-description.json` for
/// per-child metadata and enqueueing every regular file it finds. A missing
/// description is not fatal: the folder's children are enqueued with no
/// metadata. A description that exists but fails to parse is logged loudly
/// (not silently treated as missing, matching Backup's own handling of a
/// malformed body) and likewise falls back to no metadata. Non-regular
/// entries (symlinks, sockets, pipes) are ignored; per-entry read errors are
/// logged and skipped; a failure to open the top directory itself is
/// propagated to the caller.
pub async fn walk_backup_dir(queue: &WorkQueue, dir: &Path, folder_remote_path: &str) -> std::io::Result<()> {
    let description = match FolderDescription::load(&dir.join(DESCRIPTION_FILENAME)).await {
        Ok(description) => description,
        Err(TransferError::MalformedFolderDescription { path, source }) => {
            error!(path, error = %source, "corrupted folder description, using empty metadata");
            None
        }
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "could not read folder description, using empty metadata");
            None
        }
    };

    let mut entries = tokio::fs::read_dir(dir).await?;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "could not read directory entry, skipping");
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if name == DESCRIPTION_FILENAME || name.starts_with('.') {
            continue;
        }

        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "could not stat entry, skipping");
                continue;
            }
        };

        let remote_path = child_remote_path(folder_remote_path, &name);

        if file_type.is_dir() {
            Box::pin(walk_backup_dir(queue, &entry.path(), &format!("{remote_path}/"))).await?;
        } else if file_type.is_file() {
            let metadata = description
                .as_ref()
                .and_then(|desc| desc.items.get(&name))
                .map(|child| child.to_entry_metadata());
            let _ = queue.enqueue(remote_path, metadata);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_file(path: &Path, contents: &[u8]) {
        tokio::fs::write(path, contents).await.unwrap();
    }

    #[tokio::test]
    async fn enqueues_files_with_description_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("a.txt"), b"hello").await;
        write_file(
            &dir.path().join(DESCRIPTION_FILENAME),
            br#"{"items":{"a.txt":{"ETag":"\"abc\""}}}"#,
        )
        .await;

        let queue = WorkQueue::new();
        walk_backup_dir(&queue, dir.path(), "/cat/").await.unwrap();

        assert!(queue.contains("/cat/a.txt"));
        let entry = queue.entry_snapshot("/cat/a.txt").unwrap();
        assert_eq!(entry.metadata.unwrap().get("ETag").map(String::as_str), Some("\"abc\""));
    }

    #[tokio::test]
    async fn missing_description_enqueues_with_no_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("a.txt"), b"hello").await;

        let queue = WorkQueue::new();
        walk_backup_dir(&queue, dir.path(), "/cat/").await.unwrap();

        assert!(queue.contains("/cat/a.txt"));
        assert!(queue.entry_snapshot("/cat/a.txt").unwrap().metadata.is_none());
    }

    #[tokio::test]
    async fn corrupted_description_enqueues_with_no_metadata_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("a.txt"), b"hello").await;
        write_file(&dir.path().join(DESCRIPTION_FILENAME), b"{not valid json").await;

        let queue = WorkQueue::new();
        walk_backup_dir(&queue, dir.path(), "/cat/").await.unwrap();

        assert!(queue.contains("/cat/a.txt"));
        assert!(queue.entry_snapshot("/cat/a.txt").unwrap().metadata.is_none());
    }

    #[tokio::test]
    async fn recurses_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("sub")).await.unwrap();
        write_file(&dir.path().join("sub").join("b.txt"), b"world").await;

        let queue = WorkQueue::new();
        walk_backup_dir(&queue, dir.path(), "/cat/").await.unwrap();

        assert!(queue.contains("/cat/sub/b.txt"));
    }

    #[tokio::test]
    async fn skips_the_description_file_and_dotfiles() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join(DESCRIPTION_FILENAME), b"{}").await;
        write_file(&dir.path().join(".hidden"), b"x").await;

        let queue = WorkQueue::new();
        walk_backup_dir(&queue, dir.path(), "/cat/").await.unwrap();

        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn missing_top_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let queue = WorkQueue::new();
        let result = walk_backup_dir(&queue, &missing, "/cat/").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn no_category_walks_the_whole_root() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("a.txt"), b"hello").await;

        let queue = WorkQueue::new();
        walk_categories(&queue, dir.path(), None, false).await.unwrap();

        assert!(queue.contains("/a.txt"));
    }

    #[tokio::test]
    async fn category_with_include_public_walks_both_directories() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("notes")).await.unwrap();
        write_file(&dir.path().join("notes").join("a.txt"), b"hello").await;
        tokio::fs::create_dir_all(dir.path().join("public").join("notes")).await.unwrap();
        write_file(&dir.path().join("public").join("notes").join("b.txt"), b"world").await;

        let queue = WorkQueue::new();
        walk_categories(&queue, dir.path(), Some("notes"), true).await.unwrap();

        assert!(queue.contains("/notes/a.txt"));
        assert!(queue.contains("/public/notes/b.txt"));
    }

    #[tokio::test]
    async fn missing_public_directory_is_ignored_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("notes")).await.unwrap();
        write_file(&dir.path().join("notes").join("a.txt"), b"hello").await;

        let queue = WorkQueue::new();
        walk_categories(&queue, dir.path(), Some("notes"), true).await.unwrap();

        assert!(queue.contains("/notes/a.txt"));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn missing_category_directory_without_public_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        let queue = WorkQueue::new();
        let result = walk_categories(&queue, dir.path(), Some("notes"), false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn public_category_is_not_duplicated() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("public")).await.unwrap();
        write_file(&dir.path().join("public").join("a.txt"), b"hello").await;

        let queue = WorkQueue::new();
        walk_categories(&queue, dir.path(), Some("public"), true).await.unwrap();

        assert!(queue.contains("/public/a.txt"));
        assert_eq!(queue.len(), 1);
    }
}

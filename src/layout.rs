//! The on-disk layout shared by Backup (writing) and Restore (reading):
//! remote path <-> local path mapping under the backup root.

use std::path::{Path, PathBuf};

/// Maps a remote path to its location under the local backup root.
///
/// `/a/b/c` -> `<root>/a/b/c`. `/a/b/` -> `<root>/a/b` (folders are
/// represented as a bare directory; callers append
/// `000_folder-description.json` themselves). `/` maps to the root itself.
pub fn local_path(backup_dir: &Path, remote_path: &str) -> PathBuf {
    let trimmed = remote_path.trim_start_matches('/').trim_end_matches('/');
    if trimmed.is_empty() {
        backup_dir.to_path_buf()
    } else {
        backup_dir.join(trimmed)
    }
}

/// The inverse mapping Restore's walker uses: given a directory under the
/// backup root and a filesystem entry name within it, produce the remote
/// path. `folder_remote_path` is expected to end with `/`.
pub fn child_remote_path(folder_remote_path: &str, name: &str) -> String {
    format!("{folder_remote_path}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_path_maps_document() {
        assert_eq!(local_path(Path::new("/root"), "/a/b/c"), PathBuf::from("/root/a/b/c"));
    }

    #[test]
    fn local_path_maps_folder_without_trailing_slash() {
        assert_eq!(local_path(Path::new("/root"), "/a/b/"), PathBuf::from("/root/a/b"));
    }

    #[test]
    fn local_path_maps_root() {
        assert_eq!(local_path(Path::new("/root"), "/"), PathBuf::from("/root"));
    }

    #[test]
    fn child_remote_path_appends_name_to_folder() {
        assert_eq!(child_remote_path("/a/b/", "c.txt"), "/a/b/c.txt");
    }
}

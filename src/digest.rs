//! Entity-tag digester: a streamed content hash formatted as a quoted,
//! lowercase hex string suitable for `If-None-Match`.

use std::path::Path;

use md5::{Digest, Md5};
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 64 * 1024;

/// The hash algorithm backing the entity-tag digester.
///
/// Only `Md5` is implemented today (the configured default, and the only
/// algorithm the CLI's `--etag-algorithm` flag currently accepts), but the
/// enum exists so a second algorithm is a variant away rather than a
/// rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtagAlgorithm {
    Md5,
}

impl EtagAlgorithm {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "md5" => Some(Self::Md5),
            _ => None,
        }
    }
}

/// Streams `path` through the configured algorithm and returns the digest as
/// a quoted lowercase hex string, e.g. `"d41d8cd98f00b204e9800998ecf8427e"`.
///
/// Reads the file in fixed-size chunks; never buffers the whole file.
pub async fn etag_for_file(path: &Path, algorithm: EtagAlgorithm) -> std::io::Result<String> {
    match algorithm {
        EtagAlgorithm::Md5 => md5_etag(path).await,
    }
}

async fn md5_etag(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    let digest = hasher.finalize();
    Ok(format!("\"{digest:x}\""))
}

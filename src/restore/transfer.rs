//! Restore transfer: streams one local file as a conditional PUT.

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::header::{ETAG, RETRY_AFTER};
use tokio_util::io::ReaderStream;
use tracing::{error, info, instrument, warn};

use crate::content_type;
use crate::digest::{self, EtagAlgorithm};
use crate::dispatcher::TransferFn;
use crate::http_client::StorageClient;
use crate::layout::local_path;
use crate::lifecycle::Lifecycle;
use crate::pause_barrier::PauseBarrier;
use crate::queue::WorkQueue;
use crate::retry_after::{self, DefaultDelay};
use crate::status_policy::{self, Fate};

/// What a single PUT attempt resolved to, for caller and test inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    pub status: u16,
    pub returned_etag: Option<String>,
    pub content_type: String,
    pub content_length: u64,
}

pub struct RestoreTransfer {
    client: StorageClient,
    queue: Arc<WorkQueue>,
    barrier: Arc<PauseBarrier>,
    default_delay: DefaultDelay,
    backup_dir: PathBuf,
    etag_algorithm: Option<EtagAlgorithm>,
    lifecycle: Arc<Lifecycle>,
}

impl RestoreTransfer {
    pub fn new(
        client: StorageClient,
        queue: Arc<WorkQueue>,
        barrier: Arc<PauseBarrier>,
        backup_dir: PathBuf,
        etag_algorithm: Option<EtagAlgorithm>,
        lifecycle: Arc<Lifecycle>,
    ) -> Arc<Self> {
        Arc::new(Self {
            client,
            queue,
            barrier,
            default_delay: DefaultDelay::for_restore(),
            backup_dir,
            etag_algorithm,
            lifecycle,
        })
    }

    pub fn into_transfer_fn(self: Arc<Self>) -> TransferFn {
        Arc::new(move |path: String| {
            let this = Arc::clone(&self);
            Box::pin(async move {
                this.run(path).await;
            })
        })
    }

    /// Runs one PUT to completion and returns its outcome, for tests and
    /// callers that want to inspect the result directly. The dispatcher only
    /// calls this through `into_transfer_fn`, which discards the outcome.
    #[instrument(skip(self))]
    pub async fn run(&self, path: String) -> Option<PutOutcome> {
        let metadata = self.queue.entry_snapshot(&path).and_then(|entry| entry.metadata);
        let file_path = local_path(&self.backup_dir, &path);

        let file_len = match tokio::fs::metadata(&file_path).await {
            Ok(meta) => meta.len(),
            Err(err) => {
                error!(path = %path, error = %err, "could not stat local file");
                self.queue.increment_failures(&path);
                self.queue.move_to_end(&path);
                status_policy::finalize_entry(&self.queue, &path);
                return None;
            }
        };

        let leading_bytes = read_leading_bytes(&file_path).await.unwrap_or_default();
        let metadata_content_type = metadata.as_ref().and_then(|m| m.get("Content-Type")).map(String::as_str);
        let content_type = content_type::resolve(metadata_content_type, &leading_bytes, &file_path);

        let file_etag = match self.etag_algorithm {
            Some(algorithm) => match digest::etag_for_file(&file_path, algorithm).await {
                Ok(etag) => Some(etag),
                Err(err) => {
                    error!(path = %path, error = %err, "could not digest local file");
                    self.queue.increment_failures(&path);
                    self.queue.move_to_end(&path);
                    status_policy::finalize_entry(&self.queue, &path);
                    return None;
                }
            },
            None => metadata.as_ref().and_then(|m| m.get("ETag")).cloned(),
        };

        let body_file = match tokio::fs::File::open(&file_path).await {
            Ok(file) => file,
            Err(err) => {
                error!(path = %path, error = %err, "could not open local file for upload");
                self.queue.increment_failures(&path);
                self.queue.move_to_end(&path);
                status_policy::finalize_entry(&self.queue, &path);
                return None;
            }
        };
        let body = reqwest::Body::wrap_stream(ReaderStream::new(body_file));

        let response = match self
            .client
            .put(&path, body, &content_type, file_len, file_etag.as_deref())
            .await
        {
            Ok(response) => response,
            Err(err) => {
                self.record_network_failure(&path, &err);
                status_policy::finalize_entry(&self.queue, &path);
                return None;
            }
        };

        let status = response.status().as_u16();
        let header_etag = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        match status {
            200 => {
                info!(path = %path, etag = ?header_etag, "updated");
                self.queue.dequeue(&path);
            }
            201 => {
                info!(path = %path, etag = ?header_etag, "created");
                self.queue.dequeue(&path);
            }
            412 => {
                info!(path = %path, "already current");
                self.queue.dequeue(&path);
            }
            status => self.handle_non_success(&path, status, response),
        }

        status_policy::finalize_entry(&self.queue, &path);

        let returned_etag = if status == 412 { file_etag.clone() } else { header_etag };

        Some(PutOutcome {
            status,
            returned_etag,
            content_type,
            content_length: file_len,
        })
    }

    fn handle_non_success(&self, path: &str, status: u16, response: reqwest::Response) {
        match status_policy::classify(status) {
            Fate::GiveUp => {
                warn!(path, status, "permission error, giving up");
                self.queue.dequeue_as_failed(path);
            }
            Fate::PauseAndRetry => {
                let header = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                let resolved = retry_after::resolve(header.as_deref(), &self.default_delay);
                self.barrier.install(resolved.delay_ms);
                if resolved.overlong {
                    self.lifecycle.abandon_gracefully("overlong Retry-After");
                }
                warn!(path, status, delay_ms = resolved.delay_ms, "rate limited, pausing");
                self.queue.move_to_end(path);
            }
            Fate::RetryWithoutPenalty => {
                warn!(path, status, "transient upstream error, will retry");
                self.queue.move_to_end(path);
            }
            Fate::RetryWithPenalty => {
                warn!(path, status, "server error, will retry");
                self.queue.increment_failures(path);
                self.queue.move_to_end(path);
            }
        }
    }

    fn record_network_failure(&self, path: &str, err: &reqwest::Error) {
        warn!(path, error = %err, "network error, will retry");
        self.queue.increment_failures(path);
        self.queue.move_to_end(path);
    }
}

/// Reads up to 16 bytes (enough for every signature in the sniff table)
/// without loading the whole file.
async fn read_leading_bytes(path: &std::path::Path) -> std::io::Result<Vec<u8>> {
    use tokio::io::AsyncReadExt;
    let mut file = tokio::fs::File::open(path).await?;
    let mut buffer = vec![0u8; 16];
    let read = file.read(&mut buffer).await?;
    buffer.truncate(read);
    Ok(buffer)
}

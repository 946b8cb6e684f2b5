//! Backup transfer: fetches one remote path, expanding folders into the
//! queue and streaming documents to disk.

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::header::RETRY_AFTER;
use tokio::io::AsyncWriteExt;
use tracing::{error, instrument, warn};

use crate::dispatcher::TransferFn;
use crate::folder_description::{DESCRIPTION_FILENAME, FolderDescription};
use crate::http_client::StorageClient;
use crate::layout::local_path;
use crate::lifecycle::Lifecycle;
use crate::pause_barrier::PauseBarrier;
use crate::queue::WorkQueue;
use crate::retry_after::{self, DefaultDelay};
use crate::status_policy::{self, Fate};

pub struct BackupTransfer {
    client: StorageClient,
    queue: Arc<WorkQueue>,
    barrier: Arc<PauseBarrier>,
    default_delay: DefaultDelay,
    backup_dir: PathBuf,
    lifecycle: Arc<Lifecycle>,
}

impl BackupTransfer {
    pub fn new(
        client: StorageClient,
        queue: Arc<WorkQueue>,
        barrier: Arc<PauseBarrier>,
        backup_dir: PathBuf,
        lifecycle: Arc<Lifecycle>,
    ) -> Arc<Self> {
        Arc::new(Self {
            client,
            queue,
            barrier,
            default_delay: DefaultDelay::for_backup(),
            backup_dir,
            lifecycle,
        })
    }

    /// Adapts this transfer into the closure shape the dispatcher expects.
    pub fn into_transfer_fn(self: Arc<Self>) -> TransferFn {
        Arc::new(move |path: String| {
            let this = Arc::clone(&self);
            Box::pin(async move { this.run(path).await })
        })
    }

    #[instrument(skip(self))]
    async fn run(&self, path: String) {
        let is_folder = path.ends_with('/');

        let response = match self.client.get(&path).await {
            Ok(response) => response,
            Err(err) => {
                self.record_network_failure(&path, &err);
                status_policy::finalize_entry(&self.queue, &path);
                return;
            }
        };

        let status = response.status().as_u16();
        match status {
            200 if is_folder => self.handle_folder(&path, response).await,
            200 => self.handle_document(&path, response).await,
            status => self.handle_non_success(&path, status, response),
        }

        status_policy::finalize_entry(&self.queue, &path);
    }

    fn handle_non_success(&self, path: &str, status: u16, response: reqwest::Response) {
        match status_policy::classify(status) {
            Fate::GiveUp => {
                warn!(path, status, "permission or not-found error, giving up");
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

    async fn handle_folder(&self, path: &str, response: reqwest::Response) {
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                self.record_network_failure(path, &err);
                return;
            }
        };

        let description = match FolderDescription::parse(path, &body) {
            Ok(description) => description,
            Err(err) => {
                error!(path, error = %err, "malformed folder description");
                self.queue.increment_failures(path);
                self.queue.move_to_end(path);
                return;
            }
        };

        let dir = local_path(&self.backup_dir, path);
        if let Err(err) = tokio::fs::create_dir_all(&dir).await {
            error!(path, error = %err, "could not create backup directory");
            self.queue.increment_failures(path);
            self.queue.move_to_end(path);
            return;
        }

        let description_path = dir.join(DESCRIPTION_FILENAME);
        if let Err(err) = tokio::fs::write(&description_path, &body).await {
            error!(path, error = %err, "could not write folder description");
            self.queue.increment_failures(path);
            self.queue.move_to_end(path);
            return;
        }

        for (name, metadata) in &description.items {
            let child_path = format!("{path}{name}");
            let _ = self.queue.enqueue(child_path, Some(metadata.to_entry_metadata()));
        }

        self.queue.dequeue(path);
    }

    async fn handle_document(&self, path: &str, response: reqwest::Response) {
        let file_path = local_path(&self.backup_dir, path);
        if let Some(parent) = file_path.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                error!(path, error = %err, "could not create parent directory");
                self.queue.increment_failures(path);
                self.queue.move_to_end(path);
                return;
            }
        }

        let mut file = match tokio::fs::File::create(&file_path).await {
            Ok(file) => file,
            Err(err) => {
                error!(path, error = %err, "could not create local file");
                self.queue.increment_failures(path);
                self.queue.move_to_end(path);
                return;
            }
        };

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    if let Err(err) = file.write_all(&bytes).await {
                        error!(path, error = %err, "could not write to local file");
                        self.queue.increment_failures(path);
                        self.queue.move_to_end(path);
                        return;
                    }
                }
                Err(err) => {
                    self.record_network_failure(path, &err);
                    return;
                }
            }
        }

        self.queue.dequeue(path);
    }

    fn record_network_failure(&self, path: &str, err: &reqwest::Error) {
        warn!(path, error = %err, "network error, will retry");
        self.queue.increment_failures(path);
        self.queue.move_to_end(path);
    }
}

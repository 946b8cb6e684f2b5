//! CLI entry point for the restore tool.

use std::sync::Arc;

use anyhow::{Context, Result};
use backup_core::config::{Config, DEFAULT_RESTORE_SIMULTANEOUS};
use backup_core::digest::EtagAlgorithm;
use backup_core::http_client::StorageClient;
use backup_core::pause_barrier::PauseBarrier;
use backup_core::queue::WorkQueue;
use backup_core::restore::{RestoreTransfer, walk_categories};
use backup_core::token_resolver::{InteractiveAcquisitionUnavailable, StaticToken, TokenResolver};
use backup_core::{ExitOutcome, Lifecycle, Mode};
use clap::Parser;
use tracing::{debug, info};

mod cli {
    use super::{Parser, DEFAULT_RESTORE_SIMULTANEOUS};

    /// Upload a previously produced local mirror back to a remote storage
    /// service, adaptively throttled to the server's own rate limits.
    #[derive(Parser, Debug)]
    #[command(name = "restore")]
    #[command(author, version, about)]
    pub struct Args {
        /// Base endpoint of the remote storage service.
        #[arg(long)]
        pub endpoint: String,

        /// Bearer token. If omitted, interactive acquisition is attempted
        /// (not wired into this build, so the run aborts with exit code 1).
        #[arg(short = 't', long)]
        pub token: Option<String>,

        /// Value to send as the Origin header.
        #[arg(long, default_value = "https://localhost")]
        pub origin: String,

        /// Local directory holding the mirror to upload.
        #[arg(short = 'o', long, default_value = "./backup")]
        pub backup_dir: std::path::PathBuf,

        /// Single top-level category to restore; slashes are stripped. Omit
        /// to restore the whole local mirror.
        #[arg(short = 'c', long)]
        pub category: Option<String>,

        /// Also restore `/public/<category>/` alongside the named category.
        #[arg(short = 'p', long)]
        pub include_public: bool,

        /// Maximum simultaneous transfers.
        #[arg(short = 's', long, default_value_t = DEFAULT_RESTORE_SIMULTANEOUS)]
        pub simultaneous: usize,

        /// Entity-tag algorithm to compute a `fileETag` for conditional
        /// uploads. Defaults to md5; pass "none" to rely solely on saved
        /// folder-description metadata.
        #[arg(long, default_value = "md5")]
        pub etag_algorithm: String,

        /// Increase output verbosity (-v for debug, -vv for trace).
        #[arg(short, long, action = clap::ArgAction::Count)]
        pub verbose: u8,

        /// Suppress non-error output.
        #[arg(short, long)]
        pub quiet: bool,
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn requires_an_endpoint() {
            let result = Args::try_parse_from(["restore"]);
            assert!(result.is_err());
        }

        #[test]
        fn default_simultaneous_matches_the_configured_constant() {
            let args = Args::try_parse_from(["restore", "--endpoint", "https://storage.example/"]).unwrap();
            assert_eq!(args.simultaneous, DEFAULT_RESTORE_SIMULTANEOUS);
            assert_eq!(args.etag_algorithm, "md5");
        }

        #[test]
        fn etag_algorithm_accepts_an_override() {
            let args = Args::try_parse_from([
                "restore",
                "--endpoint",
                "https://storage.example/",
                "--etag-algorithm",
                "none",
            ])
            .unwrap();
            assert_eq!(args.etag_algorithm, "none");
        }

        #[test]
        fn category_and_include_public_accept_short_flags() {
            let args = Args::try_parse_from([
                "restore",
                "--endpoint",
                "https://storage.example/",
                "-c",
                "notes",
                "-p",
            ])
            .unwrap();
            assert_eq!(args.category.as_deref(), Some("notes"));
            assert!(args.include_public);
        }
    }
}

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("restore starting");

    let endpoint = Config::normalize_endpoint(url::Url::parse(&args.endpoint).context("invalid --endpoint")?);
    let category = args.category.as_deref().and_then(Config::normalize_category);

    let etag_algorithm = if args.etag_algorithm.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(EtagAlgorithm::parse(&args.etag_algorithm).context("unknown --etag-algorithm")?)
    };

    let resolver: Arc<dyn TokenResolver> = match args.token {
        Some(token) => Arc::new(StaticToken::new(token)),
        None => Arc::new(InteractiveAcquisitionUnavailable),
    };
    let token = match resolver.resolve().await {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(error = %err, "token acquisition aborted");
            std::process::exit(ExitOutcome::AuthAborted.code());
        }
    };

    let config = Config {
        endpoint,
        token,
        origin: args.origin,
        version: env!("CARGO_PKG_VERSION"),
        simultaneous: args.simultaneous,
        backup_dir: args.backup_dir,
        category,
        include_public: args.include_public,
        etag_algorithm,
    };

    let queue = Arc::new(WorkQueue::new());
    walk_categories(&queue, &config.backup_dir, config.category.as_deref(), config.include_public)
        .await
        .context("could not read local backup root")?;

    let client = StorageClient::new(&config)?;
    let barrier = Arc::new(PauseBarrier::new());
    let lifecycle = Lifecycle::new(Arc::clone(&queue), Mode::Restore);
    lifecycle.install_signal_handlers();

    let transfer = RestoreTransfer::new(
        client,
        Arc::clone(&queue),
        Arc::clone(&barrier),
        config.backup_dir.clone(),
        config.etag_algorithm,
        Arc::clone(&lifecycle),
    );
    let dispatcher = backup_core::Dispatcher::new(Arc::clone(&queue), barrier, config.simultaneous, transfer.into_transfer_fn());
    dispatcher.kickoff();

    let (spinner, spinner_stop) = backup_core::progress::spawn(!args.quiet, queue, "restore");
    let outcome = lifecycle.run_to_completion(&dispatcher).await;
    spinner_stop.store(true, std::sync::atomic::Ordering::SeqCst);
    if let Some(handle) = spinner {
        let _ = handle.await;
    }

    std::process::exit(outcome.code());
}

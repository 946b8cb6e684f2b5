//! Bearer-token acquisition.
//!
//! WebFinger discovery of the storage endpoint and OAuth-style interactive
//! token acquisition are explicitly out of scope for this crate's design
//! (they're external collaborators, not core engine behavior). What lives
//! here is the narrow seam the binaries call through: a trait object the
//! CLI wires up, so the engine itself never needs to know whether a token
//! came from a flag, a cached session, or a browser popup.

use async_trait::async_trait;

/// Supplies the bearer token (and, by extension, whatever discovery/auth
/// flow produced it) for a run.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    async fn resolve(&self) -> anyhow::Result<String>;
}

/// The common case: the token was already supplied on the command line.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenResolver for StaticToken {
    async fn resolve(&self) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

/// Placeholder for the interactive WebFinger + OAuth-style flow. Not
/// implemented here by design: the real flow launches a browser and listens
/// on a local redirect page, both of which are glue outside this crate's
/// core. A production binary wires in its own resolver; this one exists so
/// the CLI has something to construct when no token is given, and so tests
/// can exercise the "token acquisition aborted" exit path (exit code 1).
pub struct InteractiveAcquisitionUnavailable;

#[async_trait]
impl TokenResolver for InteractiveAcquisitionUnavailable {
    async fn resolve(&self) -> anyhow::Result<String> {
        anyhow::bail!(
            "no --token supplied and interactive token acquisition is not wired into this build"
        )
    }
}

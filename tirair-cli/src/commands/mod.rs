//! Subcommand implementations
//!
//! Each command takes the shared `AppContext`. Commands that print results
//! write to a caller-supplied writer so they can be driven from tests;
//! diagnostics go through `tracing` to stderr.

pub mod control;
pub mod history;
pub mod ingest;
pub mod predict;
pub mod status;
pub mod train;

use std::future::Future;

/// Resolves when the operator interrupts the process
///
/// If the signal handler cannot be installed the future never resolves, so
/// the caller keeps running rather than stopping at once.
pub fn interrupted() -> impl Future<Output = ()> {
    async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("interrupt received, shutting down"),
            Err(e) => {
                tracing::warn!("cannot listen for interrupts: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}

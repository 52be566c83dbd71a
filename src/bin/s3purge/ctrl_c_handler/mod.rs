//! Turns Ctrl+C into a cancellation of the running purge.

use s3purge_rs::PipelineCancellationToken;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Spawn a task that cancels `cancellation_token` on the first Ctrl+C.
///
/// The task also ends when the token is cancelled elsewhere, which is how
/// `main` stops it once the purge is over.
pub fn spawn_ctrl_c_handler(cancellation_token: PipelineCancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let signal_result = tokio::select! {
            _ = cancellation_token.cancelled() => {
                debug!("purge finished, ctrl-c handler stopped.");
                return;
            }
            result = signal::ctrl_c() => result,
        };

        if let Err(e) = signal_result {
            error!(error = e.to_string(), "unable to listen for ctrl-c.");
            return;
        }

        warn!("ctrl-c received, cancelling the purge.");
        cancellation_token.cancel();
    })
}

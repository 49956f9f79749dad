//! Ctrl-C handling: the first interrupt drains, the second exits at once.

use std::future::Future;
use std::io;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Exit status after a forced quit, as a shell reports for SIGINT.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Wait for interrupts from `next_interrupt`. The first one trips `cancel`;
/// returns `true` when a second one arrives. Returns `false` if the signal
/// source fails.
pub async fn watch_interrupts<F, Fut>(mut next_interrupt: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if let Err(e) = next_interrupt().await {
        warn!("cannot listen for Ctrl-C: {e}");
        return false;
    }
    info!("termination requested, draining in-flight work (Ctrl-C again to force)");
    cancel.cancel();

    match next_interrupt().await {
        Ok(()) => {
            warn!("second interrupt, exiting without draining");
            true
        }
        Err(e) => {
            warn!("cannot listen for Ctrl-C: {e}");
            false
        }
    }
}

/// Listen for Ctrl-C for the rest of the process; a second one exits with
/// [`FORCED_EXIT_CODE`].
pub fn spawn(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, cancel).await {
            std::process::exit(FORCED_EXIT_CODE);
        }
    })
}

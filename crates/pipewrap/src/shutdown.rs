//! Single-shot shutdown coordination.

use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Installs the interrupt listener and returns the watch the capture driver
/// selects on.
///
/// The first Ctrl-C flips the watch to `true`; the listener keeps swallowing
/// subsequent interrupts so the drain sequence can only ever run once.
pub fn install() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        let mut draining = false;
        loop {
            if let Err(error) = tokio::signal::ctrl_c().await {
                warn!(%error, "cannot listen for interrupts");
                // Keep the sender alive so the session is not spuriously
                // stopped by a closed watch.
                std::future::pending::<()>().await;
            }
            if draining {
                debug!("interrupt ignored; shutdown already in progress");
            } else {
                info!("interrupt received; draining capture session");
                draining = true;
                let _ = tx.send(true);
            }
        }
    });
    rx
}

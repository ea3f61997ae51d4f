//! Process-wide shutdown signal.
//!
//! A `tokio::sync::watch` channel carrying `true` once shutdown was
//! requested. Long-running loops race their work against [`requested`].

use tokio::sync::watch;

/// Sending half; call `send(true)` to stop every loop holding a receiver.
pub type ShutdownTx = watch::Sender<bool>;
/// Receiving half handed to long-running loops.
pub type ShutdownRx = watch::Receiver<bool>;

/// Create a fresh, not-yet-triggered shutdown channel.
pub fn channel() -> (ShutdownTx, ShutdownRx) {
    watch::channel(false)
}

/// Resolve once shutdown was requested or the sender went away.
pub async fn requested(rx: &mut ShutdownRx) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

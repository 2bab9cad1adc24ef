//! Autosave timer.
//!
//! The ticker only produces ticks. The host loop receives them and calls
//! [`SessionManager::autosave_tick`](crate::SessionManager::autosave_tick) on
//! its own thread, so the engine never runs off the host thread.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

/// Pending ticks beyond this are dropped.
const TICK_BUFFER: usize = 4;

/// Periodic autosave trigger running on the tokio runtime.
#[derive(Debug)]
pub struct AutosaveTicker {
    handle: JoinHandle<()>,
}

impl AutosaveTicker {
    /// Start ticking every `interval`; the first tick fires one interval
    /// after spawning. Must be called inside a tokio runtime.
    pub fn spawn(interval: Duration) -> (Self, mpsc::Receiver<Instant>) {
        let (tx, rx) = mpsc::channel(TICK_BUFFER);
        let period = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                let at = ticker.tick().await;
                match tx.try_send(at) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!("Autosave tick dropped, receiver is behind");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => break, // Receiver dropped
                }
            }
        });

        (Self { handle }, rx)
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for AutosaveTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

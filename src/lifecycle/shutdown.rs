//! Stop latch for background tasks.
//!
//! Once triggered the latch stays set, so a task that starts listening after
//! the server stopped still returns straight away. Dropping the `Shutdown`
//! releases every listener as well.

use tokio::sync::watch;

pub struct Shutdown {
    stopped: watch::Sender<bool>,
}

/// Handle held by one background task.
#[derive(Clone)]
pub struct StopListener {
    stopped: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (stopped, _) = watch::channel(false);
        Self { stopped }
    }

    pub fn listener(&self) -> StopListener {
        StopListener {
            stopped: self.stopped.subscribe(),
        }
    }

    /// Set the latch. Returns how many listeners were still attached.
    pub fn trigger(&self) -> usize {
        let listeners = self.stopped.receiver_count();
        self.stopped.send_replace(true);
        tracing::debug!(listeners, "Stopping background tasks");
        listeners
    }

    pub fn is_triggered(&self) -> bool {
        *self.stopped.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl StopListener {
    /// Resolves once the latch is set or its `Shutdown` is gone.
    pub async fn stopped(&mut self) {
        let _ = self.stopped.wait_for(|stopped| *stopped).await;
    }
}

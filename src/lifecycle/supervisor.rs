//! Supervision of background tasks.
//!
//! The process is crash-only: a background task that fails or panics is never
//! restarted. Its failure is reported once on a shared channel, and the server
//! treats the first report as the signal to close the listener and exit with
//! status 1.

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A failure nothing in the process handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalError {
    /// Name of the task that failed.
    pub task: String,
    pub reason: String,
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task '{}' failed: {}", self.task, self.reason)
    }
}

/// How a server run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Stopped by an OS signal.
    Stopped,
    /// Stopped because of an unhandled failure.
    Fatal(FatalError),
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Stopped => 0,
            RunOutcome::Fatal(_) => 1,
        }
    }
}

/// Spawns background tasks and reports their failures.
#[derive(Debug, Clone)]
pub struct Supervisor {
    tx: mpsc::UnboundedSender<FatalError>,
}

/// Receiving end of the failure channel.
#[derive(Debug)]
pub struct FatalReports {
    rx: mpsc::UnboundedReceiver<FatalError>,
}

impl Supervisor {
    pub fn new() -> (Self, FatalReports) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, FatalReports { rx })
    }

    /// Report a failure directly.
    pub fn report(&self, task: impl Into<String>, reason: impl Into<String>) {
        let fatal = FatalError {
            task: task.into(),
            reason: reason.into(),
        };
        tracing::error!(task = %fatal.task, reason = %fatal.reason, "Unhandled failure");
        let _ = self.tx.send(fatal);
    }

    /// Run `task` in the background. An `Err` or a panic is reported as fatal;
    /// a task that returns `Ok` simply ends.
    pub fn spawn<F, E>(&self, name: &'static str, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let supervisor = self.clone();
        let inner = tokio::spawn(task);

        tokio::spawn(async move {
            match inner.await {
                Ok(Ok(())) => tracing::debug!(task = name, "Background task finished"),
                Ok(Err(e)) => supervisor.report(name, e.to_string()),
                Err(join_error) if join_error.is_panic() => {
                    let payload = join_error.into_panic();
                    let reason = if let Some(s) = payload.downcast_ref::<String>() {
                        format!("panicked: {}", s)
                    } else if let Some(s) = payload.downcast_ref::<&str>() {
                        format!("panicked: {}", s)
                    } else {
                        "panicked".to_string()
                    };
                    supervisor.report(name, reason);
                }
                Err(_) => tracing::debug!(task = name, "Background task cancelled"),
            }
        })
    }
}

impl FatalReports {
    /// Wait for the next failure.
    ///
    /// Never resolves once every `Supervisor` handle is gone, since no failure
    /// can be reported any more.
    pub async fn next(&mut self) -> FatalError {
        match self.rx.recv().await {
            Some(fatal) => fatal,
            None => std::future::pending().await,
        }
    }
}

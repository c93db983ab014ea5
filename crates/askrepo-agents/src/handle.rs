//! The uniform two-channel shape every backend returns.

use askrepo_core::AgentEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

/// A running agent invocation.
///
/// Two channels: an incremental stream of normalized events
/// ([`RunHandle::next_event`]) and a completion signal
/// ([`RunHandle::finished`]). The stream carries at most one terminal
/// event (`Result` or `Error`) and closes after it.
///
/// Dropping the handle cancels the run: the child process is killed or the
/// SDK call aborted, so a disconnected consumer never leaves orphaned work
/// behind.
#[derive(Debug)]
pub struct RunHandle {
    events: mpsc::Receiver<AgentEvent>,
    driver: JoinHandle<()>,
    _cancel: DropGuard,
}

impl RunHandle {
    pub(crate) fn new(
        events: mpsc::Receiver<AgentEvent>,
        driver: JoinHandle<()>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            events,
            driver,
            _cancel: cancel.drop_guard(),
        }
    }

    /// Next event, in native-stream order. `None` once the run is over.
    pub async fn next_event(&mut self) -> Option<AgentEvent> {
        self.events.recv().await
    }

    /// Wait for the backend driver to wind down (process reaped, SDK call
    /// finished). Usually called after the event stream has ended.
    pub async fn finished(mut self) {
        self.events.close();
        let _ = (&mut self.driver).await;
    }
}

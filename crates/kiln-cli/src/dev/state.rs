//! Lifecycle phase tracking for the development server.
//!
//! The phase is published through a `tokio::sync::watch` channel so callers
//! can await a given phase, and every transition is appended to a history
//! kept behind a parking_lot mutex. The same mutex serializes transitions and
//! stop requests, which is what makes [`ServerController::stop`] safe to call
//! from any phase.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::error::ServerError;

/// Server lifecycle phase.
///
/// ```text
/// Unstarted -> Binding -> Serving -> Stopped
///                  |
///                  +----> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerPhase {
    Unstarted,
    Binding,
    Serving,
    Stopped,
    Failed,
}

impl ServerPhase {
    /// `Stopped` and `Failed` are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, ServerPhase::Stopped | ServerPhase::Failed)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(self, next: ServerPhase) -> bool {
        use ServerPhase::*;
        matches!(
            (self, next),
            (Unstarted, Binding)
                | (Unstarted, Stopped)
                | (Binding, Serving)
                | (Binding, Failed)
                | (Binding, Stopped)
                | (Serving, Stopped)
        )
    }
}

impl fmt::Display for ServerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerPhase::Unstarted => "unstarted",
            ServerPhase::Binding => "binding",
            ServerPhase::Serving => "serving",
            ServerPhase::Stopped => "stopped",
            ServerPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Shared phase state owned jointly by a server, its handle and its controllers.
#[derive(Debug)]
pub(crate) struct ServerControl {
    phase: watch::Sender<ServerPhase>,
    stop: watch::Sender<bool>,
    history: Mutex<Vec<ServerPhase>>,
}

impl ServerControl {
    pub(crate) fn new() -> Self {
        let (phase, _) = watch::channel(ServerPhase::Unstarted);
        let (stop, _) = watch::channel(false);
        Self {
            phase,
            stop,
            history: Mutex::new(vec![ServerPhase::Unstarted]),
        }
    }

    pub(crate) fn phase(&self) -> ServerPhase {
        *self.phase.borrow()
    }

    /// Move to `next`, or fail with `InvalidState` naming `action`.
    pub(crate) fn transition(
        &self,
        next: ServerPhase,
        action: &'static str,
    ) -> Result<(), ServerError> {
        let mut history = self.history.lock();
        let current = self.phase();

        if !current.can_transition_to(next) {
            return Err(ServerError::InvalidState {
                action,
                phase: current,
            });
        }

        debug!(from = %current, to = %next, "server phase transition");
        self.phase.send_replace(next);
        history.push(next);
        Ok(())
    }

    /// Move to `Stopped` unless the server already reached a terminal phase.
    pub(crate) fn finish(&self) {
        let mut history = self.history.lock();
        let current = self.phase();

        if current.can_transition_to(ServerPhase::Stopped) {
            debug!(from = %current, to = %ServerPhase::Stopped, "server phase transition");
            self.phase.send_replace(ServerPhase::Stopped);
            history.push(ServerPhase::Stopped);
        }
    }

    /// Request shutdown. An unstarted server stops immediately.
    pub(crate) fn request_stop(&self) {
        let mut history = self.history.lock();

        if self.phase() == ServerPhase::Unstarted {
            self.phase.send_replace(ServerPhase::Stopped);
            history.push(ServerPhase::Stopped);
        }

        self.stop.send_replace(true);
    }

    pub(crate) fn stop_requested(&self) -> bool {
        *self.stop.borrow()
    }

    /// Resolves once a stop has been requested.
    pub(crate) async fn stopped(&self) {
        let mut rx = self.stop.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|stop| *stop).await;
    }

    pub(crate) fn history(&self) -> Vec<ServerPhase> {
        self.history.lock().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ServerPhase> {
        self.phase.subscribe()
    }
}

/// Cloneable handle for observing and stopping a server from anywhere.
#[derive(Debug, Clone)]
pub struct ServerController {
    control: Arc<ServerControl>,
}

impl ServerController {
    pub(crate) fn new(control: Arc<ServerControl>) -> Self {
        Self { control }
    }

    pub fn phase(&self) -> ServerPhase {
        self.control.phase()
    }

    /// Every phase the server has been in, starting with `Unstarted`.
    pub fn history(&self) -> Vec<ServerPhase> {
        self.control.history()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerPhase> {
        self.control.subscribe()
    }

    /// Request shutdown; safe in every phase.
    ///
    /// In `Unstarted` the server moves straight to `Stopped`. During
    /// `Binding` the bind completes, the listener is dropped and the server
    /// ends in `Stopped`. In `Serving` graceful shutdown begins.
    pub fn stop(&self) {
        self.control.request_stop();
    }

    pub fn stop_requested(&self) -> bool {
        self.control.stop_requested()
    }

    /// Wait until the server is in `phase`, returning early with the
    /// current phase if a terminal one is reached instead.
    pub async fn wait_for(&self, phase: ServerPhase) -> ServerPhase {
        let mut rx = self.control.subscribe();
        match rx.wait_for(|current| *current == phase || current.is_terminal()).await {
            Ok(current) => *current,
            Err(_) => self.control.phase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_edges() {
        use ServerPhase::*;

        assert!(Unstarted.can_transition_to(Binding));
        assert!(Binding.can_transition_to(Serving));
        assert!(Binding.can_transition_to(Failed));
        assert!(Serving.can_transition_to(Stopped));

        assert!(!Unstarted.can_transition_to(Serving));
        assert!(!Serving.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Binding));
        assert!(!Stopped.can_transition_to(Binding));
    }

    #[test]
    fn invalid_transition_reports_current_phase() {
        let control = ServerControl::new();
        let err = control.transition(ServerPhase::Serving, "serve").unwrap_err();

        assert!(matches!(
            err,
            ServerError::InvalidState {
                action: "serve",
                phase: ServerPhase::Unstarted
            }
        ));
        assert_eq!(control.history(), vec![ServerPhase::Unstarted]);
    }

    #[test]
    fn stop_before_start_goes_straight_to_stopped() {
        let control = Arc::new(ServerControl::new());
        let controller = ServerController::new(control.clone());

        controller.stop();

        assert_eq!(controller.phase(), ServerPhase::Stopped);
        assert!(controller.stop_requested());
        assert_eq!(
            controller.history(),
            vec![ServerPhase::Unstarted, ServerPhase::Stopped]
        );
        assert!(control.transition(ServerPhase::Binding, "start").is_err());
    }

    #[test]
    fn finish_is_idempotent() {
        let control = ServerControl::new();
        control.transition(ServerPhase::Binding, "start").unwrap();
        control.transition(ServerPhase::Serving, "start").unwrap();

        control.finish();
        control.finish();

        assert_eq!(
            control.history(),
            vec![
                ServerPhase::Unstarted,
                ServerPhase::Binding,
                ServerPhase::Serving,
                ServerPhase::Stopped
            ]
        );
    }

    #[test]
    fn finish_does_not_override_failure() {
        let control = ServerControl::new();
        control.transition(ServerPhase::Binding, "start").unwrap();
        control.transition(ServerPhase::Failed, "start").unwrap();

        control.finish();
        assert_eq!(control.phase(), ServerPhase::Failed);
    }

    #[tokio::test]
    async fn wait_for_returns_on_terminal_phase() {
        let control = Arc::new(ServerControl::new());
        let controller = ServerController::new(control.clone());

        let waiter = tokio::spawn({
            let controller = controller.clone();
            async move { controller.wait_for(ServerPhase::Serving).await }
        });

        control.transition(ServerPhase::Binding, "start").unwrap();
        control.transition(ServerPhase::Failed, "start").unwrap();

        assert_eq!(waiter.await.unwrap(), ServerPhase::Failed);
    }

    #[tokio::test]
    async fn stopped_resolves_after_request() {
        let control = Arc::new(ServerControl::new());
        control.transition(ServerPhase::Binding, "start").unwrap();

        let waiter = tokio::spawn({
            let control = control.clone();
            async move { control.stopped().await }
        });

        control.request_stop();
        waiter.await.unwrap();
        assert_eq!(control.phase(), ServerPhase::Binding);
    }
}

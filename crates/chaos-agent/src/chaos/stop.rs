//! Stop — bounded two-phase shutdown.
//!
//! ```text
//! Running → GracefulSignalSent → WaitingGraceful → ForceSignalSent → WaitingForce
//!                                                                     ├─ Stopped
//!                                                                     └─ Unstoppable
//! ```
//!
//! The two waits read their outcomes differently. During the graceful
//! wait a poll error is only logged. During the force wait a poll error
//! means the container is gone and counts as stopped, while running out
//! the clock with the container still up is the only failure.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::chaos::error::{map_docker_error, ChaosError};
use crate::client::docker::DockerOps;
use crate::docker::client::DockerError;
use crate::docker::snapshot::{is_running, ContainerSnapshot};

/// Graceful signal used when the image declares none.
pub const DEFAULT_STOP_SIGNAL: &str = "SIGTERM";
/// Signal sent after the graceful wait, unconditionally.
pub const KILL_SIGNAL: &str = "SIGKILL";
/// Gap between running-state polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Deadline used when the timeout overflows the clock.
const UNBOUNDED_WAIT: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopState {
    Running,
    GracefulSignalSent,
    WaitingGraceful,
    ForceSignalSent,
    WaitingForce,
    Stopped,
    Unstoppable,
}

impl StopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, StopState::Stopped | StopState::Unstoppable)
    }
}

/// How a bounded wait for "not running" ended.
#[derive(Debug)]
pub enum WaitOutcome {
    NotRunning,
    TimedOut,
    PollFailed(DockerError),
}

/// Verdict of the force wait.
pub fn settle(outcome: &WaitOutcome) -> StopState {
    match outcome {
        WaitOutcome::NotRunning | WaitOutcome::PollFailed(_) => StopState::Stopped,
        WaitOutcome::TimedOut => StopState::Unstoppable,
    }
}

/// Graceful signal for `target`: its declared stop signal, else SIGTERM.
pub fn graceful_signal(target: &ContainerSnapshot) -> &str {
    if target.stop_signal.is_empty() {
        DEFAULT_STOP_SIGNAL
    } else {
        &target.stop_signal
    }
}

/// Poll until the container reports not running or `timeout` elapses.
/// Polls at least once.
pub async fn wait_for_stop(docker: &dyn DockerOps, id: &str, timeout: Duration) -> WaitOutcome {
    let start = Instant::now();
    let deadline = start
        .checked_add(timeout)
        .unwrap_or_else(|| start + UNBOUNDED_WAIT);
    loop {
        match docker.inspect_container(id).await {
            Err(e) => return WaitOutcome::PollFailed(e),
            Ok(details) if !is_running(&details) => return WaitOutcome::NotRunning,
            Ok(_) => {}
        }
        let now = Instant::now();
        if now >= deadline {
            return WaitOutcome::TimedOut;
        }
        sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}

/// One run of the stop state machine against a single container.
pub struct StopSequence<'a> {
    docker: &'a dyn DockerOps,
    target: &'a ContainerSnapshot,
    timeout: Duration,
    state: StopState,
}

impl<'a> StopSequence<'a> {
    pub fn new(docker: &'a dyn DockerOps, target: &'a ContainerSnapshot, timeout: Duration) -> Self {
        Self {
            docker,
            target,
            timeout,
            state: StopState::Running,
        }
    }

    /// Drive the machine to a terminal state.
    pub async fn run(mut self) -> Result<(), ChaosError> {
        while !self.state.is_terminal() {
            let next = self.step().await?;
            debug!(container_id = %self.target.id, from = ?self.state, to = ?next, "Stop transition");
            self.state = next;
        }
        match self.state {
            StopState::Stopped => Ok(()),
            _ => Err(ChaosError::CouldNotStop {
                name: self.target.name.clone(),
                id: self.target.id.clone(),
                signal: KILL_SIGNAL.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }

    /// Perform the current state's action and return the next state.
    async fn step(&self) -> Result<StopState, ChaosError> {
        let id = self.target.id.as_str();
        Ok(match self.state {
            StopState::Running => {
                self.signal(graceful_signal(self.target)).await?;
                StopState::GracefulSignalSent
            }
            StopState::GracefulSignalSent => StopState::WaitingGraceful,
            StopState::WaitingGraceful => {
                match wait_for_stop(self.docker, id, self.timeout).await {
                    WaitOutcome::PollFailed(e) => {
                        debug!(container_id = %id, error = %e, "Error waiting for graceful stop")
                    }
                    outcome => debug!(container_id = %id, ?outcome, "Graceful wait finished"),
                }
                self.force_signal().await?;
                StopState::ForceSignalSent
            }
            StopState::ForceSignalSent => StopState::WaitingForce,
            StopState::WaitingForce => {
                let outcome = wait_for_stop(self.docker, id, self.timeout).await;
                debug!(container_id = %id, ?outcome, "Force wait finished");
                settle(&outcome)
            }
            terminal => terminal,
        })
    }

    /// A container that already exited (or was removed) rejects the kill;
    /// the force wait decides the outcome then. Only an unreachable daemon
    /// aborts here.
    async fn force_signal(&self) -> Result<(), ChaosError> {
        debug!(container_id = %self.target.id, signal = KILL_SIGNAL, "Sending signal");
        match self.docker.kill_container(&self.target.id, KILL_SIGNAL).await {
            Err(e) if e.is_unavailable() => Err(map_docker_error("stopping", self.target, e)),
            Err(e) => {
                debug!(container_id = %self.target.id, error = %e, "Force signal not delivered");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// A stale snapshot may name a container that already exited; the
    /// rejected signal is logged and the waits decide. An unreachable daemon
    /// or a vanished container aborts.
    async fn signal(&self, signal: &str) -> Result<(), ChaosError> {
        debug!(container_id = %self.target.id, %signal, "Sending signal");
        match self.docker.kill_container(&self.target.id, signal).await {
            Err(e) if e.is_unavailable() || e.is_not_found() => {
                Err(map_docker_error("stopping", self.target, e))
            }
            Err(e) => {
                debug!(container_id = %self.target.id, error = %e, "Graceful signal not delivered");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{FakeCall, FakeContainer, FakeDocker};

    fn snapshot(id: &str) -> ContainerSnapshot {
        ContainerSnapshot::new(id, "web", "img")
    }

    #[test]
    fn test_settle_asymmetry() {
        assert_eq!(settle(&WaitOutcome::NotRunning), StopState::Stopped);
        assert_eq!(
            settle(&WaitOutcome::PollFailed(DockerError::ContainerNotFound("abc".into()))),
            StopState::Stopped
        );
        assert_eq!(settle(&WaitOutcome::TimedOut), StopState::Unstoppable);
    }

    #[test]
    fn test_graceful_signal_defaults_to_sigterm() {
        assert_eq!(graceful_signal(&snapshot("abc")), "SIGTERM");
        let custom = snapshot("abc").with_stop_signal("SIGQUIT");
        assert_eq!(graceful_signal(&custom), "SIGQUIT");
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_stop_still_sends_kill_once() {
        let fake = FakeDocker::new();
        fake.add_container(FakeContainer::running("abc", "web")).await;
        let target = snapshot("abc");

        StopSequence::new(&fake, &target, Duration::from_secs(5))
            .run()
            .await
            .unwrap();

        assert_eq!(fake.signals_sent("abc").await, vec!["SIGTERM", "SIGKILL"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_sigterm_falls_back_to_kill() {
        let fake = FakeDocker::new();
        fake.add_container(FakeContainer::running("abc", "web").ignoring(&["SIGTERM"]))
            .await;
        let target = snapshot("abc");

        let started = Instant::now();
        StopSequence::new(&fake, &target, Duration::from_secs(3))
            .run()
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(fake.signals_sent("abc").await, vec!["SIGTERM", "SIGKILL"]);
        assert!(!fake.container("abc").await.unwrap().running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_stop_signal_used_first() {
        let fake = FakeDocker::new();
        fake.add_container(FakeContainer::running("abc", "web")).await;
        let target = snapshot("abc").with_stop_signal("SIGINT");

        StopSequence::new(&fake, &target, Duration::from_secs(1))
            .run()
            .await
            .unwrap();

        assert_eq!(fake.signals_sent("abc").await, vec!["SIGINT", "SIGKILL"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unstoppable_container_fails() {
        let fake = FakeDocker::new();
        fake.add_container(
            FakeContainer::running("abc", "web").ignoring(&["SIGTERM", "SIGKILL"]),
        )
        .await;
        let target = snapshot("abc");

        let err = StopSequence::new(&fake, &target, Duration::from_secs(2))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, ChaosError::CouldNotStop { ref id, .. } if id == "abc"));
        assert_eq!(fake.signals_sent("abc").await, vec!["SIGTERM", "SIGKILL"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vanished_during_force_wait_is_stopped() {
        let fake = FakeDocker::new();
        fake.add_container(
            FakeContainer::running("abc", "web")
                .ignoring(&["SIGTERM"])
                .vanishing_on_kill(),
        )
        .await;
        let target = snapshot("abc");

        StopSequence::new(&fake, &target, Duration::from_secs(2))
            .run()
            .await
            .unwrap();
        assert!(fake.container("abc").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_vanished_during_graceful_wait_is_stopped() {
        let fake = FakeDocker::new();
        fake.add_container(FakeContainer::running("abc", "web").vanishing_on_kill())
            .await;
        let target = snapshot("abc");

        StopSequence::new(&fake, &target, Duration::from_secs(2))
            .run()
            .await
            .unwrap();

        assert_eq!(fake.signals_sent("abc").await, vec!["SIGTERM", "SIGKILL"]);
        assert!(fake.container("abc").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_exited_container_stops_cleanly() {
        let fake = FakeDocker::new();
        let mut exited = FakeContainer::running("abc", "web");
        exited.running = false;
        fake.add_container(exited).await;
        let target = snapshot("abc");

        StopSequence::new(&fake, &target, Duration::from_secs(2))
            .run()
            .await
            .unwrap();

        assert_eq!(fake.signals_sent("abc").await, vec!["SIGTERM", "SIGKILL"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_timeout_does_not_overflow() {
        let fake = FakeDocker::new();
        fake.add_container(FakeContainer::running("abc", "web")).await;
        let target = snapshot("abc");

        StopSequence::new(&fake, &target, Duration::from_secs(u64::MAX))
            .run()
            .await
            .unwrap();

        assert_eq!(fake.signals_sent("abc").await, vec!["SIGTERM", "SIGKILL"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_once_per_interval() {
        let fake = FakeDocker::new();
        fake.add_container(FakeContainer::running("abc", "web").ignoring(&["SIGTERM"]))
            .await;
        let target = snapshot("abc");

        StopSequence::new(&fake, &target, Duration::from_secs(3))
            .run()
            .await
            .unwrap();

        let calls = fake.calls().await;
        let kill_at = calls
            .iter()
            .position(|c| matches!(c, FakeCall::Kill { signal, .. } if signal == "SIGKILL"))
            .unwrap();
        let graceful_polls = calls[..kill_at]
            .iter()
            .filter(|c| matches!(c, FakeCall::InspectContainer(_)))
            .count();
        // t=0,1,2,3
        assert_eq!(graceful_polls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_signal_error_aborts_before_kill() {
        let fake = FakeDocker::new();
        let target = snapshot("missing");

        let err = StopSequence::new(&fake, &target, Duration::from_secs(1))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, ChaosError::NotFound { .. }));
        assert_eq!(fake.signals_sent("missing").await, vec!["SIGTERM"]);
    }
}

//! Capture process supervision.
//!
//! Runs the capture subprocess to completion, turning a user stop request into
//! SIGTERM followed by SIGKILL once the grace window runs out, and classifies how
//! the process ended.

use crate::error::{RecordError, Result};
use crate::process::{CaptureHandle, ExitReport, StopKind, SIGINT, SIGTERM};
use std::time::Duration;
use tokio::sync::watch;

/// Fires a stop request. Dropping it without firing leaves tokens pending forever.
#[derive(Debug)]
pub struct StopTrigger {
    tx: watch::Sender<bool>,
}

/// Resolves once the paired [`StopTrigger`] fires.
#[derive(Debug, Clone)]
pub struct StopToken {
    rx: watch::Receiver<bool>,
}

pub fn stop_pair() -> (StopTrigger, StopToken) {
    let (tx, rx) = watch::channel(false);
    (StopTrigger { tx }, StopToken { rx })
}

impl StopTrigger {
    pub fn fire(&self) {
        self.tx.send_replace(true);
    }
}

impl StopToken {
    pub async fn stopped(&mut self) {
        if self.rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Wires Ctrl+C to a new stop token. The listening task lives until the process exits.
pub fn stop_on_ctrl_c() -> StopToken {
    let (trigger, token) = stop_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping capture");
            trigger.fire();
            // Keep the sender alive so the token stays fired.
            std::future::pending::<()>().await;
        }
    });
    token
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Starting,
    Recording,
    StoppedByUser,
    StoppedByError,
    CompletedNaturally,
}

pub struct Supervisor {
    state: CaptureState,
    grace: Duration,
}

impl Supervisor {
    pub fn new(grace: Duration) -> Self {
        Self {
            state: CaptureState::Starting,
            grace,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    fn transition(&mut self, next: CaptureState) {
        tracing::debug!("Capture state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Waits for the capture to end, stopping it when `stop` fires.
    ///
    /// Returns the final state: `StoppedByUser` or `CompletedNaturally`.
    ///
    /// # Errors
    /// - `Subprocess` if the process exits non-zero without having been asked to stop
    pub async fn supervise<H: CaptureHandle>(
        &mut self,
        handle: &mut H,
        mut stop: StopToken,
    ) -> Result<CaptureState> {
        self.transition(CaptureState::Recording);

        let natural = tokio::select! {
            report = handle.wait() => Some(report?),
            _ = stop.stopped() => None,
        };

        let (report, stop_requested) = match natural {
            Some(report) => (report, false),
            None => (self.stop(handle).await?, true),
        };

        let next = classify(&report, stop_requested);
        self.transition(next);
        match next {
            CaptureState::StoppedByError => {
                tracing::error!("Capture process failed: {}", report.describe());
                Err(RecordError::subprocess("ffmpeg", report.describe()))
            }
            state => {
                tracing::info!("Capture ended ({:?}): {}", state, report.describe());
                Ok(state)
            }
        }
    }

    async fn stop<H: CaptureHandle>(&self, handle: &mut H) -> Result<ExitReport> {
        println!("{}", console::style("\n🛑 Stopping recording...").red());
        handle.stop(StopKind::Graceful)?;

        match tokio::time::timeout(self.grace, handle.wait()).await {
            Ok(report) => report,
            Err(_) => {
                println!("{}", console::style("Force killing FFmpeg...").red());
                tracing::warn!("Capture still running after {:?}, sending SIGKILL", self.grace);
                handle.stop(StopKind::Force)?;
                handle.wait().await
            }
        }
    }
}

/// Decides whether an exit was a user stop, a natural end or a failure.
///
/// ffmpeg traps SIGINT/SIGTERM and exits non-zero after finalizing the file, so
/// once a stop was requested any exit counts as a user stop.
pub fn classify(report: &ExitReport, stop_requested: bool) -> CaptureState {
    if stop_requested {
        return CaptureState::StoppedByUser;
    }
    if report.success() {
        return CaptureState::CompletedNaturally;
    }
    match report.signal {
        Some(SIGTERM) | Some(SIGINT) => CaptureState::StoppedByUser,
        _ => CaptureState::StoppedByError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::FakeHandle;
    use crate::process::testing::SIGKILL;

    #[test]
    fn test_classify() {
        assert_eq!(classify(&ExitReport::exited(0), false), CaptureState::CompletedNaturally);
        assert_eq!(classify(&ExitReport::signalled(SIGTERM), false), CaptureState::StoppedByUser);
        assert_eq!(classify(&ExitReport::signalled(SIGINT), false), CaptureState::StoppedByUser);
        assert_eq!(classify(&ExitReport::exited(255), true), CaptureState::StoppedByUser);
        assert_eq!(classify(&ExitReport::signalled(SIGKILL), true), CaptureState::StoppedByUser);
        assert_eq!(classify(&ExitReport::exited(1), false), CaptureState::StoppedByError);
        assert_eq!(classify(&ExitReport::signalled(SIGKILL), false), CaptureState::StoppedByError);
    }

    #[tokio::test]
    async fn test_natural_completion() {
        let mut handle = FakeHandle::finished(ExitReport::exited(0));
        let (_trigger, token) = stop_pair();
        let mut supervisor = Supervisor::new(Duration::from_secs(3));
        let state = supervisor.supervise(&mut handle, token).await.unwrap();
        assert_eq!(state, CaptureState::CompletedNaturally);
        assert!(handle.stops.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let mut handle = FakeHandle::finished(ExitReport::exited(1));
        let (_trigger, token) = stop_pair();
        let mut supervisor = Supervisor::new(Duration::from_secs(3));
        let result = supervisor.supervise(&mut handle, token).await;
        assert!(matches!(result, Err(RecordError::Subprocess { .. })));
        assert_eq!(supervisor.state(), CaptureState::StoppedByError);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_sends_sigterm_only_when_honoured() {
        let mut handle = FakeHandle::running(true);
        let stops = handle.stops.clone();
        let (trigger, token) = stop_pair();
        trigger.fire();

        let mut supervisor = Supervisor::new(Duration::from_secs(3));
        let state = supervisor.supervise(&mut handle, token).await.unwrap();

        assert_eq!(state, CaptureState::StoppedByUser);
        assert_eq!(*stops.lock().unwrap(), vec![StopKind::Graceful]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_escalates_to_kill_after_grace_window() {
        let mut handle = FakeHandle::running(false);
        let stops = handle.stops.clone();
        let (trigger, token) = stop_pair();

        let started = tokio::time::Instant::now();
        let fire = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.fire();
            trigger
        });

        let mut supervisor = Supervisor::new(Duration::from_millis(3000));
        let state = supervisor.supervise(&mut handle, token).await.unwrap();
        let _trigger = fire.await.unwrap();

        assert_eq!(state, CaptureState::StoppedByUser);
        assert_eq!(*stops.lock().unwrap(), vec![StopKind::Graceful, StopKind::Force]);
        assert!(started.elapsed() >= Duration::from_millis(3500));
    }

    #[tokio::test]
    async fn test_dropped_trigger_never_stops() {
        let mut handle = FakeHandle::finished(ExitReport::exited(0));
        let (trigger, token) = stop_pair();
        drop(trigger);
        let mut supervisor = Supervisor::new(Duration::from_secs(3));
        let state = supervisor.supervise(&mut handle, token).await.unwrap();
        assert_eq!(state, CaptureState::CompletedNaturally);
    }
}

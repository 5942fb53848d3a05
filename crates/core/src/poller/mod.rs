//! Cancellable interval poller for slow external operations
//!
//! A [`DiscoveryPoller`] invokes a [`Probe`] on a fixed interval until the
//! probe finishes, fails, or the timeout elapses. Ticks that fire while a
//! probe is still running are skipped, so at most one invocation is ever in
//! flight. Once the poll reaches a terminal state both timers are gone and
//! the probe is never called again.

mod probe;
mod state;

pub use probe::{FnProbe, Probe, ProbeStatus, probe_fn};
pub use state::{PollFailure, PollOutcome, PollPhase, PollState};

use crate::config::PollSettings;
use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

struct Shared<T> {
    state: watch::Sender<PollState<T>>,
    invocations: AtomicUsize,
    skipped_ticks: AtomicUsize,
}

impl<T> Shared<T> {
    /// Move to a terminal state unless one was already reached
    fn finish(&self, outcome: PollOutcome<T>) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = PollState::Finished(outcome);
            true
        })
    }

    fn mark_running(&self) {
        self.state.send_if_modified(|state| {
            if !matches!(state, PollState::Idle) {
                return false;
            }
            *state = PollState::Running;
            true
        });
    }
}

pub struct DiscoveryPoller<T> {
    label: String,
    shared: Arc<Shared<T>>,
    cancel: CancellationToken,
    started: AtomicBool,
}

impl<T> std::fmt::Debug for DiscoveryPoller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryPoller")
            .field("label", &self.label)
            .field("phase", &self.shared.state.borrow().phase())
            .field("invocations", &self.shared.invocations.load(Ordering::SeqCst))
            .finish()
    }
}

impl<T> DiscoveryPoller<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(label: impl Into<String>) -> Self {
        let (state, _) = watch::channel(PollState::Idle);
        Self {
            label: label.into(),
            shared: Arc::new(Shared {
                state,
                invocations: AtomicUsize::new(0),
                skipped_ticks: AtomicUsize::new(0),
            }),
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Start polling with the default safety margin.
    ///
    /// Must be called from within a Tokio runtime. A poller can only be
    /// started once.
    pub fn start<P>(&self, probe: P, interval: Duration, timeout: Duration) -> Result<()>
    where
        P: Probe<Output = T>,
    {
        self.start_with_settings(probe, &PollSettings::new(interval, timeout))
    }

    pub fn start_with_settings<P>(&self, probe: P, settings: &PollSettings) -> Result<()>
    where
        P: Probe<Output = T>,
    {
        settings.validate()?;
        let handle = Handle::try_current().map_err(|e| {
            Error::PollMisuse(format!("poll '{}' started outside a runtime: {e}", self.label))
        })?;

        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::PollMisuse(format!(
                "poll '{}' was already started",
                self.label
            )));
        }

        if self.cancel.is_cancelled() {
            debug!("Poll '{}' cancelled before start, not spawning", self.label);
            return Ok(());
        }

        debug!(
            "Starting poll '{}' (interval {:?}, timeout {:?})",
            self.label,
            settings.interval(),
            settings.timeout()
        );
        self.shared.mark_running();
        handle.spawn(drive(
            self.label.clone(),
            Arc::clone(&self.shared),
            self.cancel.clone(),
            probe,
            *settings,
        ));
        Ok(())
    }

    /// Wait for the poll to reach a terminal state.
    ///
    /// Calling this before [`start`](Self::start) is an error.
    pub async fn wait(&self) -> Result<PollOutcome<T>> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(Error::PollMisuse(format!(
                "wait() called before start() on poll '{}'",
                self.label
            )));
        }

        let mut rx = self.shared.state.subscribe();
        let state = rx
            .wait_for(|state| state.is_terminal())
            .await
            .map_err(|_| Error::PollMisuse(format!("poll '{}' state was dropped", self.label)))?;

        state
            .outcome()
            .cloned()
            .ok_or_else(|| Error::PollMisuse(format!("poll '{}' has no outcome", self.label)))
    }

    /// Cancel the poll. Safe to call any number of times in any phase.
    pub fn cancel(&self) {
        if self.shared.finish(PollOutcome::Cancelled) {
            debug!("Poll '{}' cancelled", self.label);
        }
        self.cancel.cancel();
    }
}

impl<T: Clone> DiscoveryPoller<T> {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> PollState<T> {
        self.shared.state.borrow().clone()
    }

    pub fn phase(&self) -> PollPhase {
        self.shared.state.borrow().phase()
    }

    pub fn is_running(&self) -> bool {
        self.phase() == PollPhase::Running
    }

    /// Number of probe invocations so far
    pub fn invocations(&self) -> usize {
        self.shared.invocations.load(Ordering::SeqCst)
    }

    /// Number of ticks skipped because a probe was still in flight
    pub fn skipped_ticks(&self) -> usize {
        self.shared.skipped_ticks.load(Ordering::SeqCst)
    }
}

impl<T> Drop for DiscoveryPoller<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

type ProbeRun<P> = (P, anyhow::Result<ProbeStatus<<P as Probe>::Output>>);

async fn drive<P>(
    label: String,
    shared: Arc<Shared<P::Output>>,
    cancel: CancellationToken,
    probe: P,
    settings: PollSettings,
) where
    P: Probe,
{
    let started_at = Instant::now();
    let mut ticker = time::interval_at(started_at + settings.interval(), settings.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let deadline = time::sleep(settings.deadline());
    tokio::pin!(deadline);

    // The probe is moved into the task running it and handed back on completion.
    let mut idle = Some(probe);
    let mut in_flight: Option<JoinHandle<ProbeRun<P>>> = None;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                trace!("Poll '{}' driver stopping after cancel", label);
                break;
            }
            _ = &mut deadline => {
                let waited = started_at.elapsed();
                if shared.finish(PollOutcome::TimedOut { waited }) {
                    warn!("Poll '{}' timed out after {:?}", label, waited);
                }
                break;
            }
            joined = settle(&mut in_flight) => {
                in_flight = None;
                match joined {
                    Ok((probe, Ok(ProbeStatus::Pending))) => {
                        trace!("Poll '{}' still pending", label);
                        idle = Some(probe);
                    }
                    Ok((_, Ok(ProbeStatus::Done(value)))) => {
                        if shared.finish(PollOutcome::Succeeded(value)) {
                            debug!("Poll '{}' succeeded", label);
                        }
                        break;
                    }
                    Ok((_, Err(error))) => {
                        debug!("Poll '{}' failed: {:#}", label, error);
                        shared.finish(PollOutcome::Failed(PollFailure::new(error)));
                        break;
                    }
                    Err(join_error) => {
                        let error = anyhow::anyhow!("probe task aborted: {join_error}");
                        shared.finish(PollOutcome::Failed(PollFailure::new(error)));
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                match idle.take() {
                    Some(mut probe) => {
                        let count = shared.invocations.fetch_add(1, Ordering::SeqCst) + 1;
                        trace!("Poll '{}' invoking probe (#{})", label, count);
                        in_flight = Some(tokio::spawn(async move {
                            let status = probe.probe().await;
                            (probe, status)
                        }));
                    }
                    None => {
                        shared.skipped_ticks.fetch_add(1, Ordering::SeqCst);
                        trace!("Poll '{}' skipped tick, probe still in flight", label);
                    }
                }
            }
        }
    }

    // Dropping the handle detaches a still-running probe; its result is ignored.
    drop(in_flight);
}

async fn settle<R>(in_flight: &mut Option<JoinHandle<R>>) -> std::result::Result<R, JoinError> {
    match in_flight {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

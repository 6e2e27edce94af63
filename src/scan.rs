// src/scan.rs
//! Background scan lifecycle: trigger, poll, detect completion, cancel.
//!
//! Each lifecycle owns one spawned poll task and one generation number. A
//! response is applied only while its generation is current and the phase is
//! still `Polling`; `dispose` bumps the generation and aborts the task, so a
//! late response can never reach the observer.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::DynApi;
use crate::error::ApiError;
use crate::model::{ScanState, TriggerReply};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Starting,
    Polling,
    /// Last job finished; behaves like `Idle` for new triggers.
    Completed,
    /// Last job lost track of the backend; behaves like `Idle` for new triggers.
    Failed,
}

impl ScanPhase {
    pub fn is_active(self) -> bool {
        matches!(self, ScanPhase::Starting | ScanPhase::Polling)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Backend accepted; polling has begun.
    Started,
    /// A trigger or poll loop is already in progress here.
    AlreadyRunning,
    /// Backend already runs a scan; attach with `resume`.
    Busy,
    /// The trigger call itself failed.
    Rejected(ApiError),
    /// `dispose` ran while the trigger call was in flight.
    Cancelled,
}

/// Consumer of scan progress (the dashboard store).
#[async_trait::async_trait]
pub trait ScanObserver: Send + Sync {
    /// Called under the monitor lock for every accepted status, so it must stay
    /// short and must not call back into the monitor.
    fn status_polled(&self, _status: &ScanState) {}

    /// Called exactly once per lifecycle after the backend reports the job done.
    async fn scan_completed(&self, status: &ScanState);

    fn scan_failed(&self, _error: &ApiError) {}
}

struct Lifecycle {
    phase: ScanPhase,
    status: ScanState,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    life: Mutex<Lifecycle>,
    phase_tx: watch::Sender<ScanPhase>,
}

impl Shared {
    fn set_phase(&self, life: &mut Lifecycle, phase: ScanPhase) {
        life.phase = phase;
        self.phase_tx.send_replace(phase);
    }
}

pub struct ScanMonitor {
    client: DynApi,
    interval: Duration,
    shared: Arc<Shared>,
}

impl ScanMonitor {
    pub fn new(client: DynApi, interval: Duration) -> Self {
        let (phase_tx, _) = watch::channel(ScanPhase::Idle);
        let interval = if interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            interval
        };
        Self {
            client,
            interval,
            shared: Arc::new(Shared {
                life: Mutex::new(Lifecycle {
                    phase: ScanPhase::Idle,
                    status: ScanState::default(),
                    generation: 0,
                    task: None,
                }),
                phase_tx,
            }),
        }
    }

    pub fn phase(&self) -> ScanPhase {
        self.shared.life.lock().phase
    }

    /// Last status received from the backend.
    pub fn status(&self) -> ScanState {
        self.shared.life.lock().status.clone()
    }

    pub fn progress(&self) -> u8 {
        self.shared.life.lock().status.progress
    }

    pub fn is_scanning(&self) -> bool {
        self.phase() == ScanPhase::Polling
    }

    /// Phase changes, for re-rendering.
    pub fn subscribe(&self) -> watch::Receiver<ScanPhase> {
        self.shared.phase_tx.subscribe()
    }

    pub fn poll_interval(&self) -> Duration {
        self.interval
    }

    /// Ask the backend to start a scan and follow it.
    pub async fn trigger(&self, observer: Arc<dyn ScanObserver>) -> TriggerOutcome {
        let generation = {
            let mut life = self.shared.life.lock();
            if life.phase.is_active() {
                debug!(target: "scan", phase = ?life.phase, "trigger ignored: scan already tracked");
                return TriggerOutcome::AlreadyRunning;
            }
            life.generation += 1;
            self.shared.set_phase(&mut life, ScanPhase::Starting);
            life.generation
        };

        let reply = self.client.trigger_scan().await;

        let mut life = self.shared.life.lock();
        if life.generation != generation || life.phase != ScanPhase::Starting {
            debug!(target: "scan", "trigger reply discarded after dispose");
            return TriggerOutcome::Cancelled;
        }
        match reply {
            Ok(TriggerReply::Started { message }) => {
                info!(target: "scan", message = message.as_deref().unwrap_or(""), "scan started");
                life.status.is_scanning = true;
                life.status.progress = 0;
                self.start_polling(&mut life, observer);
                TriggerOutcome::Started
            }
            Ok(TriggerReply::Busy { message }) => {
                info!(target: "scan", message = message.as_deref().unwrap_or(""), "backend busy");
                self.shared.set_phase(&mut life, ScanPhase::Idle);
                TriggerOutcome::Busy
            }
            Err(e) => {
                warn!(target: "scan", error = %e, "trigger failed");
                self.shared.set_phase(&mut life, ScanPhase::Idle);
                TriggerOutcome::Rejected(e)
            }
        }
    }

    /// Attach to a scan the backend may already be running. Returns whether
    /// polling is active afterwards.
    pub async fn resume(&self, observer: Arc<dyn ScanObserver>) -> bool {
        let generation = {
            let life = self.shared.life.lock();
            if life.phase.is_active() {
                return true;
            }
            life.generation
        };

        let status = match self.client.fetch_scan_status().await {
            Ok(s) => s,
            Err(e) => {
                warn!(target: "scan", error = %e, "scan status check failed");
                return false;
            }
        };

        let mut life = self.shared.life.lock();
        if life.generation != generation || life.phase.is_active() {
            return life.phase.is_active();
        }
        observer.status_polled(&status);
        let scanning = status.is_scanning;
        life.status = status;
        if scanning {
            info!(target: "scan", progress = life.status.progress, "resuming scan in progress");
            life.generation += 1;
            self.start_polling(&mut life, observer);
        }
        scanning
    }

    /// Stop tracking. No tick fires and no response is applied afterwards.
    pub fn dispose(&self) {
        let task = {
            let mut life = self.shared.life.lock();
            life.generation += 1;
            if life.phase.is_active() {
                debug!(target: "scan", phase = ?life.phase, "disposing active scan monitor");
                self.shared.set_phase(&mut life, ScanPhase::Idle);
            }
            life.task.take()
        };
        if let Some(t) = task {
            t.abort();
        }
    }

    /// Await the current poll task, completion hook included. The task handle is
    /// consumed, so a `dispose` issued meanwhile only discards further ticks.
    pub async fn wait(&self) {
        let task = self.shared.life.lock().task.take();
        if let Some(t) = task {
            if let Err(e) = t.await {
                if !e.is_cancelled() {
                    warn!(target: "scan", error = %e, "poll task panicked");
                }
            }
        }
    }

    fn start_polling(&self, life: &mut Lifecycle, observer: Arc<dyn ScanObserver>) {
        self.shared.set_phase(life, ScanPhase::Polling);
        let task = tokio::spawn(poll_loop(
            self.client.clone(),
            self.shared.clone(),
            self.interval,
            life.generation,
            observer,
        ));
        // A previous task can only be finishing its completion hook; the new
        // lifecycle refreshes on its own completion.
        if let Some(prev) = life.task.replace(task) {
            prev.abort();
        }
    }
}

impl Drop for ScanMonitor {
    fn drop(&mut self) {
        self.dispose();
    }
}

enum TickOutcome {
    Continue,
    Completed(ScanState),
    Failed(ApiError),
}

async fn poll_loop(
    client: DynApi,
    shared: Arc<Shared>,
    interval: Duration,
    generation: u64,
    observer: Arc<dyn ScanObserver>,
) {
    // Each tick awaits its fetch before the next one is considered; late ticks are skipped.
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let polled = client.fetch_scan_status().await;
        counter!("scan_polls_total").increment(1);

        let outcome = {
            let mut life = shared.life.lock();
            if life.generation != generation || life.phase != ScanPhase::Polling {
                debug!(target: "scan", generation, "stale scan status discarded");
                return;
            }
            match polled {
                Ok(status) => {
                    observer.status_polled(&status);
                    debug!(target: "scan", progress = status.progress, scanning = status.is_scanning, "scan tick");
                    let done = !status.is_scanning;
                    life.status = status;
                    if done {
                        shared.set_phase(&mut life, ScanPhase::Completed);
                        TickOutcome::Completed(life.status.clone())
                    } else {
                        TickOutcome::Continue
                    }
                }
                Err(e) => {
                    life.status.is_scanning = false;
                    shared.set_phase(&mut life, ScanPhase::Failed);
                    TickOutcome::Failed(e)
                }
            }
        };

        match outcome {
            TickOutcome::Continue => continue,
            TickOutcome::Completed(status) => {
                counter!("scan_completed_total").increment(1);
                info!(target: "scan", new_added = status.new_added, "scan completed");
                observer.scan_completed(&status).await;
                return;
            }
            TickOutcome::Failed(e) => {
                counter!("scan_failed_total").increment(1);
                warn!(target: "scan", error = %e, "scan polling failed; giving up");
                observer.scan_failed(&e);
                return;
            }
        }
    }
}

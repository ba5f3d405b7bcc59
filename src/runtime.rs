//! Fixed-Rate Async Driver
//!
//! Runs a [`SimulationScheduler`] on a tokio interval. Commands arrive over an
//! mpsc channel and are applied between ticks; each tick runs to completion
//! before the next command or tick is looked at, so ticks never overlap.
//! Snapshots are published through a `watch` channel, which always holds the
//! latest `Arc<SystemState>`.

use crate::config::TICK_INTERVAL_MS;
use crate::error::SimError;
use crate::metrics;
use crate::scheduler::SimulationScheduler;
use crate::simulation::{FaultKind, FaultState, SystemState};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const COMMAND_QUEUE_DEPTH: usize = 64;

/// Wall-clock anchor advanced by a monotonic clock, so timestamps handed to
/// the scheduler never go backwards.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    wall: DateTime<Utc>,
    origin: Instant,
}

impl MonotonicClock {
    pub fn start() -> Self {
        Self {
            wall: Utc::now(),
            origin: Instant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall + elapsed
    }
}

pub enum Command {
    Inject {
        kind: FaultKind,
        reply: oneshot::Sender<Result<FaultState, SimError>>,
    },
    Clear {
        reply: oneshot::Sender<Option<FaultKind>>,
    },
}

/// Cloneable client for a running simulation.
#[derive(Clone)]
pub struct SimulationHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<SystemState>>,
}

impl SimulationHandle {
    pub async fn inject(&self, kind: FaultKind) -> Result<FaultState, SimError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Inject { kind, reply })
            .await
            .map_err(|_| SimError::EngineStopped)?;
        rx.await.map_err(|_| SimError::EngineStopped)?
    }

    pub async fn clear(&self) -> Result<Option<FaultKind>, SimError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Clear { reply })
            .await
            .map_err(|_| SimError::EngineStopped)?;
        rx.await.map_err(|_| SimError::EngineStopped)
    }

    /// Latest published snapshot.
    pub fn latest(&self) -> Arc<SystemState> {
        self.snapshots.borrow().clone()
    }

    /// Receiver that wakes once per published tick.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SystemState>> {
        self.snapshots.clone()
    }
}

pub struct SimulationRuntime {
    handle: SimulationHandle,
    cancel: CancellationToken,
    task: JoinHandle<SimulationScheduler>,
}

impl SimulationRuntime {
    /// Start ticking `scheduler` at the engine rate on the current tokio runtime.
    pub fn spawn(scheduler: SimulationScheduler) -> Self {
        Self::spawn_with_period(scheduler, Duration::from_millis(TICK_INTERVAL_MS))
    }

    pub fn spawn_with_period(scheduler: SimulationScheduler, period: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (snapshot_tx, snapshot_rx) = watch::channel(scheduler.snapshot());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_loop(
            scheduler,
            command_rx,
            snapshot_tx,
            cancel.clone(),
            period,
        ));

        info!(period_ms = period.as_millis() as u64, "Simulation loop started");

        Self {
            handle: SimulationHandle {
                commands: command_tx,
                snapshots: snapshot_rx,
            },
            cancel,
            task,
        }
    }

    pub fn handle(&self) -> SimulationHandle {
        self.handle.clone()
    }

    /// Stop scheduling ticks and wait for the loop to exit. Returns the
    /// scheduler so its final state can be inspected.
    pub async fn shutdown(self) -> Option<SimulationScheduler> {
        self.cancel.cancel();
        match self.task.await {
            Ok(scheduler) => Some(scheduler),
            Err(e) => {
                warn!(error = %e, "Simulation loop ended abnormally");
                None
            }
        }
    }
}

async fn run_loop(
    mut scheduler: SimulationScheduler,
    mut commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<Arc<SystemState>>,
    cancel: CancellationToken,
    period: Duration,
) -> SimulationScheduler {
    let clock = MonotonicClock::start();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            Some(command) = commands.recv() => {
                apply_command(&mut scheduler, command, clock.now());
            }
            _ = interval.tick() => {
                let timer = metrics::TICK_DURATION.start_timer();
                let snapshot = scheduler.tick(clock.now());
                timer.observe_duration();
                snapshots.send_replace(snapshot);
            }
        }
    }

    info!(ticks = scheduler.tick_count(), "Simulation loop stopped");
    scheduler
}

fn apply_command(scheduler: &mut SimulationScheduler, command: Command, now: DateTime<Utc>) {
    match command {
        Command::Inject { kind, reply } => {
            let _ = reply.send(scheduler.inject(kind, now));
        }
        Command::Clear { reply } => {
            let _ = reply.send(scheduler.clear());
        }
    }
}

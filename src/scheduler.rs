//! Simulation Scheduler
//!
//! Owns every piece of mutable engine state (generators, smoothers, history
//! and baseline buffers, the fault controller) and turns one call to
//! [`SimulationScheduler::tick`] into one immutable [`SystemState`].
//!
//! ```text
//!   progress = controller(now)
//!        │
//!        ▼  for each channel
//!   generator ─► fault effect ─► clamp ─► EMA ─► history / baseline ─► detector
//!        │
//!        ▼
//!   aggregate (worst status, min days-to-failure, factors) ─► Arc<SystemState>
//! ```
//!
//! The scheduler never reads a clock; callers pass `now`, which keeps runs
//! reproducible and lets the async runtime supply a monotonic time base.
//! Before the first tick the published snapshot is stamped at the Unix epoch.

use crate::algo::Ewma;
use crate::config::{BASELINE_CAPACITY, EMA_ALPHA, HISTORY_CAPACITY, SensorConfig, SensorId};
use crate::detector::{self, DetectionContext};
use crate::error::SimError;
use crate::metrics;
use crate::simulation::faults::{self, FaultKind};
use crate::simulation::{
    FaultController, FaultState, SensorReading, SensorState, SignalGenerator, Status, SystemState,
};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-channel engine state.
struct Channel {
    config: &'static SensorConfig,
    generator: SignalGenerator,
    smoother: Ewma,
    history: VecDeque<SensorReading>,
    baseline: Vec<SensorReading>,
}

impl Channel {
    fn new(id: SensorId, rng: StdRng) -> Self {
        let config = id.config();
        Self {
            config,
            generator: SignalGenerator::new(config, rng),
            smoother: Ewma::new(EMA_ALPHA, config.initial_value),
            history: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
            baseline: Vec::with_capacity(BASELINE_CAPACITY),
        }
    }

    fn record(&mut self, reading: SensorReading, capture_baseline: bool) {
        self.history.push_back(reading);
        if self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
        if capture_baseline && self.baseline.len() < BASELINE_CAPACITY {
            self.baseline.push(reading);
        }
    }
}

pub struct SimulationScheduler {
    channels: Vec<Channel>,
    controller: FaultController,
    /// Source of seeds for fresh generators.
    seeder: StdRng,
    /// Drives the stochastic fault terms.
    fault_rng: StdRng,
    tick: u64,
    latest: Arc<SystemState>,
}

impl SimulationScheduler {
    /// Scheduler seeded from OS entropy.
    pub fn new() -> Self {
        Self::from_seeder(StdRng::from_os_rng())
    }

    /// Fully reproducible scheduler.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_seeder(StdRng::seed_from_u64(seed))
    }

    fn from_seeder(mut seeder: StdRng) -> Self {
        let channels = SensorId::ALL
            .iter()
            .map(|&id| Channel::new(id, StdRng::seed_from_u64(seeder.random())))
            .collect();
        let fault_rng = StdRng::seed_from_u64(seeder.random());

        Self {
            channels,
            controller: FaultController::new(),
            seeder,
            fault_rng,
            tick: 0,
            latest: Arc::new(SystemState::initial(DateTime::<Utc>::UNIX_EPOCH)),
        }
    }

    /// Replace the fault controller (tests use a short development time).
    pub fn with_controller(mut self, controller: FaultController) -> Self {
        self.controller = controller;
        self
    }

    /// Start developing `kind`. Rejected, with no state change, while a
    /// fault is already active.
    pub fn inject(&mut self, kind: FaultKind, now: DateTime<Utc>) -> Result<FaultState, SimError> {
        if let Err(e) = self.controller.inject(kind, now) {
            warn!(requested = %kind, error = %e, "Fault injection rejected");
            return Err(e);
        }

        metrics::FAULTS_INJECTED.inc();
        info!(fault = %kind, primary = %kind.primary_sensor(), "Fault injected");

        Ok(FaultState {
            kind,
            active: true,
            progress: 0.0,
            started_at: now,
            days_to_failure: None,
        })
    }

    /// Deactivate any fault and restart every generator from fresh state.
    /// History, baseline and smoother state are kept.
    pub fn clear(&mut self) -> Option<FaultKind> {
        let previous = self.controller.clear();

        for channel in &mut self.channels {
            let rng = StdRng::seed_from_u64(self.seeder.random());
            channel.generator = SignalGenerator::new(channel.config, rng);
        }

        match previous {
            Some(kind) => info!(fault = %kind, "Fault cleared, generators reset"),
            None => debug!("Clear with no active fault, generators reset"),
        }
        previous
    }

    /// Advance one step and publish the resulting snapshot.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Arc<SystemState> {
        self.tick += 1;
        let tick = self.tick;

        let fault = match (self.controller.active_kind(), self.controller.progress(now)) {
            (Some(kind), Some(progress)) => Some((kind, progress)),
            _ => None,
        };
        let capture_baseline = fault.is_none();

        let mut sensors = Vec::with_capacity(self.channels.len());
        let mut overall_status = Status::Normal;
        let mut days_to_failure: Option<f64> = None;
        let mut anomaly_details = Vec::new();

        for channel in &mut self.channels {
            let config = channel.config;

            let mut raw = channel.generator.next_reading(tick);
            if let Some((kind, progress)) = fault {
                raw = faults::apply(raw, kind, progress, tick, config.id, &mut self.fault_rng);
            }
            let raw = config.clamp_to_range(raw);
            let value = channel.smoother.update(raw);

            channel.record(
                SensorReading {
                    timestamp: now,
                    raw_value: raw,
                    value,
                },
                capture_baseline,
            );

            let history: Vec<f64> = channel.history.iter().map(|r| r.value).collect();
            let baseline: Vec<f64> = channel.baseline.iter().map(|r| r.value).collect();
            let detection = detector::detect(&DetectionContext {
                config,
                value,
                history: &history,
                baseline: &baseline,
            });
            let status = detector::classify(value, config);

            overall_status = overall_status.max(status);
            if let Some(days) = detection.days_to_failure {
                days_to_failure = Some(days_to_failure.map_or(days, |d: f64| d.min(days)));
            }
            if detection.is_anomalous {
                anomaly_details.push(format!("{}: {}", config.name, detection.factors.join(", ")));
            }

            sensors.push(SensorState {
                sensor: config.id,
                config,
                current_value: value,
                raw_value: raw,
                status,
                z_score: detection.z_score,
                rate_of_change: detection.rate_of_change,
                is_anomalous: detection.is_anomalous,
                confidence: detection.confidence,
                readings: channel.history.iter().copied().collect(),
            });
        }

        let active_fault = match (fault, self.controller.started_at()) {
            (Some((kind, progress)), Some(started_at)) => Some(FaultState {
                kind,
                active: true,
                progress,
                started_at,
                days_to_failure,
            }),
            _ => None,
        };

        let previous_status = self.latest.overall_status;
        if overall_status != previous_status {
            if overall_status > previous_status {
                warn!(
                    from = previous_status.as_str(),
                    to = overall_status.as_str(),
                    tick,
                    "Machine status degraded"
                );
            } else {
                info!(
                    from = previous_status.as_str(),
                    to = overall_status.as_str(),
                    tick,
                    "Machine status recovered"
                );
            }
        }

        let snapshot = Arc::new(SystemState {
            tick,
            timestamp: now,
            sensors,
            active_fault,
            overall_status,
            days_to_failure,
            anomaly_details,
        });

        metrics::record_snapshot(&snapshot);
        debug!(
            tick,
            status = overall_status.as_str(),
            anomalous = snapshot.anomalous_count(),
            "Tick complete"
        );

        self.latest = Arc::clone(&snapshot);
        snapshot
    }

    /// Most recently published snapshot.
    pub fn snapshot(&self) -> Arc<SystemState> {
        Arc::clone(&self.latest)
    }

    pub fn controller(&self) -> &FaultController {
        &self.controller
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn history_len(&self, id: SensorId) -> usize {
        self.channels[id.index()].history.len()
    }

    pub fn baseline_len(&self, id: SensorId) -> usize {
        self.channels[id.index()].baseline.len()
    }

    pub fn generator_drift(&self, id: SensorId) -> f64 {
        self.channels[id.index()].generator.drift()
    }
}

impl Default for SimulationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BASELINE_MIN_READINGS, TICK_INTERVAL_MS};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn at(tick: i64) -> DateTime<Utc> {
        t0() + Duration::milliseconds(tick * TICK_INTERVAL_MS as i64)
    }

    fn run(scheduler: &mut SimulationScheduler, from: i64, ticks: i64) -> Arc<SystemState> {
        let mut last = scheduler.snapshot();
        for t in from..from + ticks {
            last = scheduler.tick(at(t));
        }
        last
    }

    #[test]
    fn test_healthy_run_stays_normal() {
        let mut scheduler = SimulationScheduler::with_seed(1);
        let state = run(&mut scheduler, 0, 300);

        assert_eq!(state.tick, 300);
        assert_eq!(state.overall_status, Status::Normal);
        assert!(state.active_fault.is_none());
        for sensor in &state.sensors {
            assert_eq!(sensor.status, Status::Normal, "{}", sensor.sensor);
        }
    }

    #[test]
    fn test_history_is_bounded() {
        let mut scheduler = SimulationScheduler::with_seed(2);
        let state = run(&mut scheduler, 0, HISTORY_CAPACITY as i64 + 75);

        for id in SensorId::ALL {
            assert_eq!(scheduler.history_len(id), HISTORY_CAPACITY);
            assert_eq!(state.sensor(id).readings.len(), HISTORY_CAPACITY);
        }
        // oldest evicted first
        let readings = &state.sensor(SensorId::Current).readings;
        assert_eq!(readings[0].timestamp, at(75));
        assert_eq!(readings[HISTORY_CAPACITY - 1].timestamp, at(HISTORY_CAPACITY as i64 + 74));
    }

    #[test]
    fn test_baseline_caps_and_skips_fault_ticks() {
        let mut scheduler = SimulationScheduler::with_seed(3);
        run(&mut scheduler, 0, 10);
        assert_eq!(scheduler.baseline_len(SensorId::Vibration), 10);

        scheduler.inject(FaultKind::BearingWear, at(10)).unwrap();
        run(&mut scheduler, 10, 40);
        assert_eq!(scheduler.baseline_len(SensorId::Vibration), 10);

        scheduler.clear();
        run(&mut scheduler, 50, 100);
        for id in SensorId::ALL {
            assert_eq!(scheduler.baseline_len(id), BASELINE_CAPACITY);
        }
    }

    #[test]
    fn test_second_inject_leaves_fault_unchanged() {
        let mut scheduler = SimulationScheduler::with_seed(4);
        run(&mut scheduler, 0, 50);

        scheduler.inject(FaultKind::HeaterFailure, at(50)).unwrap();
        let before = run(&mut scheduler, 50, 20);

        let err = scheduler.inject(FaultKind::MotorOverload, at(70)).unwrap_err();
        assert_eq!(err, SimError::FaultAlreadyActive(FaultKind::HeaterFailure));

        let after = scheduler.tick(at(70));
        let before = before.active_fault.clone().unwrap();
        let after = after.active_fault.clone().unwrap();
        assert_eq!(after.kind, FaultKind::HeaterFailure);
        assert_eq!(after.started_at, before.started_at);
        assert!(after.progress >= before.progress);
    }

    #[test]
    fn test_progress_follows_clock_and_clears() {
        let mut scheduler = SimulationScheduler::with_seed(5);
        run(&mut scheduler, 0, 40);
        scheduler.inject(FaultKind::PressureBlockage, at(40)).unwrap();

        let mut last = 0.0;
        for t in 40..500 {
            let state = scheduler.tick(at(t));
            let progress = state.active_fault.as_ref().unwrap().progress;
            assert!(progress >= last);
            last = progress;
        }
        assert_eq!(last, 1.0);

        scheduler.clear();
        let state = scheduler.tick(at(500));
        assert!(state.active_fault.is_none());
        assert_eq!(scheduler.controller().progress(at(500)), None);
    }

    #[test]
    fn test_bearing_wear_at_full_progress_is_detected() {
        let mut scheduler = SimulationScheduler::with_seed(6);
        run(&mut scheduler, 0, 60);
        assert!(scheduler.baseline_len(SensorId::Vibration) >= BASELINE_MIN_READINGS);

        scheduler.inject(FaultKind::BearingWear, at(60)).unwrap();
        // jump past the 45 s development time, then let the smoother settle
        let start = 60 + 450;
        let mut worst = Status::Normal;
        let mut state = scheduler.snapshot();
        for t in start..start + 40 {
            state = scheduler.tick(at(t));
            worst = worst.max(state.overall_status);
        }

        let fault = state.active_fault.as_ref().unwrap();
        assert_eq!(fault.progress, 1.0);

        let vibration = state.sensor(SensorId::Vibration);
        assert!(vibration.raw_value <= 15.0);
        assert!(vibration.current_value > 6.0, "vibration {}", vibration.current_value);
        assert!(vibration.is_anomalous);
        assert!(
            state
                .anomaly_details
                .iter()
                .any(|d| d.starts_with("Vibration:")
                    && (d.contains("Outside normal range") || d.contains("Rapid increase")))
        );
        // creep alone puts the smoothed mean ~8 above center, past warning
        assert!(worst >= Status::Warning);
    }

    #[test]
    fn test_pressure_blockage_goes_critical_with_prediction() {
        let mut scheduler = SimulationScheduler::with_seed(7);
        run(&mut scheduler, 0, 60);
        scheduler.inject(FaultKind::PressureBlockage, at(60)).unwrap();

        // a trend is only visible while the fault is still developing
        let mut saw_prediction = false;
        let mut last = scheduler.snapshot();
        for t in 60..560 {
            last = scheduler.tick(at(t));
            if let Some(days) = last.days_to_failure {
                assert!((0.1..=30.0).contains(&days));
                assert_eq!(last.active_fault.as_ref().unwrap().days_to_failure, Some(days));
                saw_prediction = true;
            }
        }

        assert!(saw_prediction);
        assert_eq!(last.sensor(SensorId::Pressure).status, Status::Critical);
        assert_eq!(last.overall_status, Status::Critical);
    }

    #[test]
    fn test_clear_resets_generators() {
        let mut scheduler = SimulationScheduler::with_seed(8);
        run(&mut scheduler, 0, 2_000);
        scheduler.inject(FaultKind::MotorOverload, at(2_000)).unwrap();
        run(&mut scheduler, 2_000, 100);

        assert_eq!(scheduler.clear(), Some(FaultKind::MotorOverload));
        for id in SensorId::ALL {
            assert_eq!(scheduler.generator_drift(id), 0.0);
        }

        let state = scheduler.tick(at(2_100));
        for id in SensorId::ALL {
            let config = id.config();
            let sensor = state.sensor(id);
            assert!(scheduler.generator_drift(id).abs() < 0.01);
            let margin = config.normal_range() * 0.6 + 1e-9;
            assert!(
                (sensor.raw_value - config.center()).abs() <= margin,
                "{} raw {} not near center",
                id,
                sensor.raw_value
            );
        }
    }

    #[test]
    fn test_short_development_time_reaches_full_progress() {
        let mut scheduler = SimulationScheduler::with_seed(10)
            .with_controller(FaultController::with_duration_ms(1_000));
        run(&mut scheduler, 0, 40);
        scheduler.inject(FaultKind::BearingWear, at(40)).unwrap();

        let state = run(&mut scheduler, 40, 5);
        let progress = state.active_fault.as_ref().unwrap().progress;
        assert!((progress - 0.4).abs() < 1e-9);

        let state = run(&mut scheduler, 45, 20);
        assert_eq!(state.active_fault.as_ref().unwrap().progress, 1.0);
    }

    #[test]
    fn test_initial_snapshot_does_not_depend_on_wall_clock() {
        let a = SimulationScheduler::with_seed(31).snapshot();
        let b = SimulationScheduler::with_seed(31).snapshot();
        assert_eq!(a.tick, 0);
        assert_eq!(a.timestamp, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.overall_status, Status::Normal);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let mut a = SimulationScheduler::with_seed(99);
        let mut b = SimulationScheduler::with_seed(99);
        for t in 0..200 {
            if t == 80 {
                a.inject(FaultKind::MotorOverload, at(t)).unwrap();
                b.inject(FaultKind::MotorOverload, at(t)).unwrap();
            }
            let (sa, sb) = (a.tick(at(t)), b.tick(at(t)));
            for id in SensorId::ALL {
                assert_eq!(sa.sensor(id).raw_value, sb.sensor(id).raw_value);
            }
        }
    }

    #[test]
    fn test_fault_at_zero_progress_does_not_perturb() {
        let mut faulted = SimulationScheduler::with_seed(12);
        let mut healthy = SimulationScheduler::with_seed(12);
        run(&mut faulted, 0, 20);
        run(&mut healthy, 0, 20);

        // tick at the activation instant: progress 0
        faulted.inject(FaultKind::HeaterFailure, at(20)).unwrap();
        let f = faulted.tick(at(20));
        let h = healthy.tick(at(20));
        for id in SensorId::ALL {
            assert_eq!(f.sensor(id).raw_value, h.sensor(id).raw_value);
        }
        assert_eq!(f.active_fault.as_ref().unwrap().progress, 0.0);
    }
}

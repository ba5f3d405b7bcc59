//! Healthy-signal generator for one channel.
//!
//! A reading is the band center plus four independent components: a bounded
//! random-walk drift, a slow process cycle with a per-instance phase, pink
//! noise scaled to the channel's noise level, and rare one-shot spikes.

use crate::algo::PinkNoise;
use crate::algo::gaussian;
use crate::config::SensorConfig;
use rand::Rng;
use rand::rngs::StdRng;
use std::f64::consts::PI;

const DRIFT_STEP_STD: f64 = 0.001;
const DRIFT_LIMIT: f64 = 0.5;
const CYCLE_RATE: f64 = 0.001;
const CYCLE_AMPLITUDE: f64 = 0.1;
const NOISE_GAIN: f64 = 3.0;
const SPIKE_PROBABILITY: f64 = 0.02;
const SPIKE_GAIN: f64 = 2.0;
/// Healthy readings may overshoot the normal band by this fraction of its width.
const BAND_MARGIN: f64 = 0.1;

pub struct SignalGenerator {
    config: &'static SensorConfig,
    rng: StdRng,
    pink: PinkNoise,
    drift: f64,
    phase: f64,
}

impl SignalGenerator {
    pub fn new(config: &'static SensorConfig, mut rng: StdRng) -> Self {
        let phase = rng.random::<f64>() * PI * 2.0;
        Self {
            config,
            rng,
            pink: PinkNoise::new(),
            drift: 0.0,
            phase,
        }
    }

    /// Produce the healthy reading for `tick`.
    pub fn next_reading(&mut self, tick: u64) -> f64 {
        let config = self.config;
        let range = config.normal_range();

        self.drift += gaussian::sample(&mut self.rng, 0.0, DRIFT_STEP_STD);
        self.drift = self.drift.clamp(-DRIFT_LIMIT, DRIFT_LIMIT);

        let cycle = (tick as f64 * CYCLE_RATE + self.phase).sin() * range * CYCLE_AMPLITUDE;
        let noise = self.pink.next(&mut self.rng) * config.noise_level * NOISE_GAIN;
        let spike = if self.rng.random_bool(SPIKE_PROBABILITY) {
            gaussian::sample(&mut self.rng, 0.0, config.noise_level * SPIKE_GAIN)
        } else {
            0.0
        };

        let value = config.center() + self.drift * range + cycle + noise + spike;

        value.clamp(
            config.normal_min - range * BAND_MARGIN,
            config.normal_max + range * BAND_MARGIN,
        )
    }

    pub fn drift(&self) -> f64 {
        self.drift
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }
}

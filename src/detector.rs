//! Anomaly Detector
//!
//! Stateless evaluation of one channel against a reference window. Three
//! independent tests raise the anomaly flag (z-score, distance outside the
//! normal band, steep trend); threshold crossings only add confidence and
//! factors. Severity classification is a separate pure threshold check.

use crate::algo::{WindowStats, trailing_slope};
use crate::config::{
    BASELINE_MIN_READINGS, FAILURE_CALIBRATION_MULTIPLIER, MAX_DAYS_TO_FAILURE,
    MIN_DAYS_TO_FAILURE, SensorConfig, TICKS_PER_SECOND, TREND_WINDOW,
};
use crate::simulation::types::Status;
use serde::Serialize;

const Z_SCORE_LIMIT: f64 = 2.0;
const BAND_DEVIATION_LIMIT: f64 = 1.5;
const RATE_LIMIT: f64 = 5.0;
/// Trends flatter than this (units per tick) are not extrapolated.
const MIN_EXTRAPOLATION_SLOPE: f64 = 0.001;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Everything the detector needs for one evaluation.
pub struct DetectionContext<'a> {
    pub config: &'a SensorConfig,
    /// Latest smoothed value.
    pub value: f64,
    /// Smoothed values of the live history, oldest first, including `value`.
    pub history: &'a [f64],
    /// Smoothed values captured while idle.
    pub baseline: &'a [f64],
}

impl<'a> DetectionContext<'a> {
    /// Baseline once it is warm, else the earlier part of the live history.
    pub fn reference_window(&self) -> &'a [f64] {
        if self.baseline.len() >= BASELINE_MIN_READINGS {
            return self.baseline;
        }
        let len = self
            .history
            .len()
            .min(BASELINE_MIN_READINGS.max(self.history.len() / 2));
        &self.history[..len]
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Detection {
    pub is_anomalous: bool,
    /// Accumulated evidence in [0, 1].
    pub confidence: f64,
    pub z_score: f64,
    /// Regression slope over the trend window, units per tick.
    pub rate_of_change: f64,
    pub days_to_failure: Option<f64>,
    pub factors: Vec<String>,
}

pub fn detect(ctx: &DetectionContext) -> Detection {
    let config = ctx.config;
    let value = ctx.value;

    let stats = WindowStats::from_values(ctx.reference_window());
    let z_score = stats.z_score(value);
    let rate_of_change = trailing_slope(ctx.history, TREND_WINDOW);

    let mut factors = Vec::new();
    let mut is_anomalous = false;
    let mut confidence = 0.0;

    let abs_z = z_score.abs();
    if abs_z > Z_SCORE_LIMIT {
        is_anomalous = true;
        confidence += (abs_z / 4.0).min(0.4);
        let sign = if z_score > 0.0 { '+' } else { '-' };
        factors.push(format!("Z-score: {:.2} (>{}2σ)", z_score, sign));
    }

    let center = config.center();
    let distance = (value - center).abs();
    let band_deviation = distance / (config.normal_range() / 2.0);
    if band_deviation > BAND_DEVIATION_LIMIT {
        is_anomalous = true;
        confidence += ((band_deviation - 1.0) * 0.2).min(0.3);
        factors.push(format!(
            "Outside normal range by {:.0}%",
            (band_deviation - 1.0) * 100.0
        ));
    }

    let normalized_rate = rate_of_change.abs() / config.noise_level;
    if normalized_rate > RATE_LIMIT {
        is_anomalous = true;
        confidence += (normalized_rate / 20.0).min(0.3);
        let direction = if rate_of_change > 0.0 { "increase" } else { "decrease" };
        factors.push(format!(
            "Rapid {}: {:.3}/tick",
            direction,
            rate_of_change.abs()
        ));
    }

    if distance > config.warning_threshold {
        factors.push("Warning threshold exceeded".to_string());
        confidence += 0.15;
    }
    if distance > config.critical_threshold {
        factors.push("Critical threshold exceeded".to_string());
        confidence += 0.25;
    }

    let days_to_failure = if is_anomalous {
        predict_days_to_failure(config, value, rate_of_change)
    } else {
        None
    };

    Detection {
        is_anomalous,
        confidence: confidence.min(1.0),
        z_score,
        rate_of_change,
        days_to_failure,
        factors,
    }
}

/// Extrapolate the trend to the critical threshold on the side it is heading.
pub fn predict_days_to_failure(config: &SensorConfig, value: f64, slope: f64) -> Option<f64> {
    if slope.abs() <= MIN_EXTRAPOLATION_SLOPE {
        return None;
    }

    let center = config.center();
    let target = if slope > 0.0 {
        center + config.critical_threshold
    } else {
        center - config.critical_threshold
    };

    let ticks = (target - value).abs() / slope.abs();
    let seconds = ticks / TICKS_PER_SECOND;
    let days = (seconds / SECONDS_PER_DAY).max(0.01);

    Some((days * FAILURE_CALIBRATION_MULTIPLIER).clamp(MIN_DAYS_TO_FAILURE, MAX_DAYS_TO_FAILURE))
}

/// Severity from distance to the band center alone.
pub fn classify(value: f64, config: &SensorConfig) -> Status {
    let distance = (value - config.center()).abs();
    if distance > config.critical_threshold {
        Status::Critical
    } else if distance > config.warning_threshold {
        Status::Warning
    } else {
        Status::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorId;

    fn flat(value: f64, n: usize) -> Vec<f64> {
        vec![value; n]
    }

    #[test]
    fn test_steady_channel_is_quiet() {
        let config = SensorId::Temperature.config();
        let baseline: Vec<f64> = (0..50).map(|i| 400.0 + (i % 5) as f64 - 2.0).collect();
        let history = baseline.clone();
        let ctx = DetectionContext {
            config,
            value: 400.0,
            history: &history,
            baseline: &baseline,
        };
        let detection = detect(&ctx);

        assert!(!detection.is_anomalous);
        assert!(detection.factors.is_empty());
        assert_eq!(detection.confidence, 0.0);
        assert_eq!(detection.days_to_failure, None);
        assert!(detection.z_score.abs() < 1e-9);
    }

    #[test]
    fn test_z_score_factor() {
        let config = SensorId::Pressure.config();
        let baseline = alternating(2990.0, 3010.0, 40);
        let mut history = flat(3000.0, 40);
        history.push(3050.0);
        let ctx = DetectionContext {
            config,
            value: 3050.0,
            history: &history,
            baseline: &baseline,
        };
        let detection = detect(&ctx);

        // std 10 -> z = 5
        assert!((detection.z_score - 5.0).abs() < 1e-9);
        assert!(detection.is_anomalous);
        assert_eq!(detection.factors, vec!["Z-score: 5.00 (>+2σ)".to_string()]);
        assert!((detection.confidence - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_outside_band_and_thresholds() {
        let config = SensorId::Vibration.config();
        let baseline = flat(3.0, 50);
        let history = flat(14.0, 60);
        let ctx = DetectionContext {
            config,
            value: 14.0,
            history: &history,
            baseline: &baseline,
        };
        let detection = detect(&ctx);

        assert!(detection.is_anomalous);
        assert!(detection.factors.iter().any(|f| f == "Outside normal range by 1000%"));
        assert!(detection.factors.iter().any(|f| f == "Warning threshold exceeded"));
        assert!(detection.factors.iter().any(|f| f == "Critical threshold exceeded"));
        // 0.4 + 0.3 + 0.15 + 0.25 capped
        assert_eq!(detection.confidence, 1.0);
        // flat trend: nothing to extrapolate
        assert_eq!(detection.days_to_failure, None);
    }

    #[test]
    fn test_rapid_trend_factor_and_prediction() {
        let config = SensorId::Current.config();
        let baseline = flat(50.0, 50);
        // 5 A per tick against noise 0.8 -> normalized rate 6.25
        let history: Vec<f64> = (0..20).map(|i| 20.0 + 5.0 * i as f64).collect();
        let value = *history.last().unwrap();
        let ctx = DetectionContext {
            config,
            value,
            history: &history,
            baseline: &baseline,
        };
        let detection = detect(&ctx);

        assert!((detection.rate_of_change - 5.0).abs() < 1e-9);
        assert!(detection.factors.iter().any(|f| f == "Rapid increase: 5.000/tick"));
        assert!(detection.days_to_failure.is_some());
    }

    fn alternating(low: f64, high: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| if i % 2 == 0 { low } else { high }).collect()
    }

    #[test]
    fn test_falling_channel_factors() {
        let config = SensorId::Temperature.config();
        // mean 400, population std 2
        let baseline = alternating(398.0, 402.0, 50);
        let history: Vec<f64> = (0..16).map(|i| 400.0 - 12.0 * i as f64).collect();
        let value = *history.last().unwrap();
        assert_eq!(value, 220.0);

        let ctx = DetectionContext {
            config,
            value,
            history: &history,
            baseline: &baseline,
        };
        let detection = detect(&ctx);

        assert!(detection.is_anomalous);
        assert!((detection.z_score + 90.0).abs() < 1e-9);
        assert!((detection.rate_of_change + 12.0).abs() < 1e-9);
        assert_eq!(
            detection.factors,
            vec![
                "Z-score: -90.00 (>-2σ)".to_string(),
                "Outside normal range by 1700%".to_string(),
                "Rapid decrease: 12.000/tick".to_string(),
                "Warning threshold exceeded".to_string(),
                "Critical threshold exceeded".to_string(),
            ]
        );
        assert_eq!(detection.confidence, 1.0);
        // 120 degrees to the lower threshold at 12/tick: floored horizon
        assert_eq!(detection.days_to_failure, Some(5.0));
    }

    #[test]
    fn test_falling_trend_extrapolates_to_lower_threshold() {
        let config = SensorId::Temperature.config();
        let baseline = alternating(398.0, 402.0, 50);
        // gentle cooling ending at 370
        let history: Vec<f64> = (0..20).map(|i| 370.0 + 0.002 * (19 - i) as f64).collect();
        let ctx = DetectionContext {
            config,
            value: 370.0,
            history: &history,
            baseline: &baseline,
        };
        let detection = detect(&ctx);
        assert!(detection.is_anomalous);
        assert!((detection.rate_of_change + 0.002).abs() < 1e-9);
        assert!(!detection.factors.iter().any(|f| f.starts_with("Rapid")));

        // lower target 340 is 30 away; the upper target 460 would be 90 away
        let to_seconds = |distance: f64| distance / 0.002 / TICKS_PER_SECOND;
        let downward = (to_seconds(30.0) / 86_400.0_f64).max(0.01) * 500.0;
        let upward = (to_seconds(90.0) / 86_400.0_f64).max(0.01) * 500.0;
        let days = detection.days_to_failure.unwrap();
        assert!((days - downward).abs() < 1e-6, "days {}", days);
        assert!((days - upward).abs() > 1.0);
    }

    #[test]
    fn test_days_to_failure_calibration() {
        let config = SensorId::Vibration.config();
        // target 13; 10 units at 0.01/tick = 1000 ticks = 100 s
        let days = predict_days_to_failure(config, 3.0, 0.01).unwrap();
        let expected = (100.0 / 86_400.0_f64).max(0.01) * 500.0;
        assert!((days - expected).abs() < 1e-12);

        // tiny horizon hits the 0.01 day floor before calibration
        assert_eq!(predict_days_to_failure(config, 12.99, 5.0), Some(5.0));
        // 700 PSI at 0.002/tick is ~0.4 days raw, 200 calibrated -> ceiling
        let pressure = SensorId::Pressure.config();
        assert_eq!(
            predict_days_to_failure(pressure, 3000.0, 0.002),
            Some(MAX_DAYS_TO_FAILURE)
        );

        // falling trend targets the lower threshold: |-7 - 3| = 10
        let down = predict_days_to_failure(config, 3.0, -0.01).unwrap();
        assert!((down - expected).abs() < 1e-12);

        assert_eq!(predict_days_to_failure(config, 3.0, 0.001), None);
        assert_eq!(predict_days_to_failure(config, 3.0, 0.0), None);
    }

    #[test]
    fn test_days_to_failure_floor_applies_before_multiplier() {
        let config = SensorId::Current.config();
        // one tick away: raw days ~1e-6, floored to 0.01, x500 = 5 days
        let days = predict_days_to_failure(config, 67.0, 1.0).unwrap();
        assert!((days - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_classification_thresholds() {
        let config = SensorId::Temperature.config();
        assert_eq!(classify(400.0, config), Status::Normal);
        assert_eq!(classify(440.0, config), Status::Normal);
        assert_eq!(classify(440.5, config), Status::Warning);
        assert_eq!(classify(359.0, config), Status::Warning);
        assert_eq!(classify(339.0, config), Status::Critical);
        assert_eq!(classify(470.0, config), Status::Critical);
    }

    #[test]
    fn test_classification_is_monotonic_in_distance() {
        for id in SensorId::ALL {
            let config = id.config();
            let center = config.center();
            let step = config.critical_threshold / 200.0;
            for sign in [1.0, -1.0] {
                let mut last = Status::Normal;
                for i in 0..400 {
                    let status = classify(center + sign * step * i as f64, config);
                    assert!(status >= last, "{} regressed at step {}", id, i);
                    last = status;
                }
                assert_eq!(last, Status::Critical);
            }
        }
    }

    #[test]
    fn test_reference_window_before_baseline_is_warm() {
        let config = SensorId::Vibration.config();
        let history: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let short_baseline = flat(3.0, 10);

        let ctx = DetectionContext {
            config,
            value: 99.0,
            history: &history,
            baseline: &short_baseline,
        };
        assert_eq!(ctx.reference_window().len(), 50);

        let short_history = &history[..12];
        let ctx = DetectionContext {
            config,
            value: 11.0,
            history: short_history,
            baseline: &short_baseline,
        };
        assert_eq!(ctx.reference_window().len(), 12);

        let warm = flat(3.0, 30);
        let ctx = DetectionContext {
            config,
            value: 99.0,
            history: &history,
            baseline: &warm,
        };
        assert_eq!(ctx.reference_window().len(), 30);
    }
}

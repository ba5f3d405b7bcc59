//! Window statistics shared by the anomaly detector.

/// Summary of a reference window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    /// Population standard deviation, floored to 1.0 when degenerate.
    pub std_dev: f64,
}

impl WindowStats {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 1.0,
            };
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let mut std_dev = variance.sqrt();
        // Flat window: avoid dividing by zero downstream
        if std_dev == 0.0 || !std_dev.is_finite() {
            std_dev = 1.0;
        }

        Self { mean, std_dev }
    }

    pub fn z_score(&self, value: f64) -> f64 {
        (value - self.mean) / self.std_dev
    }
}

/// Ordinary least-squares slope of value vs. index over the trailing
/// `window` values. Zero while fewer than `window` values exist.
pub fn trailing_slope(values: &[f64], window: usize) -> f64 {
    if window < 2 || values.len() < window {
        return 0.0;
    }

    let recent = &values[values.len() - window..];
    let n = window as f64;

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    for (i, y) in recent.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_x2 - sum_x * sum_x);
    if slope.is_finite() { slope } else { 0.0 }
}

use serde::{Deserialize, Serialize};

/// Exponential moving average with a fixed weight and an explicit seed value.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Ewma {
    alpha: f64,
    value: f64,
}

impl Ewma {
    pub fn new(alpha: f64, initial: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            value: initial,
        }
    }

    pub fn update(&mut self, sample: f64) -> f64 {
        self.value = self.alpha * sample + (1.0 - self.alpha) * self.value;
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_update_blends_with_seed() {
        let mut ema = Ewma::new(0.4, 3.0);
        let v = ema.update(8.0);
        assert!((v - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_converges_to_constant_input() {
        let mut ema = Ewma::new(0.4, 400.0);
        for _ in 0..100 {
            ema.update(320.0);
        }
        assert!((ema.value() - 320.0).abs() < 1e-9);
    }

    #[test]
    fn test_alpha_is_clamped() {
        // alpha 1: follows the input exactly
        assert_eq!(Ewma::new(1.7, 0.0).update(5.0), 5.0);
        // alpha 0: never leaves the seed
        assert_eq!(Ewma::new(-0.2, 3.0).update(9.0), 3.0);
    }
}

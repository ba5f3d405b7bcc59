//! 1/f Noise Source
//!
//! Six-pole IIR filter over uniform white noise in [-1, 1). The pole and gain
//! coefficients are the Voss-McCartney / Kellet refinement and give the
//! spectrum its pink slope; changing any of them changes the spectral shape.

use rand::Rng;
use serde::{Deserialize, Serialize};

const OUTPUT_GAIN: f64 = 0.11;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PinkNoise {
    b0: f64,
    b1: f64,
    b2: f64,
    b3: f64,
    b4: f64,
    b5: f64,
    b6: f64,
}

impl PinkNoise {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        let white = rng.random::<f64>() * 2.0 - 1.0;
        self.filter(white)
    }

    /// Feed one white sample through the filter.
    pub fn filter(&mut self, white: f64) -> f64 {
        self.b0 = 0.99886 * self.b0 + white * 0.0555179;
        self.b1 = 0.99332 * self.b1 + white * 0.0750759;
        self.b2 = 0.96900 * self.b2 + white * 0.1538520;
        self.b3 = 0.86650 * self.b3 + white * 0.3104856;
        self.b4 = 0.55000 * self.b4 + white * 0.5329522;
        self.b5 = -0.7616 * self.b5 - white * 0.0168980;
        let pink = self.b0
            + self.b1
            + self.b2
            + self.b3
            + self.b4
            + self.b5
            + self.b6
            + white * 0.5362;
        self.b6 = white * 0.115926;
        pink * OUTPUT_GAIN
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

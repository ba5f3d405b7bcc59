//! Gaussian sampling via the Box–Muller transform.

use rand::Rng;
use std::f64::consts::PI;

/// Draw from N(mean, std_dev) using two independent uniform samples.
pub fn sample<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    // u1 must be strictly positive for ln()
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    z * std_dev + mean
}

pub mod ewma;
pub mod gaussian;
pub mod pink_noise;
pub mod stats;

pub use ewma::Ewma;
pub use pink_noise::PinkNoise;
pub use stats::{WindowStats, trailing_slope};

//! Detector-frame signals: projection onto a detector and SNR.

use num_complex::Complex64;

pub mod projection;
pub mod snr;

pub use projection::project;
pub use snr::{inner_product, is_observing, snr};

/// Strain seen by one detector on its frequency grid, with the signal's
/// time-frequency track.
#[derive(Debug, Clone)]
pub struct DetectorSignal {
    pub strain: Vec<Complex64>,
    pub t_of_f: Vec<f64>,
}

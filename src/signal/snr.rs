//! Matched-filter SNR against a detector's noise curve.

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::network::{Detector, DutyCycle};
use crate::signal::DetectorSignal;

/// Per-bin SNR contributions `sqrt(4 |h|² Δf / S_n)`.
///
/// The detector SNR is the quadrature sum of the returned values. With
/// `duty_cycle` set, bins whose `t(f)` falls in a segment where the detector
/// is off contribute zero.
pub fn snr(detector: &Detector, signal: &DetectorSignal, duty_cycle: bool) -> Vec<f64> {
    let df = detector.df();
    let psd = detector.psd();
    let duty = &detector.duty_cycle;

    // Adjacent bins mostly share a segment; draw once per segment change.
    let mut last: Option<(i64, bool)> = None;
    let mut observing = |t: f64| {
        let segment = segment_index(duty, t);
        match last {
            Some((s, on)) if s == segment => on,
            _ => {
                let on = segment_on(duty, segment);
                last = Some((segment, on));
                on
            }
        }
    };

    signal
        .strain
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if duty_cycle && !observing(signal.t_of_f[i]) {
                return 0.0;
            }
            (4.0 * h.norm_sqr() * df[i] / psd[i]).sqrt()
        })
        .collect()
}

/// Noise-weighted inner product `4 Σ a b* Δf / S_n` over the detector grid.
pub fn inner_product(detector: &Detector, a: &[Complex64], b: &[Complex64]) -> Complex64 {
    let df = detector.df();
    let psd = detector.psd();
    a.iter()
        .zip(b)
        .enumerate()
        .map(|(i, (x, y))| x * y.conj() * (4.0 * df[i] / psd[i]))
        .sum()
}

/// Whether the detector is taking data at GPS time `t`.
///
/// Time is cut into fixed segments; each segment is switched on with
/// probability `factor`, from an RNG seeded by the detector seed and the
/// segment index. Every event that overlaps a segment sees the same draw.
pub fn is_observing(duty: &DutyCycle, t: f64) -> bool {
    segment_on(duty, segment_index(duty, t))
}

fn segment_index(duty: &DutyCycle, t: f64) -> i64 {
    (t / duty.segment_s).floor() as i64
}

fn segment_on(duty: &DutyCycle, segment: i64) -> bool {
    if duty.factor >= 1.0 {
        return true;
    }
    if duty.factor <= 0.0 {
        return false;
    }
    let seed = duty.seed ^ (segment as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    StdRng::seed_from_u64(seed).gen_bool(duty.factor)
}

//! Numerical Fisher information for one event in one detector.
//!
//! ```text
//! F_ij = 4 Re Σ ∂_i h(f) ∂_j h*(f) Δf / S_n(f)
//! ```
//!
//! Derivatives are central finite differences of the projected signal. Near a
//! domain boundary (e.g. redshift 0) a forward difference is used instead.

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::domain::{Event, FisherParameterSet, Parameter};
use crate::network::Detector;
use crate::signal::{DetectorSignal, inner_product};
use crate::waveform::InvalidEvent;

/// Relative step for scale parameters (masses, distance, redshift).
const REL_STEP: f64 = 1e-6;

/// Absolute step for angles (rad).
const ANGLE_STEP: f64 = 1e-6;

/// Absolute step for the coalescence time (s).
const TIME_STEP: f64 = 1e-5;

fn step_size(param: Parameter, value: f64) -> f64 {
    match param {
        Parameter::Mass1 | Parameter::Mass2 | Parameter::LuminosityDistance => REL_STEP * value.abs(),
        Parameter::Redshift => REL_STEP * (1.0 + value.abs()),
        Parameter::Ra | Parameter::Dec | Parameter::Psi | Parameter::ThetaJn | Parameter::Phase => {
            ANGLE_STEP
        }
        Parameter::GeocentTime => TIME_STEP,
    }
}

/// Smallest value a parameter may take, if bounded.
fn lower_bound(param: Parameter) -> Option<f64> {
    match param {
        Parameter::Mass1 | Parameter::Mass2 | Parameter::LuminosityDistance | Parameter::Redshift => {
            Some(0.0)
        }
        _ => None,
    }
}

/// Compute the Fisher matrix over `parameters`.
///
/// `signal` regenerates the detector-frame signal for a (perturbed) event; it
/// must be evaluated on `detector`'s frequency grid.
pub fn fisher_matrix<F>(
    signal: F,
    event: &Event,
    parameters: &FisherParameterSet,
    detector: &Detector,
) -> Result<DMatrix<f64>, InvalidEvent>
where
    F: Fn(&Event) -> Result<DetectorSignal, InvalidEvent>,
{
    let base = signal(event)?;
    let derivatives = parameters
        .iter()
        .map(|p| derivative(&signal, event, p, &base))
        .collect::<Result<Vec<_>, _>>()?;

    let n = derivatives.len();
    let mut fm = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in i..n {
            let v = inner_product(detector, &derivatives[i], &derivatives[j]).re;
            fm[(i, j)] = v;
            fm[(j, i)] = v;
        }
    }
    Ok(fm)
}

fn derivative<F>(
    signal: &F,
    event: &Event,
    param: Parameter,
    base: &DetectorSignal,
) -> Result<Vec<Complex64>, InvalidEvent>
where
    F: Fn(&Event) -> Result<DetectorSignal, InvalidEvent>,
{
    let value = param.get(event);
    let step = step_size(param, value);
    if !(step.is_finite() && step > 0.0) {
        return Err(InvalidEvent(format!("cannot differentiate with respect to {param} at {value}")));
    }

    let up = value + step;
    let down = value - step;
    let upper = signal(&param.with(event, up))?;

    let central = lower_bound(param).is_none_or(|lb| down > lb);
    let (lower, width) = if central {
        (signal(&param.with(event, down))?.strain, up - down)
    } else {
        (base.strain.clone(), up - value)
    };

    Ok(upper
        .strain
        .iter()
        .zip(&lower)
        .map(|(a, b)| (a - b) / width)
        .collect())
}

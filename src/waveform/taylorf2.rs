//! Restricted post-Newtonian inspiral in the stationary-phase approximation.
//!
//! The strain is
//!
//! ```text
//! h+(f) = A f^(-7/6) (1 + cos²ι)/2 · exp(-iΨ(f))
//! h×(f) = -i A f^(-7/6) cos ι     · exp(-iΨ(f))
//! ```
//!
//! with `A = sqrt(5/24) π^(-2/3) Mc^(5/6) / D` in geometric (second) units and
//! the phase
//!
//! ```text
//! Ψ(f) = 2πf (t_c - t0) - φ - π/4 + P(f) - P(f_ref)
//! P(f) = 3 / (128 η v^5) · Σ a_k v^k,   v = (π M f)^(1/3)
//! ```
//!
//! Subtracting `P(f_ref)` makes `φ` the phase at the reference frequency. The
//! signal is truncated at the innermost stable circular orbit.

use std::f64::consts::{FRAC_PI_4, PI};

use num_complex::Complex64;

use crate::domain::{Event, MPC_SECONDS, MSUN_SECONDS};
use crate::waveform::{GenerationContext, InvalidEvent, Waveform};

/// Highest post-Newtonian order of the phase series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PhaseOrder {
    Newtonian,
    TwoPn,
}

#[derive(Debug, Clone, Copy)]
struct Binary {
    /// Total detector-frame mass (s).
    total_mass: f64,
    /// Detector-frame chirp mass (s).
    chirp_mass: f64,
    eta: f64,
    /// Luminosity distance (s).
    distance: f64,
}

impl Binary {
    fn from_event(event: &Event) -> Result<Self, InvalidEvent> {
        validate(event)?;
        let (m1, m2) = event.detector_frame_masses();
        let total = m1 + m2;
        let eta = m1 * m2 / (total * total);
        let total_mass = total * MSUN_SECONDS;
        Ok(Self {
            total_mass,
            chirp_mass: total_mass * eta.powf(0.6),
            eta,
            distance: event.luminosity_distance * MPC_SECONDS,
        })
    }

    fn f_isco(&self) -> f64 {
        1.0 / (6f64.powf(1.5) * PI * self.total_mass)
    }

    fn amplitude(&self) -> f64 {
        (5.0f64 / 24.0).sqrt() * PI.powf(-2.0 / 3.0) * self.chirp_mass.powf(5.0 / 6.0) / self.distance
    }

    /// Frequency-dependent part of the SPA phase.
    fn pn_phase(&self, f: f64, order: PhaseOrder) -> f64 {
        let v = (PI * self.total_mass * f).cbrt();
        let v2 = v * v;
        let eta = self.eta;
        let series = match order {
            PhaseOrder::Newtonian => 1.0,
            PhaseOrder::TwoPn => {
                let a2 = 3715.0 / 756.0 + 55.0 / 9.0 * eta;
                let a3 = -16.0 * PI;
                let a4 = 15_293_365.0 / 508_032.0 + 27_145.0 / 504.0 * eta + 3085.0 / 72.0 * eta * eta;
                1.0 + a2 * v2 + a3 * v2 * v + a4 * v2 * v2
            }
        };
        3.0 / (128.0 * eta * v2 * v2 * v) * series
    }

    /// Leading-order time to coalescence from frequency `f` (s).
    fn chirp_time(&self, f: f64) -> f64 {
        5.0 / 256.0 * self.chirp_mass.powf(-5.0 / 3.0) * (PI * f).powf(-8.0 / 3.0)
    }
}

fn validate(event: &Event) -> Result<(), InvalidEvent> {
    let positive = [
        ("mass_1", event.mass_1),
        ("mass_2", event.mass_2),
        ("luminosity_distance", event.luminosity_distance),
    ];
    for (name, value) in positive {
        if !(value.is_finite() && value > 0.0) {
            return Err(InvalidEvent(format!("{name} must be finite and > 0 (got {value})")));
        }
    }
    if !(event.redshift.is_finite() && event.redshift >= 0.0) {
        return Err(InvalidEvent(format!(
            "redshift must be finite and >= 0 (got {})",
            event.redshift
        )));
    }
    let finite = [
        ("ra", event.ra),
        ("dec", event.dec),
        ("psi", event.psi),
        ("theta_jn", event.theta_jn),
        ("geocent_time", event.geocent_time),
        ("phase", event.phase),
    ];
    for (name, value) in finite {
        if !value.is_finite() {
            return Err(InvalidEvent(format!("{name} must be finite (got {value})")));
        }
    }
    Ok(())
}

pub(crate) fn generate(
    event: &Event,
    ctx: &GenerationContext<'_>,
    order: PhaseOrder,
) -> Result<Waveform, InvalidEvent> {
    let binary = Binary::from_event(event)?;
    let f_isco = binary.f_isco();
    let amp = binary.amplitude();
    let ref_phase = binary.pn_phase(ctx.f_ref, order);

    let cos_i = event.theta_jn.cos();
    let plus_factor = 0.5 * (1.0 + cos_i * cos_i);
    let dt = event.geocent_time - ctx.time_origin;

    let n = ctx.frequencies.len();
    let mut plus = Vec::with_capacity(n);
    let mut cross = Vec::with_capacity(n);
    let mut t_of_f = Vec::with_capacity(n);

    for &f in ctx.frequencies {
        if f > f_isco {
            plus.push(Complex64::new(0.0, 0.0));
            cross.push(Complex64::new(0.0, 0.0));
            t_of_f.push(event.geocent_time);
            continue;
        }

        let psi = 2.0 * PI * f * dt - event.phase - FRAC_PI_4 + binary.pn_phase(f, order) - ref_phase;
        let h = Complex64::from_polar(amp * f.powf(-7.0 / 6.0), -psi);
        plus.push(h * plus_factor);
        cross.push(h * Complex64::new(0.0, -cos_i));
        t_of_f.push(event.geocent_time - binary.chirp_time(f));
    }

    Ok(Waveform { plus, cross, t_of_f })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> Event {
        Event {
            mass_1: 1.4,
            mass_2: 1.4,
            redshift: 0.0,
            luminosity_distance: 40.0,
            ra: 3.44,
            dec: -0.41,
            psi: 0.3,
            theta_jn: 0.4,
            geocent_time: 1_187_008_882.4,
            phase: 0.0,
        }
    }

    #[test]
    fn isco_frequency_of_a_double_neutron_star() {
        let b = Binary::from_event(&event()).unwrap();
        // f_isco ≈ 4400 Hz / (M / M_sun) for M = 2.8.
        assert!((b.f_isco() - 1570.0).abs() < 5.0, "f_isco = {}", b.f_isco());
    }

    #[test]
    fn chirp_time_from_10hz_is_minutes_for_bns() {
        let b = Binary::from_event(&event()).unwrap();
        let tau = b.chirp_time(10.0);
        assert!(tau > 900.0 && tau < 1100.0, "tau = {tau}");
    }

    #[test]
    fn amplitude_scales_inversely_with_distance() {
        let near = Binary::from_event(&event()).unwrap().amplitude();
        let mut far_event = event();
        far_event.luminosity_distance *= 2.0;
        let far = Binary::from_event(&far_event).unwrap().amplitude();
        assert!((near / far - 2.0).abs() < 1e-12);
    }

    #[test]
    fn phase_parameter_is_the_phase_at_f_ref() {
        let e = event();
        let freqs = [50.0];
        let ctx = GenerationContext {
            frequencies: &freqs,
            f_ref: 50.0,
            time_origin: e.geocent_time,
        };
        let a = generate(&e, &ctx, PhaseOrder::TwoPn).unwrap();
        let mut shifted = e;
        shifted.phase = 0.5;
        let b = generate(&shifted, &ctx, PhaseOrder::TwoPn).unwrap();
        let dphi = (b.plus[0] / a.plus[0]).arg();
        assert!((dphi - 0.5).abs() < 1e-12, "dphi = {dphi}");
    }

    #[test]
    fn rejects_non_positive_masses() {
        let mut e = event();
        e.mass_2 = 0.0;
        assert!(validate(&e).is_err());
        e.mass_2 = 1.4;
        e.dec = f64::NAN;
        assert!(validate(&e).is_err());
    }
}

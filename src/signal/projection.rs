//! Projection of a waveform onto one detector.
//!
//! The antenna pattern and geocenter delay are evaluated at `t(f)` for every
//! frequency bin, so long signals see the Earth rotate underneath them.

use std::f64::consts::TAU;

use num_complex::Complex64;

use crate::domain::Event;
use crate::network::{Detector, antenna_pattern, gmst, time_delay_from_geocenter};
use crate::signal::DetectorSignal;
use crate::waveform::Waveform;

pub fn project(event: &Event, detector: &Detector, waveform: &Waveform) -> DetectorSignal {
    let freqs = detector.frequencies();
    debug_assert_eq!(freqs.len(), waveform.len());

    let zero = Complex64::new(0.0, 0.0);
    let mut strain = Vec::with_capacity(freqs.len());

    for (i, &f) in freqs.iter().enumerate() {
        let (hp, hc) = (waveform.plus[i], waveform.cross[i]);
        if hp == zero && hc == zero {
            strain.push(zero);
            continue;
        }

        let sidereal = gmst(waveform.t_of_f[i]);
        let (fp, fc) = antenna_pattern(detector.tensor(), event.ra, event.dec, event.psi, sidereal);
        let delay = time_delay_from_geocenter(detector.position(), event.ra, event.dec, sidereal);
        let shift = Complex64::from_polar(1.0, -TAU * f * delay);
        strain.push((hp * fp + hc * fc) * shift);
    }

    DetectorSignal {
        strain,
        t_of_f: waveform.t_of_f.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::tests::test_detector;
    use crate::waveform::{GenerationContext, WaveformModel};

    fn event() -> Event {
        Event {
            mass_1: 10.0,
            mass_2: 8.0,
            redshift: 0.0,
            luminosity_distance: 500.0,
            ra: 0.4,
            dec: 0.9,
            psi: 1.1,
            theta_jn: 0.3,
            geocent_time: 1_300_000_000.0,
            phase: 0.0,
        }
    }

    #[test]
    fn projected_strain_is_bounded_by_the_polarizations() {
        let det = test_detector("A");
        let e = event();
        let ctx = GenerationContext {
            frequencies: det.frequencies(),
            f_ref: 50.0,
            time_origin: e.geocent_time,
        };
        let wf = WaveformModel::TaylorF2.generate(&e, &ctx).unwrap();
        let sig = project(&e, &det, &wf);
        assert_eq!(sig.strain.len(), wf.len());

        // |F+ h+ + Fx hx| <= sqrt(F+^2 + Fx^2) * sqrt(|h+|^2 + |hx|^2) <= sqrt(|h+|^2 + |hx|^2)
        for i in 0..wf.len() {
            let bound = (wf.plus[i].norm_sqr() + wf.cross[i].norm_sqr()).sqrt();
            assert!(sig.strain[i].norm() <= bound * (1.0 + 1e-12));
        }
        assert!(sig.strain.iter().any(|h| h.norm() > 0.0));
    }
}

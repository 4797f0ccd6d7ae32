//! Interferometer geometry: detector tensors, antenna patterns, and light
//! travel time from the geocenter.
//!
//! Conventions follow the usual Earth-fixed frame (x through the prime
//! meridian on the equator, z through the north pole). Source directions enter
//! through the Greenwich hour angle `gha = gmst - ra`.

use std::f64::consts::TAU;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Mean Earth radius (m).
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Speed of light (m/s).
const C_M_PER_S: f64 = 299_792_458.0;

/// GPS time of the J2000.0 epoch (2000-01-01 12:00 TT).
const GPS_J2000: f64 = 630_763_213.0;

/// Greenwich mean sidereal angle at J2000.0 (rad).
const GMST_J2000: f64 = 4.894_961_212_823_756;

/// Length of a sidereal day (s).
const SIDEREAL_DAY_S: f64 = 86_164.090_5;

/// Location and arm orientation of one interferometer.
///
/// All angles are radians. `arm_azimuth` is the bearing of the first arm,
/// measured from local north towards east; the second arm sits
/// `opening_angle` further round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorGeometry {
    pub latitude: f64,
    pub longitude: f64,
    pub arm_azimuth: f64,
    pub opening_angle: f64,
}

impl DetectorGeometry {
    /// Earth-fixed position of the vertex (m).
    pub fn position(&self) -> Vector3<f64> {
        let (slat, clat) = self.latitude.sin_cos();
        let (slon, clon) = self.longitude.sin_cos();
        Vector3::new(clat * clon, clat * slon, slat) * EARTH_RADIUS_M
    }

    /// `D = (x xᵀ - y yᵀ) / 2` for unit arm vectors `x`, `y`.
    pub fn tensor(&self) -> Matrix3<f64> {
        let (slat, clat) = self.latitude.sin_cos();
        let (slon, clon) = self.longitude.sin_cos();
        let east = Vector3::new(-slon, clon, 0.0);
        let north = Vector3::new(-slat * clon, -slat * slon, clat);

        let arm = |azimuth: f64| {
            let (s, c) = azimuth.sin_cos();
            north * c + east * s
        };
        let x = arm(self.arm_azimuth);
        let y = arm(self.arm_azimuth + self.opening_angle);
        (x * x.transpose() - y * y.transpose()) * 0.5
    }
}

/// Greenwich mean sidereal time (rad, in `[0, 2π)`) at a GPS time.
pub fn gmst(gps_time: f64) -> f64 {
    (GMST_J2000 + TAU * (gps_time - GPS_J2000) / SIDEREAL_DAY_S).rem_euclid(TAU)
}

/// Plus and cross antenna pattern for a source at (`ra`, `dec`) with
/// polarization angle `psi`, observed at sidereal angle `gmst`.
pub fn antenna_pattern(tensor: &Matrix3<f64>, ra: f64, dec: f64, psi: f64, gmst: f64) -> (f64, f64) {
    let gha = gmst - ra;
    let (sg, cg) = gha.sin_cos();
    let (sd, cd) = dec.sin_cos();
    let (sp, cp) = psi.sin_cos();

    let x = Vector3::new(-cp * sg - sp * cg * sd, -cp * cg + sp * sg * sd, sp * cd);
    let y = Vector3::new(sp * sg - cp * cg * sd, sp * cg + cp * sg * sd, cp * cd);

    let dx = tensor * x;
    let dy = tensor * y;
    let f_plus = x.dot(&dx) - y.dot(&dy);
    let f_cross = x.dot(&dy) + y.dot(&dx);
    (f_plus, f_cross)
}

/// Arrival time at `position` minus arrival time at the geocenter (s).
pub fn time_delay_from_geocenter(position: &Vector3<f64>, ra: f64, dec: f64, gmst: f64) -> f64 {
    let gha = gmst - ra;
    let (sd, cd) = dec.sin_cos();
    let towards_source = Vector3::new(cd * gha.cos(), -cd * gha.sin(), sd);
    -towards_source.dot(position) / C_M_PER_S
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    fn equator_detector() -> DetectorGeometry {
        DetectorGeometry {
            latitude: 0.0,
            longitude: 0.0,
            arm_azimuth: 0.0,
            opening_angle: FRAC_PI_2,
        }
    }

    #[test]
    fn tensor_is_symmetric_and_traceless() {
        let d = DetectorGeometry {
            latitude: 0.76,
            longitude: -1.58,
            arm_azimuth: 2.2,
            opening_angle: FRAC_PI_2,
        }
        .tensor();
        assert!((d - d.transpose()).norm() < 1e-15);
        assert!(d.trace().abs() < 1e-15);
    }

    #[test]
    fn overhead_source_has_unit_response() {
        // Source at the zenith of an equatorial detector on the prime meridian.
        let det = equator_detector();
        let tensor = det.tensor();
        let (fp, fc) = antenna_pattern(&tensor, 0.0, 0.0, 0.0, 0.0);
        let norm = (fp * fp + fc * fc).sqrt();
        assert!((norm - 1.0).abs() < 1e-12, "|F| = {norm}");

        // Rotating the polarization angle mixes the patterns but keeps the norm.
        let (fp2, fc2) = antenna_pattern(&tensor, 0.0, 0.0, 0.6, 0.0);
        assert!(((fp2 * fp2 + fc2 * fc2).sqrt() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zenith_source_arrives_early() {
        let det = equator_detector();
        let dt = time_delay_from_geocenter(&det.position(), 0.0, 0.0, 0.0);
        assert!((dt + EARTH_RADIUS_M / C_M_PER_S).abs() < 1e-12);
    }

    #[test]
    fn gmst_advances_one_turn_per_sidereal_day() {
        let a = gmst(1e9);
        let b = gmst(1e9 + SIDEREAL_DAY_S);
        assert!((a - b).abs() < 1e-9);
        assert!((0.0..TAU).contains(&a));
    }
}

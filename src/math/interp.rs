//! Log-log interpolation of tabulated curves.
//!
//! Noise curves span many decades in both frequency and PSD, so linear
//! interpolation in log space tracks them far better than linear interpolation
//! in the raw values.

/// Interpolate `(xs, ys)` at `x` in log-log space.
///
/// `xs` must be strictly increasing and both axes strictly positive. Outside
/// the table, the nearest endpoint value is returned.
pub fn interp_loglog(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len();
    if n == 0 {
        return f64::NAN;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }

    // First index with xs[i] > x; `x` lies in [xs[i-1], xs[i]).
    let i = xs.partition_point(|&v| v <= x);
    let (x0, x1) = (xs[i - 1].ln(), xs[i].ln());
    let (y0, y1) = (ys[i - 1].ln(), ys[i].ln());
    let u = (x.ln() - x0) / (x1 - x0);
    (y0 + u * (y1 - y0)).exp()
}

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn geomspace(min: f64, max: f64, steps: usize) -> Vec<f64> {
    if steps == 0 {
        return Vec::new();
    }
    if steps == 1 {
        return vec![min];
    }
    let ln_min = min.ln();
    let step = (max.ln() - ln_min) / (steps as f64 - 1.0);
    (0..steps).map(|i| (ln_min + step * i as f64).exp()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_law_is_interpolated_exactly() {
        // y = x^-2 is a straight line in log-log space.
        let xs = [1.0, 10.0, 100.0];
        let ys = [1.0, 1e-2, 1e-4];
        let y = interp_loglog(&xs, &ys, 31.622_776_601_683_793);
        assert!((y - 1e-3).abs() < 1e-12);
    }

    #[test]
    fn clamps_outside_the_table() {
        let xs = [5.0, 50.0];
        let ys = [2.0, 3.0];
        assert_eq!(interp_loglog(&xs, &ys, 1.0), 2.0);
        assert_eq!(interp_loglog(&xs, &ys, 500.0), 3.0);
    }

    #[test]
    fn geomspace_includes_endpoints() {
        let v = geomspace(2.0, 2048.0, 11);
        assert_eq!(v.len(), 11);
        assert!((v[0] - 2.0).abs() < 1e-12);
        assert!((v[10] - 2048.0).abs() < 1e-9);
        assert!((v[1] - 4.0).abs() < 1e-12);
    }
}

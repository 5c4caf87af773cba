use super::summary::finite_sorted;

/// Number of evenly spaced thresholds each density curve is sampled at.
pub const DENSITY_SAMPLES: usize = 100;

/// Bandwidth is the observed range divided by this.
const BANDWIDTH_DIVISOR: f64 = 5.0;

/// Epanechnikov kernel scaled to bandwidth `h`.
fn epanechnikov(h: f64, u: f64) -> f64 {
    let u = u / h;
    if u.abs() <= 1.0 {
        0.75 * (1.0 - u * u) / h
    } else {
        0.0
    }
}

/// Kernel density estimate of `values` as `[x, density]` points.
///
/// Sampled at [`DENSITY_SAMPLES`] thresholds spanning the observed
/// min..max.  Returns `None` for one observation or fewer, or when every
/// observation is equal.
pub fn density_curve(values: &[f64]) -> Option<Vec<[f64; 2]>> {
    let sorted = finite_sorted(values);
    if sorted.len() <= 1 {
        return None;
    }
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let range = max - min;
    if range <= 0.0 {
        return None;
    }
    let bandwidth = range / BANDWIDTH_DIVISOR;
    let n = sorted.len() as f64;
    let step = range / (DENSITY_SAMPLES - 1) as f64;

    let curve = (0..DENSITY_SAMPLES)
        .map(|i| {
            let x = if i == DENSITY_SAMPLES - 1 {
                max
            } else {
                min + step * i as f64
            };
            let d = sorted.iter().map(|&v| epanechnikov(bandwidth, x - v)).sum::<f64>() / n;
            [x, d]
        })
        .collect();
    Some(curve)
}

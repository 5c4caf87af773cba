/// Five-number summary plus count and mean of one category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
}

impl Summary {
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Fraction of a value used to pad single-point or flat ranges.
const PAD_FRACTION: f64 = 0.1;

fn pad_for(value: f64) -> f64 {
    let pad = value.abs() * PAD_FRACTION;
    if pad > 0.0 { pad } else { 1.0 }
}

/// Finite values of `values`, sorted ascending.
pub fn finite_sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Quantile `p` in `[0, 1]` of already-sorted values, interpolating linearly
/// between ranks.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || !p.is_finite() {
        return None;
    }
    let p = p.clamp(0.0, 1.0);
    let h = (n - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (h - lo as f64))
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile_sorted(&finite_sorted(values), 0.5)
}

/// Summarise one category's observations.
///
/// With three or more observations the quartiles are rank statistics.  With
/// one or two there are too few ranks, so q1 and q3 sit halfway between the
/// median and the extremes.  A single observation `v` gets synthetic extremes
/// of `v ∓ 10%` so the box keeps a visible width.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    let sorted = finite_sorted(values);
    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count.max(1) as f64;

    match count {
        0 => None,
        1 | 2 => {
            let median = quantile_sorted(&sorted, 0.5)?;
            let (min, max) = if count == 1 {
                let pad = pad_for(sorted[0]);
                (sorted[0] - pad, sorted[0] + pad)
            } else {
                (sorted[0], sorted[1])
            };
            Some(Summary {
                count,
                min,
                q1: (min + median) / 2.0,
                median,
                q3: (median + max) / 2.0,
                max,
                mean,
            })
        }
        _ => Some(Summary {
            count,
            min: sorted[0],
            q1: quantile_sorted(&sorted, 0.25)?,
            median: quantile_sorted(&sorted, 0.5)?,
            q3: quantile_sorted(&sorted, 0.75)?,
            max: sorted[count - 1],
            mean,
        }),
    }
}

/// A plotting domain that is never empty: a flat range `[v, v]` becomes
/// `[v - 10%, v + 10%]`.  Non-finite bounds fall back to `[0, 1]`.
pub fn padded_range(min: f64, max: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    if hi - lo > f64::EPSILON * hi.abs().max(1.0) {
        (lo, hi)
    } else {
        let pad = pad_for(lo);
        (lo - pad, hi + pad)
    }
}

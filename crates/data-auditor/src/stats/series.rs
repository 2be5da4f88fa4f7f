//! Ordered-series statistics: trend, autocorrelation, change points and
//! spectral power.

use serde::Serialize;

use super::two_sided_normal_p;

/// Longest series Mann-Kendall evaluates directly; longer series are
/// subsampled with a fixed stride.
pub const MANN_KENDALL_MAX_N: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MannKendall {
    pub s: f64,
    pub z: f64,
    pub p_value: f64,
    pub trend: TrendDirection,
}

/// Mann-Kendall monotonic trend test with tie-corrected variance.
pub fn mann_kendall(values: &[f64], alpha: f64) -> Option<MannKendall> {
    if values.len() < 3 {
        return None;
    }
    let data: Vec<f64> = if values.len() > MANN_KENDALL_MAX_N {
        let step = values.len().div_ceil(MANN_KENDALL_MAX_N);
        values.iter().step_by(step).copied().collect()
    } else {
        values.to_vec()
    };
    let n = data.len();

    let mut s = 0.0;
    for i in 0..n - 1 {
        for j in (i + 1)..n {
            s += match data[j].partial_cmp(&data[i]) {
                Some(std::cmp::Ordering::Greater) => 1.0,
                Some(std::cmp::Ordering::Less) => -1.0,
                _ => 0.0,
            };
        }
    }

    let tie_correction = tie_groups(&data)
        .into_iter()
        .map(|t| t * (t - 1.0) * (2.0 * t + 5.0))
        .sum::<f64>();
    let nf = n as f64;
    let var_s = (nf * (nf - 1.0) * (2.0 * nf + 5.0) - tie_correction) / 18.0;
    if var_s <= 0.0 {
        return None;
    }

    let z = if s > 0.0 {
        (s - 1.0) / var_s.sqrt()
    } else if s < 0.0 {
        (s + 1.0) / var_s.sqrt()
    } else {
        0.0
    };
    let p_value = two_sided_normal_p(z);
    let trend = if p_value < alpha {
        if z > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }
    } else {
        TrendDirection::None
    };

    Some(MannKendall { s, z, p_value, trend })
}

/// Sizes of groups of equal values.
fn tie_groups(values: &[f64]) -> Vec<f64> {
    let mut data = values.to_vec();
    data.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut groups = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let mut j = i;
        while j + 1 < data.len() && data[j + 1] == data[i] {
            j += 1;
        }
        if j > i {
            groups.push((j - i + 1) as f64);
        }
        i = j + 1;
    }
    groups
}

/// Sample autocorrelation at `lag`.
pub fn autocorrelation(values: &[f64], lag: usize) -> Option<f64> {
    let n = values.len();
    if lag == 0 || n <= lag + 1 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let denom: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    if denom <= 0.0 {
        return None;
    }
    let numer: f64 = (0..n - lag)
        .map(|i| (values[i] - mean) * (values[i + lag] - mean))
        .sum();
    Some(numer / denom)
}

/// Cumulative sum of deviations from the mean.
///
/// Returns the index and absolute value of the largest excursion.
pub fn cusum_peak(values: &[f64]) -> Option<(usize, f64)> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let mut running = 0.0;
    let mut peak = (0, 0.0_f64);
    for (i, v) in values.iter().enumerate() {
        running += v - mean;
        if running.abs() > peak.1 {
            peak = (i, running.abs());
        }
    }
    Some(peak)
}

/// Periodogram of a mean-centred series for frequencies `1..=n/2`.
///
/// Element `k - 1` holds the power at period `n / k`.
pub fn periodogram(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 4 {
        return Vec::new();
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let centred: Vec<f64> = values.iter().map(|v| v - mean).collect();
    let nf = n as f64;

    (1..=n / 2)
        .map(|k| {
            let omega = 2.0 * std::f64::consts::PI * k as f64 / nf;
            let (mut re, mut im) = (0.0, 0.0);
            for (t, x) in centred.iter().enumerate() {
                let angle = omega * t as f64;
                re += x * angle.cos();
                im -= x * angle.sin();
            }
            (re * re + im * im) / nf
        })
        .collect()
}

//! Seeded, reproducible sampling.
//!
//! Two runs with the same input length, sample size and seed always select
//! the same rows. Returned indices are sorted ascending so sampled data keeps
//! its original row order (trend and drift checks depend on it).

use rand::prelude::*;

/// Simple random sample of `k` indices out of `0..n`.
pub fn seeded_sample_indices(n: usize, k: usize, seed: u64) -> Vec<usize> {
    if k >= n {
        return (0..n).collect();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let indices: Vec<usize> = (0..n).collect();
    let mut picked: Vec<usize> = indices.choose_multiple(&mut rng, k).copied().collect();
    picked.sort_unstable();
    picked
}

/// Stratified sample of `k` indices out of `0..n`.
///
/// The rows are cut into `k` contiguous strata of (nearly) equal size and one
/// row is drawn from each, so every region of the data is represented.
pub fn stratified_indices(n: usize, k: usize, seed: u64) -> Vec<usize> {
    if k >= n {
        return (0..n).collect();
    }
    if k == 0 {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    (0..k)
        .map(|stratum| {
            let start = stratum * n / k;
            let end = ((stratum + 1) * n / k).max(start + 1);
            rng.gen_range(start..end)
        })
        .collect()
}

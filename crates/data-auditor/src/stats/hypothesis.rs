//! Two-sample and k-sample hypothesis tests.

use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use super::{
    TestOutcome, average_ranks, chi2_sf, kolmogorov_sf, normal_cdf, two_sided_normal_p,
    two_sided_t_p,
};
use crate::profiler::statistics::{mean, median_sorted, sample_std, sorted, variance};

/// Welch's unequal-variance t-test.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Option<TestOutcome> {
    if a.len() < 2 || b.len() < 2 {
        return None;
    }
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (v1, v2) = (variance(a, 1) / n1, variance(b, 1) / n2);
    let se_sq = v1 + v2;
    if se_sq <= 0.0 {
        return None;
    }
    let t = (mean(a) - mean(b)) / se_sq.sqrt();
    let df = se_sq * se_sq / (v1 * v1 / (n1 - 1.0) + v2 * v2 / (n2 - 1.0));
    TestOutcome::new(t, two_sided_t_p(t, df)?)
}

/// Mann-Whitney U test, normal approximation with tie and continuity
/// correction. The statistic is U of the first sample.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> Option<TestOutcome> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let combined: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    let n = combined.len() as f64;
    let (ranks, tie_term) = average_ranks(&combined);

    let r1: f64 = ranks[..a.len()].iter().sum();
    let u1 = r1 - n1 * (n1 + 1.0) / 2.0;
    let u = u1.max(n1 * n2 - u1);

    let mu = n1 * n2 / 2.0;
    let sigma_sq = n1 * n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if sigma_sq <= 0.0 {
        return None;
    }
    let z = (u - mu - 0.5) / sigma_sq.sqrt();
    TestOutcome::new(u1, two_sided_normal_p(z))
}

/// Wilcoxon signed-rank test on paired samples (normal approximation).
/// Zero differences are dropped. The statistic is `min(W+, W-)`.
pub fn wilcoxon_signed_rank(a: &[f64], b: &[f64]) -> Option<TestOutcome> {
    let diffs: Vec<f64> = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| x - y)
        .filter(|d| *d != 0.0)
        .collect();
    if diffs.len() < 2 {
        return None;
    }
    let abs: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let (ranks, tie_term) = average_ranks(&abs);
    let w_plus: f64 = diffs
        .iter()
        .zip(ranks.iter())
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();

    let n = diffs.len() as f64;
    let total = n * (n + 1.0) / 2.0;
    let mu = total / 2.0;
    let sigma_sq = n * (n + 1.0) * (2.0 * n + 1.0) / 24.0 - tie_term / 48.0;
    if sigma_sq <= 0.0 {
        return None;
    }
    let z = (w_plus - mu) / sigma_sq.sqrt();
    TestOutcome::new(w_plus.min(total - w_plus), two_sided_normal_p(z))
}

/// Levene's test centred on group medians (Brown-Forsythe variant).
pub fn levene_median(groups: &[&[f64]]) -> Option<TestOutcome> {
    if groups.len() < 2 || groups.iter().any(|g| g.len() < 2) {
        return None;
    }

    let z_values: Vec<Vec<f64>> = groups
        .iter()
        .map(|group| {
            let median = median_sorted(&sorted(group));
            group.iter().map(|v| (v - median).abs()).collect()
        })
        .collect();

    let n_total: usize = groups.iter().map(|g| g.len()).sum();
    let k = groups.len();
    if n_total <= k {
        return None;
    }

    let z_means: Vec<f64> = z_values.iter().map(|z| mean(z)).collect();
    let z_grand_mean = z_values.iter().flatten().sum::<f64>() / n_total as f64;

    let ss_between: f64 = z_values
        .iter()
        .zip(z_means.iter())
        .map(|(z, &m)| z.len() as f64 * (m - z_grand_mean).powi(2))
        .sum();
    let ss_within: f64 = z_values
        .iter()
        .zip(z_means.iter())
        .map(|(z, &m)| z.iter().map(|v| (v - m).powi(2)).sum::<f64>())
        .sum();

    let df1 = (k - 1) as f64;
    let df2 = (n_total - k) as f64;
    let ms_within = ss_within / df2;
    if ms_within <= 0.0 || !ms_within.is_finite() {
        return None;
    }
    let f_stat = (ss_between / df1) / ms_within;
    let f_dist = FisherSnedecor::new(df1, df2).ok()?;
    TestOutcome::new(f_stat, f_dist.sf(f_stat))
}

/// Bartlett's test for equal variances (assumes normality).
pub fn bartlett(groups: &[&[f64]]) -> Option<TestOutcome> {
    if groups.len() < 2 || groups.iter().any(|g| g.len() < 2) {
        return None;
    }
    let k = groups.len() as f64;
    let n_total: f64 = groups.iter().map(|g| g.len() as f64).sum();
    let variances: Vec<f64> = groups.iter().map(|g| variance(g, 1)).collect();
    if variances.iter().any(|v| *v <= 0.0) {
        return None;
    }

    let pooled = groups
        .iter()
        .zip(variances.iter())
        .map(|(g, v)| (g.len() as f64 - 1.0) * v)
        .sum::<f64>()
        / (n_total - k);

    let numerator = (n_total - k) * pooled.ln()
        - groups
            .iter()
            .zip(variances.iter())
            .map(|(g, v)| (g.len() as f64 - 1.0) * v.ln())
            .sum::<f64>();
    let correction = 1.0
        + (groups.iter().map(|g| 1.0 / (g.len() as f64 - 1.0)).sum::<f64>() - 1.0 / (n_total - k))
            / (3.0 * (k - 1.0));
    let statistic = numerator / correction;
    TestOutcome::new(statistic, chi2_sf(statistic, k - 1.0)?)
}

/// Kruskal-Wallis H test with tie correction.
pub fn kruskal_wallis(groups: &[&[f64]]) -> Option<TestOutcome> {
    let groups: Vec<&[f64]> = groups.iter().copied().filter(|g| !g.is_empty()).collect();
    if groups.len() < 2 {
        return None;
    }
    let combined: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let n = combined.len() as f64;
    let (ranks, tie_term) = average_ranks(&combined);

    let mut offset = 0;
    let mut sum_term = 0.0;
    for group in &groups {
        let rank_sum: f64 = ranks[offset..offset + group.len()].iter().sum();
        sum_term += rank_sum * rank_sum / group.len() as f64;
        offset += group.len();
    }

    let h = 12.0 / (n * (n + 1.0)) * sum_term - 3.0 * (n + 1.0);
    let correction = 1.0 - tie_term / (n * n * n - n);
    if correction <= 0.0 {
        return None;
    }
    let h = h / correction;
    TestOutcome::new(h, chi2_sf(h, groups.len() as f64 - 1.0)?)
}

/// Two-sample Kolmogorov-Smirnov test (asymptotic p-value).
pub fn ks_two_sample(a: &[f64], b: &[f64]) -> Option<TestOutcome> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let (a, b) = (sorted(a), sorted(b));
    let (n1, n2) = (a.len(), b.len());

    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < n1 && j < n2 {
        let x = a[i].min(b[j]);
        while i < n1 && a[i] <= x {
            i += 1;
        }
        while j < n2 && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n1 as f64 - j as f64 / n2 as f64).abs());
    }

    let en = (n1 as f64 * n2 as f64 / (n1 + n2) as f64).sqrt();
    TestOutcome::new(d, kolmogorov_sf((en + 0.12 + 0.11 / en) * d))
}

/// One-sample KS test against a normal with the sample's own mean and
/// standard deviation.
pub fn ks_normal_fit(values: &[f64]) -> Option<TestOutcome> {
    if values.len() < 3 {
        return None;
    }
    let std = sample_std(values);
    if std <= 0.0 {
        return None;
    }
    let m = mean(values);
    let data = sorted(values);
    let n = data.len() as f64;

    let d = data
        .iter()
        .enumerate()
        .map(|(i, x)| {
            let cdf = normal_cdf((x - m) / std);
            ((i as f64 + 1.0) / n - cdf).max(cdf - i as f64 / n)
        })
        .fold(0.0, f64::max);

    let en = n.sqrt();
    TestOutcome::new(d, kolmogorov_sf((en + 0.12 + 0.11 / en) * d))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shifted(n: usize, offset: f64) -> Vec<f64> {
        (0..n).map(|i| (i % 10) as f64 + offset).collect()
    }

    // ==================== location tests ====================

    #[test]
    fn test_welch_detects_shift() {
        let a = shifted(50, 0.0);
        let b = shifted(50, 5.0);
        let result = welch_t_test(&a, &b).unwrap();
        assert!(result.statistic < 0.0);
        assert!(result.p_value < 0.001);
    }

    #[test]
    fn test_welch_same_distribution() {
        let a = shifted(50, 0.0);
        let result = welch_t_test(&a, &a).unwrap();
        assert!(result.p_value > 0.99);
    }

    #[test]
    fn test_welch_requires_variance() {
        assert!(welch_t_test(&[1.0, 1.0], &[1.0, 1.0]).is_none());
        assert!(welch_t_test(&[1.0], &[2.0, 3.0]).is_none());
    }

    #[test]
    fn test_mann_whitney() {
        let a = shifted(40, 0.0);
        let b = shifted(40, 20.0);
        assert!(mann_whitney_u(&a, &b).unwrap().p_value < 0.001);
        let c = shifted(40, 0.0);
        assert!(mann_whitney_u(&a, &c).unwrap().p_value > 0.5);
    }

    #[test]
    fn test_wilcoxon_signed_rank() {
        let a = shifted(30, 0.0);
        let b: Vec<f64> = a.iter().map(|v| v + 3.0 + (*v * 0.1)).collect();
        assert!(wilcoxon_signed_rank(&a, &b).unwrap().p_value < 0.001);
        assert!(wilcoxon_signed_rank(&a, &a).is_none());
    }

    // ==================== spread tests ====================

    #[test]
    fn test_levene_and_bartlett_detect_variance_change() {
        let narrow: Vec<f64> = (0..50).map(|i| (i % 5) as f64).collect();
        let wide: Vec<f64> = (0..50).map(|i| (i % 5) as f64 * 10.0).collect();
        assert!(levene_median(&[&narrow, &wide]).unwrap().p_value < 0.001);
        assert!(bartlett(&[&narrow, &wide]).unwrap().p_value < 0.001);
        assert!(bartlett(&[&narrow, &narrow]).unwrap().p_value > 0.99);
    }

    // ==================== k-sample and distribution tests ====================

    #[test]
    fn test_kruskal_wallis() {
        let g1 = shifted(20, 0.0);
        let g2 = shifted(20, 50.0);
        let g3 = shifted(20, 100.0);
        assert!(kruskal_wallis(&[&g1, &g2, &g3]).unwrap().p_value < 0.001);
        assert!(kruskal_wallis(&[&g1]).is_none());
    }

    #[test]
    fn test_ks_two_sample() {
        let a = shifted(100, 0.0);
        let b = shifted(100, 0.0);
        let same = ks_two_sample(&a, &b).unwrap();
        assert_eq!(same.statistic, 0.0);
        assert_eq!(same.p_value, 1.0);

        let c = shifted(100, 8.0);
        let diff = ks_two_sample(&a, &c).unwrap();
        assert!((diff.statistic - 0.8).abs() < 1e-12);
        assert!(diff.p_value < 0.001);
    }

    #[test]
    fn test_ks_normal_fit_rejects_bimodal() {
        let mut values = vec![0.0; 100];
        values.extend(vec![100.0; 100]);
        values.push(50.0);
        assert!(ks_normal_fit(&values).unwrap().p_value < 0.001);
    }
}

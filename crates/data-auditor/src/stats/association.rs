//! Correlation, contingency and collinearity measures.

use std::collections::BTreeMap;

use super::{TestOutcome, chi2_sf, two_sided_t_p};

/// Pearson correlation with a t-test p-value (`n - 2` degrees of freedom).
///
/// The statistic of the returned outcome is `r`.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<TestOutcome> {
    let n = x.len().min(y.len());
    if n < 3 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let nf = n as f64;
    let mx = x.iter().sum::<f64>() / nf;
    let my = y.iter().sum::<f64>() / nf;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y.iter()) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);

    let df = nf - 2.0;
    let p = if (1.0 - r.abs()) < 1e-12 {
        0.0
    } else {
        let t = r * (df / (1.0 - r * r)).sqrt();
        two_sided_t_p(t, df)?
    };
    TestOutcome::new(r, p)
}

/// Chi-square test of independence over a contingency table.
#[derive(Debug, Clone, PartialEq)]
pub struct Contingency {
    pub chi2: f64,
    pub p_value: f64,
    pub dof: usize,
    pub cramers_v: f64,
    pub n: usize,
}

/// Build the contingency table of two label sequences and test it.
///
/// Returns `None` if either side has fewer than two levels.
pub fn contingency_test<A: Ord, B: Ord>(
    pairs: impl IntoIterator<Item = (A, B)>,
) -> Option<Contingency> {
    let mut row_index: BTreeMap<A, usize> = BTreeMap::new();
    let mut col_index: BTreeMap<B, usize> = BTreeMap::new();
    let mut cells: Vec<(usize, usize)> = Vec::new();

    for (a, b) in pairs {
        let next_row = row_index.len();
        let i = *row_index.entry(a).or_insert(next_row);
        let next_col = col_index.len();
        let j = *col_index.entry(b).or_insert(next_col);
        cells.push((i, j));
    }

    let (rows, cols, n) = (row_index.len(), col_index.len(), cells.len());
    if rows < 2 || cols < 2 {
        return None;
    }

    let mut observed = vec![vec![0.0; cols]; rows];
    for (i, j) in cells {
        observed[i][j] += 1.0;
    }
    let row_sums: Vec<f64> = observed.iter().map(|r| r.iter().sum()).collect();
    let col_sums: Vec<f64> = (0..cols).map(|j| observed.iter().map(|r| r[j]).sum()).collect();

    let nf = n as f64;
    let mut chi2 = 0.0;
    for i in 0..rows {
        for j in 0..cols {
            let expected = row_sums[i] * col_sums[j] / nf;
            if expected > 0.0 {
                chi2 += (observed[i][j] - expected).powi(2) / expected;
            }
        }
    }

    let dof = (rows - 1) * (cols - 1);
    let min_dim = (rows.min(cols) - 1) as f64;
    let cramers_v = (chi2 / (nf * min_dim)).sqrt().clamp(0.0, 1.0);
    let p_value = chi2_sf(chi2, dof as f64)?;

    Some(Contingency {
        chi2,
        p_value,
        dof,
        cramers_v,
        n,
    })
}

/// Variance inflation factors from the diagonal of the inverse correlation
/// matrix. `columns` must all have the same length. Returns `None` when the
/// correlation matrix is singular.
pub fn variance_inflation(columns: &[Vec<f64>]) -> Option<Vec<f64>> {
    let k = columns.len();
    if k < 2 {
        return None;
    }
    let mut corr = vec![vec![0.0; k]; k];
    for i in 0..k {
        corr[i][i] = 1.0;
        for j in (i + 1)..k {
            let r = pearson(&columns[i], &columns[j])?.statistic;
            corr[i][j] = r;
            corr[j][i] = r;
        }
    }
    let inverse = invert(corr)?;
    Some((0..k).map(|i| inverse[i][i]).collect())
}

/// Gauss-Jordan inversion with partial pivoting.
fn invert(mut matrix: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    let mut inverse: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let pivot = (col..n).max_by(|&a, &b| {
            matrix[a][col]
                .abs()
                .partial_cmp(&matrix[b][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if matrix[pivot][col].abs() < 1e-10 {
            return None;
        }
        matrix.swap(col, pivot);
        inverse.swap(col, pivot);

        let div = matrix[col][col];
        for j in 0..n {
            matrix[col][j] /= div;
            inverse[col][j] /= div;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = matrix[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                matrix[row][j] -= factor * matrix[col][j];
                inverse[row][j] -= factor * inverse[col][j];
            }
        }
    }
    Some(inverse)
}

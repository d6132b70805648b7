//! Two-sided Mann-Whitney U test (normal approximation).
//!
//! Average ranks for ties, tie correction of the variance and a 0.5
//! continuity correction.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MannWhitney {
    /// min(U1, U2)
    pub u: f64,
    /// Two-sided p-value in [0, 1].
    pub p: f64,
}

/// Both samples should be non-empty; otherwise `p = 1`.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> MannWhitney {
    if a.is_empty() || b.is_empty() {
        return MannWhitney { u: 0.0, p: 1.0 };
    }

    let n1 = a.len() as f64;
    let n2 = b.len() as f64;
    let n = n1 + n2;

    let (rank_sum_a, tie_sum) = rank_sum(a, b);
    let u1 = n1 * n2 + n1 * (n1 + 1.0) / 2.0 - rank_sum_a;
    let u2 = n1 * n2 - u1;

    let tie_correction = 1.0 - tie_sum / (n * n * n - n);
    if tie_correction <= 0.0 {
        // every pooled value is identical
        return MannWhitney { u: u1.min(u2), p: 1.0 };
    }

    let sd = (tie_correction * n1 * n2 * (n + 1.0) / 12.0).sqrt();
    let z = (u1.max(u2) - (n1 * n2 / 2.0 + 0.5)).abs() / sd;
    let p = erfc(z / std::f64::consts::SQRT_2).clamp(0.0, 1.0);

    MannWhitney { u: u1.min(u2), p }
}

/// Sum of the (1-based, tie-averaged) ranks of `a` in the pooled sample,
/// and Σ(t³ - t) over tie groups.
fn rank_sum(a: &[f64], b: &[f64]) -> (f64, f64) {
    let mut pooled: Vec<(f64, bool)> = a
        .iter()
        .map(|&v| (v, true))
        .chain(b.iter().map(|&v| (v, false)))
        .collect();
    pooled.sort_by(|x, y| x.0.total_cmp(&y.0));

    let mut rank_sum_a = 0.0;
    let mut tie_sum = 0.0;
    let mut i = 0;
    while i < pooled.len() {
        let mut j = i + 1;
        while j < pooled.len() && pooled[j].0 == pooled[i].0 {
            j += 1;
        }
        // ranks i+1 ..= j
        let average_rank = (i + 1 + j) as f64 / 2.0;
        let from_a = pooled[i..j].iter().filter(|(_, is_a)| *is_a).count();
        rank_sum_a += average_rank * from_a as f64;

        let t = (j - i) as f64;
        tie_sum += t * t * t - t;
        i = j;
    }
    (rank_sum_a, tie_sum)
}

/// Complementary error function, Abramowitz and Stegun 7.1.26.
fn erfc(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let z = x.abs();
    let t = 1.0 / (1.0 + p * z);
    let tail = (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-z * z).exp();

    if x >= 0.0 { tail } else { 2.0 - tail }
}

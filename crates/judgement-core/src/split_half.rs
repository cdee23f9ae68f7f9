//! C7: split-half reliability via Monte-Carlo verdict splits (spec §4.7).
//!
//! Each split randomly partitions the effective verdicts in half, fits a
//! lightweight Bradley-Terry model on each half independently, and
//! correlates the two resulting rankings with Spearman's rho. The raw
//! correlations are Spearman-Brown corrected and averaged across splits.

use judgement_types::{SplitHalfResult, Text, Verdict};

use crate::cancel::Cancellation;
use crate::error::EngineError;
use crate::fit::fit_theta_only;
use crate::numerics::{clamp, spearman_rho, Xorshift32};

const SPLIT_LAMBDA: f64 = 0.1;
const SPLIT_MAX_ITERS: usize = 50;

/// Estimate split-half reliability by running `num_splits` random halvings
/// of `verdicts` over `texts` and Spearman-Brown correcting the average
/// correlation between each half's ranking.
///
/// `seed` makes the Monte-Carlo splits reproducible: the same
/// `(seed, split_index)` pair always produces the same partition (spec
/// §4.7, §5). Fewer than 3 texts or fewer than 6 verdicts makes every
/// split's correlation undefined; the result is then `None` ("not
/// available"), not an error and not a synthesized zero coefficient.
pub fn split_half_reliability(
    texts: &[Text],
    verdicts: &[Verdict],
    num_splits: usize,
    seed: u32,
    cancel: &Cancellation,
) -> Result<Option<SplitHalfResult>, EngineError> {
    if texts.len() < 3 || verdicts.len() < 6 || num_splits == 0 {
        return Ok(None);
    }

    let mut raw_correlations = Vec::with_capacity(num_splits);

    for split_index in 0..num_splits {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut rng = Xorshift32::new(seed.wrapping_add(split_index as u32).wrapping_mul(2654435761));
        let mut shuffled: Vec<Verdict> = verdicts.to_vec();
        rng.shuffle(&mut shuffled);
        let mid = shuffled.len() / 2;
        let (half_a, half_b) = shuffled.split_at(mid);

        let theta_a = fit_theta_only(texts, half_a, SPLIT_LAMBDA, SPLIT_MAX_ITERS, cancel)?;
        let theta_b = fit_theta_only(texts, half_b, SPLIT_LAMBDA, SPLIT_MAX_ITERS, cancel)?;

        let ranks_a = ranks_from_theta(&theta_a);
        let ranks_b = ranks_from_theta(&theta_b);

        if let Some(rho) = spearman_rho(&ranks_a, &ranks_b) {
            raw_correlations.push(rho);
        }
    }

    if raw_correlations.is_empty() {
        return Ok(None);
    }

    let mean_rho = raw_correlations.iter().sum::<f64>() / raw_correlations.len() as f64;
    let corrected = spearman_brown(mean_rho);

    Ok(Some(SplitHalfResult {
        coefficient: clamp(corrected, 0.0, 1.0),
        raw_correlations,
        num_splits: raw_correlations.len(),
    }))
}

/// Spearman-Brown prophecy formula for doubling test length from one half
/// to the full test: `r_sb = 2r / (1 + r)`.
fn spearman_brown(r: f64) -> f64 {
    if (1.0 + r).abs() < 1e-12 {
        0.0
    } else {
        2.0 * r / (1.0 + r)
    }
}

/// Convert raw theta values into 1-based ranks (1 = highest theta), ties
/// broken by index so the result is always a clean permutation.
fn ranks_from_theta(theta: &[f64]) -> Vec<usize> {
    let n = theta.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        theta[b]
            .partial_cmp(&theta[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    let mut ranks = vec![0usize; n];
    for (pos, &idx) in order.iter().enumerate() {
        ranks[idx] = pos + 1;
    }
    ranks
}

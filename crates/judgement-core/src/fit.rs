//! C3: regularised Bradley-Terry fit, standard errors, and infit (spec §4.3).

use std::collections::HashMap;

use judgement_types::{
    CohortScore, FitLabel, FitOutput, GradingConfig, QualitativeLabel, ReliabilityLabel, ScoreRow,
    Text, Verdict,
};
use tracing::{debug, trace};

use crate::cancel::Cancellation;
use crate::error::EngineError;
use crate::numerics::{clamp, logistic, population_sd, round_to_step};

/// Tunable parameters for the Bradley-Terry fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BradleyTerryParams {
    /// Ridge regularisation strength `lambda`.
    pub lambda: f64,
    /// Top percentile threshold used for the "top" qualitative label.
    pub top_pct: f64,
}

impl Default for BradleyTerryParams {
    fn default() -> Self {
        Self {
            lambda: 0.1,
            top_pct: 0.1,
        }
    }
}

const NEWTON_EPS: f64 = 1e-12;
const NEWTON_TOL: f64 = 1e-6;
const NEWTON_MAX_ITERS: usize = 100;
pub(crate) const SE_RELIABLE: f64 = 0.75;
pub(crate) const SE_REPEAT: f64 = 1.00;

/// Dense pairwise-count and win matrices built from effective verdicts.
struct PairMatrices {
    /// `n_ij[i][j]`: number of verdicts on unordered pair `{i, j}` (symmetric).
    n_ij: Vec<Vec<f64>>,
    /// `w_ij[i][j]`: wins of `i` over `j` (ties contribute 0.5 to each side).
    w_ij: Vec<Vec<f64>>,
}

fn build_matrices(n: usize, index_of: &HashMap<u64, usize>, verdicts: &[Verdict]) -> PairMatrices {
    let mut n_ij = vec![vec![0.0; n]; n];
    let mut w_ij = vec![vec![0.0; n]; n];
    for v in verdicts {
        let (Some(&i), Some(&j)) = (index_of.get(&v.text_a_id), index_of.get(&v.text_b_id)) else {
            continue;
        };
        if i == j {
            continue;
        }
        n_ij[i][j] += 1.0;
        n_ij[j][i] += 1.0;
        match v.outcome {
            judgement_types::Outcome::AWins => w_ij[i][j] += 1.0,
            judgement_types::Outcome::BWins => w_ij[j][i] += 1.0,
            judgement_types::Outcome::Tie => {
                w_ij[i][j] += 0.5;
                w_ij[j][i] += 0.5;
            }
        }
    }
    PairMatrices { n_ij, w_ij }
}

/// Regularised Newton solve with a diagonal Hessian approximation. Returns
/// `(theta, h_diag)` where `h_diag[i]` is the final diagonal Hessian entry,
/// needed by the caller for standard errors.
fn newton_fit(
    mats: &PairMatrices,
    lambda: f64,
    max_iters: usize,
    cancel: &Cancellation,
) -> Result<(Vec<f64>, Vec<f64>), EngineError> {
    let n = mats.n_ij.len();
    let mut theta = vec![0.0; n];
    let mut h_diag = vec![lambda; n];
    if n < 2 {
        return Ok((theta, h_diag));
    }

    for iter in 0..max_iters {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut grad = vec![0.0; n];
        let mut max_update: f64 = 0.0;

        for i in 0..n {
            let mut sum_w = 0.0;
            let mut sum_np = 0.0;
            let mut h_ii = lambda;
            for j in 0..n {
                if i == j || mats.n_ij[i][j] == 0.0 {
                    continue;
                }
                let p_ij = logistic(theta[i] - theta[j]);
                sum_w += mats.w_ij[i][j];
                sum_np += mats.n_ij[i][j] * p_ij;
                h_ii += mats.n_ij[i][j] * p_ij * (1.0 - p_ij);
            }
            grad[i] = sum_w - sum_np - lambda * theta[i];
            h_diag[i] = h_ii;
        }

        for i in 0..n {
            let update = grad[i] / h_diag[i].max(NEWTON_EPS);
            theta[i] += update;
            max_update = max_update.max(update.abs());
        }

        let mean = theta.iter().sum::<f64>() / n as f64;
        for t in &mut theta {
            *t -= mean;
        }

        trace!(iter, max_update, "newton iteration");
        if max_update <= NEWTON_TOL {
            debug!(iter, "newton converged");
            break;
        }
    }

    // Recompute the final diagonal Hessian at the converged theta so SEs
    // reflect the same point the loop stopped at.
    for i in 0..n {
        let mut h_ii = lambda;
        for j in 0..n {
            if i == j || mats.n_ij[i][j] == 0.0 {
                continue;
            }
            let p_ij = logistic(theta[i] - theta[j]);
            h_ii += mats.n_ij[i][j] * p_ij * (1.0 - p_ij);
        }
        h_diag[i] = h_ii;
    }

    Ok((theta, h_diag))
}

fn infit_for(i: usize, mats: &PairMatrices, theta: &[f64]) -> Option<f64> {
    let n = theta.len();
    let mut numer = 0.0;
    let mut denom = 0.0;
    for j in 0..n {
        if i == j || mats.n_ij[i][j] == 0.0 {
            continue;
        }
        let p_ij = logistic(theta[i] - theta[j]);
        let obs_ij = mats.w_ij[i][j] / mats.n_ij[i][j];
        numer += (obs_ij - p_ij).powi(2) * mats.n_ij[i][j];
        denom += mats.n_ij[i][j] * p_ij * (1.0 - p_ij);
    }
    if denom <= NEWTON_EPS {
        None
    } else {
        Some(numer / denom)
    }
}

/// Basic cohort verdict from a set of score rows (spec §4.5's first rule:
/// `pctReliable`, `medianSE`, `maxSE`). The fuller robust assessment lives
/// in [`crate::reliability::assess_reliability`].
///
/// `split_half` carries C7's coefficient into the returned [`CohortScore`]
/// when the caller has one available (spec §3's `CohortVerdict` names a
/// "split-half coefficient when available" field); pass `None` when no
/// split-half run has been done.
#[must_use]
pub fn cohort_score(rows: &[ScoreRow], split_half: Option<f64>) -> CohortScore {
    let n = rows.len();
    let finite_ses: Vec<f64> = rows.iter().map(|r| r.se).filter(|se| se.is_finite()).collect();

    let median_se = if finite_ses.is_empty() {
        f64::INFINITY
    } else {
        crate::numerics::median(&finite_ses)
    };
    let max_se = finite_ses
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let max_se = if finite_ses.is_empty() {
        f64::INFINITY
    } else {
        max_se
    };

    let pct_reliable = if n == 0 {
        0.0
    } else {
        rows.iter().filter(|r| r.se <= SE_RELIABLE).count() as f64 / n as f64
    };

    let verdict = if pct_reliable >= 0.70 || (median_se <= 0.80 && max_se <= 1.40) {
        ReliabilityLabel::Reliable
    } else if median_se <= 1.00 {
        ReliabilityLabel::Almost
    } else {
        ReliabilityLabel::Insufficient
    };

    CohortScore {
        verdict,
        median_se,
        max_se,
        split_half,
    }
}

fn reliability_label(se: f64) -> ReliabilityLabel {
    if se <= SE_RELIABLE {
        ReliabilityLabel::Reliable
    } else if se <= SE_REPEAT {
        ReliabilityLabel::Almost
    } else {
        ReliabilityLabel::Insufficient
    }
}

fn qualitative_label(rank: usize, n: usize, top_pct: f64) -> QualitativeLabel {
    let p = rank as f64 / n as f64;
    if p <= top_pct {
        QualitativeLabel::Top
    } else if p <= 0.5 {
        QualitativeLabel::AboveAverage
    } else if p <= 0.9 {
        QualitativeLabel::Average
    } else {
        QualitativeLabel::BelowAverage
    }
}

/// Fit the regularised Bradley-Terry model over `texts` given effective
/// `verdicts`, returning a ranked scoring table and a basic cohort verdict.
///
/// Never fails except on cooperative cancellation. Fewer than 2 texts is
/// the documented degenerate case (spec §4.3, §7), not an error.
pub fn fit_bradley_terry(
    texts: &[Text],
    verdicts: &[Verdict],
    params: &BradleyTerryParams,
    grading: &GradingConfig,
    cancel: &Cancellation,
) -> Result<FitOutput, EngineError> {
    let n = texts.len();
    let index_of: HashMap<u64, usize> = texts.iter().enumerate().map(|(i, t)| (t.id, i)).collect();

    if n == 0 {
        return Ok(FitOutput {
            rows: Vec::new(),
            cohort: cohort_score(&[], None),
        });
    }

    let mats = build_matrices(n, &index_of, verdicts);
    let exposure: Vec<f64> = (0..n).map(|i| mats.n_ij[i].iter().sum()).collect();

    let (theta, h_diag) = newton_fit(&mats, params.lambda, NEWTON_MAX_ITERS, cancel)?;

    let sigma_theta = population_sd(&theta);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        theta[b]
            .partial_cmp(&theta[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| texts[b].id.cmp(&texts[a].id))
    });
    let mut rank_of = vec![0usize; n];
    for (pos, &idx) in order.iter().enumerate() {
        rank_of[idx] = pos + 1;
    }

    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        let se = if exposure[i] > 0.0 {
            1.0 / h_diag[i].max(NEWTON_EPS).sqrt()
        } else {
            f64::INFINITY
        };
        let z = if sigma_theta > NEWTON_EPS {
            theta[i] / sigma_theta
        } else {
            0.0
        };
        let grade_raw = clamp(
            round_to_step(grading.base + grading.scale * z, grading.rounding),
            grading.min,
            grading.max,
        );
        let infit = infit_for(i, &mats, &theta);
        let infit_label = infit.map(|v| {
            if (0.7..=1.3).contains(&v) {
                FitLabel::GoodFit
            } else {
                FitLabel::Misfit
            }
        });

        rows.push(ScoreRow {
            text_id: texts[i].id,
            theta: theta[i],
            se,
            rank: rank_of[i],
            label: qualitative_label(rank_of[i], n, params.top_pct),
            grade_raw,
            infit,
            infit_label,
            verdict_count: exposure[i] as usize,
            reliability: reliability_label(se),
        });
    }

    let cohort = cohort_score(&rows, None);
    Ok(FitOutput { rows, cohort })
}

/// Lightweight theta-only fit used by C7's split-half splits: same
/// equations, fewer iterations, no SE/infit/grading computed.
pub(crate) fn fit_theta_only(
    texts: &[Text],
    verdicts: &[Verdict],
    lambda: f64,
    max_iters: usize,
    cancel: &Cancellation,
) -> Result<Vec<f64>, EngineError> {
    let n = texts.len();
    let index_of: HashMap<u64, usize> = texts.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
    let mats = build_matrices(n, &index_of, verdicts);
    let (theta, _h_diag) = newton_fit(&mats, lambda, max_iters, cancel)?;
    Ok(theta)
}

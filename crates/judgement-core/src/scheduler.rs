//! C8: adaptive pair scheduler (spec §4.8).
//!
//! Picks the next batch of text pairs to present to raters. Under-exposed
//! texts (and, once θ/SE estimates exist, under-informed ones) are
//! prioritised; candidates are scored to prefer bridging disconnected
//! components first, then under-exposure, then informativeness under
//! Bradley-Terry; a hard exclusion keeps extreme opposite-sign texts from
//! pairing directly, since that comparison is rarely in doubt. A fallback
//! ladder relaxes these constraints in turn rather than leaving an
//! under-cap text unpaired.

use std::collections::HashMap;
use std::collections::HashSet;

use judgement_types::{Pair, ScoreRow, Text, Verdict};

use crate::cancel::Cancellation;
use crate::error::EngineError;
use crate::graph::UnionFind;
use crate::numerics::deterministic_coin;
use crate::numerics::deterministic_jitter;

/// Exposure floor and SE ceiling used by the dynamic batch-size formula
/// (spec §4.8). Fixed constants, distinct from `targetPerText`.
const NEEDS_WORK_EXPOSURE: usize = 5;
const NEEDS_WORK_SE: f64 = 0.75;
/// `|θ|` floor above which two opposite-signed texts are excluded from
/// direct pairing ("opposite wings"). Spec §9 pins this at exactly 1.0.
const OPPOSITE_WING_THETA: f64 = 1.0;
const CONNECTIVITY_BONUS: f64 = 1000.0;

/// Scheduler options (spec §4.8, §6's `options` parameter to `nextPairs`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerOptions {
    /// Desired number of effective verdicts per text.
    pub target_per_text: usize,
    /// Explicit batch size; `None` uses the spec's dynamic formula.
    pub batch_size: Option<usize>,
    /// Whether already-judged pairs may be re-selected.
    pub allow_repeats: bool,
    /// Ceiling on observed judgements for a pair when `allow_repeats`.
    pub max_pair_rejudgements: usize,
    /// SE above which an at-target text is still considered under-informed.
    pub se_inform_threshold: f64,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            target_per_text: 10,
            batch_size: None,
            allow_repeats: false,
            max_pair_rejudgements: 10,
            se_inform_threshold: 0.30,
        }
    }
}

/// Score and select the next batch of pairs.
///
/// `fit`, when supplied, is the most recent [`fit_bradley_terry`]
/// (`crate::fit::fit_bradley_terry`) output's rows, giving θ/SE per text;
/// without it the scheduler falls back to pure exposure-based scoring
/// (spec §4.8's "optional (θ, SE) maps from C3"). Returns an empty batch
/// once every text is at cap (or `texts.len() < 2`), the documented
/// degenerate case, not an error.
pub fn schedule_next_batch(
    texts: &[Text],
    verdicts: &[Verdict],
    fit: Option<&[ScoreRow]>,
    options: &SchedulerOptions,
    cancel: &Cancellation,
) -> Result<Vec<Pair>, EngineError> {
    let n = texts.len();
    if n < 2 {
        return Ok(Vec::new());
    }
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    let exposure = exposure_counts(texts, verdicts);
    let theta_se = fit.map(|rows| theta_se_by_index(texts, rows));

    let needs_work = (0..n)
        .filter(|&i| {
            exposure[i] < NEEDS_WORK_EXPOSURE
                || theta_se.as_ref().is_some_and(|ts| ts[i].1 > NEEDS_WORK_SE)
        })
        .count();
    let default_batch = if (needs_work as f64 / n as f64) <= 0.30 {
        2.max((2.0 * needs_work as f64).ceil() as usize)
    } else {
        8
    };
    let batch_size = options.batch_size.unwrap_or(default_batch).max(1);

    let pair_counts = observed_pair_counts(verdicts);

    // Fallback ladder: (use_se_override, allow_repeats, max_pair_rejudgements).
    // Step 0 is the full predicate from the caller's own options; steps 1-3
    // are spec §4.8's three progressive relaxations.
    let attempts = [
        (true, options.allow_repeats, options.max_pair_rejudgements),
        (false, options.allow_repeats, options.max_pair_rejudgements),
        (false, true, 10),
        (false, true, 100),
    ];

    for &(use_se_override, allow_repeats, max_pair_rejudgements) in &attempts {
        let selected = run_selection(
            texts,
            verdicts,
            &exposure,
            theta_se.as_deref(),
            &pair_counts,
            options.target_per_text,
            options.se_inform_threshold,
            use_se_override,
            allow_repeats,
            max_pair_rejudgements,
            batch_size,
        );
        if !selected.is_empty() {
            return Ok(orient_pairs(texts, selected));
        }
    }

    Ok(Vec::new())
}

fn exposure_counts(texts: &[Text], verdicts: &[Verdict]) -> Vec<usize> {
    let index_of: HashMap<u64, usize> = texts.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
    let mut counts = vec![0usize; texts.len()];
    for v in verdicts {
        if let Some(&i) = index_of.get(&v.text_a_id) {
            counts[i] += 1;
        }
        if let Some(&j) = index_of.get(&v.text_b_id) {
            counts[j] += 1;
        }
    }
    counts
}

fn theta_se_by_index(texts: &[Text], rows: &[ScoreRow]) -> Vec<(f64, f64)> {
    let by_id: HashMap<u64, (f64, f64)> = rows.iter().map(|r| (r.text_id, (r.theta, r.se))).collect();
    texts
        .iter()
        .map(|t| by_id.get(&t.id).copied().unwrap_or((0.0, f64::INFINITY)))
        .collect()
}

fn observed_pair_counts(verdicts: &[Verdict]) -> HashMap<(u64, u64), usize> {
    let mut counts = HashMap::new();
    for v in verdicts {
        let key = (v.text_a_id.min(v.text_b_id), v.text_a_id.max(v.text_b_id));
        *counts.entry(key).or_insert(0usize) += 1;
    }
    counts
}

/// Iteratively and greedily fill a batch of up to `batch_size` pairs,
/// updating exposure counts and the union-find component state after each
/// pick so later candidates in the same batch see the effect of earlier
/// ones (spec §4.8: "update exposure and component union after each
/// pick").
#[allow(clippy::too_many_arguments)]
fn run_selection(
    texts: &[Text],
    verdicts: &[Verdict],
    exposure0: &[usize],
    theta_se: Option<&[(f64, f64)]>,
    pair_counts: &HashMap<(u64, u64), usize>,
    target_per_text: usize,
    se_inform_threshold: f64,
    use_se_override: bool,
    allow_repeats: bool,
    max_pair_rejudgements: usize,
    batch_size: usize,
) -> Vec<(usize, usize)> {
    let n = texts.len();
    let mut exposure = exposure0.to_vec();

    let index_of: HashMap<u64, usize> = texts.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
    let mut uf = UnionFind::new(n);
    for v in verdicts {
        if let (Some(&i), Some(&j)) = (index_of.get(&v.text_a_id), index_of.get(&v.text_b_id)) {
            uf.union(i, j);
        }
    }

    let mut used: HashSet<usize> = HashSet::new();
    let mut selected: Vec<(usize, usize)> = Vec::new();

    while selected.len() < batch_size {
        let under_cap: Vec<bool> = (0..n)
            .map(|i| {
                is_under_cap(
                    i,
                    &exposure,
                    theta_se,
                    target_per_text,
                    se_inform_threshold,
                    use_se_override,
                )
            })
            .collect();

        let mut best: Option<(f64, usize, usize)> = None;
        for i in 0..n {
            if used.contains(&i) || !under_cap[i] {
                continue;
            }
            for j in (i + 1)..n {
                if used.contains(&j) || !under_cap[j] {
                    continue;
                }
                let key = (texts[i].id.min(texts[j].id), texts[i].id.max(texts[j].id));
                let observed = pair_counts.get(&key).copied().unwrap_or(0);
                if !allow_repeats && observed > 0 {
                    continue;
                }
                if allow_repeats && observed >= max_pair_rejudgements {
                    continue;
                }
                if let Some(ts) = theta_se {
                    let (theta_i, _) = ts[i];
                    let (theta_j, _) = ts[j];
                    if theta_i.abs() > OPPOSITE_WING_THETA
                        && theta_j.abs() > OPPOSITE_WING_THETA
                        && theta_i.signum() != theta_j.signum()
                    {
                        continue;
                    }
                }
                let score = candidate_score(i, j, &exposure, theta_se, &mut uf);
                let improves = match best {
                    Some((best_score, _, _)) => score > best_score,
                    None => true,
                };
                if improves {
                    best = Some((score, i, j));
                }
            }
        }

        let Some((_, i, j)) = best else { break };
        selected.push((i, j));
        used.insert(i);
        used.insert(j);
        exposure[i] += 1;
        exposure[j] += 1;
        uf.union(i, j);
    }

    selected
}

fn is_under_cap(
    i: usize,
    exposure: &[usize],
    theta_se: Option<&[(f64, f64)]>,
    target_per_text: usize,
    se_inform_threshold: f64,
    use_se_override: bool,
) -> bool {
    if exposure[i] < target_per_text {
        return true;
    }
    if use_se_override {
        if let Some(ts) = theta_se {
            return ts[i].1 > se_inform_threshold;
        }
    }
    false
}

fn candidate_score(
    i: usize,
    j: usize,
    exposure: &[usize],
    theta_se: Option<&[(f64, f64)]>,
    uf: &mut UnionFind,
) -> f64 {
    let mut score = -((exposure[i] + exposure[j]) as f64);
    if uf.find(i) != uf.find(j) {
        score += CONNECTIVITY_BONUS;
    }
    if let Some(ts) = theta_se {
        let (theta_i, se_i) = ts[i];
        let (theta_j, se_j) = ts[j];
        let delta_theta = (theta_i - theta_j).abs();
        score += 10.0 * (1.0 - delta_theta.min(1.0));
        score += 5.0 * (se_i + se_j).min(2.0);
    }
    score += deterministic_jitter(i, j);
    score
}

fn orient_pairs(texts: &[Text], selected: Vec<(usize, usize)>) -> Vec<Pair> {
    selected
        .into_iter()
        .map(|(i, j)| {
            if deterministic_coin(i, j) {
                Pair {
                    text_a: texts[i].id,
                    text_b: texts[j].id,
                }
            } else {
                Pair {
                    text_a: texts[j].id,
                    text_b: texts[i].id,
                }
            }
        })
        .collect()
}

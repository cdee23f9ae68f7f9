//! C6: per-rater diagnostics (spec §4.6).
//!
//! Summarises each rater's tie rate, agreement with the fitted model, and
//! (for raters with enough verdicts) an infit-style consistency label, plus
//! the set of pairs where raters disagreed on the decisive winner.

use std::collections::HashMap;

use indexmap::IndexMap;
use judgement_types::{
    Choice, DisagreementPair, Outcome, RaterDiagnostics, RaterFitLabel, RaterStats, RaterVote,
    ScoreRow, Verdict,
};

use crate::numerics::logistic;

const MIN_VERDICTS_FOR_INFIT: usize = 10;

/// Summarise per-rater behaviour given the effective `verdicts` and the
/// fitted ability estimates in `rows`.
///
/// Never fails: a rater list with no decisive verdicts produces stats with
/// `model_agreement = 1.0` (spec §4.6's documented default, not `NaN`), and
/// an empty verdict set produces an empty report.
#[must_use]
pub fn analyse_raters(rows: &[ScoreRow], verdicts: &[Verdict]) -> RaterDiagnostics {
    let theta_of: HashMap<u64, f64> = rows.iter().map(|r| (r.text_id, r.theta)).collect();

    let mut by_rater: IndexMap<String, Vec<&Verdict>> = IndexMap::new();
    for v in verdicts {
        by_rater.entry(v.rater_key().to_string()).or_default().push(v);
    }

    let mut rater_stats: Vec<RaterStats> = by_rater
        .iter()
        .map(|(rater_id, votes)| rater_stats_for(rater_id, votes, &theta_of))
        .collect();
    rater_stats.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.rater_id.cmp(&b.rater_id))
    });

    let disagreements = disagreement_pairs(verdicts);
    let unique_raters = by_rater.len();

    RaterDiagnostics {
        rater_stats,
        disagreements,
        unique_raters,
    }
}

fn rater_stats_for(
    rater_id: &str,
    votes: &[&Verdict],
    theta_of: &HashMap<u64, f64>,
) -> RaterStats {
    let count = votes.len();
    let tie_count = votes.iter().filter(|v| v.outcome == Outcome::Tie).count();
    let tie_rate = if count == 0 {
        0.0
    } else {
        tie_count as f64 / count as f64
    };

    let mut agree = 0usize;
    let mut decisive = 0usize;
    let mut infit_numer = 0.0;
    let mut infit_denom = 0.0;

    for v in votes {
        let (Some(&theta_a), Some(&theta_b)) =
            (theta_of.get(&v.text_a_id), theta_of.get(&v.text_b_id))
        else {
            continue;
        };
        let p_a_wins = logistic(theta_a - theta_b);

        // Ties contribute obs=0.5 to the infit sums but never to the
        // decisive agree/count tallies (spec §4.6).
        let observed_a = match v.outcome {
            Outcome::AWins => 1.0,
            Outcome::BWins => 0.0,
            Outcome::Tie => 0.5,
        };
        infit_numer += (observed_a - p_a_wins).powi(2);
        infit_denom += p_a_wins * (1.0 - p_a_wins);

        if v.outcome == Outcome::Tie {
            continue;
        }
        decisive += 1;
        let model_favours_a = p_a_wins >= 0.5;
        let rater_chose_a = v.outcome == Outcome::AWins;
        if model_favours_a == rater_chose_a {
            agree += 1;
        }
    }

    let model_agreement = if decisive == 0 {
        1.0
    } else {
        agree as f64 / decisive as f64
    };

    let infit = if count >= MIN_VERDICTS_FOR_INFIT && infit_denom > 1e-12 {
        Some(infit_numer / infit_denom)
    } else {
        None
    };
    let infit_label = infit.map(|v| {
        if v <= 1.2 {
            RaterFitLabel::Consistent
        } else if v <= 1.5 {
            RaterFitLabel::Inconsistent
        } else {
            RaterFitLabel::Careless
        }
    });

    RaterStats {
        rater_id: rater_id.to_string(),
        count,
        tie_rate,
        model_agreement,
        infit,
        infit_label,
    }
}

/// Group decisive verdicts by unordered pair and keep only pairs where at
/// least two raters cast votes and at least one of each side was cast.
fn disagreement_pairs(verdicts: &[Verdict]) -> Vec<DisagreementPair> {
    let mut by_pair: HashMap<(u64, u64), Vec<RaterVote>> = HashMap::new();

    for v in verdicts {
        let choice = match v.outcome {
            Outcome::AWins => Choice::A,
            Outcome::BWins => Choice::B,
            Outcome::Tie => continue,
        };
        let lo = v.text_a_id.min(v.text_b_id);
        let hi = v.text_a_id.max(v.text_b_id);
        // Normalise the choice to the canonical (lo, hi) orientation.
        let choice = if v.text_a_id == lo { choice } else { flip(choice) };
        by_pair.entry((lo, hi)).or_default().push(RaterVote {
            rater_id: v.rater_key().to_string(),
            choice,
        });
    }

    let mut out: Vec<DisagreementPair> = by_pair
        .into_iter()
        .filter_map(|((a, b), votes)| {
            let a_count = votes.iter().filter(|v| v.choice == Choice::A).count();
            let b_count = votes.iter().filter(|v| v.choice == Choice::B).count();
            let disagreement_count = a_count.min(b_count);
            if disagreement_count == 0 {
                return None;
            }
            Some(DisagreementPair {
                text_a_id: a,
                text_b_id: b,
                votes,
                disagreement_count,
            })
        })
        .collect();

    out.sort_by(|x, y| {
        y.disagreement_count
            .cmp(&x.disagreement_count)
            .then_with(|| x.text_a_id.cmp(&y.text_a_id))
            .then_with(|| x.text_b_id.cmp(&y.text_b_id))
    });
    out
}

fn flip(choice: Choice) -> Choice {
    match choice {
        Choice::A => Choice::B,
        Choice::B => Choice::A,
    }
}

//! C5: robust reliability assessment (spec §4.5).
//!
//! Extends C3's basic cohort verdict with three further checks: a
//! middle-80%-by-theta core subset must itself clear the SE bar, extreme
//! (top/bottom decile) texts need ladder evidence against near-theta
//! neighbours, and an optional convergence check against a previous fit.

use std::collections::HashMap;

use judgement_types::{ReliabilityLabel, ReliabilityReport, ScoreRow, SplitHalfResult, Text, Verdict};

use crate::fit::cohort_score;
use crate::numerics::kendall_tau;

/// Default `seThreshold` for the core-subset check (spec §4.5 rule 1).
pub const DEFAULT_SE_THRESHOLD: f64 = 0.35;

/// `|Δθ|` band within which a verdict counts as evidence against a
/// "nearby" neighbour for the ladder-evidence check (spec §4.5 rule 2).
const LADDER_THETA_BAND: f64 = 1.5;
/// Minimum direct verdicts against nearby neighbours an extreme text needs.
const LADDER_MIN_VERDICTS: usize = 3;
/// Kendall's tau floor for the convergence check (spec §4.5 rule 3).
const CONVERGENCE_TAU: f64 = 0.98;
/// Maximum allowed absolute grade delta for the convergence check.
const CONVERGENCE_MAX_GRADE_DELTA: f64 = 0.1;

/// Run the full robust reliability assessment described in spec §4.5.
///
/// `verdicts` should be the same effective set `rows` was fitted from
/// (needed for the ladder-evidence check). `texts` is accepted to match
/// the language-neutral signature (spec §6: `assessReliability(rows,
/// texts, verdicts, previous?, seThreshold=0.35)`); every check here
/// otherwise derives its cohort size from `rows`; the one place cohort
/// size and `texts` could actually disagree is a truncated `rows` slice
/// passed by mistake, which this guards against.
///
/// `previous`, when given, is a prior fit's rows over the same (or an
/// overlapping) set of texts, matched by `text_id`; used for the
/// convergence check. `se_threshold` is the core-subset SE bar (spec
/// default [`DEFAULT_SE_THRESHOLD`]). `split_half`, when given, is wired
/// into the returned `cohort.split_half` field; this parameter is an
/// extension beyond the language-neutral surface in spec §6, added
/// because spec §3's `CohortVerdict` names a split-half field that
/// otherwise has no call site to populate it from.
#[must_use]
pub fn assess_reliability(
    rows: &[ScoreRow],
    texts: &[Text],
    verdicts: &[Verdict],
    previous: Option<&[ScoreRow]>,
    se_threshold: f64,
    split_half: Option<&SplitHalfResult>,
) -> ReliabilityReport {
    debug_assert!(
        rows.len() <= texts.len(),
        "more score rows than texts supplied"
    );

    let cohort = cohort_score(rows, split_half.map(|s| s.coefficient));
    let core_subset_reliable = core_subset_check(rows, se_threshold);
    let ladder_evidence_ok = ladder_evidence_check(rows, verdicts);
    let convergence_ok = previous.map(|prev| check_convergence(rows, prev));

    let overall_reliable = cohort.verdict == ReliabilityLabel::Reliable
        && core_subset_reliable
        && ladder_evidence_ok
        && convergence_ok.unwrap_or(true);

    ReliabilityReport {
        cohort,
        core_subset_reliable,
        ladder_evidence_ok,
        convergence_ok,
        overall_reliable,
    }
}

/// The middle 80% of texts by theta (dropping the top and bottom decile)
/// must have at least 80% of its members at or below `se_threshold`. An
/// empty core (fewer than 3 texts) is vacuously fine: there is nothing to
/// check extremes against.
fn core_subset_check(rows: &[ScoreRow], se_threshold: f64) -> bool {
    let n = rows.len();
    if n < 3 {
        return true;
    }
    let mut by_theta: Vec<&ScoreRow> = rows.iter().collect();
    by_theta.sort_by(|a, b| a.theta.partial_cmp(&b.theta).unwrap_or(std::cmp::Ordering::Equal));

    let trim = ((n as f64) * 0.10).floor() as usize;
    let core = &by_theta[trim..n - trim];
    if core.is_empty() {
        return true;
    }

    let pct_reliable =
        core.iter().filter(|r| r.se <= se_threshold).count() as f64 / core.len() as f64;
    pct_reliable >= 0.80
}

/// Extreme texts (top and bottom decile by rank, at least one each when
/// `n > 2`) need `>= 3` direct verdicts against a "nearby" neighbour
/// (`|Δθ| <= 1.5`), at least one of which is decisive (not a tie).
/// Trivially satisfied for `n <= 2`, where there is no meaningful notion
/// of a nearby neighbour.
fn ladder_evidence_check(rows: &[ScoreRow], verdicts: &[Verdict]) -> bool {
    let n = rows.len();
    if n <= 2 {
        return true;
    }

    let theta_of: HashMap<u64, f64> = rows.iter().map(|r| (r.text_id, r.theta)).collect();

    let mut by_rank: Vec<&ScoreRow> = rows.iter().collect();
    by_rank.sort_by_key(|r| r.rank);
    let decile = (((n as f64) * 0.10).floor() as usize).max(1);

    let mut extreme_ids: std::collections::HashSet<u64> = std::collections::HashSet::new();
    extreme_ids.extend(by_rank[..decile].iter().map(|r| r.text_id));
    extreme_ids.extend(by_rank[n - decile..].iter().map(|r| r.text_id));

    for &text_id in &extreme_ids {
        let theta_i = theta_of[&text_id];
        let mut count = 0usize;
        let mut has_decisive = false;

        for v in verdicts {
            let other = if v.text_a_id == text_id {
                Some(v.text_b_id)
            } else if v.text_b_id == text_id {
                Some(v.text_a_id)
            } else {
                None
            };
            let Some(other) = other else { continue };
            let Some(&theta_j) = theta_of.get(&other) else {
                continue;
            };
            if (theta_i - theta_j).abs() > LADDER_THETA_BAND {
                continue;
            }
            count += 1;
            if v.outcome != judgement_types::Outcome::Tie {
                has_decisive = true;
            }
        }

        if count < LADDER_MIN_VERDICTS || !has_decisive {
            return false;
        }
    }
    true
}

/// Kendall's tau on ranks `>= 0.98` AND max absolute grade delta `<= 0.1`,
/// both computed only over texts present in both `rows` and `previous`
/// (matched by `text_id`, since a previous fit may cover a different set).
/// Fewer than two texts in common makes the comparison vacuous.
fn check_convergence(rows: &[ScoreRow], previous: &[ScoreRow]) -> bool {
    let prev_rank: HashMap<u64, usize> = previous.iter().map(|r| (r.text_id, r.rank)).collect();
    let prev_grade: HashMap<u64, f64> = previous.iter().map(|r| (r.text_id, r.grade_raw)).collect();

    let mut current_ranks = Vec::new();
    let mut previous_ranks = Vec::new();
    let mut max_grade_delta = 0.0_f64;

    for row in rows {
        if let Some(&pr) = prev_rank.get(&row.text_id) {
            current_ranks.push(row.rank);
            previous_ranks.push(pr);
        }
        if let Some(&pg) = prev_grade.get(&row.text_id) {
            max_grade_delta = max_grade_delta.max((row.grade_raw - pg).abs());
        }
    }

    if current_ranks.len() < 2 {
        return true;
    }

    kendall_tau(&current_ranks, &previous_ranks) >= CONVERGENCE_TAU
        && max_grade_delta <= CONVERGENCE_MAX_GRADE_DELTA
}

#[cfg(test)]
mod tests {
    use super::*;
    use judgement_types::{FitLabel, Outcome, QualitativeLabel};

    fn row_with_grade(text_id: u64, theta: f64, rank: usize, se: f64, grade: f64) -> ScoreRow {
        ScoreRow {
            text_id,
            theta,
            se,
            rank,
            label: QualitativeLabel::Average,
            grade_raw: grade,
            infit: None,
            infit_label: None::<FitLabel>,
            verdict_count: 5,
            reliability: if se <= DEFAULT_SE_THRESHOLD {
                ReliabilityLabel::Reliable
            } else {
                ReliabilityLabel::Insufficient
            },
        }
    }

    fn row(text_id: u64, theta: f64, rank: usize, se: f64) -> ScoreRow {
        row_with_grade(text_id, theta, rank, se, 7.0)
    }

    fn texts_for(rows: &[ScoreRow]) -> Vec<Text> {
        rows.iter()
            .map(|r| Text {
                id: r.text_id,
                assignment_id: 1,
                anonymized_name: format!("t{}", r.text_id),
                content: None,
                content_html: None,
                original_filename: None,
                created_at: 0,
            })
            .collect()
    }

    fn verdict(a: u64, b: u64, outcome: Outcome) -> Verdict {
        Verdict {
            id: a * 1000 + b,
            assignment_id: 1,
            text_a_id: a,
            text_b_id: b,
            outcome,
            created_at: 0,
            rater_id: None,
            rater_name: None,
            comment_a: None,
            comment_b: None,
            supersedes_id: None,
            is_final: false,
            pair_key: None,
        }
    }

    #[test]
    fn small_cohort_is_vacuously_fine_on_core_and_ladder() {
        let rows = vec![row(1, 1.0, 1, 0.2), row(2, -1.0, 2, 0.2)];
        let texts = texts_for(&rows);
        let report = assess_reliability(&rows, &texts, &[], None, DEFAULT_SE_THRESHOLD, None);
        assert!(report.core_subset_reliable);
        assert!(report.ladder_evidence_ok);
    }

    #[test]
    fn core_subset_uses_the_080_fraction_and_se_threshold_params() {
        // 10 rows, core = middle 8 (trim 1 each side). 7/8 reliable at the
        // default 0.35 bar clears 0.80; loosening the bar to 0.05 fails it.
        let mut rows: Vec<ScoreRow> = (0..10)
            .map(|i| row(i, 5.0 - i as f64, (i + 1) as usize, if i == 5 { 0.5 } else { 0.2 }))
            .collect();
        rows.sort_by_key(|r| r.rank);
        let texts = texts_for(&rows);
        assert!(core_subset_check(&rows, DEFAULT_SE_THRESHOLD));
        assert!(!core_subset_check(&rows, 0.05));
        let _ = texts;
    }

    #[test]
    fn ladder_evidence_requires_neighbour_comparison() {
        let rows = vec![
            row(1, 3.0, 1, 0.3),
            row(2, 2.0, 2, 0.3),
            row(3, 1.0, 3, 0.3),
            row(4, 0.0, 4, 0.3),
            row(5, -1.0, 5, 0.3),
            row(6, -2.0, 6, 0.3),
            row(7, -3.0, 7, 0.3),
            row(8, -4.0, 8, 0.3),
            row(9, -5.0, 9, 0.3),
            row(10, -6.0, 10, 0.3),
        ];
        let texts = texts_for(&rows);

        // Only one verdict against a far (not nearby) neighbour: fails.
        let far_only = vec![verdict(10, 1, Outcome::AWins)];
        let report = assess_reliability(&rows, &texts, &far_only, None, DEFAULT_SE_THRESHOLD, None);
        assert!(!report.ladder_evidence_ok);

        // Two nearby verdicts only: still under the required count of 3.
        let too_few = vec![
            verdict(1, 2, Outcome::AWins),
            verdict(10, 9, Outcome::AWins),
        ];
        let report2 = assess_reliability(&rows, &texts, &too_few, None, DEFAULT_SE_THRESHOLD, None);
        assert!(!report2.ladder_evidence_ok);

        // Three nearby, decisive verdicts per extreme: passes.
        let enough = vec![
            verdict(1, 2, Outcome::AWins),
            verdict(1, 2, Outcome::BWins),
            verdict(1, 2, Outcome::Tie),
            verdict(10, 9, Outcome::AWins),
            verdict(10, 9, Outcome::BWins),
            verdict(10, 9, Outcome::Tie),
        ];
        let report3 = assess_reliability(&rows, &texts, &enough, None, DEFAULT_SE_THRESHOLD, None);
        assert!(report3.ladder_evidence_ok);
    }

    #[test]
    fn ladder_evidence_requires_at_least_one_decisive_vote() {
        let rows = vec![
            row(1, 3.0, 1, 0.3),
            row(2, 2.0, 2, 0.3),
            row(3, 1.0, 3, 0.3),
            row(4, 0.0, 4, 0.3),
            row(5, -1.0, 5, 0.3),
            row(6, -2.0, 6, 0.3),
            row(7, -3.0, 7, 0.3),
            row(8, -4.0, 8, 0.3),
            row(9, -5.0, 9, 0.3),
            row(10, -6.0, 10, 0.3),
        ];
        let texts = texts_for(&rows);
        let all_ties = vec![
            verdict(1, 2, Outcome::Tie),
            verdict(1, 2, Outcome::Tie),
            verdict(1, 2, Outcome::Tie),
            verdict(10, 9, Outcome::Tie),
            verdict(10, 9, Outcome::Tie),
            verdict(10, 9, Outcome::Tie),
        ];
        let report = assess_reliability(&rows, &texts, &all_ties, None, DEFAULT_SE_THRESHOLD, None);
        assert!(!report.ladder_evidence_ok);
    }

    #[test]
    fn convergence_check_detects_reordering() {
        let rows = vec![
            row(1, 3.0, 1, 0.3),
            row(2, 2.0, 2, 0.3),
            row(3, 1.0, 3, 0.3),
            row(4, 0.0, 4, 0.3),
        ];
        let texts = texts_for(&rows);
        let same_order = rows.clone();
        let reversed = vec![
            row(1, -3.0, 4, 0.3),
            row(2, -2.0, 3, 0.3),
            row(3, -1.0, 2, 0.3),
            row(4, 0.0, 1, 0.3),
        ];
        let stable = assess_reliability(&rows, &texts, &[], Some(&same_order), DEFAULT_SE_THRESHOLD, None);
        let unstable = assess_reliability(&rows, &texts, &[], Some(&reversed), DEFAULT_SE_THRESHOLD, None);
        assert_eq!(stable.convergence_ok, Some(true));
        assert_eq!(unstable.convergence_ok, Some(false));
    }

    #[test]
    fn convergence_check_also_requires_stable_grades() {
        let rows = vec![
            row_with_grade(1, 3.0, 1, 0.3, 9.0),
            row_with_grade(2, 2.0, 2, 0.3, 7.0),
            row_with_grade(3, 1.0, 3, 0.3, 6.0),
            row_with_grade(4, 0.0, 4, 0.3, 5.0),
        ];
        let texts = texts_for(&rows);
        let same_ranks_different_grades = vec![
            row_with_grade(1, 3.0, 1, 0.3, 9.0),
            row_with_grade(2, 2.0, 2, 0.3, 7.0),
            row_with_grade(3, 1.0, 3, 0.3, 6.0),
            row_with_grade(4, 0.0, 4, 0.3, 5.5), // delta 0.5 > 0.1
        ];
        let report = assess_reliability(
            &rows,
            &texts,
            &[],
            Some(&same_ranks_different_grades),
            DEFAULT_SE_THRESHOLD,
            None,
        );
        assert_eq!(report.convergence_ok, Some(false));
    }

    #[test]
    fn split_half_coefficient_flows_into_cohort() {
        let rows = vec![row(1, 1.0, 1, 0.2), row(2, -1.0, 2, 0.2)];
        let texts = texts_for(&rows);
        let split = SplitHalfResult {
            coefficient: 0.91,
            raw_correlations: vec![0.9, 0.92],
            num_splits: 2,
        };
        let report = assess_reliability(&rows, &texts, &[], None, DEFAULT_SE_THRESHOLD, Some(&split));
        assert_eq!(report.cohort.split_half, Some(0.91));
    }

    #[test]
    fn overall_reliable_requires_every_check() {
        let rows = vec![row(1, 1.0, 1, 0.2), row(2, -1.0, 2, 0.2)];
        let texts = texts_for(&rows);
        let report = assess_reliability(&rows, &texts, &[], None, DEFAULT_SE_THRESHOLD, None);
        assert_eq!(
            report.overall_reliable,
            report.cohort.verdict == ReliabilityLabel::Reliable
        );
    }
}

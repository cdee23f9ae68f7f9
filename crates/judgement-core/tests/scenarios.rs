//! End-to-end scenarios exercising the full C1 -> C8 pipeline together,
//! rather than one module in isolation.

use judgement_core::{
    analyse_raters, assess_reliability, calibrate_grades, effective_verdicts, fit_bradley_terry,
    is_connected, schedule_next_batch, split_half_reliability, BradleyTerryParams, Cancellation,
    SchedulerOptions, DEFAULT_SE_THRESHOLD,
};
use judgement_types::{Anchor, GradingConfig, Outcome, Text, Verdict};

fn text(id: u64) -> Text {
    Text {
        id,
        assignment_id: 1,
        anonymized_name: format!("essay-{id}"),
        content: None,
        content_html: None,
        original_filename: None,
        created_at: 0,
    }
}

fn verdict(id: u64, a: u64, b: u64, outcome: Outcome, rater: &str, t: i64) -> Verdict {
    Verdict {
        id,
        assignment_id: 1,
        text_a_id: a,
        text_b_id: b,
        outcome,
        created_at: t,
        rater_id: Some(rater.to_string()),
        rater_name: None,
        comment_a: None,
        comment_b: None,
        supersedes_id: None,
        is_final: false,
        pair_key: None,
    }
}

/// A small round-robin cohort, judged by two consistent raters, run through
/// the entire pipeline: canonicalisation, connectivity, fit, calibration,
/// reliability, rater diagnostics, and scheduling the next round.
#[test]
fn full_pipeline_on_a_connected_round_robin_cohort() {
    let texts: Vec<Text> = (1..=5).map(text).collect();
    let ids: Vec<u64> = texts.iter().map(|t| t.id).collect();

    let mut raw = Vec::new();
    let mut id = 0u64;
    for round in 0..3i64 {
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                // Higher id consistently beats lower id: a clean, strict order.
                raw.push(verdict(id, ids[j], ids[i], Outcome::AWins, "r1", round * 100 + id as i64));
                id += 1;
            }
        }
    }

    let effective = effective_verdicts(&texts, &raw);
    assert_eq!(effective.len(), raw.len(), "no rater duplicates to collapse here");

    let connectivity = is_connected(&texts, &effective);
    assert!(connectivity.is_connected);

    let fit = fit_bradley_terry(
        &texts,
        &effective,
        &BradleyTerryParams::default(),
        &GradingConfig::default(),
        &Cancellation::never(),
    )
    .unwrap();
    assert_eq!(fit.rows.len(), 5);

    let rank_of = |tid: u64| fit.rows.iter().find(|r| r.text_id == tid).unwrap().rank;
    // Strict consistent order should fully recover the induced ranking.
    assert_eq!(rank_of(5), 1);
    assert_eq!(rank_of(4), 2);
    assert_eq!(rank_of(3), 3);
    assert_eq!(rank_of(2), 4);
    assert_eq!(rank_of(1), 5);

    let anchors = vec![
        Anchor {
            text_id: 5,
            grade: 9.5,
        },
        Anchor {
            text_id: 1,
            grade: 3.0,
        },
    ];
    let calibrated = calibrate_grades(&fit.rows, &anchors, &GradingConfig::default()).unwrap();
    let g5 = calibrated.iter().find(|r| r.text_id == 5).unwrap().grade;
    let g1 = calibrated.iter().find(|r| r.text_id == 1).unwrap().grade;
    assert!(g5 > g1);

    let split_half = split_half_reliability(&texts, &effective, 12, 7, &Cancellation::never()).unwrap();

    let reliability = assess_reliability(
        &fit.rows,
        &texts,
        &effective,
        None,
        DEFAULT_SE_THRESHOLD,
        split_half.as_ref(),
    );
    assert!(reliability.cohort.median_se.is_finite());
    if let Some(ref sh) = split_half {
        assert!((0.0..=1.0).contains(&sh.coefficient));
    }

    let diagnostics = analyse_raters(&fit.rows, &effective);
    assert_eq!(diagnostics.unique_raters, 1);
    assert!((diagnostics.rater_stats[0].model_agreement - 1.0).abs() < 1e-9);

    let scheduler_opts = SchedulerOptions {
        target_per_text: 5,
        batch_size: Some(10),
        ..SchedulerOptions::default()
    };
    let next_batch = schedule_next_batch(
        &texts,
        &effective,
        Some(&fit.rows),
        &scheduler_opts,
        &Cancellation::never(),
    )
    .unwrap();
    assert!(!next_batch.is_empty());
}

/// A disconnected cohort (two isolated pairs, no comparisons across them)
/// should report disconnection and the scheduler should bridge it.
#[test]
fn disconnected_cohort_is_detected_and_bridged() {
    let texts = vec![text(1), text(2), text(3), text(4)];
    let verdicts = vec![
        verdict(1, 1, 2, Outcome::AWins, "r1", 1),
        verdict(2, 3, 4, Outcome::AWins, "r1", 2),
    ];
    let effective = effective_verdicts(&texts, &verdicts);
    let connectivity = is_connected(&texts, &effective);
    assert!(!connectivity.is_connected);
    assert_eq!(connectivity.components, 2);

    let scheduler_opts = SchedulerOptions {
        target_per_text: 5,
        batch_size: Some(10),
        ..SchedulerOptions::default()
    };
    let batch =
        schedule_next_batch(&texts, &effective, None, &scheduler_opts, &Cancellation::never()).unwrap();
    assert!(!batch.is_empty());
}

/// Moderator overrides collapse a pair's conflicting raw verdicts into one
/// effective verdict, which then flows cleanly through the fit.
#[test]
fn moderator_override_flows_through_to_a_clean_fit() {
    let texts = vec![text(1), text(2)];
    let mut moderated = verdict(3, 1, 2, Outcome::BWins, "moderator", 10);
    moderated.is_final = true;
    let verdicts = vec![
        verdict(1, 1, 2, Outcome::AWins, "r1", 1),
        verdict(2, 1, 2, Outcome::AWins, "r2", 2),
        moderated,
    ];
    let effective = effective_verdicts(&texts, &verdicts);
    assert_eq!(effective.len(), 1);
    assert!(effective[0].is_final);

    let fit = fit_bradley_terry(
        &texts,
        &effective,
        &BradleyTerryParams::default(),
        &GradingConfig::default(),
        &Cancellation::never(),
    )
    .unwrap();
    let row2 = fit.rows.iter().find(|r| r.text_id == 2).unwrap();
    assert_eq!(row2.rank, 1);
}

/// More evidence should never increase standard error for a text that
/// keeps winning decisively (a monotonicity property, not just a point
/// check).
#[test]
fn more_decisive_evidence_does_not_increase_standard_error() {
    let texts = vec![text(1), text(2)];
    let ids = [1u64, 2u64];
    let params = BradleyTerryParams::default();
    let grading = GradingConfig::default();

    let few: Vec<Verdict> = (0..2)
        .map(|i| verdict(i, ids[0], ids[1], Outcome::AWins, "r1", i as i64))
        .collect();
    let many: Vec<Verdict> = (0..20)
        .map(|i| verdict(i, ids[0], ids[1], Outcome::AWins, "r1", i as i64))
        .collect();

    let fit_few = fit_bradley_terry(&texts, &few, &params, &grading, &Cancellation::never()).unwrap();
    let fit_many = fit_bradley_terry(&texts, &many, &params, &grading, &Cancellation::never()).unwrap();

    let se_few = fit_few.rows.iter().find(|r| r.text_id == 1).unwrap().se;
    let se_many = fit_many.rows.iter().find(|r| r.text_id == 1).unwrap().se;
    assert!(se_many <= se_few, "se_few={se_few} se_many={se_many}");
}

/// The scheduler should never hand back a pair that repeats a text within
/// the same batch, across a range of cohort sizes.
#[test]
fn scheduler_batches_never_repeat_a_text_across_sizes() {
    for n in [2u64, 3, 5, 9, 16] {
        let texts: Vec<Text> = (1..=n).map(text).collect();
        let scheduler_opts = SchedulerOptions {
            target_per_text: 3,
            batch_size: Some(50),
            ..SchedulerOptions::default()
        };
        let batch =
            schedule_next_batch(&texts, &[], None, &scheduler_opts, &Cancellation::never()).unwrap();
        let mut seen = std::collections::HashSet::new();
        for pair in &batch {
            assert!(seen.insert(pair.text_a), "n={n}: {} repeated", pair.text_a);
            assert!(seen.insert(pair.text_b), "n={n}: {} repeated", pair.text_b);
        }
    }
}

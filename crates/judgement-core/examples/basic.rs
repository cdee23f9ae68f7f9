//! Runs the full pipeline over a small synthetic cohort with a `tracing`
//! subscriber installed, so the Newton convergence and fallback-ladder logs
//! from `fit`/`scheduler` are visible on stderr.
//!
//! Run with `cargo run -p judgement-core --example basic`.

use judgement_core::{
    analyse_raters, assess_reliability, effective_verdicts, fit_bradley_terry, is_connected,
    schedule_next_batch, BradleyTerryParams, Cancellation, SchedulerOptions, DEFAULT_SE_THRESHOLD,
};
use judgement_types::{GradingConfig, Outcome, Text, Verdict};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let texts: Vec<Text> = (1..=6)
        .map(|id| Text {
            id,
            assignment_id: 1,
            anonymized_name: format!("essay-{id}"),
            content: None,
            content_html: None,
            original_filename: None,
            created_at: 0,
        })
        .collect();

    let mut raw = Vec::new();
    let mut next_id = 0u64;
    for i in 1..=6u64 {
        for j in (i + 1)..=6u64 {
            raw.push(Verdict {
                id: next_id,
                assignment_id: 1,
                text_a_id: j,
                text_b_id: i,
                outcome: Outcome::AWins,
                created_at: next_id as i64,
                rater_id: Some("r1".to_string()),
                rater_name: None,
                comment_a: None,
                comment_b: None,
                supersedes_id: None,
                is_final: false,
                pair_key: None,
            });
            next_id += 1;
        }
    }

    let effective = effective_verdicts(&texts, &raw);
    let connectivity = is_connected(&texts, &effective);
    println!("connected: {}", connectivity.is_connected);

    let fit = fit_bradley_terry(
        &texts,
        &effective,
        &BradleyTerryParams::default(),
        &GradingConfig::default(),
        &Cancellation::never(),
    )
    .expect("fit does not fail outside cancellation");

    for row in &fit.rows {
        println!(
            "text {:>2}: rank {:>2} theta {:>+6.3} se {:>5.3} grade {:>4.1}",
            row.text_id, row.rank, row.theta, row.se, row.grade_raw
        );
    }

    let reliability = assess_reliability(
        &fit.rows,
        &texts,
        &effective,
        None,
        DEFAULT_SE_THRESHOLD,
        None,
    );
    println!("cohort reliability: {:?}", reliability.cohort.verdict);

    let diagnostics = analyse_raters(&fit.rows, &effective);
    println!("raters observed: {}", diagnostics.unique_raters);

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
    .expect("scheduling does not fail outside cancellation");
    println!("next batch has {} pairs", next_batch.len());
}

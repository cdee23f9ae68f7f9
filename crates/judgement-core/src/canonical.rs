//! C1: verdict canonicalisation (spec §4.1).
//!
//! Turns a raw verdict history into the *effective* subset every other
//! component treats as ground truth: malformed references dropped,
//! superseded verdicts removed, moderator overrides collapsed to one
//! survivor per pair, and otherwise one survivor per `(pair, rater)`.

use std::collections::HashSet;

use indexmap::IndexMap;
use judgement_types::{Text, Verdict};

/// Reduce `verdicts` to the effective subset used by every downstream
/// component. Never fails; an empty or fully-invalid input yields an empty
/// output.
#[must_use]
pub fn effective_verdicts(texts: &[Text], verdicts: &[Verdict]) -> Vec<Verdict> {
    let known_ids: HashSet<_> = texts.iter().map(|t| t.id).collect();

    let valid: Vec<&Verdict> = verdicts
        .iter()
        .filter(|v| {
            v.text_a_id != v.text_b_id
                && known_ids.contains(&v.text_a_id)
                && known_ids.contains(&v.text_b_id)
        })
        .collect();

    let mut groups: IndexMap<String, Vec<&Verdict>> = IndexMap::new();
    for v in valid {
        groups.entry(v.canonical_pair_key()).or_default().push(v);
    }

    let mut out = Vec::new();
    for (_key, group) in groups {
        let superseded: HashSet<u64> = group.iter().filter_map(|v| v.supersedes_id).collect();
        let remaining: Vec<&Verdict> = group
            .into_iter()
            .filter(|v| !superseded.contains(&v.id))
            .collect();

        let finals: Vec<&Verdict> = remaining.iter().copied().filter(|v| v.is_final).collect();
        if !finals.is_empty() {
            if let Some(winner) = latest(&finals) {
                out.push(winner.clone());
            }
            continue;
        }

        let mut by_rater: IndexMap<String, Vec<&Verdict>> = IndexMap::new();
        for v in remaining {
            by_rater.entry(v.rater_key().to_string()).or_default().push(v);
        }
        for bucket in by_rater.into_values() {
            if let Some(winner) = latest(&bucket) {
                out.push(winner.clone());
            }
        }
    }

    out
}

/// Latest verdict by `(created_at, id)`, both ascending, so the last in
/// sort order is "latest timestamp, ties broken by larger id".
fn latest<'a>(verdicts: &[&'a Verdict]) -> Option<&'a Verdict> {
    verdicts
        .iter()
        .copied()
        .max_by_key(|v| (v.created_at, v.id))
}

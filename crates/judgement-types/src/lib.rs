//! Data model for the comparative-judgement analytics engine.
//!
//! This crate carries only types: texts, verdicts, anchors, grading
//! configuration, and the result records produced by `judgement-core`. It
//! has no analytic logic of its own, the same split `depyler-hir` draws
//! against `depyler-analyzer` in the wider workspace this crate is part of.

#![deny(rust_2018_idioms)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};

/// Unique identifier for a [`Text`] within an assignment.
pub type TextId = u64;

/// Unique identifier for a [`Verdict`].
pub type VerdictId = u64;

/// Monotonic timestamp, milliseconds since epoch (or any monotonic clock).
pub type Timestamp = i64;

/// A student text submitted for comparative judgement.
///
/// Immutable from the core's perspective: created and owned by the boundary
/// (UI/storage), the core only ever borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// Identity, unique within an assignment.
    pub id: TextId,
    /// Assignment this text belongs to.
    pub assignment_id: u64,
    /// Display name shown to raters (anonymized in the boundary's UI).
    pub anonymized_name: String,
    /// Plain-text body, if supplied.
    pub content: Option<String>,
    /// Rendered HTML body, if supplied.
    pub content_html: Option<String>,
    /// Original filename at import time, if any.
    pub original_filename: Option<String>,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

/// Outcome of a pairwise judgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Text A was judged better.
    AWins,
    /// Text B was judged better.
    BWins,
    /// The rater judged the two texts equal.
    Tie,
}

/// A single pairwise judgement between two texts.
///
/// See spec §3 for the canonical-pair-key and `final`-override invariants;
/// enforcing them is [`judgement_core::canonical::effective_verdicts`]'s job,
/// not this type's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Unique verdict id.
    pub id: VerdictId,
    /// Assignment this verdict belongs to.
    pub assignment_id: u64,
    /// First text in the ordered pair.
    pub text_a_id: TextId,
    /// Second text in the ordered pair.
    pub text_b_id: TextId,
    /// Which side won, or a tie.
    pub outcome: Outcome,
    /// Monotonic creation timestamp, used to resolve revisions.
    pub created_at: Timestamp,
    /// Rater who cast this verdict; `None` is treated as the token `unknown`.
    pub rater_id: Option<String>,
    /// Display name of the rater, if known.
    pub rater_name: Option<String>,
    /// Free-text comment on the A side.
    pub comment_a: Option<String>,
    /// Free-text comment on the B side.
    pub comment_b: Option<String>,
    /// Id of a prior verdict this one supersedes, if any.
    pub supersedes_id: Option<VerdictId>,
    /// True when this verdict is a moderator override for the pair.
    pub is_final: bool,
    /// Canonical pair key (`"min-max"` of the two text ids). Computed by
    /// [`Verdict::pair_key`] when not explicitly supplied.
    pub pair_key: Option<String>,
}

impl Verdict {
    /// The canonical pair key `"min-max"` of the two text ids, computing it
    /// from `text_a_id`/`text_b_id` when [`Verdict::pair_key`] was not set.
    #[must_use]
    pub fn canonical_pair_key(&self) -> String {
        self.pair_key.clone().unwrap_or_else(|| {
            let lo = self.text_a_id.min(self.text_b_id);
            let hi = self.text_a_id.max(self.text_b_id);
            format!("{lo}-{hi}")
        })
    }

    /// Rater id with the missing case normalized to the token `unknown`.
    #[must_use]
    pub fn rater_key(&self) -> &str {
        self.rater_id.as_deref().unwrap_or("unknown")
    }
}

/// An externally supplied target grade for a specific text, used to
/// recalibrate the raw Bradley-Terry scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// The anchored text.
    pub text_id: TextId,
    /// Target grade for that text.
    pub grade: f64,
}

/// Grading scale configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Base grade `g0`.
    pub base: f64,
    /// Scale `s`.
    pub scale: f64,
    /// Inclusive lower bound.
    pub min: f64,
    /// Inclusive upper bound.
    pub max: f64,
    /// Rounding step `r`.
    pub rounding: f64,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            base: 7.0,
            scale: 1.2,
            min: 1.0,
            max: 10.0,
            rounding: 0.1,
        }
    }
}

/// How repeated verdicts on the same pair are to be treated by the boundary
/// before handing data to the core (the core itself is agnostic: C1 always
/// applies the same canonicalisation rules regardless of mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JudgementMode {
    /// New verdicts accumulate alongside prior ones.
    Accumulate,
    /// New verdicts replace prior ones from the same rater.
    Replace,
    /// A moderator's `final` verdict overrides the pair.
    Moderate,
}

/// Assignment-level metadata threaded through every analytic call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentMeta {
    /// Assignment id.
    pub assignment_id: u64,
    /// Judgement collection mode.
    pub judgement_mode: JudgementMode,
    /// Anchors supplied for this assignment.
    pub anchors: Vec<Anchor>,
    /// Grading configuration.
    pub grading: GradingConfig,
    /// SE threshold below which a text is considered "repeat-worthy" (used
    /// by boundary-side re-judgement prompts; the core's own SE thresholds
    /// are fixed constants, see spec §4.3).
    pub se_repeat_threshold: f64,
}

/// Qualitative percentile label assigned by C3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualitativeLabel {
    /// Within the top percentile (`topPct`, default 0.10).
    Top,
    /// Better than the median but outside the top percentile.
    AboveAverage,
    /// Within the middle band (up to the 90th percentile).
    Average,
    /// Below the 90th percentile.
    BelowAverage,
}

/// Rasch-style fit label derived from a text's infit mean-square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitLabel {
    /// Infit within `[0.7, 1.3]`.
    GoodFit,
    /// Infit outside `[0.7, 1.3]`.
    Misfit,
}

/// Three-way reliability verdict, used both per-text (SE-based) and at the
/// cohort level (spec §4.3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReliabilityLabel {
    /// SE at or below the reliable threshold.
    Reliable,
    /// SE between the reliable and repeat thresholds.
    Almost,
    /// SE above the repeat threshold.
    Insufficient,
}

/// One row of the ranked scoring table, per text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    /// The scored text.
    pub text_id: TextId,
    /// Centered ability estimate.
    pub theta: f64,
    /// Standard error of `theta` (may be `f64::INFINITY`).
    pub se: f64,
    /// 1-based rank, 1 = best.
    pub rank: usize,
    /// Qualitative percentile label.
    pub label: QualitativeLabel,
    /// Raw grade derived from `theta` alone (no anchor calibration).
    pub grade_raw: f64,
    /// Infit mean-square, when computable (needs positive exposure).
    pub infit: Option<f64>,
    /// Fit label derived from `infit`.
    pub infit_label: Option<FitLabel>,
    /// Number of effective verdicts referencing this text.
    pub verdict_count: usize,
    /// Per-row reliability label derived from `se`.
    pub reliability: ReliabilityLabel,
}

/// Cohort-level reliability summary (spec §3 "Derived CohortVerdict").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CohortScore {
    /// Overall cohort verdict.
    pub verdict: ReliabilityLabel,
    /// Median SE across all rows (ignoring non-finite values).
    pub median_se: f64,
    /// Maximum SE across all rows (ignoring non-finite values).
    pub max_se: f64,
    /// Split-half reliability coefficient, when available.
    pub split_half: Option<f64>,
}

/// Output of `fit_bradley_terry` (C3): the ranked table plus a basic cohort
/// verdict (spec §4.5's first rule only; the fuller robust assessment is
/// `assess_reliability`, C5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOutput {
    /// One row per text, sorted by rank.
    pub rows: Vec<ScoreRow>,
    /// Basic cohort verdict computed alongside the fit.
    pub cohort: CohortScore,
}

/// Anchor-calibrated grade for a single text (C4 output).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibratedRow {
    /// The calibrated text.
    pub text_id: TextId,
    /// Calibrated grade, clamped into `[grading.min, grading.max]`.
    pub grade: f64,
}

/// Full reliability report (C5): the basic cohort verdict plus the robust
/// assessment's three additional checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityReport {
    /// Basic cohort verdict (spec §4.5 first rule).
    pub cohort: CohortScore,
    /// Whether the middle-80%-by-theta core subset meets the SE bar.
    pub core_subset_reliable: bool,
    /// Whether extreme (top/bottom 10%) texts have sufficient ladder
    /// evidence against near-theta neighbours.
    pub ladder_evidence_ok: bool,
    /// Kendall's tau convergence check against a previous fit, when one was
    /// supplied. `None` when no previous fit was given.
    pub convergence_ok: Option<bool>,
    /// True only when the cohort verdict is `Reliable` and all three robust
    /// checks above hold (a missing `convergence_ok` counts as satisfied).
    pub overall_reliable: bool,
}

/// A single rater's identifier and display name, paired with their verdicts.
pub type RaterKey = String;

/// Per-rater diagnostic statistics (C6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaterStats {
    /// Rater id (`"unknown"` when the verdict had none).
    pub rater_id: RaterKey,
    /// Number of verdicts cast by this rater.
    pub count: usize,
    /// Fraction of verdicts that were ties.
    pub tie_rate: f64,
    /// Fraction of decisive verdicts agreeing with the model's winner.
    pub model_agreement: f64,
    /// Infit mean-square, computed only when `count >= 10`.
    pub infit: Option<f64>,
    /// Qualitative label derived from `infit`.
    pub infit_label: Option<RaterFitLabel>,
}

/// Rater-level fit label (distinct thresholds from the per-text [`FitLabel`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaterFitLabel {
    /// Infit `<= 1.2`.
    Consistent,
    /// Infit in `(1.2, 1.5]`.
    Inconsistent,
    /// Infit `> 1.5`.
    Careless,
}

/// Which side of a pair a rater chose (ties are excluded from disagreement
/// reporting by construction, see spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
    /// The rater preferred text A.
    A,
    /// The rater preferred text B.
    B,
}

/// A single rater's vote on a disagreement pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaterVote {
    /// The voting rater.
    pub rater_id: RaterKey,
    /// Which side they picked.
    pub choice: Choice,
}

/// A pair with conflicting decisive verdicts from at least two raters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisagreementPair {
    /// First text of the pair.
    pub text_a_id: TextId,
    /// Second text of the pair.
    pub text_b_id: TextId,
    /// Every decisive vote cast on this pair.
    pub votes: Vec<RaterVote>,
    /// `min(#A-wins, #B-wins)` across `votes`.
    pub disagreement_count: usize,
}

/// Output of `analyse_raters` (C6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaterDiagnostics {
    /// Per-rater statistics, sorted by `count` descending.
    pub rater_stats: Vec<RaterStats>,
    /// Disagreement pairs, sorted by `disagreement_count` descending.
    pub disagreements: Vec<DisagreementPair>,
    /// Number of distinct raters observed.
    pub unique_raters: usize,
}

/// Output of `split_half_reliability` (C7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitHalfResult {
    /// Spearman-Brown corrected coefficient, clamped into `[0, 1]`.
    pub coefficient: f64,
    /// Each split's raw Spearman correlation before averaging.
    pub raw_correlations: Vec<f64>,
    /// Number of Monte-Carlo splits performed.
    pub num_splits: usize,
}

/// A pair of texts selected by the scheduler (C8) to present next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    /// First text, as oriented by the scheduler's coin flip.
    pub text_a: TextId,
    /// Second text, as oriented by the scheduler's coin flip.
    pub text_b: TextId,
}

/// Connectivity report (C2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connectivity {
    /// True when the comparison graph has at most one component (and there
    /// is at least one text).
    pub is_connected: bool,
    /// Number of connected components.
    pub components: usize,
    /// Component index per text, same order as the input `texts` slice.
    pub component_of: Vec<usize>,
}

//! Comparative-judgement analytics engine.
//!
//! A pure library: no I/O, no persistence, no network access. Callers own
//! the data (texts, verdicts, anchors) and call the nine public operations
//! below in whatever order their application needs. Every operation is
//! deterministic given the same inputs, `lambda`/`seed` parameters, and
//! configuration.
//!
//! The pipeline a typical caller runs:
//!
//! 1. [`canonical::effective_verdicts`] (C1) to collapse raw verdict
//!    history into the subset every other component treats as truth.
//! 2. [`graph::is_connected`] (C2) to check the comparison graph has
//!    enough structure for a stable fit.
//! 3. [`fit::fit_bradley_terry`] (C3) for the ranked scoring table.
//! 4. [`grading::calibrate_grades`] (C4) if anchors are available.
//! 5. [`reliability::assess_reliability`] (C5) for the robust cohort
//!    verdict, optionally combined with [`split_half::split_half_reliability`]
//!    (C7).
//! 6. [`raters::analyse_raters`] (C6) for rater-level diagnostics.
//! 7. [`scheduler::schedule_next_batch`] (C8) to pick what to judge next.

#![deny(rust_2018_idioms)]
#![warn(missing_docs)]

pub mod canonical;
pub mod cancel;
pub mod error;
pub mod fit;
pub mod grading;
pub mod graph;
pub mod numerics;
pub mod raters;
pub mod reliability;
pub mod scheduler;
pub mod split_half;

pub use cancel::Cancellation;
pub use error::EngineError;

pub use canonical::effective_verdicts;
pub use fit::{fit_bradley_terry, BradleyTerryParams};
pub use grading::calibrate_grades;
pub use graph::is_connected;
pub use raters::analyse_raters;
pub use reliability::{assess_reliability, DEFAULT_SE_THRESHOLD};
pub use scheduler::{schedule_next_batch, SchedulerOptions};
pub use split_half::split_half_reliability;

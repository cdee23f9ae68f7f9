//! C4: anchor-based grade calibration (spec §4.4).
//!
//! Recalibrates the raw Bradley-Terry scale against externally supplied
//! anchor grades: 0 usable anchors means "no calibration" (callers fall
//! back to each row's own `grade_raw`), 1 anchor applies a pure additive
//! offset scaled by theta's dispersion, and `>= 2` anchors fit an ordinary
//! least-squares line of `grade` on `theta`.

use judgement_types::{Anchor, CalibratedRow, GradingConfig, ScoreRow};

use crate::numerics::{clamp, population_sd};

/// Calibrate every row in `rows` against `anchors`, producing one
/// [`CalibratedRow`] per input row in the same order.
///
/// Returns `None` when no anchor names a text present in `rows` (spec
/// §4.4/§6: zero usable anchors is "no calibration", not an empty or
/// degenerate calibration — callers are expected to fall back to each
/// row's `grade_raw` in that case).
#[must_use]
pub fn calibrate_grades(
    rows: &[ScoreRow],
    anchors: &[Anchor],
    grading: &GradingConfig,
) -> Option<Vec<CalibratedRow>> {
    let theta_of: std::collections::HashMap<u64, f64> =
        rows.iter().map(|r| (r.text_id, r.theta)).collect();

    let usable: Vec<(f64, f64)> = anchors
        .iter()
        .filter_map(|a| theta_of.get(&a.text_id).map(|&theta| (theta, a.grade)))
        .collect();

    if usable.is_empty() {
        return None;
    }

    let transform: Box<dyn Fn(f64) -> f64> = if usable.len() == 1 {
        let sigma_theta = population_sd(&rows.iter().map(|r| r.theta).collect::<Vec<_>>());
        let slope = if sigma_theta > 1e-12 {
            grading.scale / sigma_theta
        } else {
            0.0
        };
        let (theta0, grade0) = usable[0];
        let offset = grade0 - slope * theta0;
        Box::new(move |theta: f64| slope * theta + offset)
    } else {
        let (slope, intercept) = ols_fit(&usable);
        Box::new(move |theta: f64| intercept + slope * theta)
    };

    Some(
        rows.iter()
            .map(|r| CalibratedRow {
                text_id: r.text_id,
                grade: clamp(
                    crate::numerics::round_to_step(transform(r.theta), grading.rounding),
                    grading.min,
                    grading.max,
                ),
            })
            .collect(),
    )
}

/// Ordinary least squares fit of `y` on `x` over `(x, y)` pairs, returning
/// `(slope, intercept)`. Falls back to a flat line at the mean `y` when `x`
/// has zero variance (every anchor landed on the same theta).
fn ols_fit(points: &[(f64, f64)]) -> (f64, f64) {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov_xy = 0.0;
    let mut var_x = 0.0;
    for &(x, y) in points {
        cov_xy += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
    }

    if var_x <= 1e-12 {
        return (0.0, mean_y);
    }

    let slope = cov_xy / var_x;
    let intercept = mean_y - slope * mean_x;
    (slope, intercept)
}

//! Shared numeric primitives used by more than one component (spec §4.9).
//!
//! Nothing here is a public operation in its own right; it is not named in
//! spec §6 and exists only so C3/C4/C5/C6/C7 don't each reimplement the
//! logistic function, percentile math, or the seeded PRNG.

/// The logistic function `sigma(x) = 1 / (1 + e^-x)`.
#[must_use]
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Population standard deviation (divides by `n`, not `n - 1`): the texts
/// scored in one analytic call are the whole cohort, not a sample drawn
/// from a larger population.
#[must_use]
pub fn population_sd(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Round `x` to the nearest multiple of `step` (e.g. `step = 0.1`).
#[must_use]
pub fn round_to_step(x: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return x;
    }
    (x / step).round() * step
}

/// Clamp `x` into `[lo, hi]`.
#[must_use]
pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    x.max(lo).min(hi)
}

/// Median of a slice of `f64`. Returns `0.0` for an empty slice.
#[must_use]
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Kendall's tau rank correlation between two rankings of the same `n`
/// items, given as parallel slices of ranks (lower = better, as produced by
/// C3). `O(n^2)`, which is acceptable at the scale this engine targets.
#[must_use]
pub fn kendall_tau(ranks_a: &[usize], ranks_b: &[usize]) -> f64 {
    let n = ranks_a.len();
    if n < 2 || ranks_b.len() != n {
        return 1.0;
    }
    let mut concordant = 0i64;
    let mut discordant = 0i64;
    for i in 0..n {
        for j in (i + 1)..n {
            let a = (ranks_a[i] as i64) - (ranks_a[j] as i64);
            let b = (ranks_b[i] as i64) - (ranks_b[j] as i64);
            let sign = a * b;
            if sign > 0 {
                concordant += 1;
            } else if sign < 0 {
                discordant += 1;
            }
        }
    }
    let total = (n * (n - 1) / 2) as f64;
    if total <= 0.0 {
        1.0
    } else {
        f64::from((concordant - discordant) as i32) / total
    }
}

/// Spearman rank correlation from two parallel rank vectors (spec's
/// `rho = 1 - 6*sum(d^2) / (n*(n^2-1))`). Requires `n >= 3`.
#[must_use]
pub fn spearman_rho(ranks_a: &[usize], ranks_b: &[usize]) -> Option<f64> {
    let n = ranks_a.len();
    if n < 3 || ranks_b.len() != n {
        return None;
    }
    let d2_sum: f64 = ranks_a
        .iter()
        .zip(ranks_b.iter())
        .map(|(a, b)| {
            let d = *a as f64 - *b as f64;
            d * d
        })
        .sum();
    let n_f = n as f64;
    Some(1.0 - (6.0 * d2_sum) / (n_f * (n_f * n_f - 1.0)))
}

/// The `xorshift32` PRNG recurrence, seeded explicitly so results are
/// reproducible for identical `(seed, split_index)` inputs (spec §4.7).
#[derive(Debug, Clone)]
pub struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    /// Seed the generator. A zero seed is remapped to a fixed nonzero value
    /// since xorshift has a fixed point at zero.
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    /// Next raw `u32`.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Next `f64` in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / f64::from(u32::MAX)
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        if items.len() < 2 {
            return;
        }
        for i in (1..items.len()).rev() {
            let j = (self.next_u32() as usize) % (i + 1);
            items.swap(i, j);
        }
    }
}

/// A small deterministic hash used for the scheduler's tie-breaking jitter
/// and coin flips (spec §4.8). Not a cryptographic hash, just a cheap
/// splitmix-style mix so identical `(i, j)` always produce the same jitter.
#[must_use]
pub fn deterministic_jitter(i: usize, j: usize) -> f64 {
    let mut z = (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ (j as u64).wrapping_add(1);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z as f64 / u64::MAX as f64) * 0.01
}

/// A deterministic coin flip for the same `(i, j)` pair, independent of the
/// jitter above (different mixing constants).
#[must_use]
pub fn deterministic_coin(i: usize, j: usize) -> bool {
    let mut z = (i as u64).wrapping_add(1).wrapping_mul(0xD689_5B66_2936_6935)
        ^ (j as u64).wrapping_mul(0xA24B_AED4_963E_E407);
    z ^= z >> 33;
    z.wrapping_mul(0xFF51_AFD7_ED55_8CCD) & 1 == 1
}

//! The PSNR metric: mean squared error over a frame pair and its
//! logarithmic dB form, plus the running totals a stream comparison folds
//! per-frame results into.

use image::RgbImage;

/// PSNR of a single frame pair: a finite value in dB, or infinite when the
/// frames are bit-identical (zero error).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Psnr {
    Finite(f64),
    Infinite,
}

impl Psnr {
    /// The value in dB, with `Infinite` mapped to `f64::INFINITY` (which
    /// formats as `inf`).
    pub fn as_db(self) -> f64 {
        match self {
            Psnr::Finite(db) => db,
            Psnr::Infinite => f64::INFINITY,
        }
    }
}

/// Highest representable sample value for an integer bit depth.
fn peak_value(bit_depth: u32) -> f64 {
    assert!(
        (1..=32).contains(&bit_depth),
        "unsupported bit depth: {bit_depth}"
    );
    ((1u64 << bit_depth) - 1) as f64
}

/// Mean squared error over every sample of the two frames, all positions
/// and all channels pooled into a single scalar. Samples are promoted to
/// f64 before differencing.
///
/// Identical dimensions are the caller's contract, validated once per
/// stream pair before iteration starts.
pub fn mean_squared_error(reference: &RgbImage, candidate: &RgbImage) -> f64 {
    assert_eq!(
        reference.dimensions(),
        candidate.dimensions(),
        "frame dimensions must match"
    );

    let sum_sq: f64 = reference
        .as_raw()
        .iter()
        .zip(candidate.as_raw())
        .map(|(&r, &c)| {
            let d = f64::from(r) - f64::from(c);
            d * d
        })
        .sum();

    sum_sq / reference.as_raw().len() as f64
}

/// Derive PSNR from an MSE at the given sample bit depth, as
/// `20 * log10(peak / sqrt(mse))`. An MSE of exactly zero means the frames
/// are identical and maps to [`Psnr::Infinite`].
pub fn psnr_from_mse(mse: f64, bit_depth: u32) -> Psnr {
    if mse == 0.0 {
        return Psnr::Infinite;
    }
    Psnr::Finite(20.0 * (peak_value(bit_depth) / mse.sqrt()).log10())
}

/// PSNR between two decoded 8-bit RGB frames. Pure and deterministic;
/// cannot fail on same-shaped input.
pub fn compute_psnr(reference: &RgbImage, candidate: &RgbImage) -> Psnr {
    psnr_from_mse(mean_squared_error(reference, candidate), 8)
}

/// How the stream-level mean treats identical (infinite-PSNR) pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AverageMode {
    /// Divide the finite sum by every processed pair. Identical pairs
    /// contribute nothing to the sum and pull the mean toward zero.
    #[default]
    AllProcessed,
    /// Divide the finite sum by the finite count only. All-identical input
    /// yields an infinite mean.
    FiniteOnly,
}

/// Running totals across a stream comparison.
///
/// Finite values add to the sum; infinite values count as processed but
/// contribute nothing to it. `merge` combines two accumulators, so the
/// totals are independent of accumulation order (modulo float summation
/// order).
#[derive(Debug, Clone, Copy, Default)]
pub struct PsnrAccumulator {
    sum_finite: f64,
    finite: u64,
    processed: u64,
}

impl PsnrAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one frame-pair result into the totals.
    pub fn record(&mut self, value: Psnr) {
        self.processed += 1;
        if let Psnr::Finite(db) = value {
            self.sum_finite += db;
            self.finite += 1;
        }
    }

    /// Combine the totals of two accumulators. Commutative and associative,
    /// so partial accumulators can be reduced in any order.
    pub fn merge(&mut self, other: &PsnrAccumulator) {
        self.sum_finite += other.sum_finite;
        self.finite += other.finite;
        self.processed += other.processed;
    }

    pub fn frames_processed(&self) -> u64 {
        self.processed
    }

    pub fn finite_frames(&self) -> u64 {
        self.finite
    }

    /// Mean PSNR under the given averaging policy, or `None` when nothing
    /// was processed.
    pub fn average(&self, mode: AverageMode) -> Option<f64> {
        if self.processed == 0 {
            return None;
        }
        let value = match mode {
            AverageMode::AllProcessed => self.sum_finite / self.processed as f64,
            AverageMode::FiniteOnly => {
                if self.finite == 0 {
                    f64::INFINITY
                } else {
                    self.sum_finite / self.finite as f64
                }
            }
        };
        Some(value)
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::CompareError;
use crate::psnr::{self, AverageMode, Psnr, PsnrAccumulator};
use crate::video::frame::Frame;
use crate::video::FrameSource;

/// Parameters for a stream comparison.
#[derive(Debug, Clone, Default)]
pub struct CompareConfig {
    /// Averaging policy for the final report.
    pub average_mode: AverageMode,
    /// Cooperative cancellation flag, checked between frame pairs. A run
    /// cancelled mid-stream finalizes over the pairs already scored.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Non-fatal conditions recorded in the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// The containers declare different frame counts. The comparison still
    /// runs and stops when either stream actually ends.
    LengthMismatch {
        reference_frames: u64,
        candidate_frames: u64,
    },
}

/// One scored frame pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsnrSample {
    /// 1-based ordinal of the pair within the run.
    pub index: u64,
    /// Smaller of the two declared frame counts. Advisory; 0 when neither
    /// container reports a count.
    pub expected_total: u64,
    pub value: Psnr,
}

/// Progress notifications delivered to the observer while a run executes.
/// Per-frame values are observable effects only; they are not retained in
/// the final report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// Declared frame counts differ. Emitted once, before any frame event.
    LengthMismatch {
        reference_frames: u64,
        candidate_frames: u64,
    },
    /// A frame pair has been pulled and scored.
    Frame(PsnrSample),
}

/// Final result of a comparison run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Mean PSNR in dB under the configured [`AverageMode`].
    pub average_psnr: f64,
    /// Frame pairs read and scored before either stream ended.
    pub frames_processed: u64,
    /// Scored pairs with a finite PSNR (non-identical frames).
    pub finite_frames: u64,
    pub advisories: Vec<Advisory>,
}

/// Compare two frame streams pair by pair and report per-frame and average
/// PSNR.
///
/// Dimensions are validated once up front and a mismatch is fatal before
/// any frame is read. Differing declared frame counts are advisory; the
/// loop is governed by actual stream exhaustion, and a read error on either
/// side ends it exactly like an end of stream.
pub fn run_comparison<R, C>(
    reference: &mut R,
    candidate: &mut C,
    config: &CompareConfig,
    mut observer: impl FnMut(Progress),
) -> Result<Report, CompareError>
where
    R: FrameSource,
    C: FrameSource,
{
    let (reference_width, reference_height) = reference.dimensions();
    let (candidate_width, candidate_height) = candidate.dimensions();
    if (reference_width, reference_height) != (candidate_width, candidate_height) {
        warn!(
            reference_width,
            reference_height,
            candidate_width,
            candidate_height,
            "dimension mismatch, aborting before any frame is read"
        );
        return Err(CompareError::DimensionMismatch {
            reference_width,
            reference_height,
            candidate_width,
            candidate_height,
        });
    }

    let reference_frames = reference.declared_frame_count();
    let candidate_frames = candidate.declared_frame_count();
    let expected_total = reference_frames.min(candidate_frames);

    let mut advisories = Vec::new();
    if reference_frames != candidate_frames {
        warn!(
            reference_frames,
            candidate_frames,
            "declared frame counts differ, comparing up to the shorter stream"
        );
        advisories.push(Advisory::LengthMismatch {
            reference_frames,
            candidate_frames,
        });
        observer(Progress::LengthMismatch {
            reference_frames,
            candidate_frames,
        });
    }

    info!(
        width = reference_width,
        height = reference_height,
        expected_total,
        "comparison starting"
    );

    let mut totals = PsnrAccumulator::new();

    loop {
        if cancelled(config) {
            info!(
                frames_processed = totals.frames_processed(),
                "comparison cancelled"
            );
            break;
        }

        let Some(reference_frame) = pull_frame(reference, "reference") else {
            break;
        };
        let Some(candidate_frame) = pull_frame(candidate, "candidate") else {
            break;
        };

        let value = psnr::compute_psnr(&reference_frame.image, &candidate_frame.image);
        totals.record(value);

        debug!(
            frame = reference_frame.frame_number,
            ?value,
            "frame pair scored"
        );

        observer(Progress::Frame(PsnrSample {
            index: totals.frames_processed(),
            expected_total,
            value,
        }));
    }

    let Some(average_psnr) = totals.average(config.average_mode) else {
        warn!("no frame pairs could be read from the streams");
        return Err(CompareError::NoFramesProcessed);
    };

    info!(
        average_psnr,
        frames_processed = totals.frames_processed(),
        finite_frames = totals.finite_frames(),
        "comparison complete"
    );

    Ok(Report {
        average_psnr,
        frames_processed: totals.frames_processed(),
        finite_frames: totals.finite_frames(),
        advisories,
    })
}

fn cancelled(config: &CompareConfig) -> bool {
    config
        .cancel
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}

/// Pull one frame, mapping both end-of-stream and read errors to `None`: a
/// failed read ends the comparison the same way exhaustion does.
fn pull_frame<S: FrameSource>(source: &mut S, side: &str) -> Option<Frame> {
    match source.next_frame() {
        Ok(Some(frame)) => Some(frame),
        Ok(None) => {
            debug!(side, "stream exhausted");
            None
        }
        Err(e) => {
            warn!(side, error = %e, "frame read failed, treating as end of stream");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::anyhow;
    use image::{Rgb, RgbImage};
    use tracing_test::traced_test;

    /// In-memory frame source with adjustable metadata.
    struct StubSource {
        dims: (u32, u32),
        declared: u64,
        frames: Vec<RgbImage>,
        next: usize,
        fail_after: Option<usize>,
        pulls: u64,
    }

    impl StubSource {
        fn new(dims: (u32, u32), declared: u64, frames: Vec<RgbImage>) -> Self {
            Self {
                dims,
                declared,
                frames,
                next: 0,
                fail_after: None,
                pulls: 0,
            }
        }
    }

    impl FrameSource for StubSource {
        fn dimensions(&self) -> (u32, u32) {
            self.dims
        }

        fn declared_frame_count(&self) -> u64 {
            self.declared
        }

        fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
            self.pulls += 1;
            if self.fail_after.is_some_and(|n| self.next >= n) {
                return Err(anyhow!("simulated read failure"));
            }
            let Some(image) = self.frames.get(self.next) else {
                return Ok(None);
            };
            let frame = Frame {
                image: image.clone(),
                frame_number: self.next as u64,
            };
            self.next += 1;
            Ok(Some(frame))
        }
    }

    fn solid(rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(2, 2, Rgb(rgb))
    }

    /// Stub whose declared count matches its actual frame count.
    fn source_of(frames: Vec<RgbImage>) -> StubSource {
        let declared = frames.len() as u64;
        StubSource::new((2, 2), declared, frames)
    }

    #[test]
    #[traced_test]
    fn identical_pair_reports_zero_average() {
        let mut reference = source_of(vec![solid([9, 9, 9])]);
        let mut candidate = source_of(vec![solid([9, 9, 9])]);
        let mut events = Vec::new();

        let report = run_comparison(
            &mut reference,
            &mut candidate,
            &CompareConfig::default(),
            |p| events.push(p),
        )
        .unwrap();

        assert_eq!(report.frames_processed, 1);
        assert_eq!(report.finite_frames, 0);
        assert_eq!(report.average_psnr, 0.0);
        assert!(report.advisories.is_empty());
        assert_eq!(
            events,
            vec![Progress::Frame(PsnrSample {
                index: 1,
                expected_total: 1,
                value: Psnr::Infinite,
            })]
        );
    }

    #[test]
    fn shorter_stream_governs_and_advisory_fires_first() {
        let mut reference = source_of((0..10).map(|_| solid([50, 50, 50])).collect());
        let mut candidate = source_of((0..8).map(|_| solid([52, 52, 52])).collect());
        let mut events = Vec::new();

        let report = run_comparison(
            &mut reference,
            &mut candidate,
            &CompareConfig::default(),
            |p| events.push(p),
        )
        .unwrap();

        assert_eq!(report.frames_processed, 8);
        assert_eq!(
            report.advisories,
            vec![Advisory::LengthMismatch {
                reference_frames: 10,
                candidate_frames: 8,
            }]
        );

        assert_eq!(events.len(), 9);
        assert_eq!(
            events[0],
            Progress::LengthMismatch {
                reference_frames: 10,
                candidate_frames: 8,
            }
        );
        let Progress::Frame(last) = events[8] else {
            panic!("expected a frame event, got {:?}", events[8]);
        };
        assert_eq!(last.index, 8);
        assert_eq!(last.expected_total, 8);
    }

    #[test]
    fn dimension_mismatch_is_fatal_before_any_read() {
        let mut reference = StubSource::new((640, 480), 5, Vec::new());
        let mut candidate = StubSource::new((320, 240), 5, Vec::new());

        let err = run_comparison(
            &mut reference,
            &mut candidate,
            &CompareConfig::default(),
            |_| {},
        )
        .unwrap_err();

        assert_eq!(
            err,
            CompareError::DimensionMismatch {
                reference_width: 640,
                reference_height: 480,
                candidate_width: 320,
                candidate_height: 240,
            }
        );
        assert_eq!(reference.pulls, 0);
        assert_eq!(candidate.pulls, 0);
    }

    #[test]
    fn empty_stream_reports_no_frames() {
        let mut reference = source_of(Vec::new());
        let mut candidate = source_of(vec![solid([1, 2, 3])]);
        let mut events = Vec::new();

        let err = run_comparison(
            &mut reference,
            &mut candidate,
            &CompareConfig::default(),
            |p| events.push(p),
        )
        .unwrap_err();

        assert_eq!(err, CompareError::NoFramesProcessed);
        // Declared 0 vs 1: the length advisory still fires.
        assert_eq!(events.len(), 1);
    }

    #[test]
    #[traced_test]
    fn read_error_ends_loop_like_exhaustion() {
        let mut reference = source_of(vec![solid([10, 10, 10]); 5]);
        let mut candidate = source_of(vec![solid([11, 11, 11]); 5]);
        candidate.fail_after = Some(3);

        let report = run_comparison(
            &mut reference,
            &mut candidate,
            &CompareConfig::default(),
            |_| {},
        )
        .unwrap();

        assert_eq!(report.frames_processed, 3);
        assert_eq!(report.finite_frames, 3);
    }

    #[test]
    fn identical_pairs_dilute_the_default_average() {
        // Pair 1 identical, pair 2 off by one everywhere (20*log10(255) dB).
        // The default policy divides the finite sum by both pairs.
        let mut reference = source_of(vec![solid([0, 0, 0]), solid([0, 0, 0])]);
        let mut candidate = source_of(vec![solid([0, 0, 0]), solid([1, 1, 1])]);

        let report = run_comparison(
            &mut reference,
            &mut candidate,
            &CompareConfig::default(),
            |_| {},
        )
        .unwrap();

        let finite_db = 20.0 * 255f64.log10();
        assert_eq!(report.frames_processed, 2);
        assert_eq!(report.finite_frames, 1);
        assert!((report.average_psnr - finite_db / 2.0).abs() < 1e-9);
    }

    #[test]
    fn finite_only_mode_excludes_identical_pairs() {
        let mut reference = source_of(vec![solid([0, 0, 0]), solid([0, 0, 0])]);
        let mut candidate = source_of(vec![solid([0, 0, 0]), solid([1, 1, 1])]);
        let config = CompareConfig {
            average_mode: AverageMode::FiniteOnly,
            ..Default::default()
        };

        let report = run_comparison(&mut reference, &mut candidate, &config, |_| {}).unwrap();

        let finite_db = 20.0 * 255f64.log10();
        assert!((report.average_psnr - finite_db).abs() < 1e-9);
    }

    #[test]
    fn cancellation_stops_between_pairs() {
        let cancel = Arc::new(AtomicBool::new(false));
        let mut reference = source_of(vec![solid([40, 40, 40]); 6]);
        let mut candidate = source_of(vec![solid([41, 41, 41]); 6]);
        let config = CompareConfig {
            cancel: Some(cancel.clone()),
            ..Default::default()
        };

        let report = run_comparison(&mut reference, &mut candidate, &config, |p| {
            if let Progress::Frame(sample) = p {
                if sample.index == 2 {
                    cancel.store(true, Ordering::Relaxed);
                }
            }
        })
        .unwrap();

        assert_eq!(report.frames_processed, 2);
    }
}

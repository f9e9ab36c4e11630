mod cli;

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info};

use vidpsnr_core::error::CompareError;
use vidpsnr_core::pipeline::{self, CompareConfig, Progress};
use vidpsnr_core::video::decoder::VideoDecoder;

fn main() -> ExitCode {
    // Diagnostics go to stderr; stdout carries only the report lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(cli::Cli::parse())
}

fn run(cli: cli::Cli) -> ExitCode {
    let start = Instant::now();
    info!(
        original = ?cli.original_video,
        compressed = ?cli.compressed_video,
        "starting PSNR comparison"
    );

    let Some(mut reference) = open_video(&cli.original_video, "original") else {
        return ExitCode::FAILURE;
    };
    let Some(mut candidate) = open_video(&cli.compressed_video, "compressed") else {
        return ExitCode::FAILURE;
    };

    let config = CompareConfig {
        average_mode: cli.average_over.into(),
        ..Default::default()
    };

    match pipeline::run_comparison(&mut reference, &mut candidate, &config, print_progress) {
        Ok(report) => {
            println!();
            println!("---------------------------------");
            println!("Average PSNR: {:.2} dB", report.average_psnr);
            println!("---------------------------------");
            info!(
                frames_processed = report.frames_processed,
                finite_frames = report.finite_frames,
                elapsed = ?start.elapsed(),
                "comparison finished"
            );
            ExitCode::SUCCESS
        }
        Err(CompareError::DimensionMismatch {
            reference_width,
            reference_height,
            candidate_width,
            candidate_height,
        }) => {
            println!("Error: Video dimensions do not match.");
            println!(
                "Original: {reference_width}x{reference_height}, Compressed: {candidate_width}x{candidate_height}"
            );
            ExitCode::FAILURE
        }
        Err(CompareError::NoFramesProcessed) => {
            println!("Error: No frames were processed.");
            ExitCode::FAILURE
        }
    }
}

/// Open one side of the comparison, reporting a failure in the console's
/// error format.
fn open_video(path: &Path, role: &str) -> Option<VideoDecoder> {
    match VideoDecoder::open(path) {
        Ok(decoder) => Some(decoder),
        Err(e) => {
            error!(?path, "failed to open video: {e:#}");
            println!("Error: Could not open {role} video file: {}", path.display());
            None
        }
    }
}

/// Render one progress event in the reference console format.
fn print_progress(event: Progress) {
    match event {
        Progress::LengthMismatch {
            reference_frames,
            candidate_frames,
        } => {
            println!("Warning: Videos have different frame counts.");
            println!("Original: {reference_frames} frames, Compressed: {candidate_frames} frames.");
            println!("PSNR will be calculated for the shorter video's duration.");
        }
        Progress::Frame(sample) => {
            println!(
                "Processing Frame {}/{} - PSNR: {:.2} dB",
                sample.index,
                sample.expected_total,
                sample.value.as_db()
            );
        }
    }
}

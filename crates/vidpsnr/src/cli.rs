use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use vidpsnr_core::psnr::AverageMode;

#[derive(Parser)]
#[command(name = "vidpsnr", about = "Per-frame and average PSNR between two video files")]
pub struct Cli {
    /// Path to the original (reference) video file.
    pub original_video: PathBuf,

    /// Path to the compressed (distorted) video file.
    pub compressed_video: PathBuf,

    /// Denominator for the average: every processed frame pair (identical
    /// pairs count as zero) or only pairs with a finite PSNR.
    #[arg(long, value_enum, default_value = "processed")]
    pub average_over: AverageArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AverageArg {
    Processed,
    Finite,
}

impl From<AverageArg> for AverageMode {
    fn from(arg: AverageArg) -> Self {
        match arg {
            AverageArg::Processed => AverageMode::AllProcessed,
            AverageArg::Finite => AverageMode::FiniteOnly,
        }
    }
}

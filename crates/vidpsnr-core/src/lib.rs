//! Frame-level PSNR comparison between two decoded video streams:
//! ffmpeg-backed frame acquisition, the MSE/PSNR metric, and the paired
//! iteration that turns a stream pair into per-frame values and a final
//! report.

pub mod error;
pub mod pipeline;
pub mod psnr;
pub mod video;

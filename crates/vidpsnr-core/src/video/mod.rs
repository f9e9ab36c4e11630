pub mod decoder;
pub mod frame;

use anyhow::Result;

use crate::video::frame::Frame;

/// Pull-based contract over a decoded video stream.
///
/// Implementations yield frames in presentation order until the stream is
/// exhausted. Opening a stream is each implementation's constructor and
/// releasing it is `Drop`.
pub trait FrameSource {
    /// Frame dimensions as (width, height), constant for the whole stream.
    fn dimensions(&self) -> (u32, u32);

    /// Total frame count as declared by the container. Advisory only:
    /// containers misreport, so iteration is governed by actual stream
    /// exhaustion, never by this value.
    fn declared_frame_count(&self) -> u64;

    /// Pull the next frame. `Ok(None)` marks the end of the stream; a read
    /// error is terminal for the stream as well.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

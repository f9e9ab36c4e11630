use image::RgbImage;

/// A single decoded video frame.
pub struct Frame {
    /// Interleaved 8-bit RGB samples.
    pub image: RgbImage,
    /// Absolute frame number from the start of the source (0-based).
    pub frame_number: u64,
}

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::{bail, Context, Result};
use image::RgbImage;
use tracing::{debug, error, info, warn};

use crate::video::frame::Frame;
use crate::video::FrameSource;

/// Video stream metadata obtained by probing with ffprobe.
struct ProbeResult {
    width: u32,
    height: u32,
    fps: f64,
    declared_frames: u64,
}

fn probe(path: &Path) -> Result<ProbeResult> {
    info!(?path, "probing video metadata with ffprobe");

    let output = Command::new("ffprobe")
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height,r_frame_rate,nb_frames:format=duration",
            "-of", "csv=p=0",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .context("failed to run ffprobe, is ffmpeg installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(%stderr, ?path, "ffprobe failed");
        bail!("ffprobe failed: {stderr}");
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let info = parse_probe_output(&stdout)?;

    if info.fps <= 0.0 {
        warn!(fps = info.fps, ?path, "video has non-positive fps");
    }

    info!(
        width = info.width,
        height = info.height,
        fps = info.fps,
        declared_frames = info.declared_frames,
        "probe completed"
    );
    Ok(info)
}

/// Parse ffprobe CSV output: a stream line `width,height,num/den[,nb_frames]`
/// optionally followed by a format line holding the container duration in
/// seconds. Fields ffprobe cannot determine come through as `N/A`.
fn parse_probe_output(stdout: &str) -> Result<ProbeResult> {
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());

    let stream_line = lines.next().unwrap_or("");
    let parts: Vec<&str> = stream_line.split(',').collect();
    if parts.len() < 3 {
        error!(%stdout, "unexpected ffprobe output format, expected width,height,fps");
        bail!("unexpected ffprobe output: {stdout}");
    }

    let width: u32 = parts[0].parse().context("failed to parse width")?;
    let height: u32 = parts[1].parse().context("failed to parse height")?;

    let fps = if let Some((num, den)) = parts[2].split_once('/') {
        let num: f64 = num.parse().context("failed to parse fps numerator")?;
        let den: f64 = den.parse().context("failed to parse fps denominator")?;
        if den > 0.0 { num / den } else { 0.0 }
    } else {
        parts[2].parse().context("failed to parse fps")?
    };

    // Declared count resolution: the stream's nb_frames when the container
    // records one, else an estimate from duration and fps, else 0 (unknown).
    let nb_frames = parts.get(3).and_then(|s| s.parse::<u64>().ok());
    let duration = lines.next().and_then(|s| s.parse::<f64>().ok());
    let declared_frames = match (nb_frames, duration) {
        (Some(n), _) => n,
        (None, Some(d)) if fps > 0.0 && d > 0.0 => (d * fps).round() as u64,
        _ => 0,
    };

    Ok(ProbeResult {
        width,
        height,
        fps,
        declared_frames,
    })
}

/// Decodes video frames by piping raw RGB24 data from the ffmpeg CLI.
pub struct VideoDecoder {
    child: Child,
    width: u32,
    height: u32,
    declared_frames: u64,
    frames_read: u64,
    frame_bytes: usize,
}

impl VideoDecoder {
    /// Open a video file for decoding.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("video file does not exist: {}", path.display());
        }

        let info = probe(path)?;
        if info.width == 0 || info.height == 0 {
            bail!("invalid video dimensions: {}x{}", info.width, info.height);
        }

        info!(?path, "spawning ffmpeg decoder process");

        let child = Command::new("ffmpeg")
            .arg("-i")
            .arg(path)
            .args([
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "-v", "error",
                "pipe:1",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("failed to spawn ffmpeg, is ffmpeg installed?")?;

        let frame_bytes = (info.width as usize) * (info.height as usize) * 3;

        info!(
            width = info.width,
            height = info.height,
            declared_frames = info.declared_frames,
            frame_bytes,
            "video decoder opened"
        );

        Ok(Self {
            child,
            width: info.width,
            height: info.height,
            declared_frames: info.declared_frames,
            frames_read: 0,
            frame_bytes,
        })
    }
}

impl FrameSource for VideoDecoder {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn declared_frame_count(&self) -> u64 {
        self.declared_frames
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let stdout = self
            .child
            .stdout
            .as_mut()
            .context("ffmpeg stdout not available")?;

        let mut buf = vec![0u8; self.frame_bytes];
        let mut read = 0;

        while read < self.frame_bytes {
            match stdout.read(&mut buf[read..]) {
                Ok(0) => {
                    if read == 0 {
                        info!(total_frames = self.frames_read, "video stream ended");
                        return Ok(None);
                    }
                    error!(
                        read_bytes = read,
                        expected_bytes = self.frame_bytes,
                        frame = self.frames_read,
                        "ffmpeg stream ended mid-frame"
                    );
                    bail!(
                        "ffmpeg stream ended mid-frame (read {read}/{} bytes)",
                        self.frame_bytes,
                    );
                }
                Ok(n) => read += n,
                Err(e) => {
                    error!(frame = self.frames_read, %e, "failed to read from ffmpeg pipe");
                    return Err(e).context("failed to read from ffmpeg pipe");
                }
            }
        }

        let image = RgbImage::from_raw(self.width, self.height, buf)
            .context("failed to create RgbImage from raw frame data")?;

        let frame_number = self.frames_read;
        self.frames_read += 1;

        debug!(frame_number, "decoded frame");

        Ok(Some(Frame {
            image,
            frame_number,
        }))
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        info!(total_frames = self.frames_read, "closing video decoder");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

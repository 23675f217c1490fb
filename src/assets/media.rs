use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context as _;

use crate::audio::segment::AudioSegment;
use crate::foundation::error::{ThalaError, ThalaResult};
use crate::render::raster::{Channels, Raster};

#[derive(Clone, Debug, PartialEq)]
/// Basic metadata about a source video file.
pub struct VideoInfo {
    /// Source path used for probing/decoding.
    pub source_path: PathBuf,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of frames in the video stream.
    pub frame_count: u64,
    /// Frames per second.
    pub fps: f64,
}

impl VideoInfo {
    /// Time of the last frame: `(frame_count - 1) / fps`.
    pub fn duration_secs(&self) -> f64 {
        if self.fps <= 0.0 || self.frame_count == 0 {
            return 0.0;
        }
        (self.frame_count as f64 - 1.0) / self.fps
    }
}

/// Decoding collaborator for every file-backed leaf.
///
/// Implementations must not cache frames between calls: each `decode_video_frame` is an
/// independent seek, and any process or file handle it opens is released before it returns.
pub trait MediaDecoder {
    /// Read video stream metadata.
    fn probe_video(&self, path: &Path) -> ThalaResult<VideoInfo>;

    /// Decode the frame shown at `t` seconds; `None` past the end of the stream.
    fn decode_video_frame(&self, info: &VideoInfo, t: f64) -> ThalaResult<Option<Raster>>;

    /// Decode the audio track of a file (empty when the file has none).
    fn decode_audio_file(&self, path: &Path, sample_rate: u32) -> ThalaResult<AudioSegment>;

    /// Decode an in-memory encoded audio blob of container `format`.
    fn decode_audio_bytes(
        &self,
        bytes: &[u8],
        format: &str,
        sample_rate: u32,
    ) -> ThalaResult<AudioSegment>;

    /// Decode a still image.
    fn decode_image(&self, path: &Path) -> ThalaResult<Raster>;
}

/// [`MediaDecoder`] backed by the system `ffprobe`/`ffmpeg` binaries and the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegMedia;

impl MediaDecoder for FfmpegMedia {
    fn probe_video(&self, path: &Path) -> ThalaResult<VideoInfo> {
        #[derive(serde::Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
            width: Option<u32>,
            height: Option<u32>,
            nb_frames: Option<String>,
            r_frame_rate: Option<String>,
            duration: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeOut {
            streams: Vec<ProbeStream>,
        }

        let out = Command::new("ffprobe")
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| ThalaError::upstream(format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(ThalaError::upstream(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
            .map_err(|e| ThalaError::upstream(format!("ffprobe json parse failed: {e}")))?;
        let video = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| {
                ThalaError::upstream(format!("no video stream in '{}'", path.display()))
            })?;
        let width = video
            .width
            .ok_or_else(|| ThalaError::upstream("missing video width from ffprobe"))?;
        let height = video
            .height
            .ok_or_else(|| ThalaError::upstream("missing video height from ffprobe"))?;
        let fps = video
            .r_frame_rate
            .as_deref()
            .and_then(parse_rational)
            .ok_or_else(|| ThalaError::upstream("missing video frame rate from ffprobe"))?;
        let frame_count = match video.nb_frames.as_deref().and_then(|n| n.parse().ok()) {
            Some(n) => n,
            None => {
                let secs: f64 = video
                    .duration
                    .as_deref()
                    .and_then(|d| d.parse().ok())
                    .ok_or_else(|| {
                        ThalaError::upstream("ffprobe reported neither frame count nor duration")
                    })?;
                (secs * fps).round().max(0.0) as u64
            }
        };

        Ok(VideoInfo {
            source_path: path.to_path_buf(),
            width,
            height,
            frame_count,
            fps,
        })
    }

    fn decode_video_frame(&self, info: &VideoInfo, t: f64) -> ThalaResult<Option<Raster>> {
        let out = Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{:.9}", t.max(0.0))])
            .arg("-i")
            .arg(&info.source_path)
            .args([
                "-frames:v",
                "1",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "pipe:1",
            ])
            .output()
            .map_err(|e| {
                ThalaError::upstream(format!("failed to run ffmpeg for video decode: {e}"))
            })?;
        if !out.status.success() {
            return Err(ThalaError::upstream(format!(
                "ffmpeg video decode failed for '{}': {}",
                info.source_path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        // Seeking past the last frame produces no output.
        if out.stdout.is_empty() {
            return Ok(None);
        }

        let expected = info.width as usize * info.height as usize * 3;
        if out.stdout.len() < expected {
            return Err(ThalaError::upstream(format!(
                "decoded video frame has invalid size: got {} bytes, expected {expected}",
                out.stdout.len()
            )));
        }
        let mut data = out.stdout;
        data.truncate(expected);
        Raster::from_raw(info.width, info.height, Channels::Rgb, data).map(Some)
    }

    fn decode_audio_file(&self, path: &Path, sample_rate: u32) -> ThalaResult<AudioSegment> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-i"]).arg(path);
        run_audio_decode(cmd, None, sample_rate, &path.display().to_string())
    }

    fn decode_audio_bytes(
        &self,
        bytes: &[u8],
        format: &str,
        sample_rate: u32,
    ) -> ThalaResult<AudioSegment> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-f", format, "-i", "pipe:0"]);
        run_audio_decode(cmd, Some(bytes), sample_rate, "synthesized speech")
    }

    fn decode_image(&self, path: &Path) -> ThalaResult<Raster> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read image '{}'", path.display()))?;
        let img = image::load_from_memory(&bytes).map_err(|e| {
            ThalaError::upstream(format!("failed to decode image '{}': {e}", path.display()))
        })?;
        Ok(Raster::from_dynamic_image(img))
    }
}

fn run_audio_decode(
    mut cmd: Command,
    stdin_bytes: Option<&[u8]>,
    sample_rate: u32,
    what: &str,
) -> ThalaResult<AudioSegment> {
    cmd.args([
        "-vn",
        "-f",
        "f32le",
        "-acodec",
        "pcm_f32le",
        "-ac",
        "2",
        "-ar",
        &sample_rate.to_string(),
        "pipe:1",
    ]);
    cmd.stdin(if stdin_bytes.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| ThalaError::upstream(format!("failed to run ffmpeg for audio decode: {e}")))?;

    let writer = match (stdin_bytes, child.stdin.take()) {
        (Some(bytes), Some(mut stdin)) => {
            let bytes = bytes.to_vec();
            Some(std::thread::spawn(move || stdin.write_all(&bytes)))
        }
        _ => None,
    };
    // Always reaps the child, also when the writer failed.
    let out = child
        .wait_with_output()
        .map_err(|e| ThalaError::upstream(format!("failed to wait for ffmpeg: {e}")))?;
    if let Some(handle) = writer {
        handle
            .join()
            .map_err(|_| ThalaError::upstream("ffmpeg stdin writer thread panicked"))?
            .map_err(|e| ThalaError::upstream(format!("failed to feed ffmpeg stdin: {e}")))?;
    }

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        // A file without an audio stream decodes to silence of zero length.
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("Output file #0 does not contain any stream")
            || msg.contains("does not contain any stream")
        {
            return AudioSegment::new(sample_rate, 2, Vec::new());
        }
        return Err(ThalaError::upstream(format!(
            "ffmpeg audio decode failed for {what}: {}",
            msg.trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(ThalaError::upstream(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let samples = out
        .stdout
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    AudioSegment::new(sample_rate, 2, samples)
}

fn parse_rational(s: &str) -> Option<f64> {
    let v = match s.split_once('/') {
        Some((n, d)) => {
            let n: f64 = n.trim().parse().ok()?;
            let d: f64 = d.trim().parse().ok()?;
            if d == 0.0 {
                return None;
            }
            n / d
        }
        None => s.trim().parse().ok()?,
    };
    (v.is_finite() && v > 0.0).then_some(v)
}

// ffprobe/ffmpeg calls are exercised by integration tests only when the tools exist; the pure
// helpers are covered here.
#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::media::{FfmpegMedia, MediaDecoder};
use crate::assets::speech::{SpeechSynthesizer, synthesizer_for};
use crate::assets::text::{ParleyTextRasterizer, TextRasterizer};
use crate::audio::build::{AudioSources, LeafAudioCache, build_audio};
use crate::audio::segment::AudioSegment;
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::config::EngineConfig;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ThalaError, ThalaResult};
use crate::render::build::{VideoSources, build_video};
use crate::render::node::RasterNode;
use crate::render::raster::Raster;
use crate::scene::node::Scene;

/// Channel count of the emitted audio track.
pub const OUTPUT_CHANNELS: u16 = 2;

/// Options controlling range rendering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOpts {
    /// Output frame grid.
    pub fps: Fps,
    /// Attach the root audio to the sink.
    pub enable_audio: bool,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            enable_audio: true,
        }
    }
}

/// Range render statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderStats {
    /// Frames pushed to the sink.
    pub frames_total: u64,
    /// Duration of the attached audio track (0 when none was attached).
    pub audio_secs: f64,
}

/// Both passes' results for one scene.
#[derive(Debug)]
pub struct BuiltClip {
    pub video: RasterNode,
    pub audio: AudioSegment,
}

impl BuiltClip {
    pub fn duration(&self) -> f64 {
        self.video.duration()
    }

    /// Number of frames sampled on `fps`: every `i` with `i / fps < duration`.
    pub fn frame_count(&self, fps: Fps) -> u64 {
        fps.frames_covering(self.duration())
    }

    /// Root frame `idx` on the `fps` grid.
    pub fn frame(&self, idx: FrameIndex, fps: Fps) -> ThalaResult<Raster> {
        self.video.image(fps.frames_to_secs(idx.0))
    }

    /// Root audio normalized for emission: stereo at `sample_rate`.
    pub fn output_audio(&self, sample_rate: u32) -> AudioSegment {
        self.audio
            .with_channels(OUTPUT_CHANNELS)
            .resample(sample_rate)
    }
}

/// Compositing engine: configuration, collaborators and the assets root.
pub struct Engine {
    config: EngineConfig,
    assets_root: PathBuf,
    decoder: Arc<dyn MediaDecoder>,
    text: Box<dyn TextRasterizer>,
    speech: Box<dyn SpeechSynthesizer>,
}

impl Engine {
    /// Engine with the built-in `ffmpeg`, Parley and configured TTS backends.
    pub fn new(config: EngineConfig, assets_root: impl Into<PathBuf>) -> ThalaResult<Self> {
        let text = Box::new(ParleyTextRasterizer::new(&config));
        let speech = synthesizer_for(&config.tts);
        Self::with_backends(config, assets_root, Arc::new(FfmpegMedia), text, speech)
    }

    /// Engine with caller-provided collaborators.
    pub fn with_backends(
        config: EngineConfig,
        assets_root: impl Into<PathBuf>,
        decoder: Arc<dyn MediaDecoder>,
        text: Box<dyn TextRasterizer>,
        speech: Box<dyn SpeechSynthesizer>,
    ) -> ThalaResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            assets_root: assets_root.into(),
            decoder,
            text,
            speech,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn assets_root(&self) -> &Path {
        &self.assets_root
    }

    /// Audio pass: root audio plus the leaf cache the video pass needs.
    pub fn build_audio(&mut self, scene: &Scene) -> ThalaResult<(AudioSegment, LeafAudioCache)> {
        let mut cache = LeafAudioCache::new();
        let mut sources = AudioSources {
            decoder: self.decoder.as_ref(),
            speech: self.speech.as_mut(),
            assets_root: &self.assets_root,
            sample_rate: self.config.sample_rate,
        };
        let audio = build_audio(scene.root(), &mut sources, &mut cache)?;
        Ok((audio, cache))
    }

    /// Video pass, reading leaf durations from `cache`.
    pub fn build_video(&mut self, scene: &Scene, cache: &LeafAudioCache) -> ThalaResult<RasterNode> {
        let mut sources = VideoSources {
            decoder: Arc::clone(&self.decoder),
            text: self.text.as_mut(),
            assets_root: &self.assets_root,
        };
        build_video(scene.root(), &mut sources, cache)
    }

    /// Audio pass, then video pass.
    pub fn build(&mut self, scene: &Scene) -> ThalaResult<BuiltClip> {
        let (audio, cache) = self.build_audio(scene)?;
        let video = self.build_video(scene, &cache)?;
        Ok(BuiltClip { video, audio })
    }

    /// Build `scene` and stream it into `sink`.
    pub fn render(
        &mut self,
        scene: &Scene,
        opts: &RenderOpts,
        sink: &mut dyn FrameSink,
    ) -> ThalaResult<RenderStats> {
        let clip = self.build(scene)?;
        render_range(&clip, opts, self.config.sample_rate, sink)
    }
}

/// Sample the root raster node across the frame grid and stream frames into `sink`.
///
/// The sink receives frames in strictly increasing index order. With audio enabled, the root
/// audio is normalized to stereo at `sample_rate` and handed over as a temporary `f32le` file
/// that is removed when this call returns.
#[tracing::instrument(skip(clip, sink), fields(duration = clip.duration()))]
pub fn render_range(
    clip: &BuiltClip,
    opts: &RenderOpts,
    sample_rate: u32,
    sink: &mut dyn FrameSink,
) -> ThalaResult<RenderStats> {
    let frames_total = clip.frame_count(opts.fps);
    if frames_total == 0 {
        return Err(ThalaError::range(format!(
            "clip duration {}s yields no frames at {} fps",
            clip.duration(),
            opts.fps.as_f64()
        )));
    }
    if clip.video.width() == 0 || clip.video.height() == 0 {
        return Err(ThalaError::range(format!(
            "clip size {}x{} has no pixels",
            clip.video.width(),
            clip.video.height()
        )));
    }

    let mut audio_tmp = TempFileGuard(None);
    let mut audio_secs = 0.0;
    let audio_cfg = if opts.enable_audio && clip.audio.frame_count() > 0 {
        let out = clip.output_audio(sample_rate);
        let path = std::env::temp_dir().join(format!(
            "thala_audio_{}_{}.f32le",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        write_f32le_file(out.samples(), &path)?;
        audio_tmp.0 = Some(path.clone());
        audio_secs = out.duration_secs();
        Some(AudioInputConfig {
            path,
            sample_rate: out.sample_rate(),
            channels: out.channels(),
        })
    } else {
        None
    };

    sink.begin(SinkConfig {
        width: clip.video.width(),
        height: clip.video.height(),
        fps: opts.fps,
        audio: audio_cfg,
    })?;
    for i in 0..frames_total {
        let idx = FrameIndex(i);
        let frame = clip.frame(idx, opts.fps)?;
        sink.push_frame(idx, &frame)?;
    }
    sink.end()?;

    tracing::info!(frames = frames_total, audio_secs, "rendered range");
    Ok(RenderStats {
        frames_total,
        audio_secs,
    })
}

/// Write interleaved samples as raw little-endian `f32`.
pub fn write_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> ThalaResult<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ThalaError::upstream(format!(
                "failed to create audio output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        ThalaError::upstream(format!(
            "failed to write audio file '{}': {e}",
            out_path.display()
        ))
    })
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;

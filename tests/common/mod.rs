//! In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use thala::{
    AudioSegment, Channels, Engine, EngineConfig, MediaDecoder, Raster, SpeechSynthesizer,
    SynthesizedSpeech, TextRasterizer, ThalaError, ThalaResult, VideoInfo,
};

pub const RATE: u32 = 1_000;

enum Asset {
    Image(Raster),
    Audio(AudioSegment),
    Video { info: VideoInfo, rgb: [u8; 3] },
}

/// Assets keyed by file name.
#[derive(Default)]
pub struct FakeMedia {
    assets: HashMap<String, Asset>,
}

impl FakeMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, name: &str, w: u32, h: u32, rgb: [u8; 3]) -> Self {
        let raster = Raster::filled(w, h, Channels::Rgb, &rgb).unwrap();
        self.assets.insert(name.to_owned(), Asset::Image(raster));
        self
    }

    pub fn with_rgba_image(mut self, name: &str, w: u32, h: u32, rgba: [u8; 4]) -> Self {
        let raster = Raster::filled(w, h, Channels::Rgba, &rgba).unwrap();
        self.assets.insert(name.to_owned(), Asset::Image(raster));
        self
    }

    /// Mono tone of constant `level` lasting `secs`.
    pub fn with_audio(mut self, name: &str, secs: f64, level: f32) -> Self {
        self.assets
            .insert(name.to_owned(), Asset::Audio(tone(secs, level)));
        self
    }

    pub fn with_video(mut self, name: &str, w: u32, h: u32, frames: u64, fps: f64) -> Self {
        let info = VideoInfo {
            source_path: name.into(),
            width: w,
            height: h,
            frame_count: frames,
            fps,
        };
        self.assets.insert(
            name.to_owned(),
            Asset::Video {
                info,
                rgb: [0, 0, 0],
            },
        );
        self
    }

    fn get(&self, path: &Path) -> ThalaResult<&Asset> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        self.assets
            .get(name)
            .ok_or_else(|| ThalaError::upstream(format!("no such asset '{name}'")))
    }
}

pub fn tone(secs: f64, level: f32) -> AudioSegment {
    let frames = (secs * f64::from(RATE)).round() as usize;
    AudioSegment::new(RATE, 1, vec![level; frames]).unwrap()
}

impl MediaDecoder for FakeMedia {
    fn probe_video(&self, path: &Path) -> ThalaResult<VideoInfo> {
        match self.get(path)? {
            Asset::Video { info, .. } => Ok(info.clone()),
            _ => Err(ThalaError::upstream("not a video")),
        }
    }

    /// Frames encode the frame number in the red channel.
    fn decode_video_frame(&self, info: &VideoInfo, t: f64) -> ThalaResult<Option<Raster>> {
        let n = (t * info.fps).round() as u64;
        if n >= info.frame_count {
            return Ok(None);
        }
        Raster::filled(info.width, info.height, Channels::Rgb, &[n as u8, 0, 0]).map(Some)
    }

    fn decode_audio_file(&self, path: &Path, sample_rate: u32) -> ThalaResult<AudioSegment> {
        assert_eq!(sample_rate, RATE);
        match self.get(path)? {
            Asset::Audio(a) => Ok(a.clone()),
            // Fake movies carry no soundtrack, like a silent file through ffmpeg.
            Asset::Video { .. } => Ok(AudioSegment::silent(0.0, RATE, 2)),
            Asset::Image(_) => Err(ThalaError::upstream("not an audio file")),
        }
    }

    /// Speech bytes last a tenth of a second each.
    fn decode_audio_bytes(
        &self,
        bytes: &[u8],
        format: &str,
        _sample_rate: u32,
    ) -> ThalaResult<AudioSegment> {
        assert_eq!(format, "fake");
        Ok(tone(bytes.len() as f64 * 0.1, 0.1))
    }

    fn decode_image(&self, path: &Path) -> ThalaResult<Raster> {
        match self.get(path)? {
            Asset::Image(r) => Ok(r.clone()),
            _ => Err(ThalaError::upstream("not an image")),
        }
    }
}

/// Each character becomes an 8x16 opaque black cell.
pub struct BlockText;

impl TextRasterizer for BlockText {
    fn rasterize(&mut self, text: &str) -> ThalaResult<Raster> {
        let w = 8 * text.chars().count().max(1) as u32;
        Raster::filled(w, 16, Channels::Rgba, &[0, 0, 0, 255])
    }
}

/// Records every synthesis request.
#[derive(Clone, Default)]
pub struct RecordingSpeech {
    pub requests: Rc<RefCell<Vec<String>>>,
}

impl SpeechSynthesizer for RecordingSpeech {
    fn synthesize(&mut self, text: &str) -> ThalaResult<SynthesizedSpeech> {
        self.requests.borrow_mut().push(text.to_owned());
        Ok(SynthesizedSpeech {
            bytes: text.as_bytes().to_vec(),
            format: "fake".to_owned(),
        })
    }
}

pub fn config() -> EngineConfig {
    EngineConfig {
        sample_rate: RATE,
        ..EngineConfig::default()
    }
}

pub fn engine(media: FakeMedia) -> Engine {
    engine_with_speech(media, RecordingSpeech::default())
}

pub fn engine_with_speech(media: FakeMedia, speech: RecordingSpeech) -> Engine {
    Engine::with_backends(
        config(),
        "tests/data",
        Arc::new(media),
        Box::new(BlockText),
        Box::new(speech),
    )
    .unwrap()
}

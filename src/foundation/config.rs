use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::foundation::error::{ThalaError, ThalaResult};

/// Default sample rate for decoded leaf audio and the emitted track.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Engine-wide settings supplied at construction.
///
/// Nothing here is inferred from the host platform; a scene with `speak` nodes needs
/// `font_path` and a non-disabled `tts` backend.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Font file used to draw on-screen text.
    pub font_path: Option<PathBuf>,
    /// Face index inside a font collection.
    pub font_index: u32,
    /// Font size in pixels.
    pub font_size: f32,
    /// Straight RGBA text color.
    pub text_color: [u8; 4],
    /// Text-to-speech backend used by `speak` nodes.
    pub tts: TtsBackend,
    /// Sample rate for decoded leaf audio and the output track.
    pub sample_rate: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_index: 0,
            font_size: 52.0,
            text_color: [0, 0, 0, 255],
            tts: TtsBackend::Disabled,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl EngineConfig {
    /// Parse a config from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ThalaResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| ThalaError::parse(format!("parse engine config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ThalaResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ThalaError::config(format!("open engine config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn validate(&self) -> ThalaResult<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(ThalaError::range("font_size must be finite and > 0"));
        }
        if self.sample_rate == 0 {
            return Err(ThalaError::range("sample_rate must be > 0"));
        }
        Ok(())
    }
}

/// Text-to-speech backend selection.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TtsBackend {
    /// No synthesis available; `speak` nodes fail with a config error.
    #[default]
    Disabled,
    /// Run an external program: text goes to stdin (and replaces any `{text}` argument),
    /// encoded audio is read from stdout.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        /// Container/codec name of the produced audio, passed to the decoder (e.g. `wav`).
        format: String,
    },
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;

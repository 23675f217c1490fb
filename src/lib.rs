//! Thala composes a final audiovisual clip from a declarative media tree.
//!
//! Leaves (`audio`, `movie`, `image`, `speak`) are combined by six structural operators
//! (`media`, `crop`, `margin`, `scale`, `par`, `seq`). A [`Scene`] is walked twice:
//!
//! - the audio pass decodes and mixes sound, caching every leaf's audio by node;
//! - the video pass builds a [`RasterNode`] tree whose `image(t)` is sampled per frame,
//!   reading narration lengths from that cache.
//!
//! [`Engine`] owns the collaborators (media decoding, text rasterization, speech synthesis) and
//! runs both passes; [`render_range`] streams the result into a [`FrameSink`].
#![forbid(unsafe_code)]

pub mod assets;
pub mod audio;
pub mod encode;
pub mod foundation;
pub mod render;
pub mod scene;

pub use crate::foundation::config::{EngineConfig, TtsBackend};
pub use crate::foundation::core::{Extent, Fps, FrameIndex};
pub use crate::foundation::error::{ThalaError, ThalaResult};
pub use crate::foundation::units::{parse_gain, parse_time};

pub use crate::assets::media::{FfmpegMedia, MediaDecoder, VideoInfo};
pub use crate::assets::speech::{
    CommandSynthesizer, DisabledSynthesizer, SpeechSynthesizer, SynthesizedSpeech,
};
pub use crate::assets::text::{ParleyTextRasterizer, TextRasterizer};
pub use crate::audio::build::LeafAudioCache;
pub use crate::audio::segment::AudioSegment;
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use crate::render::composite::alpha_blend;
pub use crate::render::node::RasterNode;
pub use crate::render::pipeline::{BuiltClip, Engine, RenderOpts, RenderStats, render_range};
pub use crate::render::raster::{Channels, Raster};
pub use crate::scene::element::Element;
pub use crate::scene::node::{NodeId, NodeKind, Scene, SceneNode};

//! Audio-first pass over the scene tree.

use std::collections::HashMap;
use std::path::Path;

use crate::assets::media::MediaDecoder;
use crate::assets::resolve_source;
use crate::assets::speech::SpeechSynthesizer;
use crate::audio::segment::AudioSegment;
use crate::foundation::error::{ThalaError, ThalaResult};
use crate::scene::node::{NodeId, NodeKind, SceneNode};

/// Decoded leaf audio keyed by scene node.
///
/// Filled by [`build_audio`] and read (never refilled) by the video pass, so a `speak` node's
/// on-screen duration is exactly the length of its synthesized narration.
#[derive(Clone, Debug, Default)]
pub struct LeafAudioCache {
    entries: HashMap<NodeId, AudioSegment>,
}

impl LeafAudioCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<&AudioSegment> {
        self.entries.get(&id)
    }

    /// Duration of a cached leaf, or a config error when the audio pass has not seen it.
    pub fn duration_secs(&self, id: NodeId) -> ThalaResult<f64> {
        self.get(id).map(AudioSegment::duration_secs).ok_or_else(|| {
            ThalaError::config(format!(
                "leaf {id:?} has no cached audio; run the audio pass first"
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collaborators consulted while decoding leaf audio.
pub struct AudioSources<'a> {
    pub decoder: &'a dyn MediaDecoder,
    pub speech: &'a mut dyn SpeechSynthesizer,
    /// Directory relative `src` paths resolve against.
    pub assets_root: &'a Path,
    /// Rate used for decoded files and generated silence.
    pub sample_rate: u32,
}

/// Build the audio of `root`, decoding every leaf at most once through `cache`.
#[tracing::instrument(skip_all, fields(root = root.kind.tag()))]
pub fn build_audio(
    root: &SceneNode,
    sources: &mut AudioSources<'_>,
    cache: &mut LeafAudioCache,
) -> ThalaResult<AudioSegment> {
    let audio = build_node(root, sources, cache)?;
    tracing::info!(
        duration = audio.duration_secs(),
        sample_rate = audio.sample_rate(),
        channels = audio.channels(),
        leaves = cache.len(),
        "built audio"
    );
    Ok(audio)
}

fn build_node(
    node: &SceneNode,
    sources: &mut AudioSources<'_>,
    cache: &mut LeafAudioCache,
) -> ThalaResult<AudioSegment> {
    let audio = match &node.kind {
        NodeKind::Audio { .. }
        | NodeKind::Movie { .. }
        | NodeKind::Image { .. }
        | NodeKind::Speak(_) => leaf(node, sources, cache)?,
        NodeKind::Media(params, child) => {
            let audio = build_node(child, sources, cache)?;
            let natural = audio.duration_secs();
            match params.duration {
                Some(d) if d < natural => audio.speedup(d / natural)?,
                Some(d) if d > natural => audio.concat(&AudioSegment::silent(
                    d - natural,
                    audio.sample_rate(),
                    audio.channels(),
                )),
                _ => audio,
            }
        }
        NodeKind::Crop(params, child) => {
            let audio = build_node(child, sources, cache)?;
            let natural = audio.duration_secs();
            if let Some(t1) = params.t1
                && t1 < params.t0
            {
                return Err(ThalaError::range(format!(
                    "<crop> t0 <= t1 is needed, got t0={} t1={t1}",
                    params.t0
                )));
            }
            let t1 = params.t1.unwrap_or(natural);
            if params.t0 > 0.0 || t1 < natural {
                audio.slice_secs(params.t0, t1)
            } else {
                audio
            }
        }
        NodeKind::Margin(params, child) => {
            let mut audio = build_node(child, sources, cache)?;
            if params.before > 0.0 {
                let pad =
                    AudioSegment::silent(params.before, audio.sample_rate(), audio.channels());
                audio = pad.concat(&audio);
            }
            if params.after > 0.0 {
                let pad =
                    AudioSegment::silent(params.after, audio.sample_rate(), audio.channels());
                audio = audio.concat(&pad);
            }
            audio
        }
        NodeKind::Scale(params, child) => {
            let mut audio = build_node(child, sources, cache)?;
            if let Some(gain) = params.sound_level {
                audio = audio.apply_gain_db(gain);
            }
            let ft = params.time_factor(audio.duration_secs())?;
            if ft != 1.0 {
                audio = audio.speedup(ft)?;
            }
            audio
        }
        NodeKind::Par(children) => {
            let mut acc: Option<AudioSegment> = None;
            for child in children {
                let next = build_node(child, sources, cache)?;
                acc = Some(match acc {
                    // The shorter segment always goes on top of the longer one.
                    Some(acc) if acc.duration_secs() < next.duration_secs() => next.overlay(&acc),
                    Some(acc) => acc.overlay(&next),
                    None => next,
                });
            }
            acc.ok_or_else(|| ThalaError::schema("<par> needs at least 1 child"))?
        }
        NodeKind::Seq(children) => {
            let mut acc: Option<AudioSegment> = None;
            for child in children {
                let next = build_node(child, sources, cache)?;
                acc = Some(match acc {
                    Some(acc) => acc.concat(&next),
                    None => next,
                });
            }
            acc.ok_or_else(|| ThalaError::schema("<seq> needs at least 1 child"))?
        }
    };
    tracing::debug!(
        id = node.id.0,
        tag = node.kind.tag(),
        duration = audio.duration_secs(),
        "audio node"
    );
    Ok(audio)
}

fn leaf(
    node: &SceneNode,
    sources: &mut AudioSources<'_>,
    cache: &mut LeafAudioCache,
) -> ThalaResult<AudioSegment> {
    if let Some(hit) = cache.get(node.id) {
        return Ok(hit.clone());
    }
    let audio = match &node.kind {
        NodeKind::Audio { src } => {
            let path = resolve_source(sources.assets_root, src);
            sources.decoder.decode_audio_file(&path, sources.sample_rate)?
        }
        NodeKind::Movie { src } => {
            // Soundtrack follows the picture: silent files or short tracks are padded.
            let path = resolve_source(sources.assets_root, src);
            let info = sources.decoder.probe_video(&path)?;
            sources
                .decoder
                .decode_audio_file(&path, sources.sample_rate)?
                .fit_secs(info.duration_secs())
        }
        NodeKind::Image { duration, .. } => {
            AudioSegment::silent(*duration, sources.sample_rate, 1)
        }
        NodeKind::Speak(text) => {
            let speech = sources.speech.synthesize(&text.speech)?;
            sources
                .decoder
                .decode_audio_bytes(&speech.bytes, &speech.format, sources.sample_rate)?
        }
        other => {
            return Err(ThalaError::schema(format!(
                "<{}> is not a leaf",
                other.tag()
            )));
        }
    };
    cache.entries.insert(node.id, audio.clone());
    Ok(audio)
}

#[cfg(test)]
#[path = "../../tests/unit/audio/build.rs"]
mod tests;

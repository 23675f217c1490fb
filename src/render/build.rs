//! Video pass over the scene tree.

use std::path::Path;
use std::sync::Arc;

use crate::assets::media::MediaDecoder;
use crate::assets::resolve_source;
use crate::assets::text::TextRasterizer;
use crate::audio::build::LeafAudioCache;
use crate::foundation::error::ThalaResult;
use crate::render::node::RasterNode;
use crate::scene::node::{MarginParams, MediaParams, NodeKind, SceneNode};

/// Collaborators consulted while building raster leaves.
pub struct VideoSources<'a> {
    pub decoder: Arc<dyn MediaDecoder>,
    pub text: &'a mut dyn TextRasterizer,
    /// Directory relative `src` paths resolve against.
    pub assets_root: &'a Path,
}

/// Build the raster tree of `root`.
///
/// `audio` and `speak` durations come from `cache`, which the audio pass must have filled for
/// the same scene.
#[tracing::instrument(skip_all, fields(root = root.kind.tag()))]
pub fn build_video(
    root: &SceneNode,
    sources: &mut VideoSources<'_>,
    cache: &LeafAudioCache,
) -> ThalaResult<RasterNode> {
    let node = build_node(root, sources, cache)?;
    tracing::info!(
        width = node.width(),
        height = node.height(),
        duration = node.duration(),
        "built video"
    );
    Ok(node)
}

fn build_node(
    node: &SceneNode,
    sources: &mut VideoSources<'_>,
    cache: &LeafAudioCache,
) -> ThalaResult<RasterNode> {
    let out = match &node.kind {
        NodeKind::Audio { .. } => RasterNode::empty(cache.duration_secs(node.id)?),
        NodeKind::Movie { src } => {
            let path = resolve_source(sources.assets_root, src);
            let info = sources.decoder.probe_video(&path)?;
            RasterNode::movie(info, Arc::clone(&sources.decoder))
        }
        NodeKind::Image { src, duration } => {
            let path = resolve_source(sources.assets_root, src);
            RasterNode::still(sources.decoder.decode_image(&path)?, *duration)
        }
        NodeKind::Speak(text) => {
            let duration = cache.duration_secs(node.id)?;
            RasterNode::text(sources.text.rasterize(&text.display)?, duration)
        }
        NodeKind::Media(params, child) => media(build_node(child, sources, cache)?, params)?,
        NodeKind::Crop(params, child) => {
            let child = build_node(child, sources, cache)?;
            let c = child.extent();
            let identity = params.x0 == 0
                && params.y0 == 0
                && params.t0 == 0.0
                && params.x1.is_none_or(|x1| x1 >= c.width)
                && params.y1.is_none_or(|y1| y1 >= c.height)
                && params.t1.is_none_or(|t1| t1 >= c.duration);
            if identity {
                child
            } else {
                RasterNode::crop(child, params)?
            }
        }
        NodeKind::Margin(params, child) => {
            let child = build_node(child, sources, cache)?;
            if params.is_identity() {
                child
            } else {
                RasterNode::margin(child, params)?
            }
        }
        NodeKind::Scale(params, child) => {
            let child = build_node(child, sources, cache)?;
            let fxy = params.space_factor(child.width(), child.height())?;
            let ft = params.time_factor(child.duration())?;
            if fxy == 1.0 && ft == 1.0 {
                child
            } else {
                RasterNode::scale(child, fxy, ft)?
            }
        }
        NodeKind::Par(children) => RasterNode::par(
            children
                .iter()
                .map(|c| build_node(c, sources, cache))
                .collect::<ThalaResult<_>>()?,
        )?,
        NodeKind::Seq(children) => RasterNode::seq(
            children
                .iter()
                .map(|c| build_node(c, sources, cache))
                .collect::<ThalaResult<_>>()?,
        )?,
    };
    tracing::debug!(
        id = node.id.0,
        tag = node.kind.tag(),
        kind = out.kind_name(),
        width = out.width(),
        height = out.height(),
        duration = out.duration(),
        "raster node"
    );
    Ok(out)
}

/// Fit `child` into the requested box: shrink (never grow) first, then pad right/bottom/after.
fn media(child: RasterNode, params: &MediaParams) -> ThalaResult<RasterNode> {
    let c = child.extent();
    let mut width = params.width.unwrap_or(c.width);
    let mut height = params.height.unwrap_or(c.height);
    let duration = params.duration.unwrap_or(c.duration);

    let mut node = child;
    if width < c.width || height < c.height || duration < c.duration {
        let ratio = |want: f64, natural: f64| {
            if natural > 0.0 { want / natural } else { 1.0 }
        };
        let fxy = ratio(f64::from(width), f64::from(c.width))
            .min(ratio(f64::from(height), f64::from(c.height)))
            .min(1.0);
        let ft = ratio(duration, c.duration).min(1.0);
        node = RasterNode::scale(node, fxy, ft)?;
        if params.width.is_none() {
            width = node.width();
        }
        if params.height.is_none() {
            height = node.height();
        }
    }

    let s = node.extent();
    if s.width < width || s.height < height || s.duration < duration {
        let pad = MarginParams {
            right: width.saturating_sub(s.width),
            bottom: height.saturating_sub(s.height),
            after: (duration - s.duration).max(0.0),
            ..MarginParams::default()
        };
        node = RasterNode::margin(node, &pad)?;
    }
    Ok(node)
}

#[cfg(test)]
#[path = "../../tests/unit/render/build.rs"]
mod tests;

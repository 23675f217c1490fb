//! Raster nodes: immutable extents plus a pure `image(t)`.

use std::sync::Arc;

use crate::assets::media::{MediaDecoder, VideoInfo};
use crate::foundation::core::Extent;
use crate::foundation::error::{ThalaError, ThalaResult};
use crate::render::composite::alpha_blend;
use crate::render::raster::Raster;
use crate::scene::node::{CropParams, MarginParams};

/// Video-tree element.
///
/// The extent is fixed at construction from the children's extents and the node's own
/// parameters; `image` never changes it. Every `image(t)` call returns a raster of exactly
/// `width x height`, fully transparent outside the node's active time range.
pub struct RasterNode {
    extent: Extent,
    kind: RasterKind,
}

enum RasterKind {
    /// Audio leaf: nothing to show.
    Empty,
    Movie {
        info: VideoInfo,
        decoder: Arc<dyn MediaDecoder>,
    },
    Text(Raster),
    Image(Raster),
    Crop {
        child: Box<RasterNode>,
        x0: u32,
        y0: u32,
        t0: f64,
        t1: f64,
    },
    Margin {
        child: Box<RasterNode>,
        left: u32,
        top: u32,
        before: f64,
    },
    Scale {
        child: Box<RasterNode>,
        ft: f64,
    },
    Par(Vec<RasterNode>),
    Seq(Vec<RasterNode>),
}

impl std::fmt::Debug for RasterNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("RasterNode");
        s.field("kind", &self.kind_name()).field("extent", &self.extent);
        match &self.kind {
            RasterKind::Crop { child, .. }
            | RasterKind::Margin { child, .. }
            | RasterKind::Scale { child, .. } => {
                s.field("child", child);
            }
            RasterKind::Par(children) | RasterKind::Seq(children) => {
                s.field("children", children);
            }
            _ => {}
        }
        s.finish()
    }
}

impl RasterNode {
    /// Degenerate 1x1 canvas lasting `duration` (the visual side of an audio leaf).
    pub fn empty(duration: f64) -> Self {
        Self {
            extent: Extent::new(1, 1, duration.max(0.0)),
            kind: RasterKind::Empty,
        }
    }

    /// Video leaf; every `image` call is a fresh decoder seek.
    pub fn movie(info: VideoInfo, decoder: Arc<dyn MediaDecoder>) -> Self {
        Self {
            extent: Extent::new(info.width, info.height, info.duration_secs()),
            kind: RasterKind::Movie { info, decoder },
        }
    }

    /// Pre-drawn text shown for `duration` seconds.
    pub fn text(raster: Raster, duration: f64) -> Self {
        Self {
            extent: Extent::new(raster.width(), raster.height(), duration.max(0.0)),
            kind: RasterKind::Text(raster),
        }
    }

    /// Still image shown for `duration` seconds.
    pub fn still(raster: Raster, duration: f64) -> Self {
        Self {
            extent: Extent::new(raster.width(), raster.height(), duration.max(0.0)),
            kind: RasterKind::Image(raster),
        }
    }

    /// Sub-rectangle and sub-range of `child`; the far corner is clamped to the child.
    pub fn crop(child: RasterNode, params: &CropParams) -> ThalaResult<Self> {
        let c = child.extent;
        let x1 = params.x1.unwrap_or(c.width).min(c.width);
        let y1 = params.y1.unwrap_or(c.height).min(c.height);
        let t1 = params.t1.unwrap_or(c.duration).min(c.duration);
        let (x0, y0, t0) = (params.x0, params.y0, params.t0);
        if t0 < 0.0 {
            return Err(ThalaError::range(format!("<crop> 0 <= t0 is needed, got {t0}")));
        }
        if x0 > x1 {
            return Err(ThalaError::range(format!(
                "<crop> x0 <= x1 is needed, got x0={x0} x1={x1}"
            )));
        }
        if y0 > y1 {
            return Err(ThalaError::range(format!(
                "<crop> y0 <= y1 is needed, got y0={y0} y1={y1}"
            )));
        }
        if t0 > t1 {
            return Err(ThalaError::range(format!(
                "<crop> t0 <= t1 is needed, got t0={t0} t1={t1}"
            )));
        }
        Ok(Self {
            extent: Extent::new(x1 - x0, y1 - y0, t1 - t0),
            kind: RasterKind::Crop {
                child: Box::new(child),
                x0,
                y0,
                t0,
                t1,
            },
        })
    }

    /// Pad `child` in space and time.
    pub fn margin(child: RasterNode, params: &MarginParams) -> ThalaResult<Self> {
        if params.before < 0.0 || params.after < 0.0 {
            return Err(ThalaError::range(format!(
                "<margin> 0 <= before, after is needed, got {} and {}",
                params.before, params.after
            )));
        }
        let c = child.extent;
        let width = checked_sum(&[params.left, c.width, params.right], "margin width")?;
        let height = checked_sum(&[params.top, c.height, params.bottom], "margin height")?;
        Ok(Self {
            extent: Extent::new(width, height, params.before + c.duration + params.after),
            kind: RasterKind::Margin {
                child: Box::new(child),
                left: params.left,
                top: params.top,
                before: params.before,
            },
        })
    }

    /// Resize by `fxy` and stretch time by `ft`.
    pub fn scale(child: RasterNode, fxy: f64, ft: f64) -> ThalaResult<Self> {
        if !(fxy.is_finite() && fxy > 0.0) {
            return Err(ThalaError::range(format!("<scale> 0 < fxy is needed, got {fxy}")));
        }
        if !(ft.is_finite() && ft > 0.0) {
            return Err(ThalaError::range(format!("<scale> 0 < ft is needed, got {ft}")));
        }
        let c = child.extent;
        let scaled = |v: u32| -> ThalaResult<u32> {
            let out = (f64::from(v) * fxy).round();
            if out > f64::from(u32::MAX) {
                return Err(ThalaError::range(format!(
                    "<scale> fxy={fxy} overflows a {v} pixel side"
                )));
            }
            Ok(out as u32)
        };
        Ok(Self {
            extent: Extent::new(scaled(c.width)?, scaled(c.height)?, c.duration * ft),
            kind: RasterKind::Scale {
                child: Box::new(child),
                ft,
            },
        })
    }

    /// Overlay children, later ones painted over earlier ones.
    pub fn par(children: Vec<RasterNode>) -> ThalaResult<Self> {
        let extent = children
            .iter()
            .map(|c| c.extent)
            .reduce(Extent::max)
            .ok_or_else(|| ThalaError::schema("<par> needs at least 1 child"))?;
        Ok(Self {
            extent,
            kind: RasterKind::Par(children),
        })
    }

    /// Play children one after another.
    pub fn seq(children: Vec<RasterNode>) -> ThalaResult<Self> {
        let first = children
            .first()
            .ok_or_else(|| ThalaError::schema("<seq> needs at least 1 child"))?;
        let mut extent = Extent::new(first.extent.width, first.extent.height, 0.0);
        for c in &children {
            extent.width = extent.width.max(c.extent.width);
            extent.height = extent.height.max(c.extent.height);
            extent.duration += c.extent.duration;
        }
        Ok(Self {
            extent,
            kind: RasterKind::Seq(children),
        })
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn width(&self) -> u32 {
        self.extent.width
    }

    pub fn height(&self) -> u32 {
        self.extent.height
    }

    pub fn duration(&self) -> f64 {
        self.extent.duration
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            RasterKind::Empty => "empty",
            RasterKind::Movie { .. } => "movie",
            RasterKind::Text(_) => "text",
            RasterKind::Image(_) => "image",
            RasterKind::Crop { .. } => "crop",
            RasterKind::Margin { .. } => "margin",
            RasterKind::Scale { .. } => "scale",
            RasterKind::Par(_) => "par",
            RasterKind::Seq(_) => "seq",
        }
    }

    fn blank(&self) -> Raster {
        Raster::blank(self.extent.width, self.extent.height)
    }

    /// Frame at `t` seconds (node-local time).
    pub fn image(&self, t: f64) -> ThalaResult<Raster> {
        let Extent {
            width,
            height,
            duration,
        } = self.extent;
        let active = t >= 0.0 && t < duration;
        match &self.kind {
            RasterKind::Empty => Ok(self.blank()),
            RasterKind::Movie { info, decoder } => {
                if !active {
                    return Ok(self.blank());
                }
                match decoder.decode_video_frame(info, t)? {
                    Some(frame) => Ok(self.fit(frame)),
                    None => Ok(self.blank()),
                }
            }
            RasterKind::Text(raster) | RasterKind::Image(raster) => {
                if active {
                    Ok(raster.clone())
                } else {
                    Ok(self.blank())
                }
            }
            RasterKind::Crop {
                child,
                x0,
                y0,
                t0,
                t1,
            } => {
                if t < 0.0 || t0 + t > *t1 {
                    return Ok(self.blank());
                }
                let frame = child.image(t + t0)?;
                Ok(self.fit(frame.crop(*x0, *y0, x0 + width, y0 + height)))
            }
            RasterKind::Margin {
                child,
                left,
                top,
                before,
            } => {
                let mut out = self.blank();
                if *before <= t && t <= before + child.duration() {
                    alpha_blend(&mut out, &child.image(t - before)?, *left, *top);
                }
                Ok(out)
            }
            RasterKind::Scale { child, ft } => {
                if t > duration {
                    return Ok(self.blank());
                }
                Ok(child.image(t / ft)?.resize(width, height))
            }
            RasterKind::Par(children) => {
                let mut out = self.blank();
                if t > duration {
                    return Ok(out);
                }
                for c in children {
                    alpha_blend(&mut out, &c.image(t)?, 0, 0);
                }
                Ok(out)
            }
            RasterKind::Seq(children) => {
                let mut rest = t;
                for c in children {
                    if rest < c.duration() {
                        let mut out = self.blank();
                        alpha_blend(&mut out, &c.image(rest)?, 0, 0);
                        return Ok(out);
                    }
                    rest -= c.duration();
                }
                Ok(self.blank())
            }
        }
    }

    /// Guarantee the node's own dimensions for rasters produced by collaborators.
    fn fit(&self, frame: Raster) -> Raster {
        if frame.width() == self.extent.width && frame.height() == self.extent.height {
            return frame;
        }
        let mut out = self.blank();
        alpha_blend(&mut out, &frame, 0, 0);
        out
    }
}

fn checked_sum(parts: &[u32], what: &str) -> ThalaResult<u32> {
    parts
        .iter()
        .try_fold(0u32, |acc, v| acc.checked_add(*v))
        .ok_or_else(|| ThalaError::range(format!("{what} overflows u32")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/node.rs"]
mod tests;

//! Typed scene tree.
//!
//! The generic [`Element`] tree is parsed exactly once into a closed set of node kinds. Both
//! the audio pass and the video pass walk this same tree, so their topology cannot diverge.

use std::path::{Path, PathBuf};

use crate::foundation::error::{ThalaError, ThalaResult};
use crate::foundation::units::{parse_gain, parse_time};
use crate::scene::element::Element;

/// Identity of a node within one [`Scene`] (pre-order index).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub id: NodeId,
    pub kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Audio { src: PathBuf },
    Movie { src: PathBuf },
    Image { src: PathBuf, duration: f64 },
    Speak(SpeakText),
    Media(MediaParams, Box<SceneNode>),
    Crop(CropParams, Box<SceneNode>),
    Margin(MarginParams, Box<SceneNode>),
    Scale(ScaleParams, Box<SceneNode>),
    Par(Vec<SceneNode>),
    Seq(Vec<SceneNode>),
}

impl NodeKind {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Audio { .. } => "audio",
            Self::Movie { .. } => "movie",
            Self::Image { .. } => "image",
            Self::Speak(_) => "speak",
            Self::Media(..) => "media",
            Self::Crop(..) => "crop",
            Self::Margin(..) => "margin",
            Self::Scale(..) => "scale",
            Self::Par(_) => "par",
            Self::Seq(_) => "seq",
        }
    }
}

/// The two text streams of a `speak` node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpeakText {
    /// Text drawn on screen: inline children contribute their own text.
    pub display: String,
    /// Text sent to synthesis: inline children contribute their `alias`.
    pub speech: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MediaParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CropParams {
    pub x0: u32,
    pub y0: u32,
    pub t0: f64,
    pub x1: Option<u32>,
    pub y1: Option<u32>,
    pub t1: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MarginParams {
    pub left: u32,
    pub top: u32,
    pub before: f64,
    pub right: u32,
    pub bottom: u32,
    pub after: f64,
}

impl MarginParams {
    pub fn is_identity(&self) -> bool {
        self.left == 0
            && self.top == 0
            && self.right == 0
            && self.bottom == 0
            && self.before == 0.0
            && self.after == 0.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScaleParams {
    pub fxy: Option<f64>,
    /// Alternative source for `fxy` (with `height`).
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub ft: Option<f64>,
    /// Alternative source for `ft`.
    pub duration: Option<f64>,
    /// Audio-only gain in decibels.
    pub sound_level: Option<f64>,
}

impl ScaleParams {
    /// Spatial factor: `fxy`, else `min(width / w0, height / h0)` with each side defaulting
    /// to the child's natural size.
    pub fn space_factor(&self, w0: u32, h0: u32) -> ThalaResult<f64> {
        let fxy = match self.fxy {
            Some(fxy) => fxy,
            None if self.width.is_none() && self.height.is_none() => 1.0,
            None => {
                let ratio = |want: Option<u32>, natural: u32| match want {
                    Some(want) if natural > 0 => f64::from(want) / f64::from(natural),
                    Some(_) => f64::INFINITY,
                    None => 1.0,
                };
                ratio(self.width, w0).min(ratio(self.height, h0))
            }
        };
        if fxy.is_finite() && fxy > 0.0 {
            Ok(fxy)
        } else {
            Err(ThalaError::range(format!(
                "<scale> 0 < fxy is needed, got {fxy} for a {w0}x{h0} child"
            )))
        }
    }

    /// Temporal factor: `ft`, else `duration / d0`, else 1.
    pub fn time_factor(&self, d0: f64) -> ThalaResult<f64> {
        let ft = match (self.ft, self.duration) {
            (Some(ft), _) => ft,
            (None, Some(duration)) if d0 > 0.0 => duration / d0,
            (None, Some(_)) => {
                return Err(ThalaError::range(
                    "<scale> duration cannot be derived from a zero-length child",
                ));
            }
            (None, None) => 1.0,
        };
        if ft.is_finite() && ft > 0.0 {
            Ok(ft)
        } else {
            Err(ThalaError::range(format!("<scale> 0 < ft is needed, got {ft}")))
        }
    }
}

/// A parsed, typed scene tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    root: SceneNode,
    node_count: u32,
}

impl Scene {
    /// Parse and validate an element tree.
    pub fn parse(root: &Element) -> ThalaResult<Self> {
        let mut parser = Parser { next_id: 0 };
        let root = parser.node(root)?;
        Ok(Self {
            root,
            node_count: parser.next_id,
        })
    }

    /// Load a JSON element tree from disk and parse it.
    pub fn from_path(path: impl AsRef<Path>) -> ThalaResult<Self> {
        Self::parse(&Element::from_path(path)?)
    }

    pub fn root(&self) -> &SceneNode {
        &self.root
    }

    pub fn node_count(&self) -> u32 {
        self.node_count
    }
}

struct Parser {
    next_id: u32,
}

impl Parser {
    fn node(&mut self, el: &Element) -> ThalaResult<SceneNode> {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let kind = match el.tag.as_str() {
            "audio" => {
                expect_leaf(el)?;
                NodeKind::Audio { src: src(el)? }
            }
            "movie" => {
                expect_leaf(el)?;
                NodeKind::Movie { src: src(el)? }
            }
            "image" => {
                expect_leaf(el)?;
                let duration = opt_time(el, "duration")?.unwrap_or(0.0);
                non_negative("image", "duration", duration)?;
                NodeKind::Image {
                    src: src(el)?,
                    duration,
                }
            }
            "speak" => NodeKind::Speak(speak_text(el)?),
            "media" => {
                let params = MediaParams {
                    width: opt_u32(el, "width")?,
                    height: opt_u32(el, "height")?,
                    duration: opt_time(el, "duration")?,
                };
                if let Some(d) = params.duration {
                    non_negative("media", "duration", d)?;
                }
                NodeKind::Media(params, Box::new(self.single_child(el)?))
            }
            "crop" => {
                let params = CropParams {
                    x0: opt_u32(el, "x0")?.unwrap_or(0),
                    y0: opt_u32(el, "y0")?.unwrap_or(0),
                    t0: opt_time(el, "t0")?.unwrap_or(0.0),
                    x1: opt_u32(el, "x1")?,
                    y1: opt_u32(el, "y1")?,
                    t1: opt_time(el, "t1")?,
                };
                non_negative("crop", "t0", params.t0)?;
                if let Some(t1) = params.t1 {
                    non_negative("crop", "t1", t1)?;
                }
                NodeKind::Crop(params, Box::new(self.single_child(el)?))
            }
            "margin" => {
                let params = MarginParams {
                    left: opt_u32(el, "left")?.unwrap_or(0),
                    top: opt_u32(el, "top")?.unwrap_or(0),
                    before: opt_time(el, "before")?.unwrap_or(0.0),
                    right: opt_u32(el, "right")?.unwrap_or(0),
                    bottom: opt_u32(el, "bottom")?.unwrap_or(0),
                    after: opt_time(el, "after")?.unwrap_or(0.0),
                };
                non_negative("margin", "before", params.before)?;
                non_negative("margin", "after", params.after)?;
                NodeKind::Margin(params, Box::new(self.single_child(el)?))
            }
            "scale" => {
                let params = ScaleParams {
                    fxy: opt_f64(el, "fxy")?,
                    width: opt_u32(el, "width")?,
                    height: opt_u32(el, "height")?,
                    ft: opt_f64(el, "ft")?,
                    duration: opt_time(el, "duration")?,
                    sound_level: el
                        .get("soundLevel")
                        .map(parse_gain)
                        .transpose()?,
                };
                if let Some(fxy) = params.fxy {
                    positive("scale", "fxy", fxy)?;
                }
                if let Some(ft) = params.ft {
                    positive("scale", "ft", ft)?;
                }
                if let Some(d) = params.duration {
                    non_negative("scale", "duration", d)?;
                }
                NodeKind::Scale(params, Box::new(self.single_child(el)?))
            }
            "par" => NodeKind::Par(self.children(el)?),
            "seq" => NodeKind::Seq(self.children(el)?),
            other => {
                return Err(ThalaError::schema(format!("unknown element tag '{other}'")));
            }
        };

        Ok(SceneNode { id, kind })
    }

    fn single_child(&mut self, el: &Element) -> ThalaResult<SceneNode> {
        match el.children.as_slice() {
            [child] => self.node(child),
            children => Err(ThalaError::schema(format!(
                "<{}> needs exactly 1 child, got {}",
                el.tag,
                children.len()
            ))),
        }
    }

    fn children(&mut self, el: &Element) -> ThalaResult<Vec<SceneNode>> {
        if el.children.is_empty() {
            return Err(ThalaError::schema(format!(
                "<{}> needs at least 1 child",
                el.tag
            )));
        }
        el.children.iter().map(|c| self.node(c)).collect()
    }
}

fn expect_leaf(el: &Element) -> ThalaResult<()> {
    if el.children.is_empty() {
        Ok(())
    } else {
        Err(ThalaError::schema(format!(
            "<{}> takes no children, got {}",
            el.tag,
            el.children.len()
        )))
    }
}

fn src(el: &Element) -> ThalaResult<PathBuf> {
    el.get("src")
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| ThalaError::schema(format!("<{}> requires a 'src' attribute", el.tag)))
}

fn speak_text(el: &Element) -> ThalaResult<SpeakText> {
    let own = el.text.as_deref().unwrap_or("");
    let mut out = SpeakText {
        display: own.to_owned(),
        speech: own.to_owned(),
    };
    for child in &el.children {
        if child.tag != "sub" {
            return Err(ThalaError::schema(format!(
                "<speak> accepts only <sub> children, got <{}>",
                child.tag
            )));
        }
        let alias = child
            .get("alias")
            .ok_or_else(|| ThalaError::schema("<sub> requires an 'alias' attribute"))?;
        let tail = child.tail.as_deref().unwrap_or("");
        out.display.push_str(child.text.as_deref().unwrap_or(""));
        out.display.push_str(tail);
        out.speech.push_str(alias);
        out.speech.push_str(tail);
    }
    Ok(out)
}

fn opt_u32(el: &Element, key: &str) -> ThalaResult<Option<u32>> {
    let Some(raw) = el.get(key) else {
        return Ok(None);
    };
    let v: i64 = raw.trim().parse().map_err(|e| {
        ThalaError::parse(format!("<{}> {key}='{raw}' is not an integer: {e}", el.tag))
    })?;
    u32::try_from(v).map(Some).map_err(|_| {
        ThalaError::range(format!(
            "<{}> {key}={v} must be within 0..={}",
            el.tag,
            u32::MAX
        ))
    })
}

fn opt_f64(el: &Element, key: &str) -> ThalaResult<Option<f64>> {
    let Some(raw) = el.get(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ThalaError::parse(format!(
            "<{}> {key}='{raw}' is not a finite number",
            el.tag
        ))),
    }
}

fn opt_time(el: &Element, key: &str) -> ThalaResult<Option<f64>> {
    el.get(key).map(parse_time).transpose()
}

fn non_negative(tag: &str, key: &str, v: f64) -> ThalaResult<()> {
    if v >= 0.0 {
        Ok(())
    } else {
        Err(ThalaError::range(format!("<{tag}> 0 <= {key} is needed, got {v}")))
    }
}

fn positive(tag: &str, key: &str, v: f64) -> ThalaResult<()> {
    if v > 0.0 {
        Ok(())
    } else {
        Err(ThalaError::range(format!("<{tag}> 0 < {key} is needed, got {v}")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/node.rs"]
mod tests;

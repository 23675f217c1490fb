use crate::foundation::error::{ThalaError, ThalaResult};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> ThalaResult<Self> {
        if den == 0 {
            return Err(ThalaError::range("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(ThalaError::range("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    /// Number of frames sampled from `[0, secs)` on this grid.
    pub fn frames_covering(self, secs: f64) -> u64 {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        (secs * self.as_f64()).ceil() as u64
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 16, den: 1 }
    }
}

/// Natural spatial and temporal size of a raster node.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Extent {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Duration in seconds.
    pub duration: f64,
}

impl Extent {
    pub fn new(width: u32, height: u32, duration: f64) -> Self {
        Self {
            width,
            height,
            duration,
        }
    }

    /// Element-wise maximum, used by `par` and (spatially) by `seq`.
    pub fn max(self, other: Self) -> Self {
        Self {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
            duration: self.duration.max(other.duration),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;

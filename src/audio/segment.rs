use std::borrow::Cow;

use crate::foundation::error::{ThalaError, ThalaResult};

/// Decoded interleaved floating-point PCM.
///
/// Duration is derived from the frame count and the sample rate. Binary operations
/// (`concat`, `overlay`) first bring both operands to the larger sample rate and the larger
/// channel count.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSegment {
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
}

impl AudioSegment {
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> ThalaResult<Self> {
        if sample_rate == 0 {
            return Err(ThalaError::range("audio sample_rate must be > 0"));
        }
        if channels == 0 {
            return Err(ThalaError::range("audio channels must be > 0"));
        }
        if !samples.len().is_multiple_of(usize::from(channels)) {
            return Err(ThalaError::upstream(format!(
                "audio sample count {} is not a multiple of {channels} channels",
                samples.len()
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            samples,
        })
    }

    /// Silence lasting `duration_secs` (truncated to whole frames).
    pub fn silent(duration_secs: f64, sample_rate: u32, channels: u16) -> Self {
        let frames = if duration_secs.is_finite() && duration_secs > 0.0 {
            (duration_secs * f64::from(sample_rate)) as usize
        } else {
            0
        };
        Self {
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
            samples: vec![0.0; frames * usize::from(channels.max(1))],
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / f64::from(self.sample_rate)
    }

    /// Frames in `[t0, t1)` seconds, clipped to the segment.
    pub fn slice_secs(&self, t0: f64, t1: f64) -> Self {
        let frames = self.frame_count();
        let to_frame = |t: f64| ((t.max(0.0) * f64::from(self.sample_rate)) as usize).min(frames);
        let f0 = to_frame(t0);
        let f1 = to_frame(t1).max(f0);
        let n = usize::from(self.channels);
        Self {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples: self.samples[f0 * n..f1 * n].to_vec(),
        }
    }

    /// Trim or pad with trailing silence to exactly `secs` (rounded to whole frames).
    pub fn fit_secs(&self, secs: f64) -> Self {
        let target = if secs.is_finite() && secs > 0.0 {
            (secs * f64::from(self.sample_rate)).round() as usize
        } else {
            0
        };
        let mut samples = self.samples.clone();
        samples.resize(target * usize::from(self.channels), 0.0);
        Self {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples,
        }
    }

    /// `self` followed by `other`.
    pub fn concat(&self, other: &Self) -> Self {
        let (a, b) = sync(self, other);
        let mut samples = Vec::with_capacity(a.samples.len() + b.samples.len());
        samples.extend_from_slice(&a.samples);
        samples.extend_from_slice(&b.samples);
        Self {
            sample_rate: a.sample_rate,
            channels: a.channels,
            samples,
        }
    }

    /// Mix `other` into `self` starting at time zero; the result keeps `self`'s length.
    pub fn overlay(&self, other: &Self) -> Self {
        let (base, top) = sync(self, other);
        let mut out = base.into_owned();
        for (d, s) in out.samples.iter_mut().zip(top.samples.iter()) {
            *d = (*d + *s).clamp(-1.0, 1.0);
        }
        out
    }

    /// Scale amplitude by `gain_db` decibels, saturating at full scale.
    pub fn apply_gain_db(&self, gain_db: f64) -> Self {
        let factor = 10f64.powf(gain_db / 20.0) as f32;
        Self {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples: self
                .samples
                .iter()
                .map(|s| (s * factor).clamp(-1.0, 1.0))
                .collect(),
        }
    }

    /// Reinterpret the samples at `sample_rate / ft`: duration scales by `ft` and pitch shifts.
    pub fn speedup(&self, ft: f64) -> ThalaResult<Self> {
        if !ft.is_finite() || ft <= 0.0 {
            return Err(ThalaError::range(format!(
                "audio time factor must be finite and > 0, got {ft}"
            )));
        }
        let rate = f64::from(self.sample_rate) / ft;
        if !(1.0..=f64::from(u32::MAX)).contains(&rate) {
            return Err(ThalaError::range(format!(
                "audio time factor {ft} yields unusable sample rate {rate}"
            )));
        }
        Ok(Self {
            sample_rate: rate as u32,
            channels: self.channels,
            samples: self.samples.clone(),
        })
    }

    /// Linear-interpolation resample to `sample_rate`, preserving duration.
    pub fn resample(&self, sample_rate: u32) -> Self {
        if sample_rate == self.sample_rate || sample_rate == 0 {
            return self.clone();
        }
        let n = usize::from(self.channels);
        let src_frames = self.frame_count();
        let out_frames = ((src_frames as f64) * f64::from(sample_rate)
            / f64::from(self.sample_rate))
        .round() as usize;
        let mut samples = Vec::with_capacity(out_frames * n);
        if src_frames > 0 {
            let step = f64::from(self.sample_rate) / f64::from(sample_rate);
            for j in 0..out_frames {
                let pos = j as f64 * step;
                let f0 = (pos.floor() as usize).min(src_frames - 1);
                let f1 = (f0 + 1).min(src_frames - 1);
                let frac = (pos - f0 as f64) as f32;
                for c in 0..n {
                    let v0 = self.samples[f0 * n + c];
                    let v1 = self.samples[f1 * n + c];
                    samples.push(v0 + (v1 - v0) * frac);
                }
            }
        }
        Self {
            sample_rate,
            channels: self.channels,
            samples,
        }
    }

    /// Convert to `channels`: mono is duplicated on upmix, channels are averaged on downmix
    /// to mono, other layouts map channel `c` from source channel `c % source_channels`.
    pub fn with_channels(&self, channels: u16) -> Self {
        if channels == self.channels || channels == 0 {
            return self.clone();
        }
        let src_n = usize::from(self.channels);
        let dst_n = usize::from(channels);
        let mut samples = Vec::with_capacity(self.frame_count() * dst_n);
        for frame in self.samples.chunks_exact(src_n) {
            if dst_n == 1 {
                samples.push(frame.iter().sum::<f32>() / src_n as f32);
            } else {
                samples.extend((0..dst_n).map(|c| frame[c % src_n]));
            }
        }
        Self {
            sample_rate: self.sample_rate,
            channels,
            samples,
        }
    }
}

fn sync<'a>(
    a: &'a AudioSegment,
    b: &'a AudioSegment,
) -> (Cow<'a, AudioSegment>, Cow<'a, AudioSegment>) {
    let rate = a.sample_rate.max(b.sample_rate);
    let channels = a.channels.max(b.channels);
    let conform = |s: &'a AudioSegment| -> Cow<'a, AudioSegment> {
        if s.sample_rate == rate && s.channels == channels {
            Cow::Borrowed(s)
        } else {
            Cow::Owned(s.with_channels(channels).resample(rate))
        }
    };
    (conform(a), conform(b))
}

#[cfg(test)]
#[path = "../../tests/unit/audio/segment.rs"]
mod tests;

use crate::foundation::error::{ThalaError, ThalaResult};

/// Channel layout of a [`Raster`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channels {
    /// Opaque RGB8.
    Rgb,
    /// Straight-alpha RGBA8.
    Rgba,
}

impl Channels {
    pub fn count(self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

/// Row-major 8-bit pixel buffer with an optional (straight) alpha channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    channels: Channels,
    data: Vec<u8>,
}

impl Raster {
    /// Fully transparent RGBA canvas.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            channels: Channels::Rgba,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Canvas where every pixel equals `px` (3 or 4 bytes, matching `channels`).
    pub fn filled(width: u32, height: u32, channels: Channels, px: &[u8]) -> ThalaResult<Self> {
        if px.len() != channels.count() {
            return Err(ThalaError::range(format!(
                "fill pixel has {} bytes, expected {}",
                px.len(),
                channels.count()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data: px.repeat(width as usize * height as usize),
        })
    }

    pub fn from_raw(
        width: u32,
        height: u32,
        channels: Channels,
        data: Vec<u8>,
    ) -> ThalaResult<Self> {
        let expected = width as usize * height as usize * channels.count();
        if data.len() != expected {
            return Err(ThalaError::upstream(format!(
                "raster byte len mismatch: got {}, expected {expected} for {width}x{height}x{}",
                data.len(),
                channels.count()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Convert a decoded image, keeping alpha only when the source has it.
    pub fn from_dynamic_image(img: image::DynamicImage) -> Self {
        if img.color().has_alpha() {
            let rgba = img.into_rgba8();
            let (width, height) = rgba.dimensions();
            Self {
                width,
                height,
                channels: Channels::Rgba,
                data: rgba.into_raw(),
            }
        } else {
            let rgb = img.into_rgb8();
            let (width, height) = rgb.dimensions();
            Self {
                width,
                height,
                channels: Channels::Rgb,
                data: rgb.into_raw(),
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Pixel at `(x, y)` as RGBA; opaque rasters report alpha 255.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let n = self.channels.count();
        let i = (y as usize * self.width as usize + x as usize) * n;
        let px = &self.data[i..i + n];
        Some(match self.channels {
            Channels::Rgb => [px[0], px[1], px[2], 255],
            Channels::Rgba => [px[0], px[1], px[2], px[3]],
        })
    }

    /// Sub-rectangle `[x0, x1) x [y0, y1)`, clipped to the raster bounds.
    pub fn crop(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        let x0 = x0.min(x1);
        let y0 = y0.min(y1);
        let n = self.channels.count();
        let row_len = (x1 - x0) as usize * n;
        let mut data = Vec::with_capacity(row_len * (y1 - y0) as usize);
        for y in y0..y1 {
            let start = (y as usize * self.width as usize + x0 as usize) * n;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Self {
            width: x1 - x0,
            height: y1 - y0,
            channels: self.channels,
            data,
        }
    }

    /// Bilinear resize to exactly `width x height`.
    pub fn resize(&self, width: u32, height: u32) -> Self {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let n = self.channels.count();
        if width == 0 || height == 0 || self.width == 0 || self.height == 0 {
            return Self {
                width,
                height,
                channels: self.channels,
                data: vec![0; width as usize * height as usize * n],
            };
        }
        let filter = image::imageops::FilterType::Triangle;
        let data = match self.channels {
            Channels::Rgb => {
                let buf = image::ImageBuffer::<image::Rgb<u8>, &[u8]>::from_raw(
                    self.width,
                    self.height,
                    self.data.as_slice(),
                );
                buf.map(|b| image::imageops::resize(&b, width, height, filter).into_raw())
            }
            Channels::Rgba => {
                let buf = image::ImageBuffer::<image::Rgba<u8>, &[u8]>::from_raw(
                    self.width,
                    self.height,
                    self.data.as_slice(),
                );
                buf.map(|b| image::imageops::resize(&b, width, height, filter).into_raw())
            }
        };
        Self {
            width,
            height,
            channels: self.channels,
            // `data` always matches the declared dimensions.
            data: data.unwrap_or_else(|| vec![0; width as usize * height as usize * n]),
        }
    }

    /// Packed RGB24, dropping alpha.
    pub fn to_rgb24(&self) -> Vec<u8> {
        match self.channels {
            Channels::Rgb => self.data.clone(),
            Channels::Rgba => self
                .data
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
        }
    }

    /// Packed straight-alpha RGBA8.
    pub fn to_rgba8(&self) -> Vec<u8> {
        match self.channels {
            Channels::Rgba => self.data.clone(),
            Channels::Rgb => self
                .data
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 255])
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;

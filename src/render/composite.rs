use crate::render::raster::{Channels, Raster};

/// Paint `src` onto `dst` with its top-left corner at `(left, top)`, clipped to `dst`.
///
/// An opaque (RGB) source overwrites the covered region and forces destination alpha to 255.
/// An RGBA source is blended with straight-alpha "over"; destination alpha accumulates as
/// `1 - (1 - dst_a) * (1 - src_a)`.
pub fn alpha_blend(dst: &mut Raster, src: &Raster, left: u32, top: u32) {
    let w = dst.width().saturating_sub(left).min(src.width()) as usize;
    let h = dst.height().saturating_sub(top).min(src.height()) as usize;
    if w == 0 || h == 0 {
        return;
    }

    let dst_n = dst.channels().count();
    let src_n = src.channels().count();
    let dst_w = dst.width() as usize;
    let src_w = src.width() as usize;
    let dst_has_alpha = dst.channels() == Channels::Rgba;
    let (left, top) = (left as usize, top as usize);

    let src_data = src.data();
    let dst_data = dst.data_mut();
    for y in 0..h {
        let s_row = y * src_w * src_n;
        let d_row = ((top + y) * dst_w + left) * dst_n;
        for x in 0..w {
            let s = &src_data[s_row + x * src_n..s_row + (x + 1) * src_n];
            let d = &mut dst_data[d_row + x * dst_n..d_row + (x + 1) * dst_n];
            match src.channels() {
                Channels::Rgb => {
                    d[..3].copy_from_slice(&s[..3]);
                    if dst_has_alpha {
                        d[3] = 255;
                    }
                }
                Channels::Rgba => over_straight(d, s, dst_has_alpha),
            }
        }
    }
}

fn over_straight(d: &mut [u8], s: &[u8], dst_has_alpha: bool) {
    let mask = f32::from(s[3]) / 255.0;
    let inv = 1.0 - mask;
    for i in 0..3 {
        d[i] = (f32::from(d[i]) * inv + f32::from(s[i]) * mask).round() as u8;
    }
    if dst_has_alpha {
        let da = f32::from(d[3]) / 255.0;
        d[3] = ((1.0 - (1.0 - da) * inv) * 255.0).round() as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;

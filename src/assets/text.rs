use std::path::PathBuf;

use crate::foundation::config::EngineConfig;
use crate::foundation::error::{ThalaError, ThalaResult};
use crate::render::raster::{Channels, Raster};

/// Draws a string onto a tight, transparent RGBA raster.
pub trait TextRasterizer {
    fn rasterize(&mut self, text: &str) -> ThalaResult<Raster>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// [`TextRasterizer`] that shapes with Parley and fills glyphs with `vello_cpu`.
///
/// The font file is read on first use, so an engine without `speak` nodes never needs one.
pub struct ParleyTextRasterizer {
    font_path: Option<PathBuf>,
    font_index: u32,
    size_px: f32,
    brush: TextBrushRgba8,
    font: Option<LoadedFont>,
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

struct LoadedFont {
    family_name: String,
    weight: parley::style::FontWeight,
    style: parley::style::FontStyle,
    width: parley::style::FontWidth,
    data: vello_cpu::peniko::FontData,
}

impl ParleyTextRasterizer {
    pub fn new(config: &EngineConfig) -> Self {
        let [r, g, b, a] = config.text_color;
        Self {
            font_path: config.font_path.clone(),
            font_index: config.font_index,
            size_px: config.font_size,
            brush: TextBrushRgba8 { r, g, b, a },
            font: None,
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    fn ensure_font(&mut self) -> ThalaResult<()> {
        if self.font.is_some() {
            return Ok(());
        }
        let path = self
            .font_path
            .as_ref()
            .ok_or_else(|| ThalaError::config("text rendering requires `font_path`"))?;
        let bytes = std::fs::read(path).map_err(|e| {
            ThalaError::config(format!("read font '{}': {e}", path.display()))
        })?;

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        // Layout must resolve to the same face that glyphs are drawn from.
        let (family_id, face) = families
            .iter()
            .find_map(|(id, faces)| {
                faces
                    .iter()
                    .find(|f| f.index() == self.font_index)
                    .map(|f| (*id, f))
            })
            .ok_or_else(|| {
                ThalaError::config(format!(
                    "font '{}' has no face with index {}",
                    path.display(),
                    self.font_index
                ))
            })?;
        let (weight, style, width) = (face.weight(), face.style(), face.width());
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ThalaError::config("registered font family has no name"))?
            .to_string();

        let data = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(bytes),
            self.font_index,
        );
        tracing::debug!(family = %family_name, path = %path.display(), "loaded font");
        self.font = Some(LoadedFont {
            family_name,
            weight,
            style,
            width,
            data,
        });
        Ok(())
    }
}

impl TextRasterizer for ParleyTextRasterizer {
    #[tracing::instrument(skip(self))]
    fn rasterize(&mut self, text: &str) -> ThalaResult<Raster> {
        self.ensure_font()?;
        let Some(font) = self.font.as_ref() else {
            return Err(ThalaError::config("font unavailable"));
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(font.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontWeight(font.weight));
        builder.push_default(parley::style::StyleProperty::FontStyle(font.style));
        builder.push_default(parley::style::StyleProperty::FontWidth(font.width));
        builder.push_default(parley::style::StyleProperty::FontSize(self.size_px));
        builder.push_default(parley::style::StyleProperty::Brush(self.brush));
        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);

        let width = layout.width().ceil().max(1.0);
        let height = layout.height().ceil().max(1.0);
        if width > f32::from(u16::MAX) || height > f32::from(u16::MAX) {
            return Err(ThalaError::range(format!(
                "text raster {width}x{height} exceeds the drawable size"
            )));
        }
        let (w, h) = (width as u16, height as u16);

        let mut ctx = vello_cpu::RenderContext::new(w, h);
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font.data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);

        let mut data = pixmap.data_as_u8_slice().to_vec();
        unpremultiply_in_place(&mut data);
        Raster::from_raw(u32::from(w), u32::from(h), Channels::Rgba, data)
    }
}

/// Convert premultiplied RGBA8 to straight alpha.
pub(crate) fn unpremultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        if a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/text.rs"]
mod tests;

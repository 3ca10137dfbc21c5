use crate::foundation::error::{StippleError, StippleResult};

/// RGBA8 brush color carried through Parley text layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlyphBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl GlyphBrush {
    pub const BLACK: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };
}

/// Stateful helper for shaping glyph marks from raw font bytes.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<GlyphBrush>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Register font bytes with the font collection and return the primary
    /// family name. Glyph styles resolve against this family only; no system
    /// font fallback is consulted.
    pub fn register_font(&mut self, font_bytes: &[u8]) -> StippleResult<String> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            StippleError::invalid_parameter("no font families registered from font bytes")
        })?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| {
                StippleError::invalid_parameter("registered font family has no name")
            })?
            .to_string();
        Ok(family_name)
    }

    /// Shape and lay out a short piece of text in a previously registered family.
    pub fn layout(
        &mut self,
        text: &str,
        family: &str,
        size_px: f32,
        brush: GlyphBrush,
    ) -> StippleResult<parley::Layout<GlyphBrush>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(StippleError::invalid_parameter(
                "glyph size_px must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family.to_string())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<GlyphBrush> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_font_rejects_garbage_bytes() {
        let mut engine = TextLayoutEngine::new();
        let err = engine.register_font(b"not a font").unwrap_err();
        assert!(matches!(err, StippleError::InvalidParameter(_)));
    }

    #[test]
    fn layout_rejects_non_positive_size() {
        let mut engine = TextLayoutEngine::new();
        assert!(engine.layout("A", "Anywhere", 0.0, GlyphBrush::BLACK).is_err());
        assert!(
            engine
                .layout("A", "Anywhere", f32::NAN, GlyphBrush::BLACK)
                .is_err()
        );
    }
}

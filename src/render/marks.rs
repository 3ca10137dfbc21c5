use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use kurbo::{Point, Shape as _};

use crate::foundation::error::{StippleError, StippleResult};
use crate::foundation::math::GlyphRng;
use crate::render::text::{GlyphBrush, TextLayoutEngine};

/// Path flattening tolerance for mark outlines, in pixels.
const PATH_TOLERANCE: f64 = 0.1;

/// The glyph painted by the emoji mark style.
pub const EMOJI_MARK: char = '\u{1F431}'; // 🐱

/// Closed set of mark styles. One style is selected before a render begins and
/// held constant for its duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkStyle {
    /// Filled circle, radius `(k/2) * (1 - s)`.
    Dots,
    /// Diagonal stroke across the block, width `(k/2) * (1 - s)`.
    Line,
    /// Random uppercase letter at font size `2k * (1 - s)`.
    Char,
    /// Fixed cat-face glyph at font size `k * (1 - s)`.
    Emoji,
}

impl MarkStyle {
    /// Glyph styles shape text and therefore need font bytes.
    pub fn needs_font(self) -> bool {
        matches!(self, Self::Char | Self::Emoji)
    }
}

/// Dot radius for block size `k` and luminance `s`.
pub fn dot_radius(block_size: u32, s: f64) -> f64 {
    f64::from(block_size) / 2.0 * (1.0 - s)
}

/// Stroke width of the line mark for block size `k` and luminance `s`.
pub fn line_width(block_size: u32, s: f64) -> f64 {
    f64::from(block_size) / 2.0 * (1.0 - s)
}

/// Font size of the char mark for block size `k` and luminance `s`.
pub fn char_font_size(block_size: u32, s: f64) -> f64 {
    2.0 * f64::from(block_size) * (1.0 - s)
}

/// Font size of the emoji mark for block size `k` and luminance `s`.
pub fn emoji_font_size(block_size: u32, s: f64) -> f64 {
    f64::from(block_size) * (1.0 - s)
}

/// One planned paint operation.
///
/// Planning is separated from painting so the raster pass and the vector (SVG)
/// export share a single description of every mark.
#[derive(Clone, Debug, PartialEq)]
pub enum Mark {
    Dot {
        center: Point,
        radius: f64,
    },
    Stroke {
        from: Point,
        to: Point,
        width: f64,
    },
    /// A single glyph. `left` is the left edge of the text run, `baseline` the
    /// text baseline in surface coordinates.
    Glyph {
        ch: char,
        left: f64,
        baseline: f64,
        size: f64,
    },
}

impl Mark {
    /// Whether this mark rasterizes to anything perceptible. Cells with
    /// luminance 1.0 plan zero-sized marks that are counted but paint nothing.
    pub fn is_visible(&self) -> bool {
        match self {
            Self::Dot { radius, .. } => *radius > 0.0,
            Self::Stroke { width, .. } => *width > 0.0,
            Self::Glyph { size, .. } => *size > 0.0,
        }
    }
}

/// Plan the mark for one grid cell.
///
/// `s` is the cell's luminance in `[0, 1]`; every style maps `s == 0` to its
/// maximum-size mark and `s == 1` to a zero-sized one.
pub fn plan_mark(
    style: MarkStyle,
    center: Point,
    s: f64,
    block_size: u32,
    rng: &mut GlyphRng,
) -> Mark {
    let k = f64::from(block_size);
    match style {
        MarkStyle::Dots => Mark::Dot {
            center,
            radius: dot_radius(block_size, s),
        },
        MarkStyle::Line => Mark::Stroke {
            from: Point::new(center.x - k / 2.0, center.y - k / 2.0),
            to: Point::new(center.x + k / 2.0, center.y + k / 2.0),
            width: line_width(block_size, s),
        },
        MarkStyle::Char => {
            let size = char_font_size(block_size, s);
            Mark::Glyph {
                ch: rng.next_letter(),
                left: center.x - 0.4 * size,
                baseline: center.y + size / 2.0,
                size,
            }
        }
        MarkStyle::Emoji => Mark::Glyph {
            ch: EMOJI_MARK,
            left: center.x - k / 2.0,
            baseline: center.y + k / 2.0,
            size: emoji_font_size(block_size, s),
        },
    }
}

/// Font bytes backing the glyph mark styles.
#[derive(Clone, Debug)]
pub struct MarkFont {
    bytes: Arc<Vec<u8>>,
}

impl MarkFont {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(bytes),
        }
    }

    pub fn from_path(path: &Path) -> StippleResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        Ok(Self::from_bytes(bytes))
    }
}

struct LoadedFont {
    family: String,
    data: vello_cpu::peniko::FontData,
}

/// Paints [`Mark`]s into a `vello_cpu` render context.
///
/// Stateless between marks apart from the shared glyph shaping contexts; the
/// same painter serves every tick of a render session.
pub struct MarkPainter {
    text: TextLayoutEngine,
    font: Option<LoadedFont>,
}

impl MarkPainter {
    /// Build a painter, registering `font` for glyph styles if provided.
    pub fn new(font: Option<MarkFont>) -> StippleResult<Self> {
        let mut text = TextLayoutEngine::new();
        let font = match font {
            Some(f) => {
                let family = text.register_font(&f.bytes)?;
                let data = vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(f.bytes.to_vec()),
                    0,
                );
                Some(LoadedFont { family, data })
            }
            None => None,
        };
        Ok(Self { text, font })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub(crate) fn paint(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        mark: &Mark,
    ) -> StippleResult<()> {
        if !mark.is_visible() {
            return Ok(());
        }

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255));

        match *mark {
            Mark::Dot { center, radius } => {
                let circle = kurbo::Circle::new(center, radius);
                ctx.fill_path(&cpu_path(circle.path_elements(PATH_TOLERANCE)));
                Ok(())
            }
            Mark::Stroke { from, to, width } => {
                let mut seg = kurbo::BezPath::new();
                seg.move_to(from);
                seg.line_to(to);
                let outline = kurbo::stroke(
                    seg,
                    &kurbo::Stroke::new(width),
                    &kurbo::StrokeOpts::default(),
                    PATH_TOLERANCE,
                );
                ctx.fill_path(&cpu_path(outline.into_iter()));
                Ok(())
            }
            Mark::Glyph {
                ch,
                left,
                baseline,
                size,
            } => self.paint_glyph(ctx, ch, left, baseline, size),
        }
    }

    fn paint_glyph(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        ch: char,
        left: f64,
        baseline: f64,
        size: f64,
    ) -> StippleResult<()> {
        let font = self.font.as_ref().ok_or_else(|| {
            StippleError::invalid_parameter("glyph mark styles require a font")
        })?;

        let mut buf = [0u8; 4];
        let text = ch.encode_utf8(&mut buf);
        let layout = self
            .text
            .layout(text, &font.family, size as f32, GlyphBrush::BLACK)?;

        // Parley positions glyphs relative to the layout's top edge; shift so
        // the first line's baseline lands at the requested y.
        let layout_baseline = layout
            .lines()
            .next()
            .map(|line| line.metrics().baseline)
            .unwrap_or(0.0);
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            left,
            baseline - f64::from(layout_baseline),
        )));

        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font.data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        Ok(())
    }
}

fn cpu_path(els: impl IntoIterator<Item = kurbo::PathEl>) -> vello_cpu::kurbo::BezPath {
    let mut p = vello_cpu::kurbo::BezPath::new();
    for el in els {
        p.push(el);
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_and_line_sizes_are_affine_in_luminance() {
        // size(0) is the maximum, size(1) is zero, and the midpoint is exact.
        assert_eq!(dot_radius(10, 0.0), 5.0);
        assert_eq!(dot_radius(10, 1.0), 0.0);
        assert_eq!(dot_radius(10, 0.5), 2.5);

        assert_eq!(line_width(8, 0.0), 4.0);
        assert_eq!(line_width(8, 1.0), 0.0);
        assert_eq!(line_width(8, 0.25), 3.0);
    }

    #[test]
    fn glyph_sizes_scale_with_block() {
        assert_eq!(char_font_size(10, 0.0), 20.0);
        assert_eq!(char_font_size(10, 1.0), 0.0);
        assert_eq!(emoji_font_size(10, 0.0), 10.0);
        assert_eq!(emoji_font_size(10, 1.0), 0.0);
    }

    #[test]
    fn darker_cells_never_get_smaller_marks() {
        let mut prev = f64::INFINITY;
        for step in 0..=10 {
            let s = f64::from(step) / 10.0;
            let r = dot_radius(12, s);
            assert!(r < prev, "radius must strictly decrease with luminance");
            prev = r;
        }
    }

    #[test]
    fn plan_dot_centers_and_sizes() {
        let mut rng = GlyphRng::new(0);
        let mark = plan_mark(MarkStyle::Dots, Point::new(15.0, 5.0), 0.0, 10, &mut rng);
        assert_eq!(
            mark,
            Mark::Dot {
                center: Point::new(15.0, 5.0),
                radius: 5.0
            }
        );
        assert!(mark.is_visible());
    }

    #[test]
    fn plan_line_spans_the_block_diagonal() {
        let mut rng = GlyphRng::new(0);
        let mark = plan_mark(MarkStyle::Line, Point::new(5.0, 5.0), 0.5, 10, &mut rng);
        assert_eq!(
            mark,
            Mark::Stroke {
                from: Point::new(0.0, 0.0),
                to: Point::new(10.0, 10.0),
                width: 2.5
            }
        );
    }

    #[test]
    fn plan_char_offsets_follow_font_size() {
        let mut rng = GlyphRng::new(9);
        let mark = plan_mark(MarkStyle::Char, Point::new(50.0, 50.0), 0.0, 10, &mut rng);
        let Mark::Glyph {
            ch,
            left,
            baseline,
            size,
        } = mark
        else {
            panic!("char style must plan a glyph");
        };
        assert!(ch.is_ascii_uppercase());
        assert_eq!(size, 20.0);
        assert_eq!(left, 50.0 - 0.4 * 20.0);
        assert_eq!(baseline, 50.0 + 10.0);
    }

    #[test]
    fn plan_emoji_uses_block_offsets() {
        let mut rng = GlyphRng::new(0);
        let mark = plan_mark(MarkStyle::Emoji, Point::new(50.0, 50.0), 0.25, 8, &mut rng);
        assert_eq!(
            mark,
            Mark::Glyph {
                ch: EMOJI_MARK,
                left: 46.0,
                baseline: 54.0,
                size: 6.0
            }
        );
    }

    #[test]
    fn bright_cells_plan_invisible_marks() {
        let mut rng = GlyphRng::new(0);
        for style in [
            MarkStyle::Dots,
            MarkStyle::Line,
            MarkStyle::Char,
            MarkStyle::Emoji,
        ] {
            let mark = plan_mark(style, Point::new(5.0, 5.0), 1.0, 10, &mut rng);
            assert!(!mark.is_visible(), "{style:?} must vanish at s == 1");
        }
    }

    #[test]
    fn char_glyphs_are_seeded() {
        let mut a = GlyphRng::new(1);
        let mut b = GlyphRng::new(1);
        for _ in 0..32 {
            let ma = plan_mark(MarkStyle::Char, Point::new(0.0, 0.0), 0.0, 10, &mut a);
            let mb = plan_mark(MarkStyle::Char, Point::new(0.0, 0.0), 0.0, 10, &mut b);
            assert_eq!(ma, mb);
        }
    }

    #[test]
    fn painter_without_font_rejects_glyph_marks() {
        let mut painter = MarkPainter::new(None).unwrap();
        let mut ctx = vello_cpu::RenderContext::new(16, 16);
        let mark = Mark::Glyph {
            ch: 'A',
            left: 0.0,
            baseline: 10.0,
            size: 12.0,
        };
        let err = painter.paint(&mut ctx, &mark).unwrap_err();
        assert!(matches!(err, StippleError::InvalidParameter(_)));
    }
}

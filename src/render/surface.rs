use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

use crate::foundation::error::{StippleError, StippleResult};
use crate::foundation::math::mul_div255_u8;
use crate::render::marks::{Mark, MarkPainter};

/// CPU raster surface that marks are painted onto, plus a vector journal of
/// every mark painted so far.
///
/// Pixels are premultiplied RGBA8 end-to-end, starting from an opaque white
/// fill. The journal is what makes vector (SVG) export possible after the
/// raster render completes.
#[derive(Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    committed: vello_cpu::Pixmap,
    scratch: vello_cpu::Pixmap,
    ctx: vello_cpu::RenderContext,
    journal: Vec<Mark>,
}

impl Surface {
    /// Allocate a white-filled surface. Dimensions must be non-zero and fit
    /// the rasterizer's `u16` coordinate space.
    pub fn new(width: u32, height: u32) -> StippleResult<Self> {
        if width == 0 || height == 0 {
            return Err(StippleError::invalid_parameter(
                "surface dimensions must be > 0",
            ));
        }
        let w: u16 = width
            .try_into()
            .map_err(|_| StippleError::invalid_parameter("surface width exceeds u16"))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| StippleError::invalid_parameter("surface height exceeds u16"))?;

        let mut committed = vello_cpu::Pixmap::new(w, h);
        committed.data_as_u8_slice_mut().fill(255); // opaque white
        let scratch = vello_cpu::Pixmap::new(w, h);
        let ctx = vello_cpu::RenderContext::new(w, h);

        Ok(Self {
            width,
            height,
            committed,
            scratch,
            ctx,
            journal: Vec::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of marks painted so far (zero-sized marks included).
    pub fn marks_painted(&self) -> usize {
        self.journal.len()
    }

    /// Painted marks in paint order.
    pub fn marks(&self) -> &[Mark] {
        &self.journal
    }

    /// Committed pixels in premultiplied RGBA8.
    pub fn pixels_premul(&self) -> &[u8] {
        self.committed.data_as_u8_slice()
    }

    /// Rasterize one batch of marks and composite it over the committed
    /// pixels. The rasterizer renders each batch into a fresh scratch buffer,
    /// so accumulation happens with a premultiplied OVER onto the surface.
    pub(crate) fn paint_batch(
        &mut self,
        painter: &mut MarkPainter,
        marks: &[Mark],
    ) -> StippleResult<()> {
        if marks.is_empty() {
            return Ok(());
        }

        self.ctx.reset();
        for mark in marks {
            painter.paint(&mut self.ctx, mark)?;
        }
        self.ctx.flush();

        self.scratch.data_as_u8_slice_mut().fill(0);
        self.ctx.render_to_pixmap(&mut self.scratch);
        premul_over_in_place(
            self.committed.data_as_u8_slice_mut(),
            self.scratch.data_as_u8_slice(),
        )?;

        self.journal.extend_from_slice(marks);
        Ok(())
    }

    /// Committed pixels converted back to straight (non-premultiplied) RGBA8.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = self.committed.data_as_u8_slice().to_vec();
        for px in out.chunks_exact_mut(4) {
            let a = px[3];
            if a == 0 {
                px[0] = 0;
                px[1] = 0;
                px[2] = 0;
                continue;
            }
            if a != 255 {
                for c in px.iter_mut().take(3) {
                    *c = ((u16::from(*c) * 255 + u16::from(a) / 2) / u16::from(a)).min(255) as u8;
                }
            }
        }
        out
    }

    /// Encode the surface as PNG bytes.
    pub fn to_png_bytes(&self) -> StippleResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.to_rgba8())
            .ok_or_else(|| StippleError::render("surface buffer size mismatch"))?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| StippleError::render(format!("encode png: {e}")))?;
        Ok(buf)
    }

    /// Encode the surface as a `data:image/png;base64,` URL.
    pub fn to_png_data_url(&self) -> StippleResult<String> {
        let png = self.to_png_bytes()?;
        Ok(format!(
            "data:image/png;base64,{}",
            BASE64_STANDARD.encode(png)
        ))
    }

    /// Emit the mark journal as an SVG document. Zero-sized marks are
    /// journaled but omitted here; they have no visible rendering.
    pub fn to_svg(&self) -> String {
        use std::fmt::Write as _;

        let (w, h) = (self.width, self.height);
        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
        );
        let _ = writeln!(out, r##"  <rect width="{w}" height="{h}" fill="#ffffff"/>"##);

        for mark in &self.journal {
            if !mark.is_visible() {
                continue;
            }
            match *mark {
                Mark::Dot { center, radius } => {
                    let _ = writeln!(
                        out,
                        r##"  <circle cx="{}" cy="{}" r="{}" fill="#000000"/>"##,
                        center.x, center.y, radius
                    );
                }
                Mark::Stroke { from, to, width } => {
                    let _ = writeln!(
                        out,
                        r##"  <line x1="{}" y1="{}" x2="{}" y2="{}" stroke="#000000" stroke-width="{}"/>"##,
                        from.x, from.y, to.x, to.y, width
                    );
                }
                Mark::Glyph {
                    ch,
                    left,
                    baseline,
                    size,
                } => {
                    let _ = writeln!(
                        out,
                        r#"  <text x="{left}" y="{baseline}" font-family="monospace" font-size="{size}">{ch}</text>"#
                    );
                }
            }
        }

        out.push_str("</svg>\n");
        out
    }
}

/// Premultiplied source-over: `dst = src + dst * (1 - src.a)`.
fn premul_over_in_place(dst: &mut [u8], src: &[u8]) -> StippleResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(StippleError::render(
            "premul_over_in_place expects equal-length rgba8 buffers",
        ));
    }

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = s[3];
        if sa == 0 {
            continue;
        }
        let inv = 255u16 - u16::from(sa);
        for c in 0..4 {
            d[c] = s[c].saturating_add(mul_div255_u8(u16::from(d[c]), inv));
        }
    }
    Ok(())
}

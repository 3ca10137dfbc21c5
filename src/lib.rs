//! Stipple turns a raster image into an animated halftone drawing.
//!
//! The pipeline reduces the source image to a grid of per-block luminance
//! values, then paints one decorative mark per grid cell onto a CPU raster
//! surface. Marks are sized inversely to luminance (darker block, larger
//! mark) and are painted a bounded batch at a time so the drawing appears
//! sketched in over many ticks instead of all at once.
//!
//! # Pipeline overview
//!
//! 1. **Decode**: image bytes -> [`SourceImage`] (straight RGBA8)
//! 2. **Sample**: `SourceImage + block size` -> [`HalftoneGrid`] (row-major luminance cells)
//! 3. **Render**: [`RenderSession`] paints marks for a [`MarkStyle`] onto a [`Surface`],
//!    at most `marks_per_tick` per tick, yielding between ticks
//! 4. **Export**: the finished [`Surface`] encodes to PNG bytes, a PNG data URL,
//!    or an SVG document
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic sampling**: grid construction is pure; randomness lives only
//!   in the glyph mark style and is seeded via [`SessionOpts`].
//! - **Strict paint order**: marks are painted in row-major cell order and ticks
//!   never interleave; a [`CancelToken`] is checked once per tick boundary.
//! - **Premultiplied RGBA8** on the surface end-to-end; export converts back to
//!   straight alpha.
#![forbid(unsafe_code)]

mod assets;
mod foundation;
mod halftone;
mod pipeline;
mod render;

pub use assets::decode::{SourceImage, decode_image, load_image};
pub use foundation::core::{Point, TickRate, Vec2};
pub use foundation::error::{StippleError, StippleResult};
pub use foundation::math::GlyphRng;
pub use halftone::grid::{HalftoneGrid, build_grid};
pub use halftone::sampler::{pixel_luminance, sample_block};
pub use pipeline::{
    PipelineConfig, RenderSupervisor, render_halftone, render_halftone_with_cancel,
};
pub use render::marks::{
    EMOJI_MARK, Mark, MarkFont, MarkPainter, MarkStyle, char_font_size, dot_radius,
    emoji_font_size, line_width, plan_mark,
};
pub use render::session::{CancelToken, RenderSession, SessionOpts, TickOutcome};
pub use render::surface::Surface;
pub use render::text::{GlyphBrush, TextLayoutEngine};

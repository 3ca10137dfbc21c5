//! Mark rendering: styles and geometry, glyph shaping, the raster surface,
//! and the incremental tick-driven render session.

pub mod marks;
pub mod session;
pub mod surface;
pub mod text;

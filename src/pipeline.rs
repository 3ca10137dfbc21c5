use std::path::Path;

use crate::assets::decode::decode_image;
use crate::foundation::core::TickRate;
use crate::foundation::error::{StippleError, StippleResult};
use crate::halftone::grid::build_grid;
use crate::render::marks::{MarkFont, MarkPainter, MarkStyle};
use crate::render::session::{CancelToken, RenderSession, SessionOpts};
use crate::render::surface::Surface;

/// Immutable configuration for one pipeline invocation.
///
/// Captured once at invocation time; a running render never re-reads shared
/// state mid-pipeline.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Square block edge length in source pixels.
    pub block_size: u32,
    /// Mark style for this render.
    pub style: MarkStyle,
    /// Maximum marks painted per tick.
    pub marks_per_tick: u32,
    /// Tick frequency of the draw loop.
    pub tick_rate: TickRate,
    /// Seed for the glyph RNG.
    pub seed: u64,
    /// Sleep between ticks for an observable, real-time draw.
    pub paced: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            block_size: 10,
            style: MarkStyle::Dots,
            marks_per_tick: 512,
            tick_rate: TickRate::default(),
            seed: 0,
            paced: true,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(json: &str) -> StippleResult<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| StippleError::invalid_parameter(format!("parse config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a configuration file.
    pub fn from_json_path(path: &Path) -> StippleResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StippleError::invalid_parameter(format!("read config '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Check the parameter ranges that would otherwise only fail deep in the
    /// pipeline. Surfaced before any decoding or sampling starts.
    pub fn validate(&self) -> StippleResult<()> {
        if self.block_size == 0 {
            return Err(StippleError::invalid_parameter("block_size must be > 0"));
        }
        if self.marks_per_tick == 0 {
            return Err(StippleError::invalid_parameter(
                "marks_per_tick must be > 0",
            ));
        }
        if self.tick_rate.per_sec() == 0 {
            return Err(StippleError::invalid_parameter("tick_rate must be > 0"));
        }
        Ok(())
    }

    fn session_opts(&self) -> SessionOpts {
        SessionOpts {
            marks_per_tick: self.marks_per_tick,
            tick_rate: self.tick_rate,
            seed: self.seed,
            paced: self.paced,
        }
    }
}

/// Run the full halftone pipeline: decode, sample, and incrementally render.
///
/// Resolves with the finished surface once every cell's mark is painted, or
/// fails with the first error anywhere in the chain; there is no partial
/// recovery. `font` is required for glyph mark styles and ignored otherwise.
pub fn render_halftone(
    image_bytes: &[u8],
    font: Option<MarkFont>,
    cfg: &PipelineConfig,
) -> StippleResult<Surface> {
    render_halftone_with_cancel(image_bytes, font, cfg, &CancelToken::new())
}

/// [`render_halftone`] with an external cancellation token, checked at each
/// tick boundary.
#[tracing::instrument(
    skip(image_bytes, font, cancel),
    fields(block_size = cfg.block_size, style = ?cfg.style)
)]
pub fn render_halftone_with_cancel(
    image_bytes: &[u8],
    font: Option<MarkFont>,
    cfg: &PipelineConfig,
    cancel: &CancelToken,
) -> StippleResult<Surface> {
    cfg.validate()?;

    let image = decode_image(image_bytes)?;
    let surface = Surface::new(image.width, image.height)?;
    let grid = build_grid(&image, cfg.block_size)?;
    tracing::debug!(
        grid_width = grid.grid_width(),
        grid_height = grid.grid_height(),
        "built halftone grid"
    );

    let painter = MarkPainter::new(font)?;
    let session = RenderSession::new(
        grid,
        cfg.style,
        surface,
        painter,
        cfg.session_opts(),
        cancel.clone(),
    )?;
    session.run()
}

/// Tracks the one active render and cancels it when a new one begins.
///
/// Only one render is considered active at a time: starting a new one first
/// cancels the token handed out for the previous one, so a superseded render
/// stops at its next tick boundary instead of painting on unobserved.
#[derive(Debug, Default)]
pub struct RenderSupervisor {
    active: Option<CancelToken>,
}

impl RenderSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the previous render (if any) and hand out the token for the
    /// next one.
    pub fn begin(&mut self) -> CancelToken {
        if let Some(prev) = self.active.take() {
            prev.cancel();
        }
        let token = CancelToken::new();
        self.active = Some(token.clone());
        token
    }

    /// Cancel the active render without starting a new one.
    pub fn cancel_active(&mut self) {
        if let Some(prev) = self.active.take() {
            prev.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes(width: u32, height: u32, v: u8) -> Vec<u8> {
        let mut rgba8 = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            rgba8.extend_from_slice(&[v, v, v, 255]);
        }
        let img = image::RgbaImage::from_raw(width, height, rgba8).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn unpaced(cfg: PipelineConfig) -> PipelineConfig {
        PipelineConfig {
            paced: false,
            ..cfg
        }
    }

    #[test]
    fn config_default_round_trips_through_json() {
        let cfg = PipelineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back = PipelineConfig::from_json_str(&json).unwrap();
        assert_eq!(back.block_size, cfg.block_size);
        assert_eq!(back.style, cfg.style);
        assert_eq!(back.marks_per_tick, cfg.marks_per_tick);
    }

    #[test]
    fn config_fills_missing_fields_with_defaults() {
        let cfg = PipelineConfig::from_json_str(r#"{"style":"line","block_size":4}"#).unwrap();
        assert_eq!(cfg.style, MarkStyle::Line);
        assert_eq!(cfg.block_size, 4);
        assert_eq!(cfg.marks_per_tick, 512);
    }

    #[test]
    fn config_rejects_invalid_values() {
        assert!(PipelineConfig::from_json_str(r#"{"block_size":0}"#).is_err());
        assert!(PipelineConfig::from_json_str(r#"{"marks_per_tick":0}"#).is_err());
        assert!(PipelineConfig::from_json_str(r#"{"style":"sparkles"}"#).is_err());
    }

    #[test]
    fn pipeline_renders_black_image_to_marked_surface() {
        let bytes = png_bytes(60, 40, 0);
        let cfg = unpaced(PipelineConfig {
            block_size: 10,
            ..PipelineConfig::default()
        });
        let surface = render_halftone(&bytes, None, &cfg).unwrap();
        assert_eq!(surface.width(), 60);
        assert_eq!(surface.height(), 40);
        assert_eq!(surface.marks_painted(), 6 * 4);
    }

    #[test]
    fn pipeline_propagates_decode_failure() {
        let cfg = unpaced(PipelineConfig::default());
        let err = render_halftone(b"not an image", None, &cfg).unwrap_err();
        assert!(matches!(err, StippleError::ImageLoad(_)));
    }

    #[test]
    fn pipeline_rejects_block_size_larger_than_image() {
        let bytes = png_bytes(8, 8, 0);
        let cfg = unpaced(PipelineConfig {
            block_size: 16,
            ..PipelineConfig::default()
        });
        let err = render_halftone(&bytes, None, &cfg).unwrap_err();
        assert!(matches!(err, StippleError::InvalidParameter(_)));
    }

    #[test]
    fn pipeline_rejects_glyph_style_without_font() {
        let bytes = png_bytes(20, 20, 0);
        let cfg = unpaced(PipelineConfig {
            style: MarkStyle::Char,
            ..PipelineConfig::default()
        });
        let err = render_halftone(&bytes, None, &cfg).unwrap_err();
        assert!(matches!(err, StippleError::InvalidParameter(_)));
    }

    #[test]
    fn cancelled_token_aborts_the_pipeline() {
        let bytes = png_bytes(40, 40, 0);
        let cfg = unpaced(PipelineConfig {
            block_size: 10,
            marks_per_tick: 1,
            ..PipelineConfig::default()
        });
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = render_halftone_with_cancel(&bytes, None, &cfg, &cancel).unwrap_err();
        assert!(matches!(err, StippleError::Cancelled));
    }

    #[test]
    fn supervisor_cancels_the_previous_render() {
        let mut supervisor = RenderSupervisor::new();
        let first = supervisor.begin();
        assert!(!first.is_cancelled());

        let second = supervisor.begin();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        supervisor.cancel_active();
        assert!(second.is_cancelled());
    }
}

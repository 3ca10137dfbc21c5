use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::core::TickRate;
use crate::foundation::error::{StippleError, StippleResult};
use crate::foundation::math::GlyphRng;
use crate::halftone::grid::HalftoneGrid;
use crate::render::marks::{Mark, MarkPainter, MarkStyle, plan_mark};
use crate::render::surface::Surface;

/// Options controlling the incremental draw loop.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct SessionOpts {
    /// Maximum marks painted per tick.
    pub marks_per_tick: u32,
    /// Tick frequency; the driver sleeps `1 / tick_rate` between ticks.
    pub tick_rate: TickRate,
    /// Seed for the glyph RNG (only the `char` style consumes randomness).
    pub seed: u64,
    /// Sleep between ticks. Disable to run the same batched, ordered loop
    /// without real-time pacing.
    pub paced: bool,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            marks_per_tick: 512,
            tick_rate: TickRate::default(),
            seed: 0,
            paced: true,
        }
    }
}

/// Shared cancellation flag, checked once per tick boundary.
///
/// Cancelling does not interrupt a tick in flight; the session stops before
/// painting its next batch. This is how a superseded render is stopped instead
/// of letting it keep painting to a surface nobody displays anymore.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Result of one [`RenderSession::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// More cells remain; `cells_drawn` is the running total.
    InProgress { cells_drawn: usize },
    /// Every cell has been painted.
    Complete,
}

/// Incremental renderer: paints one mark per grid cell in strict row-major
/// order, at most `marks_per_tick` per tick.
///
/// The session is an explicit state machine. [`tick`](Self::tick) paints one
/// batch synchronously; [`run`](Self::run) drives ticks to completion,
/// sleeping between them when pacing is enabled. Ticks never interleave and
/// the session owns its surface exclusively until it resolves.
pub struct RenderSession {
    grid: HalftoneGrid,
    style: MarkStyle,
    surface: Surface,
    painter: MarkPainter,
    rng: GlyphRng,
    opts: SessionOpts,
    cancel: CancelToken,
    cells_drawn: usize,
    batch: Vec<Mark>,
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("cells_drawn", &self.cells_drawn)
            .field("batch_len", &self.batch.len())
            .finish_non_exhaustive()
    }
}

impl RenderSession {
    pub fn new(
        grid: HalftoneGrid,
        style: MarkStyle,
        surface: Surface,
        painter: MarkPainter,
        opts: SessionOpts,
        cancel: CancelToken,
    ) -> StippleResult<Self> {
        if opts.marks_per_tick == 0 {
            return Err(StippleError::invalid_parameter(
                "marks_per_tick must be > 0",
            ));
        }
        if style.needs_font() && !painter.has_font() {
            return Err(StippleError::invalid_parameter(format!(
                "mark style {style:?} requires a font"
            )));
        }
        let need_w = grid.grid_width() * grid.block_size();
        let need_h = grid.grid_height() * grid.block_size();
        if surface.width() < need_w || surface.height() < need_h {
            return Err(StippleError::invalid_parameter(format!(
                "surface {}x{} is smaller than the {need_w}x{need_h} grid area",
                surface.width(),
                surface.height()
            )));
        }

        let rng = GlyphRng::new(opts.seed);
        let batch = Vec::with_capacity(opts.marks_per_tick as usize);
        Ok(Self {
            grid,
            style,
            surface,
            painter,
            rng,
            opts,
            cancel,
            cells_drawn: 0,
            batch,
        })
    }

    /// Token that stops this session at its next tick boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cells_total(&self) -> usize {
        self.grid.cell_count()
    }

    pub fn cells_drawn(&self) -> usize {
        self.cells_drawn
    }

    /// Paint the next batch of up to `marks_per_tick` marks.
    ///
    /// The batch is painted synchronously; callers decide how to yield between
    /// ticks. Returns `Err(Cancelled)` if the token was tripped since the last
    /// tick.
    pub fn tick(&mut self) -> StippleResult<TickOutcome> {
        if self.cancel.is_cancelled() {
            return Err(StippleError::Cancelled);
        }

        let total = self.grid.cell_count();
        if self.cells_drawn >= total {
            return Ok(TickOutcome::Complete);
        }

        let end = (self.cells_drawn + self.opts.marks_per_tick as usize).min(total);
        self.batch.clear();
        for i in self.cells_drawn..end {
            let center = self.grid.cell_center(i);
            let s = self.grid.cell(i);
            let mark = plan_mark(self.style, center, s, self.grid.block_size(), &mut self.rng);
            self.batch.push(mark);
        }

        self.surface.paint_batch(&mut self.painter, &self.batch)?;
        self.cells_drawn = end;
        tracing::trace!(cells_drawn = end, total, "painted halftone tick");

        if end == total {
            Ok(TickOutcome::Complete)
        } else {
            Ok(TickOutcome::InProgress { cells_drawn: end })
        }
    }

    /// Drive ticks until every cell is painted, then resolve with the surface.
    ///
    /// With pacing enabled there is exactly one suspension point per tick: a
    /// sleep of `1 / tick_rate` after each incomplete batch.
    #[tracing::instrument(skip(self), fields(cells = self.grid.cell_count()))]
    pub fn run(mut self) -> StippleResult<Surface> {
        let delay = self.opts.tick_rate.tick_duration();
        loop {
            match self.tick()? {
                TickOutcome::Complete => {
                    tracing::debug!(cells = self.cells_drawn, "render session complete");
                    return Ok(self.surface);
                }
                TickOutcome::InProgress { .. } => {
                    if self.opts.paced {
                        std::thread::sleep(delay);
                    }
                }
            }
        }
    }
}

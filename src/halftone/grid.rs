use kurbo::Point;

use crate::assets::decode::SourceImage;
use crate::foundation::error::{StippleError, StippleResult};
use crate::halftone::sampler::sample_block;

/// Row-major field of per-block luminance values derived from a source image.
///
/// Immutable once built; one grid is owned by exactly one render session.
#[derive(Clone, Debug, PartialEq)]
pub struct HalftoneGrid {
    block_size: u32,
    grid_width: u32,
    grid_height: u32,
    cells: Vec<f64>,
}

impl HalftoneGrid {
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn grid_width(&self) -> u32 {
        self.grid_width
    }

    pub fn grid_height(&self) -> u32 {
        self.grid_height
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    /// Luminance of cell `i` (row-major).
    pub fn cell(&self, i: usize) -> f64 {
        self.cells[i]
    }

    /// Center of cell `i` in source-image pixel coordinates.
    pub fn cell_center(&self, i: usize) -> Point {
        let w = self.grid_width as usize;
        let k = f64::from(self.block_size);
        Point::new(
            (i % w) as f64 * k + k / 2.0,
            (i / w) as f64 * k + k / 2.0,
        )
    }
}

/// Sample `image` into a [`HalftoneGrid`] with `block_size` pixel blocks.
///
/// Grid dimensions are floor-divided; trailing pixels that do not fill a whole
/// block are dropped, never sampled or padded. A block size of zero, or one
/// large enough that no complete block fits, fails with `InvalidParameter`
/// before any sampling happens.
pub fn build_grid(image: &SourceImage, block_size: u32) -> StippleResult<HalftoneGrid> {
    if block_size == 0 {
        return Err(StippleError::invalid_parameter("block size must be > 0"));
    }

    let grid_width = image.width / block_size;
    let grid_height = image.height / block_size;
    if grid_width == 0 || grid_height == 0 {
        return Err(StippleError::invalid_parameter(format!(
            "image {}x{} is too small for block size {block_size}",
            image.width, image.height
        )));
    }

    let mut cells = Vec::with_capacity(grid_width as usize * grid_height as usize);
    for by in 0..grid_height {
        let y0 = by * block_size;
        for bx in 0..grid_width {
            let x0 = bx * block_size;
            cells.push(sample_block(image, x0, y0, block_size));
        }
    }

    Ok(HalftoneGrid {
        block_size,
        grid_width,
        grid_height,
        cells,
    })
}

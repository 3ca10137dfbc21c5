use crate::assets::decode::SourceImage;

// Channel weights are fixed constants, not configuration. The green/red-heavy
// split (rather than Rec. 601/709 weights) is load-bearing for output parity
// with existing renders.
const WEIGHT_R: f64 = 0.2;
const WEIGHT_G: f64 = 0.7;
const WEIGHT_B: f64 = 0.1;

/// Brightness of a single pixel in `[0, 1]`.
pub fn pixel_luminance(r: u8, g: u8, b: u8) -> f64 {
    WEIGHT_R * f64::from(r) / 255.0 + WEIGHT_G * f64::from(g) / 255.0 + WEIGHT_B * f64::from(b) / 255.0
}

/// Mean luminance over the `block_size x block_size` window at `(x0, y0)`.
///
/// The window must lie fully within the image; grid construction guarantees
/// this by flooring the grid dimensions.
pub fn sample_block(image: &SourceImage, x0: u32, y0: u32, block_size: u32) -> f64 {
    debug_assert!(x0 + block_size <= image.width);
    debug_assert!(y0 + block_size <= image.height);

    let width = image.width as usize;
    let data = image.rgba8.as_slice();

    let mut sum = 0.0;
    for y in y0..y0 + block_size {
        let row = y as usize * width;
        for x in x0..x0 + block_size {
            let at = (row + x as usize) * 4;
            sum += pixel_luminance(data[at], data[at + 1], data[at + 2]);
        }
    }
    sum / (f64::from(block_size) * f64::from(block_size))
}

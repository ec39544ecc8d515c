//! Procedural pixel content for the surface
//!
//! The runtime renders a phase-shifted checkerboard straight into mapped
//! pool memory. Pixels are packed XRGB8888 little-endian, rows tightly
//! packed, so a frame is exactly `width * height` `u32` cells.

/// Bytes per XRGB8888 pixel; rows are tightly packed (`stride = width * 4`).
pub const BYTES_PER_PIXEL: usize = 4;

/// The checkerboard pattern drawn every frame.
///
/// Cells are `DUTY` pixels wide with a `PERIOD` repeat, quantized into
/// `BAND`-row horizontal strips. The animation phase shifts the pattern
/// diagonally; phase 0 reproduces the static board.
#[derive(Debug, Clone, Copy)]
pub struct Checkerboard;

impl Checkerboard {
    /// Horizontal repeat of the pattern, in pixels.
    pub const PERIOD: usize = 16;
    /// Width of the dark cell within one period.
    pub const DUTY: usize = 8;
    /// Height of one checker row strip.
    pub const BAND: usize = 8;

    /// Dark cell color (opaque, XRGB).
    pub const DARK: u32 = 0xFF66_6666;
    /// Light cell color (opaque, XRGB).
    pub const LIGHT: u32 = 0xFFEE_EEEE;

    /// Fill a full frame of pixels at the given animation phase.
    ///
    /// `pixels` must hold at least `width * height` cells; excess cells are
    /// left untouched.
    pub fn fill(pixels: &mut [u32], width: usize, height: usize, phase: f32) {
        let offset = (phase.max(0.0) as usize) % Self::BAND;
        for y in 0..height {
            let band = (y + offset) / Self::BAND * Self::BAND;
            let row = &mut pixels[y * width..(y + 1) * width];
            for (x, px) in row.iter_mut().enumerate() {
                *px = if (x + offset + band) % Self::PERIOD < Self::DUTY {
                    Self::DARK
                } else {
                    Self::LIGHT
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_cell(x: usize, y: usize) -> u32 {
        // The static board: x plus y quantized to 8-row strips.
        if (x + y / 8 * 8) % 16 < 8 {
            Checkerboard::DARK
        } else {
            Checkerboard::LIGHT
        }
    }

    #[test]
    fn test_static_board_at_phase_zero() {
        let (w, h) = (640, 480);
        let mut pixels = vec![0u32; w * h];
        Checkerboard::fill(&mut pixels, w, h, 0.0);

        for y in 0..h {
            for x in 0..w {
                assert_eq!(
                    pixels[y * w + x],
                    reference_cell(x, y),
                    "mismatch at ({x}, {y})"
                );
            }
        }
    }

    #[test]
    fn test_pattern_alternates_within_a_row() {
        let (w, h) = (32, 8);
        let mut pixels = vec![0u32; w * h];
        Checkerboard::fill(&mut pixels, w, h, 0.0);

        assert_eq!(pixels[0], Checkerboard::DARK);
        assert_eq!(pixels[8], Checkerboard::LIGHT);
        assert_eq!(pixels[16], Checkerboard::DARK);
        assert_eq!(pixels[24], Checkerboard::LIGHT);
    }

    #[test]
    fn test_bands_flip_every_eight_rows() {
        let (w, h) = (16, 16);
        let mut pixels = vec![0u32; w * h];
        Checkerboard::fill(&mut pixels, w, h, 0.0);

        // Same column, adjacent bands, opposite colors.
        assert_eq!(pixels[0], Checkerboard::DARK);
        assert_eq!(pixels[8 * w], Checkerboard::LIGHT);
    }

    #[test]
    fn test_phase_shifts_the_pattern() {
        let (w, h) = (16, 8);
        let mut base = vec![0u32; w * h];
        let mut shifted = vec![0u32; w * h];
        Checkerboard::fill(&mut base, w, h, 0.0);
        Checkerboard::fill(&mut shifted, w, h, 4.0);

        assert_ne!(base, shifted);
        // A 4-pixel phase moves the row pattern left by 4.
        assert_eq!(shifted[0], base[4]);
    }

    #[test]
    fn test_phase_wraps_at_band_height() {
        let (w, h) = (16, 8);
        let mut base = vec![0u32; w * h];
        let mut wrapped = vec![0u32; w * h];
        Checkerboard::fill(&mut base, w, h, 0.0);
        Checkerboard::fill(&mut wrapped, w, h, 8.0);

        assert_eq!(base, wrapped);
    }

    #[test]
    fn test_excess_pixels_untouched() {
        let (w, h) = (4, 4);
        let mut pixels = vec![0u32; w * h + 7];
        Checkerboard::fill(&mut pixels, w, h, 0.0);
        assert!(pixels[w * h..].iter().all(|&p| p == 0));
    }
}

//! Pixel-diff engine.
//!
//! Compares two equal-size RGBA images with a perceptual (YIQ) color
//! distance per pixel, counting pixels whose distance exceeds the
//! threshold and painting them into a diff artifact. Pure and
//! deterministic: no file-system or network access; persisting the
//! artifact is the caller's responsibility.

use image::{Rgba, RgbaImage};

/// Default difference threshold on the normalized 0-1 scale.
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Maximum possible YIQ delta between two opaque colors.
const MAX_YIQ_DELTA: f64 = 35215.0;

/// Color used to mark differing pixels in the diff artifact.
const DIFF_PIXEL: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Outcome of comparing a test capture against its baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOutcome {
    /// Every pixel is within the threshold.
    Match,
    /// At least one pixel differs; the artifact marks each differing pixel
    /// on an otherwise transparent canvas.
    Diff { pixel_count: u64, artifact: RgbaImage },
    /// The images have different dimensions; no pixel comparison was
    /// attempted and no artifact exists.
    SizeMismatch {
        reference: (u32, u32),
        test: (u32, u32),
    },
}

/// Compare `test` against `reference` pixel by pixel.
///
/// `threshold` is clamped to the 0-1 range. Differing dimensions short-circuit
/// to [`DiffOutcome::SizeMismatch`] without touching any pixel data.
pub fn compare(reference: &RgbaImage, test: &RgbaImage, threshold: f64) -> DiffOutcome {
    if reference.dimensions() != test.dimensions() {
        return DiffOutcome::SizeMismatch {
            reference: reference.dimensions(),
            test: test.dimensions(),
        };
    }

    let threshold = threshold.clamp(0.0, 1.0);
    let max_delta = MAX_YIQ_DELTA * threshold * threshold;

    let (width, height) = reference.dimensions();
    let mut artifact = RgbaImage::new(width, height);
    let mut pixel_count: u64 = 0;

    for (x, y, reference_pixel) in reference.enumerate_pixels() {
        let test_pixel = test.get_pixel(x, y);
        if yiq_delta(reference_pixel, test_pixel) > max_delta {
            artifact.put_pixel(x, y, DIFF_PIXEL);
            pixel_count += 1;
        }
    }

    if pixel_count == 0 {
        DiffOutcome::Match
    } else {
        DiffOutcome::Diff {
            pixel_count,
            artifact,
        }
    }
}

/// Encode a diff artifact as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    image.write_to(
        &mut std::io::Cursor::new(&mut buffer),
        image::ImageFormat::Png,
    )?;
    Ok(buffer)
}

/// Squared color distance in YIQ space, with alpha blended onto white.
fn yiq_delta(a: &Rgba<u8>, b: &Rgba<u8>) -> f64 {
    let (r1, g1, b1) = blend_onto_white(a);
    let (r2, g2, b2) = blend_onto_white(b);

    let dy = rgb_to_y(r1, g1, b1) - rgb_to_y(r2, g2, b2);
    let di = rgb_to_i(r1, g1, b1) - rgb_to_i(r2, g2, b2);
    let dq = rgb_to_q(r1, g1, b1) - rgb_to_q(r2, g2, b2);

    0.5053 * dy * dy + 0.299 * di * di + 0.1957 * dq * dq
}

fn blend_onto_white(pixel: &Rgba<u8>) -> (f64, f64, f64) {
    let alpha = f64::from(pixel[3]) / 255.0;
    (
        blend_channel(pixel[0], alpha),
        blend_channel(pixel[1], alpha),
        blend_channel(pixel[2], alpha),
    )
}

fn blend_channel(channel: u8, alpha: f64) -> f64 {
    255.0 + (f64::from(channel) - 255.0) * alpha
}

fn rgb_to_y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.298_895_31 + g * 0.586_622_47 + b * 0.114_482_23
}

fn rgb_to_i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.595_977_99 - g * 0.274_176_10 - b * 0.321_801_89
}

fn rgb_to_q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.211_470_17 - g * 0.522_617_11 + b * 0.311_146_94
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    #[test]
    fn test_identical_images_match() {
        let a = solid(32, 16, [10, 120, 200, 255]);
        let b = a.clone();
        assert_eq!(compare(&a, &b, DEFAULT_THRESHOLD), DiffOutcome::Match);
    }

    #[test]
    fn test_size_mismatch_short_circuits() {
        let a = solid(32, 16, [0, 0, 0, 255]);
        let b = solid(16, 32, [0, 0, 0, 255]);
        match compare(&a, &b, DEFAULT_THRESHOLD) {
            DiffOutcome::SizeMismatch { reference, test } => {
                assert_eq!(reference, (32, 16));
                assert_eq!(test, (16, 32));
            }
            other => panic!("expected SizeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_altered_region_is_counted_and_marked() {
        let a = solid(32, 32, [255, 255, 255, 255]);
        let mut b = a.clone();
        for x in 0..4 {
            for y in 0..4 {
                b.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }

        match compare(&a, &b, DEFAULT_THRESHOLD) {
            DiffOutcome::Diff {
                pixel_count,
                artifact,
            } => {
                assert_eq!(pixel_count, 16);
                assert_eq!(artifact.dimensions(), (32, 32));
                // marked exactly where altered, transparent elsewhere
                assert_eq!(artifact.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
                assert_eq!(artifact.get_pixel(10, 10), &Rgba([0, 0, 0, 0]));
            }
            other => panic!("expected Diff, got {:?}", other),
        }
    }

    #[test]
    fn test_subtle_change_below_threshold_is_ignored() {
        let a = solid(8, 8, [100, 100, 100, 255]);
        let b = solid(8, 8, [102, 100, 100, 255]);
        assert_eq!(compare(&a, &b, DEFAULT_THRESHOLD), DiffOutcome::Match);
    }

    #[test]
    fn test_zero_threshold_flags_any_change() {
        let a = solid(8, 8, [100, 100, 100, 255]);
        let b = solid(8, 8, [102, 100, 100, 255]);
        match compare(&a, &b, 0.0) {
            DiffOutcome::Diff { pixel_count, .. } => assert_eq!(pixel_count, 64),
            other => panic!("expected Diff, got {:?}", other),
        }
    }

    #[test]
    fn test_compare_is_deterministic() {
        let a = solid(16, 16, [20, 40, 60, 255]);
        let mut b = a.clone();
        b.put_pixel(3, 7, Rgba([250, 10, 10, 255]));

        let first = compare(&a, &b, DEFAULT_THRESHOLD);
        let second = compare(&a, &b, DEFAULT_THRESHOLD);
        assert_eq!(first, second);
    }

    #[test]
    fn test_encode_png_round_trips() {
        let mut artifact = RgbaImage::new(4, 4);
        artifact.put_pixel(1, 2, Rgba([255, 0, 0, 255]));

        let bytes = encode_png(&artifact).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(decoded.get_pixel(1, 2), &Rgba([255, 0, 0, 255]));
    }
}

//! Alpha blending math for watermark removal.
//!
//! The generator applies watermarks via forward alpha blending:
//! `watermarked = alpha * logo + (1 - alpha) * original`
//!
//! This module provides the reverse operation to recover original pixels.

use image::{ImageBuffer, Pixel};

use crate::placement::Roi;

/// Alpha threshold: ignore pixels with negligible watermark effect (noise).
pub const ALPHA_THRESHOLD: f32 = 0.002;

/// Maximum alpha: clamp to avoid division by near-zero in reverse blending.
pub const MAX_ALPHA: f32 = 0.99;

/// Brightness of the logo. The watermark is rendered in solid white.
pub const LOGO_VALUE: f32 = 255.0;

/// Opacity actually used for a map entry scaled by `intensity`.
///
/// Returns `None` when the scaled value is below [`ALPHA_THRESHOLD`], meaning
/// the pixel must be left alone. Otherwise the value is capped at [`MAX_ALPHA`].
#[must_use]
pub fn effective_alpha(map_value: f32, intensity: f32) -> Option<f32> {
    let raw = map_value * intensity;
    // NaN falls through here too
    if raw.is_nan() || raw < ALPHA_THRESHOLD {
        return None;
    }
    Some(raw.min(MAX_ALPHA))
}

/// Invert the blend for a single 8-bit channel value.
///
/// `alpha` must already be in `[ALPHA_THRESHOLD, MAX_ALPHA]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn unblend_channel(watermarked: u8, alpha: f32, logo_value: f32) -> u8 {
    let original = (f32::from(watermarked) - alpha * logo_value) / (1.0 - alpha);
    original.clamp(0.0, 255.0).round() as u8
}

/// Remove watermark from an image using reverse alpha blending.
///
/// Applies the formula: `original = (watermarked - alpha * logo_value) / (1 - alpha)`
/// to the colour channels of every pixel under `roi`. Any further channels
/// (alpha in RGBA buffers) are never written. Images with fewer than three
/// channels are left unchanged.
///
/// Each pixel is bounds-checked on its own, so a region hanging off the
/// image (negative origin, tiny image) is restored where it overlaps and
/// skipped elsewhere.
///
/// # Arguments
///
/// * `image` - The watermarked image to modify in-place.
/// * `alpha_map` - Flat array of alpha values, length `roi.size * roi.size`.
/// * `roi` - Where the watermark sits in the image.
/// * `intensity` - Multiplier on every alpha value (1.0 for the calibrated strength).
/// * `logo_value` - The logo color value (255.0 for white).
pub fn remove_watermark_alpha_blend<P>(
    image: &mut ImageBuffer<P, Vec<u8>>,
    alpha_map: &[f32],
    roi: Roi,
    intensity: f32,
    logo_value: f32,
) where
    P: Pixel<Subpixel = u8>,
{
    if P::CHANNEL_COUNT < 3 {
        return;
    }

    let img_w = i64::from(image.width());
    let img_h = i64::from(image.height());

    for row in 0..roi.size {
        let y = roi.y + i64::from(row);
        if y < 0 || y >= img_h {
            continue;
        }

        for col in 0..roi.size {
            let x = roi.x + i64::from(col);
            if x < 0 || x >= img_w {
                continue;
            }

            let Some(&map_value) = alpha_map.get((row * roi.size + col) as usize) else {
                continue;
            };
            let Some(alpha) = effective_alpha(map_value, intensity) else {
                continue;
            };

            // Both coordinates were checked against the u32 image bounds above.
            let (Ok(px_x), Ok(px_y)) = (u32::try_from(x), u32::try_from(y)) else {
                continue;
            };
            let px = image.get_pixel_mut(px_x, px_y);
            for ch in &mut px.channels_mut()[..3] {
                *ch = unblend_channel(*ch, alpha, logo_value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn roi(x: i64, y: i64, size: u32) -> Roi {
        Roi { x, y, size }
    }

    /// Forward blend, rounded to 8 bits the way an encoder would store it.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn composite(original: u8, alpha: f32) -> u8 {
        let v = alpha * LOGO_VALUE + (1.0 - alpha) * f32::from(original);
        v.clamp(0.0, 255.0).round() as u8
    }

    #[test]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn reverse_blend_recovers_original_within_tolerance() {
        let mut image =
            RgbImage::from_fn(100, 100, |x, y| Rgb([(x * 2) as u8, (y * 2) as u8, 200]));
        let original = image.clone();

        let size = 10u32;
        let alpha_map: Vec<f32> = (0..size * size)
            .map(|i| (i as f32) / (size * size) as f32 * 0.5)
            .collect();
        let region = roi(50, 50, size);

        for dy in 0..size {
            for dx in 0..size {
                let alpha = alpha_map[(dy * size + dx) as usize];
                if alpha < ALPHA_THRESHOLD {
                    continue;
                }
                let px = image.get_pixel_mut(50 + dx, 50 + dy);
                for ch in 0..3 {
                    px[ch] = composite(px[ch], alpha);
                }
            }
        }

        remove_watermark_alpha_blend(&mut image, &alpha_map, region, 1.0, LOGO_VALUE);

        for (x, y, restored) in image.enumerate_pixels() {
            let orig = original.get_pixel(x, y);
            for ch in 0..3 {
                let diff = (i32::from(restored[ch]) - i32::from(orig[ch])).abs();
                assert!(
                    diff <= 1,
                    "Pixel ({x},{y}) ch {ch} diff {diff} (restored={}, orig={})",
                    restored[ch],
                    orig[ch]
                );
            }
        }
    }

    #[test]
    fn half_alpha_scenario() {
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([200, 200, 200, 255]));
        let alpha_map = vec![0.5f32; 4];

        remove_watermark_alpha_blend(&mut image, &alpha_map, roi(0, 0, 2), 1.0, LOGO_VALUE);

        assert_eq!(*image.get_pixel(0, 0), Rgba([145, 145, 145, 255]));
        assert_eq!(*image.get_pixel(1, 1), Rgba([145, 145, 145, 255]));
        assert_eq!(*image.get_pixel(2, 2), Rgba([200, 200, 200, 255]));
    }

    #[test]
    fn half_alpha_at_large_roi_of_2000_square() {
        let mut image = RgbaImage::from_pixel(2000, 2000, Rgba([200, 200, 200, 255]));
        let alpha_map = vec![0.5f32; 96 * 96];

        let region = roi(1840, 1840, 96);
        remove_watermark_alpha_blend(&mut image, &alpha_map, region, 1.0, LOGO_VALUE);

        assert_eq!(*image.get_pixel(1840, 1840), Rgba([145, 145, 145, 255]));
        assert_eq!(*image.get_pixel(1935, 1935), Rgba([145, 145, 145, 255]));
        assert_eq!(*image.get_pixel(1839, 1840), Rgba([200, 200, 200, 255]));
        assert_eq!(*image.get_pixel(1936, 1935), Rgba([200, 200, 200, 255]));
    }

    #[test]
    fn below_threshold_is_left_untouched() {
        let mut image = RgbImage::from_pixel(3, 1, Rgb([250, 251, 252]));
        let alpha_map = [0.0, 0.0019, 0.5];
        let before = image.clone();

        remove_watermark_alpha_blend(&mut image, &alpha_map, roi(0, 0, 1), 1.0, LOGO_VALUE);
        assert_eq!(image, before);

        // A small map value scaled down by intensity also falls below the threshold.
        remove_watermark_alpha_blend(&mut image, &[0.003], roi(0, 0, 1), 0.5, LOGO_VALUE);
        assert_eq!(image, before);
    }

    #[test]
    fn effective_alpha_never_exceeds_max() {
        for &value in &[0.99f32, 0.995, 1.0] {
            for &intensity in &[1.0f32, 1.5, 2.0, 100.0] {
                let alpha = effective_alpha(value, intensity).unwrap();
                assert!(alpha <= MAX_ALPHA);
            }
        }
        assert_eq!(effective_alpha(0.001, 1.0), None);
        assert_eq!(effective_alpha(0.5, 0.0), None);
        assert_eq!(effective_alpha(0.5, -1.0), None);
        assert_eq!(effective_alpha(0.5, f32::NAN), None);
    }

    #[test]
    fn fully_opaque_logo_clamps_instead_of_dividing_by_zero() {
        let mut image = RgbImage::from_pixel(1, 1, Rgb([255, 254, 0]));
        remove_watermark_alpha_blend(&mut image, &[1.0], roi(0, 0, 1), 2.0, LOGO_VALUE);
        let px = image.get_pixel(0, 0);
        // (255 - 0.99*255) / 0.01 == 255, (254 - 252.45) / 0.01 == 155
        assert_eq!(px[0], 255);
        assert!((i32::from(px[1]) - 155).abs() <= 1);
        assert_eq!(px[2], 0);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn alpha_channel_is_never_modified() {
        let mut image = RgbaImage::from_fn(8, 8, |x, y| Rgba([220, 230, 240, (x * 8 + y) as u8]));
        let before = image.clone();
        let alpha_map = vec![0.4f32; 64];

        remove_watermark_alpha_blend(&mut image, &alpha_map, roi(0, 0, 8), 1.0, LOGO_VALUE);

        for (x, y, px) in image.enumerate_pixels() {
            assert_eq!(px[3], before.get_pixel(x, y)[3]);
            assert_ne!(px[0], before.get_pixel(x, y)[0]);
        }
    }

    #[test]
    fn pixels_outside_roi_are_untouched() {
        let mut image = RgbaImage::from_pixel(20, 20, Rgba([240, 240, 240, 255]));
        let before = image.clone();
        let alpha_map = vec![0.3f32; 25];

        remove_watermark_alpha_blend(&mut image, &alpha_map, roi(10, 12, 5), 1.0, LOGO_VALUE);

        for (x, y, px) in image.enumerate_pixels() {
            let inside = (10..15).contains(&x) && (12..17).contains(&y);
            if inside {
                assert_ne!(px, before.get_pixel(x, y));
            } else {
                assert_eq!(px, before.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn negative_origin_restores_overlap_only() {
        let mut image = RgbaImage::from_pixel(3, 3, Rgba([200, 200, 200, 255]));
        let alpha_map = vec![0.5f32; 16];

        // 4x4 region starting at (-2, -2): only (0..2, 0..2) overlaps.
        remove_watermark_alpha_blend(&mut image, &alpha_map, roi(-2, -2, 4), 1.0, LOGO_VALUE);

        for (x, y, px) in image.enumerate_pixels() {
            let expected = if x < 2 && y < 2 { 145 } else { 200 };
            assert_eq!(px[0], expected, "pixel ({x},{y})");
        }
    }

    #[test]
    fn region_entirely_outside_is_noop() {
        let mut image = RgbImage::from_pixel(10, 10, Rgb([100, 100, 100]));
        let before = image.clone();
        let alpha_map = vec![0.5f32; 96 * 96];

        remove_watermark_alpha_blend(&mut image, &alpha_map, roi(-150, -150, 96), 1.0, LOGO_VALUE);
        assert_eq!(image, before);

        remove_watermark_alpha_blend(&mut image, &alpha_map, roi(10, 0, 96), 1.0, LOGO_VALUE);
        assert_eq!(image, before);
    }

    #[test]
    fn short_alpha_map_does_not_panic() {
        let mut image = RgbImage::from_pixel(4, 4, Rgb([200, 200, 200]));
        remove_watermark_alpha_blend(&mut image, &[0.5, 0.5], roi(0, 0, 4), 1.0, LOGO_VALUE);
        assert_eq!(image.get_pixel(1, 0)[0], 145);
        assert_eq!(image.get_pixel(2, 0)[0], 200);
    }

    #[test]
    fn grayscale_buffers_are_ignored() {
        let mut image = image::GrayImage::from_pixel(2, 2, image::Luma([200]));
        let before = image.clone();
        remove_watermark_alpha_blend(&mut image, &[0.5; 4], roi(0, 0, 2), 1.0, LOGO_VALUE);
        assert_eq!(image, before);
    }

    #[test]
    fn unblend_clamps_to_byte_range() {
        // Darker than the blend could produce: clamps to 0.
        assert_eq!(unblend_channel(10, 0.5, LOGO_VALUE), 0);
        assert_eq!(unblend_channel(255, 0.5, LOGO_VALUE), 255);
        // Brighter logo assumption than reality pushes past 255.
        assert_eq!(unblend_channel(255, 0.5, 0.0), 255);
    }
}

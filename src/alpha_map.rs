//! Alpha maps decoded from reference captures of the watermark.
//!
//! A reference bitmap is a capture of the watermark rendered over a black
//! background. Because the logo is pure white, the brightest channel of each
//! pixel gives the opacity the generator used there: `alpha = max(R, G, B) / 255`.

use std::path::Path;

use image::DynamicImage;

use crate::error::{Error, Result};

/// Side lengths of the two known watermark footprints.
pub const SUPPORTED_SIZES: [u32; 2] = [48, 96];

/// Normalized per-pixel opacity of the watermark, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMap {
    size: u32,
    data: Vec<f32>,
}

impl AlphaMap {
    /// Decode an alpha map from encoded image bytes (PNG, BMP, ...).
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlphaMapDecode`] if the bytes cannot be decoded, or
    /// [`Error::InvalidAlphaMap`] if the bitmap is not 48x48 or 96x96.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes).map_err(Error::AlphaMapDecode)?;
        Self::from_image(&img)
    }

    /// Read and decode an alpha map from a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise the same
    /// errors as [`AlphaMap::from_bytes`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    /// Build an alpha map from an already decoded reference bitmap.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAlphaMap`] if the bitmap is not square or its
    /// side is not one of [`SUPPORTED_SIZES`].
    pub fn from_image(img: &DynamicImage) -> Result<Self> {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width != height || !SUPPORTED_SIZES.contains(&width) {
            return Err(Error::InvalidAlphaMap { width, height });
        }

        let data = rgb
            .pixels()
            .map(|px| {
                let max_val = px[0].max(px[1]).max(px[2]);
                f32::from(max_val) / 255.0
            })
            .collect();

        Ok(Self { size: width, data })
    }

    /// Side length in pixels.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Opacity values, `size * size` entries in row-major order.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Opacity at `(col, row)`, or `None` outside the map.
    #[must_use]
    pub fn get(&self, col: u32, row: u32) -> Option<f32> {
        if col >= self.size || row >= self.size {
            return None;
        }
        self.data.get((row * self.size + col) as usize).copied()
    }
}

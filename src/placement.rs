//! Watermark placement: which footprint applies and where it sits.

/// Watermark size classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatermarkSize {
    /// 48x48 watermark, 32px margin (images where either dimension <= 1024).
    Small,
    /// 96x96 watermark, 64px margin (images where both dimensions > 1024).
    Large,
}

/// Caller's choice of watermark size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SizeOverride {
    /// Pick the size from the image dimensions.
    #[default]
    Auto,
    /// Always use the 48x48 footprint.
    Small,
    /// Always use the 96x96 footprint.
    Large,
}

impl From<WatermarkSize> for SizeOverride {
    fn from(size: WatermarkSize) -> Self {
        match size {
            WatermarkSize::Small => Self::Small,
            WatermarkSize::Large => Self::Large,
        }
    }
}

/// Fixed geometry of one watermark variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Which variant this is.
    pub size: WatermarkSize,
    /// Side length of the square logo in pixels.
    pub logo_size: u32,
    /// Gap between the logo and the right edge of the image.
    pub margin_right: u32,
    /// Gap between the logo and the bottom edge of the image.
    pub margin_bottom: u32,
}

/// Placement used for images where either dimension is at most 1024.
pub const SMALL: Placement = Placement {
    size: WatermarkSize::Small,
    logo_size: 48,
    margin_right: 32,
    margin_bottom: 32,
};

/// Placement used for images where both dimensions exceed 1024.
pub const LARGE: Placement = Placement {
    size: WatermarkSize::Large,
    logo_size: 96,
    margin_right: 64,
    margin_bottom: 64,
};

/// Square region of the image covered by the watermark.
///
/// The origin is signed: images smaller than the logo plus its margins put
/// it above or left of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    /// Column of the top-left corner.
    pub x: i64,
    /// Row of the top-left corner.
    pub y: i64,
    /// Side length in pixels.
    pub size: u32,
}

/// How much of a [`Roi`] lies inside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// Every pixel of the region is inside the image.
    Full,
    /// Some, but not all, of the region is inside the image.
    Partial,
    /// The region misses the image entirely.
    Outside,
}

impl Roi {
    /// Classify the overlap between this region and a `width` x `height` image.
    #[must_use]
    pub fn coverage(&self, width: u32, height: u32) -> Coverage {
        let size = i64::from(self.size);
        let (w, h) = (i64::from(width), i64::from(height));
        let x_end = self.x + size;
        let y_end = self.y + size;

        if x_end <= 0 || y_end <= 0 || self.x >= w || self.y >= h || size == 0 {
            Coverage::Outside
        } else if self.x >= 0 && self.y >= 0 && x_end <= w && y_end <= h {
            Coverage::Full
        } else {
            Coverage::Partial
        }
    }
}

impl Placement {
    /// Fixed placement for a watermark size.
    #[must_use]
    pub const fn for_size(size: WatermarkSize) -> Self {
        match size {
            WatermarkSize::Small => SMALL,
            WatermarkSize::Large => LARGE,
        }
    }

    /// Region covered by this placement in a `width` x `height` image.
    #[must_use]
    pub fn roi(&self, width: u32, height: u32) -> Roi {
        Roi {
            x: i64::from(width) - i64::from(self.margin_right) - i64::from(self.logo_size),
            y: i64::from(height) - i64::from(self.margin_bottom) - i64::from(self.logo_size),
            size: self.logo_size,
        }
    }
}

/// Determine watermark size from image dimensions.
///
/// - **Large**: both width AND height > 1024
/// - **Small**: otherwise (including 1024x1024)
#[must_use]
pub fn watermark_size_for(width: u32, height: u32) -> WatermarkSize {
    if width > 1024 && height > 1024 {
        WatermarkSize::Large
    } else {
        WatermarkSize::Small
    }
}

/// Pick the placement for an image, honoring an explicit override.
#[must_use]
pub fn select_placement(width: u32, height: u32, size: SizeOverride) -> Placement {
    match size {
        SizeOverride::Small => SMALL,
        SizeOverride::Large => LARGE,
        SizeOverride::Auto => Placement::for_size(watermark_size_for(width, height)),
    }
}

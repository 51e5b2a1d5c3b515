//! Core watermark restoration engine.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use image::{DynamicImage, ImageBuffer, ImageFormat, Pixel, RgbaImage};

use crate::alpha_map::AlphaMap;
use crate::blending;
use crate::error::{Error, Result};
use crate::placement::{self, Coverage, Placement, Roi, SizeOverride, WatermarkSize};

/// Intensity that reproduces the calibrated watermark strength.
pub const DEFAULT_INTENSITY: f32 = 1.0;

/// Options controlling watermark processing behavior.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Force a specific watermark size instead of picking one from the dimensions.
    pub force_size: SizeOverride,
    /// Multiplier on the alpha map, conventionally in `[0, 2]`.
    pub intensity: f32,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            force_size: SizeOverride::Auto,
            intensity: DEFAULT_INTENSITY,
            verbose: false,
            quiet: false,
        }
    }
}

/// Outcome of processing one image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// The whole watermark region was inside the image and was restored.
    Restored,
    /// The region hung off the image; the overlapping part was restored.
    Partial,
    /// The region missed the image entirely. Nothing was written.
    OutsideImage,
    /// The image could not be loaded or the output could not be written.
    Failed,
}

impl From<Coverage> for ProcessStatus {
    fn from(coverage: Coverage) -> Self {
        match coverage {
            Coverage::Full => Self::Restored,
            Coverage::Partial => Self::Partial,
            Coverage::Outside => Self::OutsideImage,
        }
    }
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// What happened to it.
    pub status: ProcessStatus,
    /// Placement chosen for the image, once it was loaded.
    pub placement: Option<Placement>,
    /// Region the placement maps to in this image.
    pub roi: Option<Roi>,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn failed(path: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            status: ProcessStatus::Failed,
            placement: None,
            roi: None,
            message,
        }
    }

    /// Whether the file counts as an error for the caller.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == ProcessStatus::Failed
    }
}

/// The watermark engine holding both decoded alpha maps.
///
/// Construct once and share by reference. The engine is immutable, so any
/// number of threads may restore distinct images through the same instance.
#[derive(Debug, Clone)]
pub struct WatermarkEngine {
    alpha_map_small: AlphaMap,
    alpha_map_large: AlphaMap,
}

impl WatermarkEngine {
    /// Create an engine from two already decoded alpha maps.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlphaMapSizeMismatch`] unless `small` is 48x48 and
    /// `large` is 96x96.
    pub fn new(small: AlphaMap, large: AlphaMap) -> Result<Self> {
        check_size(&small, placement::SMALL.logo_size)?;
        check_size(&large, placement::LARGE.logo_size)?;

        log::info!(
            "watermark engine ready ({0}x{0} and {1}x{1} alpha maps)",
            small.size(),
            large.size()
        );

        Ok(Self {
            alpha_map_small: small,
            alpha_map_large: large,
        })
    }

    /// Create an engine from the encoded 48x48 and 96x96 reference bitmaps.
    ///
    /// Both bitmaps are decoded before the engine exists; if either fails,
    /// no engine is created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlphaMapDecode`] or [`Error::InvalidAlphaMap`] if a
    /// bitmap cannot be turned into an alpha map, or
    /// [`Error::AlphaMapSizeMismatch`] if the two are swapped.
    pub fn from_bytes(small_png: &[u8], large_png: &[u8]) -> Result<Self> {
        let (small, large) = load_pair(
            || AlphaMap::from_bytes(small_png),
            || AlphaMap::from_bytes(large_png),
        );
        Self::new(small?, large?)
    }

    /// Create an engine from reference bitmap files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a file cannot be read, otherwise the same
    /// errors as [`WatermarkEngine::from_bytes`].
    pub fn open(small_path: &Path, large_path: &Path) -> Result<Self> {
        let (small, large) = load_pair(
            || AlphaMap::open(small_path),
            || AlphaMap::open(large_path),
        );
        Self::new(small?, large?)
    }

    /// Alpha map used for a watermark size.
    #[must_use]
    pub fn alpha_map(&self, size: WatermarkSize) -> &AlphaMap {
        match size {
            WatermarkSize::Small => &self.alpha_map_small,
            WatermarkSize::Large => &self.alpha_map_large,
        }
    }

    /// Placement that [`WatermarkEngine::restore`] would use for an image.
    #[must_use]
    #[allow(clippy::unused_self)] // method on `self` for API consistency
    pub fn placement_for(&self, width: u32, height: u32, force_size: SizeOverride) -> Placement {
        placement::select_placement(width, height, force_size)
    }

    /// Restore the pixels under the watermark in-place.
    ///
    /// Works on any 8-bit buffer with RGB colour channels; an alpha channel is
    /// left untouched. Images too small to hold the whole watermark are
    /// restored where they overlap it, which may be nowhere.
    ///
    /// Returns the placement that was applied.
    pub fn restore<P>(
        &self,
        image: &mut ImageBuffer<P, Vec<u8>>,
        force_size: SizeOverride,
        intensity: f32,
    ) -> Placement
    where
        P: Pixel<Subpixel = u8>,
    {
        let (width, height) = image.dimensions();
        let placement = self.placement_for(width, height, force_size);
        let roi = placement.roi(width, height);

        log::debug!(
            "restoring {width}x{height} image: {:?} watermark at ({}, {}), intensity {intensity}",
            placement.size,
            roi.x,
            roi.y
        );

        blending::remove_watermark_alpha_blend(
            image,
            self.alpha_map(placement.size).data(),
            roi,
            intensity,
            blending::LOGO_VALUE,
        );

        placement
    }

    /// Return a restored copy of `image`, leaving the input untouched.
    #[must_use]
    pub fn restored<P>(
        &self,
        image: &ImageBuffer<P, Vec<u8>>,
        force_size: SizeOverride,
        intensity: f32,
    ) -> ImageBuffer<P, Vec<u8>>
    where
        P: Pixel<Subpixel = u8>,
    {
        let mut out = image.clone();
        self.restore(&mut out, force_size, intensity);
        out
    }

    /// Process a single image file: load, restore, save.
    ///
    /// Images whose watermark region lies entirely outside them are reported
    /// as [`ProcessStatus::OutsideImage`] and no output is written.
    #[must_use]
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        opts: &ProcessOptions,
    ) -> ProcessResult {
        let mut img = match image::open(input) {
            Ok(img) => img.to_rgba8(),
            Err(e) => return ProcessResult::failed(input, format!("Failed to load: {e}")),
        };

        let (w, h) = img.dimensions();
        let placement = self.placement_for(w, h, opts.force_size);
        let roi = placement.roi(w, h);
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            status: roi.coverage(w, h).into(),
            placement: Some(placement),
            roi: Some(roi),
            message: String::new(),
        };

        if result.status == ProcessStatus::OutsideImage {
            let n = placement.logo_size;
            result.message = format!(
                "Image too small ({w}x{h}) for {n}x{n} watermark with {}px margin",
                placement.margin_right
            );
            log::debug!("{}: {}", input.display(), result.message);
            return result;
        }

        self.restore(&mut img, opts.force_size, opts.intensity);

        if let Err(e) = write_output(&img, output) {
            result.status = ProcessStatus::Failed;
            result.message = format!("Failed to save {}: {e}", output.display());
            return result;
        }

        result.message = format!("Saved {}", output.display());
        log::debug!("{}: {:?} -> {}", input.display(), result.status, output.display());
        result
    }

    /// Process all supported images in a directory.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon).
    /// Returns a [`ProcessResult`] for each image found.
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
    ) -> Vec<ProcessResult> {
        let images: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                return vec![ProcessResult::failed(
                    input_dir,
                    format!("Failed to read directory: {e}"),
                )];
            }
        };

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult::failed(
                    output_dir,
                    format!("Failed to create output directory: {e}"),
                )];
            }
        }

        log::debug!(
            "processing {} image(s) from {}",
            images.len(),
            input_dir.display()
        );

        let process = |input_path: &PathBuf| match input_path.file_name() {
            Some(filename) => self.process_file(input_path, &output_dir.join(filename), opts),
            None => ProcessResult::failed(input_path, "Path has no file name".to_string()),
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            images.par_iter().map(process).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            images.iter().map(process).collect()
        }
    }
}

/// Holder for an engine that is initialized once and used afterwards.
///
/// Until [`EngineSlot::initialize`] succeeds, [`EngineSlot::restore`] fails
/// with [`Error::EngineNotReady`]. The slot can live in a `static`.
#[derive(Debug, Default)]
pub struct EngineSlot {
    engine: OnceLock<WatermarkEngine>,
}

impl EngineSlot {
    /// An empty, not yet ready slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            engine: OnceLock::new(),
        }
    }

    /// Decode both reference bitmaps and mark the slot ready.
    ///
    /// A failed load leaves the slot not ready. Once initialized, later calls
    /// keep the first engine.
    ///
    /// # Errors
    ///
    /// Any load error from [`WatermarkEngine::from_bytes`].
    pub fn initialize(&self, small_png: &[u8], large_png: &[u8]) -> Result<&WatermarkEngine> {
        if let Some(engine) = self.engine.get() {
            log::warn!("watermark engine already initialized, keeping existing alpha maps");
            return Ok(engine);
        }
        let engine = WatermarkEngine::from_bytes(small_png, large_png)?;
        Ok(self.engine.get_or_init(|| engine))
    }

    /// Install an engine that was built elsewhere.
    ///
    /// Returns the engine that ends up in the slot.
    pub fn install(&self, engine: WatermarkEngine) -> &WatermarkEngine {
        self.engine.get_or_init(|| engine)
    }

    /// Whether an engine has been successfully initialized.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.engine.get().is_some()
    }

    /// The initialized engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineNotReady`] before initialization.
    pub fn engine(&self) -> Result<&WatermarkEngine> {
        self.engine.get().ok_or(Error::EngineNotReady)
    }

    /// Restore an image through the initialized engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineNotReady`] before initialization.
    pub fn restore<P>(
        &self,
        image: &mut ImageBuffer<P, Vec<u8>>,
        force_size: SizeOverride,
        intensity: f32,
    ) -> Result<Placement>
    where
        P: Pixel<Subpixel = u8>,
    {
        Ok(self.engine()?.restore(image, force_size, intensity))
    }
}

fn check_size(map: &AlphaMap, expected: u32) -> Result<()> {
    if map.size() == expected {
        Ok(())
    } else {
        Err(Error::AlphaMapSizeMismatch {
            expected,
            actual: map.size(),
        })
    }
}

/// Run both loads, concurrently when rayon is available.
fn load_pair<A, B>(small: A, large: B) -> (Result<AlphaMap>, Result<AlphaMap>)
where
    A: FnOnce() -> Result<AlphaMap> + Send,
    B: FnOnce() -> Result<AlphaMap> + Send,
{
    #[cfg(feature = "cli")]
    {
        rayon::join(small, large)
    }

    #[cfg(not(feature = "cli"))]
    {
        (small(), large())
    }
}

/// Formats the file pipeline reads and writes.
pub const SUPPORTED_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::WebP,
    ImageFormat::Bmp,
];

/// Whether the file extension names one of [`SUPPORTED_FORMATS`].
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok_and(|format| SUPPORTED_FORMATS.contains(&format))
}

/// Save an image in the format named by the path's extension.
///
/// JPEG output drops the alpha channel and is written at quality 100.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for formats outside
/// [`SUPPORTED_FORMATS`], or an I/O or encoding error if writing fails.
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
            let file = std::fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(&rgb)?;
        }
        f if SUPPORTED_FORMATS.contains(&f) => img.save_with_format(path, f)?,
        f => return Err(Error::UnsupportedFormat(format!("{f:?}"))),
    }

    Ok(())
}

/// Create the output's parent directory if needed, then save.
fn write_output(img: &RgbaImage, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    save_image(img, output)
}

/// Output path used when the caller gives none: `photo.jpg` becomes
/// `photo_restored.jpg` in the same directory. Inputs without an
/// extension are written as PNG.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "image".into(), |s| s.to_string_lossy());
    let ext = input
        .extension()
        .map_or_else(|| "png".into(), |e| e.to_string_lossy());
    input.with_file_name(format!("{stem}_restored.{ext}"))
}

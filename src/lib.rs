//! Restore pixels beneath a fixed corner watermark via reverse alpha blending.
//!
//! The watermark generator stamps a semi-transparent white logo into the
//! bottom-right corner of every image: 48x48 with a 32px margin, or 96x96 with
//! a 64px margin when both image dimensions exceed 1024. Its per-pixel
//! opacity is captured once in two reference bitmaps ("alpha maps"), and this
//! crate inverts the blending equation with them to recover the original pixels.
//!
//! # Quick Start
//!
//! ```no_run
//! use watermark_restore::{SizeOverride, WatermarkEngine, DEFAULT_INTENSITY};
//! use std::path::Path;
//!
//! let engine = WatermarkEngine::open(Path::new("bg_48.png"), Path::new("bg_96.png"))
//!     .expect("failed to load alpha maps");
//! let mut img = image::open("photo.png").unwrap().to_rgba8();
//! engine.restore(&mut img, SizeOverride::Auto, DEFAULT_INTENSITY);
//! img.save("restored.png").unwrap();
//! ```
//!
//! # Initialize once, restore many
//!
//! [`EngineSlot`] holds an engine that is set up at startup and reports
//! [`Error::EngineNotReady`] to callers that arrive before it is.
//!
//! ```no_run
//! use watermark_restore::{EngineSlot, SizeOverride};
//!
//! static ENGINE: EngineSlot = EngineSlot::new();
//!
//! # fn main() -> watermark_restore::Result<()> {
//! ENGINE.initialize(&std::fs::read("bg_48.png")?, &std::fs::read("bg_96.png")?)?;
//! let mut img = image::RgbaImage::new(1600, 1600);
//! let placement = ENGINE.restore(&mut img, SizeOverride::Auto, 1.0)?;
//! println!("restored a {}px watermark", placement.logo_size);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod alpha_map;
pub mod blending;
mod engine;
pub mod error;
pub mod placement;

pub use alpha_map::AlphaMap;
pub use engine::{
    default_output_path, is_supported_image, save_image, EngineSlot, ProcessOptions,
    ProcessResult, ProcessStatus, WatermarkEngine, DEFAULT_INTENSITY, SUPPORTED_FORMATS,
};
pub use error::{Error, Result};
pub use placement::{select_placement, Coverage, Placement, Roi, SizeOverride, WatermarkSize};

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use watermark_restore::{
    default_output_path, ProcessOptions, ProcessResult, ProcessStatus, SizeOverride,
    WatermarkEngine,
};

#[derive(Parser)]
#[command(
    name = "watermark-restore",
    about = "Restore pixels beneath a fixed corner watermark via reverse alpha blending",
    version,
    after_help = "Example: watermark-restore photo.png --alpha-small bg_48.png --alpha-large bg_96.png\n\n\
                  The watermark size is picked from the image dimensions unless forced:\n\
                  96x96 when both sides exceed 1024px, 48x48 otherwise."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image file or directory
    input: PathBuf,

    /// Output file or directory (default: {name}_restored.{ext})
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Reference capture of the 48x48 watermark
    #[arg(long, value_name = "PNG")]
    alpha_small: PathBuf,

    /// Reference capture of the 96x96 watermark
    #[arg(long, value_name = "PNG")]
    alpha_large: PathBuf,

    /// Force 48x48 watermark size (for images <= 1024px)
    #[arg(long, conflicts_with = "force_large")]
    force_small: bool,

    /// Force 96x96 watermark size (for images > 1024px)
    #[arg(long)]
    force_large: bool,

    /// Removal strength multiplier (0.0-2.0)
    #[arg(short, long, default_value = "1.0")]
    intensity: f32,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn options(&self) -> ProcessOptions {
        let force_size = match (self.force_small, self.force_large) {
            (true, _) => SizeOverride::Small,
            (_, true) => SizeOverride::Large,
            _ => SizeOverride::Auto,
        };
        ProcessOptions {
            force_size,
            intensity: self.intensity,
            verbose: self.verbose,
            quiet: self.quiet,
        }
    }

    fn load_engine(&self) -> Result<WatermarkEngine, String> {
        for path in [&self.alpha_small, &self.alpha_large] {
            if !path.is_file() {
                return Err(format!("reference bitmap not found: {}", path.display()));
            }
        }
        WatermarkEngine::open(&self.alpha_small, &self.alpha_large)
            .map_err(|e| format!("failed to load reference bitmaps: {e}"))
    }

    fn run(
        &self,
        engine: &WatermarkEngine,
        opts: &ProcessOptions,
    ) -> Result<Vec<ProcessResult>, String> {
        if !self.input.exists() {
            return Err(format!("input path does not exist: {}", self.input.display()));
        }

        if self.input.is_dir() {
            let output_dir = self
                .output
                .as_deref()
                .ok_or("an output directory (-o) is required when the input is a directory")?;
            return Ok(engine.process_directory(&self.input, output_dir, opts));
        }

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input));
        Ok(vec![engine.process_file(&self.input, &output, opts)])
    }
}

fn init_logging(opts: &ProcessOptions) {
    let level = if opts.quiet {
        "error"
    } else if opts.verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Per-status counts for the batch summary.
#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    restored: usize,
    partial: usize,
    outside: usize,
    failed: usize,
}

impl Tally {
    fn of(results: &[ProcessResult]) -> Self {
        let mut tally = Self::default();
        for r in results {
            match r.status {
                ProcessStatus::Restored => tally.restored += 1,
                ProcessStatus::Partial => tally.partial += 1,
                ProcessStatus::OutsideImage => tally.outside += 1,
                ProcessStatus::Failed => tally.failed += 1,
            }
        }
        tally
    }

    fn summary(&self) -> String {
        let mut parts = vec![format!("restored {}", self.restored)];
        if self.partial > 0 {
            parts.push(format!("partial {}", self.partial));
        }
        if self.outside > 0 {
            parts.push(format!("too small {}", self.outside));
        }
        if self.failed > 0 {
            parts.push(format!("failed {}", self.failed));
        }
        let total = self.restored + self.partial + self.outside + self.failed;
        format!("[Summary] {} of {total} image(s)", parts.join(", "))
    }
}

/// One status line for a processed file.
fn describe(result: &ProcessResult) -> String {
    let name = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().into_owned(),
    );
    let region = match (result.placement, result.roi) {
        (Some(p), Some(roi)) => format!("{0}x{0} at {1},{2}", p.logo_size, roi.x, roi.y),
        _ => String::new(),
    };

    match result.status {
        ProcessStatus::Restored => format!("[OK] {name} ({region})"),
        ProcessStatus::Partial => format!("[PARTIAL] {name} ({region}, clipped to image)"),
        ProcessStatus::OutsideImage => format!("[SKIP] {name}: {}", result.message),
        ProcessStatus::Failed => format!("[FAIL] {name}: {}", result.message),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if !(0.0..=2.0).contains(&cli.intensity) {
        eprintln!("Error: Intensity must be between 0.0 and 2.0");
        return ExitCode::FAILURE;
    }

    let opts = cli.options();
    init_logging(&opts);

    let engine = match cli.load_engine() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Fatal: {e}");
            return ExitCode::FAILURE;
        }
    };

    let results = match cli.run(&engine, &opts) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    for r in &results {
        if r.is_failure() || !opts.quiet {
            eprintln!("{}", describe(r));
        }
        if opts.verbose && !r.message.is_empty() {
            eprintln!("  -> {}", r.message);
        }
    }

    let tally = Tally::of(&results);
    if results.len() > 1 && !opts.quiet {
        eprintln!("{}", tally.summary());
    }

    if tally.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

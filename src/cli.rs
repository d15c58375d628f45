// ============================================================================
// PixelCraft CLI — headless batch conversion via command-line arguments
// ============================================================================
//
// Usage examples:
//   pixelcraft --input photo.png --width 32 --height 32 --output sprite.json
//   pixelcraft -i photo.jpg -o sprite.png --scale 16          (format from extension)
//   pixelcraft -i "shots/*.jpg" --output-dir grids/ --format json --colors 16
//   pixelcraft -i project.json --output art.png --scale 8     (export a saved project)
//
// Image inputs are converted to a grid; `.json` inputs are loaded as project
// documents. Every file runs synchronously on the current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::canvas::{Grid, GridConfig, check_dimensions};
use crate::io::{export_png, load_project, save_project};
use crate::ops::convert::{ConvertOptions, ImageSource, Resample, image_to_grid};
use crate::project::ProjectDocument;
use crate::settings::AppSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PixelCraft headless pixel-art converter.
#[derive(Parser, Debug)]
#[command(
    name = "pixelcraft",
    about = "PixelCraft headless pixel-art converter",
    long_about = "Turn images into pixel-art grids and export grids or saved projects\n\
                  as PNG or project JSON without opening an editor.\n\n\
                  Example:\n  \
                  pixelcraft --input photo.png --width 32 --height 32 --output sprite.png --scale 16\n  \
                  pixelcraft -i \"*.jpg\" --output-dir grids/ --format json --colors 16"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    /// `.json` files are read as project documents, everything else as images.
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png or json.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Grid width in cells for image inputs (default from settings).
    #[arg(long, value_name = "CELLS")]
    pub width: Option<u32>,

    /// Grid height in cells for image inputs (default from settings).
    #[arg(long, value_name = "CELLS")]
    pub height: Option<u32>,

    /// Pixels per cell in PNG output (default from settings).
    #[arg(short, long, value_name = "PX")]
    pub scale: Option<u32>,

    /// Reduce image inputs to at most this many colors.
    #[arg(short, long, value_name = "N")]
    pub colors: Option<usize>,

    /// Resampling filter for image inputs: bilinear or nearest.
    #[arg(long, default_value = "bilinear", value_name = "FILTER")]
    pub filter: String,

    /// Print per-file timing information and enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Json => "json",
        }
    }
}

/// Everything one file needs, resolved once from args + settings.
struct Job {
    width: u32,
    height: u32,
    cell_size: u32,
    scale: u32,
    format: OutputFormat,
    options: ConvertOptions,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs, settings: &AppSettings) -> ExitCode {
    // Resolve glob patterns / literal paths → concrete PathBufs
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let job = match build_job(&args, settings) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Create output directory if specified
    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let Some(output_path) = build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            job.format,
        ) else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                input_path.display()
            );
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &job) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log::error!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn build_job(args: &CliArgs, settings: &AppSettings) -> Result<Job, String> {
    let width = args.width.unwrap_or(settings.default_width);
    let height = args.height.unwrap_or(settings.default_height);
    check_dimensions(width, height).map_err(|e| e.to_string())?;

    let scale = args.scale.unwrap_or(settings.export_scale);
    if scale == 0 {
        return Err("--scale must be at least 1".to_string());
    }

    let resample: Resample = args.filter.parse()?;
    if let Some(n) = args.colors
        && n < 2
    {
        return Err("--colors must be at least 2".to_string());
    }

    Ok(Job {
        width,
        height,
        cell_size: settings.cell_size,
        scale,
        format: parse_format(args.format.as_deref(), args.output.as_deref())?,
        options: ConvertOptions {
            resample,
            max_colors: args.colors,
        },
    })
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(input: &Path, output: &Path, job: &Job) -> Result<(), String> {
    // -- Step 1: Load ----------------------------------------------------
    let (grid, config) = if is_project_file(input) {
        let doc = load_project(input).map_err(|e| format!("load failed: {}", e))?;
        (doc.grid, doc.config)
    } else {
        let grid = image_to_grid(
            &ImageSource::Path(input.to_path_buf()),
            job.width,
            job.height,
            &job.options,
        )
        .map_err(|e| format!("conversion failed: {}", e))?;
        let config = GridConfig::new(job.width, job.height, job.cell_size);
        (grid, config)
    };

    // -- Step 2: Save ----------------------------------------------------
    write_grid(&grid, config, output, job)
}

fn write_grid(grid: &Grid, config: GridConfig, output: &Path, job: &Job) -> Result<(), String> {
    match job.format {
        OutputFormat::Png => {
            export_png(grid, job.scale, output).map_err(|e| format!("PNG export failed: {}", e))
        }
        OutputFormat::Json => {
            let doc = ProjectDocument::new(grid.clone(), config);
            save_project(&doc, output).map_err(|e| format!("project save failed: {}", e))
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn is_project_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path, use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        // Treat as glob pattern
        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the [`OutputFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to PNG when neither is known.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<OutputFormat, String> {
    if let Some(f) = format_arg {
        return match f.to_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unsupported output format '{}' (use png or json)", other)),
        };
    }

    let from_ext = output.is_some_and(is_project_file);
    Ok(if from_ext { OutputFormat::Json } else { OutputFormat::Png })
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: OutputFormat,
) -> Option<PathBuf> {
    // Explicit output path
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    // Write next to the input file
    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

// ============================================================================
// CanvasFE CLI: headless editing via command-line arguments
// ============================================================================
//
// Usage examples:
//   canvasfe -i photo.png --effect brightness:40 -o brighter.png
//   canvasfe -i base.png overlay.png -o flat.jpg --quality 85
//   canvasfe -i shots/*.png --effect invert --crop 10,10,640,480 -o out.png
//   canvasfe -i photo.png --effect sepia --effect rotate:90 --undo 1 -o out.png
//
// Every input becomes one layer of a single document (first input at the
// bottom).  Effects go to the top layer, then the optional crop gesture runs,
// then `--undo` steps back through the edits, and the composite is written.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::canvas::{Point, Rect};
use crate::components::tools::ToolKind;
use crate::io::{SaveFormat, load_layer, save_image};
use crate::ops::effects::Effect;
use crate::project::Project;
use crate::settings::EditorSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// CanvasFE headless layer editor.
#[derive(Parser, Debug)]
#[command(
    name = "canvasfe",
    about = "CanvasFE headless layer compositor",
    long_about = "Stack image files as layers, apply effects and a crop with full\n\
                  undo history, and write the flattened result.\n\n\
                  Example:\n  \
                  canvasfe -i photo.png --effect brightness:50 -o out.png\n  \
                  canvasfe -i a.png b.png --crop 0,0,800,600 --undo 1 -o out.jpg"
)]
pub struct CliArgs {
    /// Input file(s), bottom layer first. Glob patterns accepted (e.g. "*.png").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Effect applied to the active (top) layer, repeatable:
    /// brightness[:DELTA], rotate[:DEGREES], invert, sepia.
    #[arg(short, long = "effect", value_name = "NAME[:VALUE]")]
    pub effects: Vec<Effect>,

    /// Crop the active layer to X,Y,WIDTH,HEIGHT after the effects.
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_rect)]
    pub crop: Option<Rect>,

    /// Number of edits to undo before writing the output.
    #[arg(long, default_value_t = 0, value_name = "N")]
    pub undo: usize,

    /// Output file path. Defaults to "<first input stem>_out.<ext>" next to the first input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format: png, jpeg, bmp, tga.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100, default 90).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    /// Canvas width. Defaults to the first input's width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Canvas height. Defaults to the first input's height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Draw the reference grid into the output.
    #[arg(long)]
    pub grid: bool,

    /// Settings file to use instead of the per-user one.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the edit history and timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the CLI and return an OS exit code.
/// `0` = output written, `1` = anything failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    let format = match parse_format(args.format.as_deref(), args.output.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(output_path) = build_output_path(&inputs[0], args.output.as_deref(), format) else {
        eprintln!("error: cannot determine output path for '{}'.", inputs[0].display());
        return ExitCode::FAILURE;
    };

    let settings = match &args.config {
        Some(path) => EditorSettings::load_from(path),
        None => EditorSettings::load(),
    };

    let start = Instant::now();
    match run_one(&inputs, &output_path, format, &args, settings) {
        Ok(project) => {
            if args.verbose {
                for entry in project.history().undo_history() {
                    println!("  history: {}", entry);
                }
                println!(
                    "  → {} ({:.0}ms)",
                    output_path.display(),
                    start.elapsed().as_secs_f64() * 1000.0
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            crate::log_err!("cli: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Processing pipeline
// ============================================================================

/// Load, edit, undo and save.  Returns the finished project.
pub fn run_one(
    inputs: &[PathBuf],
    output: &Path,
    format: SaveFormat,
    args: &CliArgs,
    mut settings: EditorSettings,
) -> Result<Project, String> {
    if inputs.is_empty() {
        return Err("no inputs".to_string());
    }

    // -- Step 1: Load ----------------------------------------------------
    let mut layers = Vec::with_capacity(inputs.len());
    for path in inputs {
        let layer = load_layer(path).map_err(|e| format!("load '{}' failed: {}", path.display(), e))?;
        if args.verbose {
            println!("[load] {}", path.display());
        }
        layers.push(layer);
    }

    let (first_w, first_h) = layers
        .first()
        .and_then(|l| l.pixels())
        .map(|p| p.dimensions())
        .unwrap_or((settings.canvas_width, settings.canvas_height));
    settings.canvas_width = args.width.unwrap_or(first_w);
    settings.canvas_height = args.height.unwrap_or(first_h);
    settings.grid_visible |= args.grid;

    let name = inputs[0]
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Untitled".to_string());
    let mut project = Project::with_layers(name, layers, settings);

    // -- Step 2: Effects -------------------------------------------------
    for effect in &args.effects {
        let applied = project.apply_effect(effect);
        if args.verbose {
            println!("[effect] {}{}", effect, if applied { "" } else { " (no change)" });
        }
    }

    // -- Step 3: Crop gesture --------------------------------------------
    if let Some(rect) = args.crop {
        project.set_tool(ToolKind::Crop);
        project.press(Point::new(rect.x, rect.y));
        project.drag(Point::new(rect.right(), rect.bottom()));
        let cropped = project.release(Point::new(rect.right(), rect.bottom()));
        if !cropped {
            return Err(format!("crop {},{},{},{} was ignored", rect.x, rect.y, rect.width, rect.height));
        }
    }

    // -- Step 4: Undo ----------------------------------------------------
    for _ in 0..args.undo {
        if !project.undo() {
            break;
        }
    }

    // -- Step 5: Save ----------------------------------------------------
    let flat = project.render();
    save_image(&flat, output, format, args.quality).map_err(|e| format!("save failed: {}", e))?;
    project.mark_clean();
    Ok(project)
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse "x,y,w,h" into a rectangle.
pub fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!("expected X,Y,W,H but got '{}'", s));
    }
    let mut values = [0i32; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part.parse().map_err(|e| format!("bad number '{}': {}", part, e))?;
    }
    let rect = Rect::new(values[0], values[1], values[2], values[3]);
    if rect.is_degenerate() {
        return Err(format!("crop rectangle '{}' has no area", s));
    }
    Ok(rect)
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

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

/// Choose the [`SaveFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to PNG when neither is given.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<SaveFormat, String> {
    if let Some(f) = format_arg {
        return SaveFormat::from_extension(f)
            .ok_or_else(|| format!("unknown format '{}' (expected png, jpeg, bmp or tga)", f));
    }
    Ok(output.and_then(SaveFormat::from_path).unwrap_or_default())
}

/// Compute the output path.
///
/// Priority:
/// 1. `--output` (explicit path)
/// 2. Fallback: next to the first input as "<stem>_out.<ext>"
fn build_output_path(first_input: &Path, output: Option<&Path>, format: SaveFormat) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }
    let stem = first_input.file_stem()?.to_string_lossy().into_owned();
    let parent = first_input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{}_out.{}", stem, format.extension())))
}

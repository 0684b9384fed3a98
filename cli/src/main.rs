//! paperfigs CLI - caption-aware figure extraction tool

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;

use paperfigs::{
    CropMode, ExtractOptions, ExtractionReport, Extractor, FigurePages, ImageMode, OutputLayout,
};

#[derive(Parser)]
#[command(name = "paperfigs")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Extract figure and table crops from scientific PDFs", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "PDF")]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    #[command(flatten)]
    options: OptionArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Select pages and compute crops without rendering, print JSON
    Plan {
        /// Input PDF file
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Show version information
    Version,
}

#[derive(Args, Clone)]
struct OptionArgs {
    /// Image sources to produce
    #[arg(long, value_enum, default_value = "hybrid")]
    image_mode: ImageModeArg,

    /// Pages to render
    #[arg(long, value_enum, default_value = "caption")]
    figure_pages: FigurePagesArg,

    /// Render resolution
    #[arg(long, default_value_t = 220)]
    dpi: u32,

    /// Crop mode for page renders
    #[arg(long, value_enum, default_value = "caption-aware")]
    crop_mode: CropModeArg,

    /// Margin around the visual region (pt)
    #[arg(long, default_value_t = 10.0)]
    caption_top_margin: f32,

    /// Distance kept from the page bottom (pt)
    #[arg(long, default_value_t = 8.0)]
    crop_bottom_margin: f32,

    /// Minimum crop height as a fraction of page height
    #[arg(long, default_value_t = 0.15)]
    min_crop_height_ratio: f32,

    /// Pages with more caption lines are treated as lists of figures
    #[arg(long, default_value_t = 6)]
    max_captions_per_page: usize,

    /// Minimum embedded image width (px)
    #[arg(long, default_value_t = 400)]
    embedded_min_width: u32,

    /// Minimum embedded image height (px)
    #[arg(long, default_value_t = 300)]
    embedded_min_height: u32,

    /// Minimum embedded image area (px²)
    #[arg(long, default_value_t = 120_000)]
    embedded_min_area: u64,

    /// Keep embedded images on pages that are also rendered
    #[arg(long)]
    keep_embedded: bool,

    /// Artifact layout
    #[arg(long, value_enum, default_value = "bundle")]
    layout: LayoutArg,

    /// Bundle directory name (defaults to the paper title)
    #[arg(long, env = "PAPERFIGS_BUNDLE_NAME")]
    bundle_name: Option<String>,

    /// File prefix (defaults to the bundle name)
    #[arg(long)]
    prefix: Option<String>,

    /// Remove previous artifacts first
    #[arg(long)]
    clean: bool,
}

impl From<&OptionArgs> for ExtractOptions {
    fn from(args: &OptionArgs) -> Self {
        let mut options = ExtractOptions::new()
            .with_image_mode(args.image_mode.into())
            .with_figure_pages(args.figure_pages.into())
            .with_dpi(args.dpi)
            .with_crop_mode(args.crop_mode.into())
            .with_caption_top_margin(args.caption_top_margin)
            .with_crop_bottom_margin(args.crop_bottom_margin)
            .with_min_crop_height_ratio(args.min_crop_height_ratio)
            .with_max_captions(args.max_captions_per_page)
            .with_embedded_min(
                args.embedded_min_width,
                args.embedded_min_height,
                args.embedded_min_area,
            )
            .keep_embedded_on_rendered_pages(args.keep_embedded)
            .with_layout(args.layout.into())
            .clean(args.clean);

        if let Some(ref name) = args.bundle_name {
            options = options.with_bundle_name(name.clone());
        }
        if let Some(ref prefix) = args.prefix {
            options = options.with_prefix(prefix.clone());
        }
        options
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ImageModeArg {
    /// Embedded raster images only
    Embedded,
    /// Page renders only
    Render,
    /// Both (default)
    Hybrid,
}

impl From<ImageModeArg> for ImageMode {
    fn from(mode: ImageModeArg) -> Self {
        match mode {
            ImageModeArg::Embedded => ImageMode::Embedded,
            ImageModeArg::Render => ImageMode::Render,
            ImageModeArg::Hybrid => ImageMode::Hybrid,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FigurePagesArg {
    /// Pages with figure or table captions (default)
    Caption,
    /// Every page
    All,
}

impl From<FigurePagesArg> for FigurePages {
    fn from(pages: FigurePagesArg) -> Self {
        match pages {
            FigurePagesArg::Caption => FigurePages::Caption,
            FigurePagesArg::All => FigurePages::All,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CropModeArg {
    /// Full-page renders
    None,
    /// Crop to the captioned figure (default)
    CaptionAware,
}

impl From<CropModeArg> for CropMode {
    fn from(mode: CropModeArg) -> Self {
        match mode {
            CropModeArg::None => CropMode::None,
            CropModeArg::CaptionAware => CropMode::CaptionAware,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum LayoutArg {
    /// One directory per paper (default)
    Bundle,
    /// Prefixed files directly in the output directory
    Flat,
}

impl From<LayoutArg> for OutputLayout {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Bundle => OutputLayout::Bundle,
            LayoutArg::Flat => OutputLayout::Flat,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Plan {
            input,
            compact,
            options,
        }) => cmd_plan(&input, (&options).into(), compact),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            if let Some(input) = cli.input {
                cmd_extract(&input, &cli.output_dir, (&cli.options).into())
            } else {
                println!("{}", "Usage: paperfigs <PDF> [--output-dir DIR]".yellow());
                println!("       paperfigs --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_extract(
    input: &Path,
    output_dir: &Path,
    options: ExtractOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let extractor = Extractor::new(options);
    if extractor.options().image_mode.renders_pages() && !extractor.has_rasterizer() {
        eprintln!(
            "{} PDFium not found, page renders are skipped",
            "Warning:".yellow().bold()
        );
    }

    let report = extractor.run(input, output_dir)?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &ExtractionReport) {
    println!("{}", report.names.paper_title.cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "Pages".bold(), report.num_pages);
    match report.selection {
        Some(ref selection) => println!(
            "{}: {} ({:?})",
            "Selected".bold(),
            format_pages(&selection.pages),
            selection.tier
        ),
        None => println!("{}: -", "Selected".bold()),
    }
    println!(
        "{}: {} figures, {} tables",
        "Captions".bold(),
        report.figure_caption_count,
        report.table_caption_count
    );

    let by_source = report.images_by_source();
    if by_source.is_empty() {
        println!("{}: none", "Images".bold());
    } else {
        for (source, count) in &by_source {
            println!("{}: {} {}", "Images".bold(), count, source);
        }
        println!("{}: {}", "Cropped".bold(), report.cropped_renders());
    }

    println!(
        "\n{} {}",
        "Output:".green().bold(),
        report.output_dir.display()
    );
}

fn format_pages(pages: &[u32]) -> String {
    if pages.is_empty() {
        return "none".to_string();
    }
    pages
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn cmd_plan(
    input: &Path,
    options: ExtractOptions,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let plan = Extractor::without_rasterizer(options).plan(input)?;

    let json = if compact {
        serde_json::to_string(&plan)?
    } else {
        serde_json::to_string_pretty(&plan)?
    };
    println!("{}", json);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "paperfigs".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Caption-aware figure extraction tool");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_match_library() {
        let cli = Cli::parse_from(["paperfigs", "paper.pdf"]);
        let options: ExtractOptions = (&cli.options).into();
        assert_eq!(options, ExtractOptions::default());
        assert_eq!(cli.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "paperfigs",
            "paper.pdf",
            "--output-dir",
            "out",
            "--image-mode",
            "render",
            "--crop-mode",
            "none",
            "--layout",
            "flat",
            "--dpi",
            "300",
            "--prefix",
            "p",
            "--keep-embedded",
        ]);
        let options: ExtractOptions = (&cli.options).into();
        assert_eq!(options.image_mode, ImageMode::Render);
        assert_eq!(options.crop_mode, CropMode::None);
        assert_eq!(options.layout, OutputLayout::Flat);
        assert_eq!(options.render_dpi, 300);
        assert_eq!(options.prefix.as_deref(), Some("p"));
        assert!(options.keep_embedded_on_rendered_pages);
    }

    #[test]
    fn test_plan_subcommand() {
        let cli = Cli::parse_from(["paperfigs", "plan", "paper.pdf", "--figure-pages", "all"]);
        match cli.command {
            Some(Commands::Plan { input, options, .. }) => {
                assert_eq!(input, PathBuf::from("paper.pdf"));
                assert_eq!(options.figure_pages, FigurePagesArg::All);
            }
            _ => panic!("expected plan subcommand"),
        }
    }

    #[test]
    fn test_format_pages() {
        assert_eq!(format_pages(&[]), "none");
        assert_eq!(format_pages(&[2, 5]), "2, 5");
    }
}

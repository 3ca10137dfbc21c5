use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "stipple", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a halftone drawing of an image as a PNG (and optionally SVG).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input raster image (PNG, JPEG, ...).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Also write a vector (SVG) rendition here.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Mark style.
    #[arg(long, value_enum, default_value_t = StyleChoice::Dots)]
    style: StyleChoice,

    /// Square block edge length in source pixels.
    #[arg(long, default_value_t = 10)]
    block_size: u32,

    /// Maximum marks painted per tick.
    #[arg(long, default_value_t = 512)]
    marks_per_tick: u32,

    /// Tick frequency of the draw loop.
    #[arg(long, default_value_t = 60)]
    tick_rate: u32,

    /// Font file for the glyph styles (required for `char` and `emoji`).
    #[arg(long)]
    font: Option<PathBuf>,

    /// Seed for the glyph RNG.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Sleep between ticks so the draw runs in real time.
    #[arg(long, default_value_t = false)]
    paced: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StyleChoice {
    Dots,
    Line,
    Char,
    Emoji,
}

impl From<StyleChoice> for stipple::MarkStyle {
    fn from(choice: StyleChoice) -> Self {
        match choice {
            StyleChoice::Dots => Self::Dots,
            StyleChoice::Line => Self::Line,
            StyleChoice::Char => Self::Char,
            StyleChoice::Emoji => Self::Emoji,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read image '{}'", args.in_path.display()))?;

    let style = stipple::MarkStyle::from(args.style);
    let font = match &args.font {
        Some(path) => Some(stipple::MarkFont::from_path(path)?),
        None => None,
    };
    if style.needs_font() && font.is_none() {
        anyhow::bail!("--font is required for style '{:?}'", args.style);
    }

    let cfg = stipple::PipelineConfig {
        block_size: args.block_size,
        style,
        marks_per_tick: args.marks_per_tick,
        tick_rate: stipple::TickRate::new(args.tick_rate)?,
        seed: args.seed,
        paced: args.paced,
    };

    let surface = stipple::render_halftone(&bytes, font, &cfg)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &surface.to_rgba8(),
        surface.width(),
        surface.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());

    if let Some(svg_path) = &args.svg {
        std::fs::write(svg_path, surface.to_svg())
            .with_context(|| format!("write svg '{}'", svg_path.display()))?;
        eprintln!("wrote {}", svg_path.display());
    }

    Ok(())
}

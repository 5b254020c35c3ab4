use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "affiche", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite a design JSON (background + cutouts) into a PNG.
    Compose(ComposeArgs),
    /// Run quality analysis on an image and print the report as JSON.
    Analyze(AnalyzeArgs),
    /// Suggest text placement zones for a background and print them as JSON.
    Zones(ZonesArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Input design JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// Input image (PNG/JPEG).
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct ZonesArgs {
    /// Input background image (PNG/JPEG).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Canvas family the background belongs to.
    #[arg(long, value_enum, default_value_t = SizeChoice::Square)]
    size: SizeChoice,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum SizeChoice {
    Square,
    Story,
}

impl From<SizeChoice> for affiche::CanvasSize {
    fn from(value: SizeChoice) -> Self {
        match value {
            SizeChoice::Square => affiche::CanvasSize::Square,
            SizeChoice::Story => affiche::CanvasSize::Story,
        }
    }
}

/// Design file consumed by `compose`. Cutout paths are resolved relative to
/// the design file's directory.
#[derive(Debug, serde::Deserialize)]
struct DesignFile {
    size: affiche::CanvasSize,
    #[serde(default)]
    mood: affiche::Mood,
    #[serde(default)]
    palette: Option<Vec<String>>,
    #[serde(default)]
    cutouts: Vec<DesignCutout>,
}

#[derive(Debug, serde::Deserialize)]
struct DesignCutout {
    id: String,
    path: PathBuf,
    bounds: affiche::Bounds,
    #[serde(default = "default_z")]
    z: i32,
    #[serde(default = "default_visible")]
    visible: bool,
}

fn default_z() -> i32 {
    1
}

fn default_visible() -> bool {
    true
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Analyze(args) => cmd_analyze(args),
        Command::Zones(args) => cmd_zones(args),
    }
}

fn read_design_json(path: &Path) -> anyhow::Result<DesignFile> {
    let f = File::open(path).with_context(|| format!("open design '{}'", path.display()))?;
    let r = BufReader::new(f);
    let design: DesignFile = serde_json::from_reader(r).context("parse design JSON")?;
    Ok(design)
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let design = read_design_json(&args.in_path)?;

    let palette = match &design.palette {
        Some(colors) if !colors.is_empty() => affiche::Palette::new(colors.iter().cloned()),
        _ => affiche::Palette::default(),
    };
    let background = affiche::gradient_background(design.size, &palette)?;

    let assets_root = args.in_path.parent().unwrap_or_else(|| Path::new("."));
    let mut cutouts = Vec::with_capacity(design.cutouts.len());
    for cut in &design.cutouts {
        let path = assets_root.join(&cut.path);
        let bytes =
            std::fs::read(&path).with_context(|| format!("read cutout '{}'", path.display()))?;
        cutouts.push(affiche::CutoutAsset {
            id: cut.id.clone(),
            image: affiche::PixelBuffer::decode(&bytes)?,
            bounds: cut.bounds,
            z: cut.z,
            visible: cut.visible,
        });
    }

    let composite = affiche::rasterize(&background, &cutouts, design.mood)?;
    let png = composite.encode_png()?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read image '{}'", args.in_path.display()))?;
    let report = affiche::analyze_bytes(&bytes)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_zones(args: ZonesArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read image '{}'", args.in_path.display()))?;
    let report = affiche::optimize_bytes(&bytes, args.size.into());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use image::ImageFormat;
use serde::Deserialize;
use tex_array_core::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "tex-array",
    about = "Pack images into a single texture-array asset",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack images into a texture-array asset (one image per layer, in order)
    Pack(PackArgs),
    /// Print the metadata of an existing asset as JSON
    Inspect(InspectArgs),
    /// Write the layers of an existing asset as PNG files
    Extract(ExtractArgs),
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    // Input/Output
    /// Input files or directories; directories are walked in path order
    #[arg(required = true, num_args = 1.., help_heading = "Input/Output")]
    inputs: Vec<PathBuf>,
    /// Output asset path (must lie inside --asset-root)
    #[arg(
        short,
        long,
        default_value = "NewTextureArray.texarray",
        help_heading = "Input/Output"
    )]
    out: PathBuf,
    /// Directory assets may be written to
    #[arg(long, default_value = ".", help_heading = "Input/Output")]
    asset_root: PathBuf,
    /// YAML config file path (overrides array options given on the command line)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,

    // Array
    /// Layer resolution for both axes: 8|16|32|64|128|256|512|1024|2048
    #[arg(long, conflicts_with_all = ["x_resolution", "y_resolution"], help_heading = "Array")]
    resolution: Option<String>,
    /// Layer width (independent mode)
    #[arg(long, requires = "y_resolution", help_heading = "Array")]
    x_resolution: Option<String>,
    /// Layer height (independent mode)
    #[arg(long, requires = "x_resolution", help_heading = "Array")]
    y_resolution: Option<String>,
    /// Number of layers (1..=8); defaults to the number of inputs
    #[arg(long, help_heading = "Array")]
    array_size: Option<String>,
    /// Pixel format: alpha8|r8|r16|rg16|rgb24|rgba32|argb32|bgra32|rgba64|rfloat|rgbafloat
    #[arg(long, help_heading = "Array")]
    format: Option<String>,
    /// Generate a full mip chain for every layer
    #[arg(long, default_value_t = false, help_heading = "Array")]
    mipmaps: bool,

    // Export
    /// Also write <asset>.json metadata next to the asset
    #[arg(long, default_value_t = false, help_heading = "Export")]
    sidecar: bool,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: pack in memory but do not write the asset
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct InspectArgs {
    /// Asset file
    asset: PathBuf,
}

#[derive(Parser, Debug, Clone)]
struct ExtractArgs {
    /// Asset file
    asset: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out")]
    out_dir: PathBuf,
    /// Also write every mip level, not only level 0
    #[arg(long, default_value_t = false)]
    all_mips: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Pack(args) => run_pack(args, cli.progress && !cli.quiet),
        Commands::Inspect(args) => run_inspect(args),
        Commands::Extract(args) => run_extract(args),
    }
}

fn run_pack(cli: &PackArgs, show_progress: bool) -> anyhow::Result<()> {
    let paths = gather_paths(&cli.inputs, &cli.include, &cli.exclude)?;

    let mut cfg = PackConfig {
        generate_mipmaps: cli.mipmaps,
        ..Default::default()
    };
    if let Some(r) = &cli.resolution {
        cfg.same_xy_resolution = true;
        cfg.x_resolution = parse_resolution(r)?;
    }
    if let (Some(x), Some(y)) = (&cli.x_resolution, &cli.y_resolution) {
        cfg.same_xy_resolution = false;
        cfg.x_resolution = parse_resolution(x)?;
        cfg.y_resolution = parse_resolution(y)?;
    }
    if let Some(a) = &cli.array_size {
        cfg.array_size = parse_array_size(a)?;
    }
    if let Some(f) = &cli.format {
        cfg.format = parse_format(f)?;
    }
    // YAML values override the flags above, field by field
    if let Some(path) = &cli.config {
        let file =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)?;
        cfg = y.into_pack_config(cfg)?;
    }
    if !cfg.array_size.is_set() {
        cfg.array_size = ArraySize::from_layers(paths.len()).with_context(|| {
            format!(
                "{} inputs found; at most {} layers are supported",
                paths.len(),
                ArraySize::MAX
            )
        })?;
    }

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    let mut request = PackRequest::new(cfg);
    let settings = request.validate();
    if !settings.settings_ready() {
        anyhow::bail!("cannot pack: {settings}");
    }
    let layers = request.config().layer_count();
    if paths.len() != layers {
        anyhow::bail!(
            "array size is {} but {} input images were found",
            layers,
            paths.len()
        );
    }

    let images = load_images_with_progress(&paths, show_progress)?;
    info!(count = images.len(), "loaded source images");
    for (index, image) in images.into_iter().enumerate() {
        request.set_source(index, image)?;
    }
    let report = request.validate();
    if let Some(issue) = report.first_issue() {
        anyhow::bail!("cannot pack: {issue}");
    }

    let (cfg, slots) = request.into_parts();
    let mut packer = ArrayPacker::new();
    if cli.dry_run {
        let array = packer.pack(&cfg, slots.as_slice())?;
        println!(
            "layers={} size={}x{} format={} mip_levels={} bytes={}",
            array.layer_count(),
            array.width(),
            array.height(),
            array.format(),
            array.mip_level_count(),
            array.byte_size()
        );
        return Ok(());
    }

    let root = fs::canonicalize(&cli.asset_root)
        .with_context(|| format!("asset root {}", cli.asset_root.display()))?;
    let sink = FileSink::new(root).with_sidecar(cli.sidecar);
    let out = absolute_output_path(&cli.out)?;
    let relative = sink.relative_path(&out)?;
    let array = packer.pack_and_persist(&cfg, slots.as_slice(), &sink, &out)?;
    info!(
        asset = %relative.display(),
        layers = array.layer_count(),
        mip_levels = array.mip_level_count(),
        "asset written"
    );
    Ok(())
}

fn run_inspect(args: &InspectArgs) -> anyhow::Result<()> {
    let array =
        read_asset(&args.asset).with_context(|| format!("read {}", args.asset.display()))?;
    println!("{}", serde_json::to_string_pretty(&to_json_meta(&array))?);
    Ok(())
}

fn run_extract(args: &ExtractArgs) -> anyhow::Result<()> {
    let array =
        read_asset(&args.asset).with_context(|| format!("read {}", args.asset.display()))?;
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create out_dir {}", args.out_dir.display()))?;
    let stem = args
        .asset
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("array");
    let levels = if args.all_mips {
        array.mip_level_count()
    } else {
        1
    };
    for (index, layer) in array.layers().iter().enumerate() {
        for (level, mip) in layer.mips.iter().take(levels).enumerate() {
            let rgba = array
                .format()
                .decode_rgba8(&mip.data, mip.width, mip.height)
                .with_context(|| format!("decode layer {index} mip {level}"))?;
            let png_path = if args.all_mips {
                args.out_dir
                    .join(format!("{stem}_layer{index}_mip{level}.png"))
            } else {
                args.out_dir.join(format!("{stem}_layer{index}.png"))
            };
            rgba.save_with_format(&png_path, ImageFormat::Png)
                .with_context(|| format!("write {}", png_path.display()))?;
            info!(?png_path, layer = index, level, "wrote layer");
        }
    }
    Ok(())
}

/// Makes `out` absolute, resolving symlinks in its parent when the parent exists
/// so it compares cleanly against the canonical asset root.
fn absolute_output_path(out: &Path) -> anyhow::Result<PathBuf> {
    let abs = std::path::absolute(out).with_context(|| format!("resolve {}", out.display()))?;
    let (Some(parent), Some(name)) = (abs.parent(), abs.file_name()) else {
        anyhow::bail!("output path {} does not name a file", out.display());
    };
    match fs::canonicalize(parent) {
        Ok(dir) => Ok(dir.join(name)),
        Err(e) => {
            warn!(dir = %parent.display(), error = %e, "output directory not found");
            Ok(abs)
        }
    }
}

fn parse_resolution(s: &str) -> anyhow::Result<Resolution> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown resolution: {}", s))
}

fn parse_array_size(s: &str) -> anyhow::Result<ArraySize> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown array size: {} (expected 1..=8)", s))
}

fn parse_format(s: &str) -> anyhow::Result<PixelFormat> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown pixel format: {}", s))
}

fn gather_paths(
    inputs: &[PathBuf],
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let filter = InputFilter::new(include, exclude)?;
    let mut list: Vec<PathBuf> = Vec::new();
    for path in inputs {
        if path.is_file() {
            if filter.accepts(path) {
                list.push(path.to_path_buf());
            }
        } else if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| filter.accepts(p))
                .collect();
            found.sort();
            list.extend(found);
        } else {
            anyhow::bail!("input not found: {}", path.display());
        }
    }
    Ok(list)
}

/// Layer source filter: decodable image extension, then `--exclude`, then `--include`.
struct InputFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl InputFilter {
    fn new(include: &[String], exclude: &[String]) -> anyhow::Result<Self> {
        Ok(Self {
            include: glob_set(include)?,
            exclude: glob_set(exclude)?,
        })
    }

    fn accepts(&self, path: &Path) -> bool {
        if !is_decodable(path) {
            return false;
        }
        let key = path.to_string_lossy().replace('\\', "/");
        if self.exclude.as_ref().is_some_and(|set| set.is_match(&key)) {
            return false;
        }
        self.include.as_ref().is_none_or(|set| set.is_match(&key))
    }
}

fn glob_set(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat).with_context(|| format!("glob {pat}"))?);
    }
    Ok(Some(b.build()?))
}

/// Extension maps to a format the linked `image` build can decode.
fn is_decodable(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok_and(|f| f.reading_enabled())
}

/// Decodes every path in order. Unlike atlas packing, a failed decode is fatal:
/// a skipped image would leave its layer empty.
fn load_images_with_progress(
    paths: &[PathBuf],
    progress: bool,
) -> anyhow::Result<Vec<SourceImage>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if let Some(b) = &bar {
            b.set_message(msg.to_string());
        }
        let img = SourceImage::open(p).with_context(|| format!("load {}", p.display()))?;
        list.push(img);
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
}

/// `RUST_LOG` wins when set; otherwise `-q` / `-v` pick the level.
fn init_tracing(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose > 1)
        .try_init();
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    resolution: Option<u32>,
    x_resolution: Option<u32>,
    y_resolution: Option<u32>,
    same_xy_resolution: Option<bool>,
    array_size: Option<u32>,
    format: Option<String>,
    generate_mipmaps: Option<bool>,
}

impl YamlConfig {
    fn into_pack_config(self, mut cfg: PackConfig) -> anyhow::Result<PackConfig> {
        let res = |v: u32| {
            Resolution::from_pixels(v).with_context(|| format!("unsupported resolution: {v}"))
        };
        if let Some(v) = self.resolution {
            cfg.same_xy_resolution = true;
            cfg.x_resolution = res(v)?;
        }
        if let Some(v) = self.x_resolution {
            cfg.x_resolution = res(v)?;
        }
        if let Some(v) = self.y_resolution {
            cfg.y_resolution = res(v)?;
        }
        if let Some(v) = self.same_xy_resolution {
            cfg.same_xy_resolution = v;
        }
        if let Some(v) = self.array_size {
            cfg.array_size = ArraySize::from_layers(v as usize)
                .with_context(|| format!("unsupported array size: {v}"))?;
        }
        if let Some(v) = self.format {
            cfg.format = parse_format(&v)?;
        }
        if let Some(v) = self.generate_mipmaps {
            cfg.generate_mipmaps = v;
        }
        Ok(cfg)
    }
}

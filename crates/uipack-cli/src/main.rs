use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing::{info, warn};
use uipack_core::atlas::{MODULES_FILENAME, SkinPack};
use uipack_core::ctm::AtlasLayout;
use uipack_core::export::{ExportConfig, export_to_dir, plan_export};
use uipack_core::manifest::parse_document;
use uipack_core::model::{Project, Tool};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "uipack",
    about = "Export painted GUI layouts as texture sheets and a runtime manifest",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export a layout: per-pack sheets, page backgrounds and gui_manifest.json
    Export(ExportArgs),
    /// List the skin packs found under a directory
    Packs(PacksArgs),
    /// Print a summary of a saved layout document
    Info(InfoArgs),
}

#[derive(Parser, Debug, Clone)]
struct ExportArgs {
    /// Saved layout document (JSON)
    #[arg(help_heading = "Input/Output")]
    project: PathBuf,
    /// Output directory (cleared before writing)
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Directory holding skin pack subdirectories
    #[arg(short, long, default_value = "skins", help_heading = "Input/Output")]
    skins: PathBuf,
    /// Atlas layout description (texture_mapping.json); omit for the built-in layout
    #[arg(long, help_heading = "Input/Output")]
    mapping: Option<PathBuf>,
    /// Export only the named skin packs
    #[arg(long, help_heading = "Input/Output")]
    pack: Vec<String>,

    /// Output sheet edge in pixels
    #[arg(long, default_value_t = 256, help_heading = "Layout")]
    sheet_px: u32,
    /// Share one texture block per button size (disable for one block per entry)
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Layout")]
    group_by_size: bool,

    /// Compute the plan and print stats without writing files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct PacksArgs {
    /// Directory holding skin pack subdirectories
    #[arg(default_value = "skins")]
    skins: PathBuf,
}

#[derive(Parser, Debug, Clone)]
struct InfoArgs {
    /// Saved layout document (JSON)
    project: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Export(args) => run_export(args),
        Commands::Packs(args) => run_packs(args),
        Commands::Info(args) => run_info(args),
    }
}

fn run_export(args: &ExportArgs) -> anyhow::Result<()> {
    let project = load_project(&args.project)?;
    let layout = load_layout(args.mapping.as_deref())?;

    let cfg = ExportConfig {
        sheet_px: args.sheet_px,
        group_by_size: args.group_by_size,
    };

    if args.dry_run {
        let plan = plan_export(&project, &layout, &cfg);
        println!(
            "components={} blocks={} sheets={}",
            plan.components.len(),
            plan.block_reps.len(),
            plan.sheets.sheets.len()
        );
        for (i, sheet) in plan.sheets.sheets.iter().enumerate() {
            println!(
                "  sheet {} {}x{} placements={}",
                i + 1,
                sheet.w,
                sheet.h,
                sheet.placements.len()
            );
        }
        return Ok(());
    }

    let mut packs: Vec<SkinPack> = Vec::new();
    for dir in discover_pack_dirs(&args.skins)? {
        let name = dir
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !args.pack.is_empty() && !args.pack.contains(&name) {
            continue;
        }
        match SkinPack::load(&dir, layout.tile_px) {
            Ok(pack) => packs.push(pack),
            Err(e) => warn!(?dir, error = %e, "skip skin pack"),
        }
    }
    anyhow::ensure!(
        !packs.is_empty(),
        "no usable skin packs under {}",
        args.skins.display()
    );

    let manifest = export_to_dir(&project, &layout, &cfg, &packs, &args.out_dir)
        .with_context(|| format!("export to {}", args.out_dir.display()))?;
    let page_count = manifest
        .get("pages")
        .and_then(|p| p.as_array())
        .map_or(0, Vec::len);
    info!(
        out = %args.out_dir.display(),
        packs = packs.len(),
        pages = page_count,
        "export written"
    );
    Ok(())
}

fn run_packs(args: &PacksArgs) -> anyhow::Result<()> {
    let dirs = discover_pack_dirs(&args.skins)?;
    if dirs.is_empty() {
        println!("no skin packs under {}", args.skins.display());
        return Ok(());
    }
    for dir in dirs {
        let name = dir.file_name().map(|s| s.to_string_lossy().into_owned());
        let has_bg = dir.join(uipack_core::atlas::BACKGROUND_FILENAME).exists();
        println!(
            "{}{}",
            name.unwrap_or_default(),
            if has_bg { " (background)" } else { "" }
        );
    }
    Ok(())
}

fn run_info(args: &InfoArgs) -> anyhow::Result<()> {
    let project = load_project(&args.project)?;
    println!("gui_name: {}", project.name);
    println!("grid: {0}x{0}", project.grid_n);
    println!("start page: {}", project.start_page_id);
    for page in project.pages() {
        let entries = page.entries().count();
        let buttons = page
            .entries()
            .filter(|e| matches!(e.tool, Tool::ButtonStandard | Tool::ButtonToggle))
            .count();
        println!(
            "page {}: {} entries ({} buttons), background painted: {}",
            page.page_id,
            entries,
            buttons,
            !page.grid.is_empty()
        );
    }
    Ok(())
}

fn load_project(path: &Path) -> anyhow::Result<Project> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let project =
        parse_document(&text).with_context(|| format!("parse {}", path.display()))?;
    Ok(project)
}

fn load_layout(mapping: Option<&Path>) -> anyhow::Result<AtlasLayout> {
    match mapping {
        Some(path) => {
            let text =
                fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parse {}", path.display()))?;
            let layout = AtlasLayout::from_json(&value)
                .with_context(|| format!("invalid mapping {}", path.display()))?;
            Ok(layout)
        }
        None => Ok(AtlasLayout::default()),
    }
}

/// A skin pack is any directory (up to one level deep) holding a Modules.png.
fn discover_pack_dirs(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let p = entry.path();
        if p.is_dir() && p.join(MODULES_FILENAME).exists() {
            dirs.push(p.to_path_buf());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use alignmark_core::{LayoutDatabase, Unit};
use alignmark_io::{read_gds_file, save_layout};
use alignmark_pattern::config::LayerConfig;
use alignmark_pattern::{generate_single_cross, write_array, CrossConfig, MarkConfig, EXAMPLE_FILENAME};

/// Generate wafer alignment-mark layouts as GDS-II files.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Log per-cell detail.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a labelled grid of alignment crosses for a wafer.
    Array(ArrayArgs),
    /// Generate a layout holding a single cross at the origin.
    Cross(CrossArgs),
    /// Print a summary of a GDS-II file.
    Inspect(InspectArgs),
}

#[derive(Args)]
struct ArrayArgs {
    /// JSON file overriding any of the default pattern parameters.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Standard wafer size to use as substrate (e.g. `3-inch`, `150mm`).
    #[arg(long)]
    substrate: Option<String>,
    /// Name written in the provenance line.
    #[arg(long)]
    author: Option<String>,
    /// Directory the GDS file is written to.
    ///
    /// Created if necessary.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Replace an existing file instead of appending `_1`, `_2`, ….
    #[arg(long)]
    overwrite: bool,
    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

#[derive(Args)]
struct CrossArgs {
    /// End-to-end arm length.
    #[arg(long, default_value_t = 10.0)]
    size: f64,
    /// Arm line width.
    #[arg(long, default_value_t = 2.0)]
    line_width: f64,
    /// Unit of `size` and `line_width` (in, mm, um, nm).
    #[arg(long, default_value = "um")]
    unit: Unit,
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,
    #[arg(long, default_value = EXAMPLE_FILENAME)]
    filename: String,
    /// Keep existing files and pick a fresh `_N` suffix.
    #[arg(long)]
    no_overwrite: bool,
}

#[derive(Args)]
struct InspectArgs {
    /// GDS-II file to read.
    input: PathBuf,
    /// Emit the summary as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Array(args) => run_array(args),
        Command::Cross(args) => run_cross(args),
        Command::Inspect(args) => run_inspect(args),
    }
}

fn run_array(args: ArrayArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => MarkConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}.", path))?,
        None => MarkConfig::default(),
    };
    if let Some(name) = &args.substrate {
        config = config
            .with_substrate_preset(name)
            .with_context(|| format!("Invalid --substrate {:?}.", name))?;
    }
    if let Some(author) = args.author {
        config.author = author;
    }
    if let Some(dir) = args.output_dir {
        config.output.directory = dir;
    }
    config.output.overwrite |= args.overwrite;

    if args.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    let (array, path) = write_array(&config).with_context(|| "Failed to generate alignment marks.")?;
    if !array.overlaps.is_empty() {
        log::warn!(
            "{} overlapping placements; consider a larger spacing",
            array.overlaps.len()
        );
    }
    println!("Done! Layout saved to: {}", path.display());
    Ok(())
}

fn run_cross(args: CrossArgs) -> anyhow::Result<()> {
    let cross = CrossConfig {
        size: args.size,
        line_width: args.line_width,
        unit: args.unit,
    };
    let db = generate_single_cross(&cross, &LayerConfig::default())
        .with_context(|| "Failed to build the cross.")?;
    let path = save_layout(&db, &args.output_dir, &args.filename, !args.no_overwrite)
        .with_context(|| format!("Failed to write layout to {:?}.", args.output_dir))?;
    println!("Done! Layout saved to: {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct LayoutSummary {
    library: String,
    dbu_nm: f64,
    top_cell: Option<String>,
    cells: Vec<CellSummary>,
    layers: Vec<LayerSummary>,
}

#[derive(Serialize)]
struct CellSummary {
    name: String,
    shapes: usize,
    instances: usize,
    /// [left, bottom, right, top] including instances.
    bbox: Option<[i64; 4]>,
}

#[derive(Serialize)]
struct LayerSummary {
    layer: u16,
    datatype: u16,
    shapes: usize,
}

fn summarize(db: &LayoutDatabase) -> LayoutSummary {
    let cells = db
        .all_cells()
        .map(|c| CellSummary {
            name: c.name.clone(),
            shapes: c.shape_count(),
            instances: c.instance_count(),
            bbox: db
                .cell_bbox(&c.id)
                .map(|b| [b.min.x, b.min.y, b.max.x, b.max.y]),
        })
        .collect();
    let layers = db
        .layer_stack
        .iter()
        .map(|l| LayerSummary {
            layer: l.gds_layer,
            datatype: l.gds_datatype,
            shapes: db.all_cells().map(|c| c.shapes_on_layer(l.id).count()).sum(),
        })
        .collect();
    LayoutSummary {
        library: db.name.clone(),
        dbu_nm: db.dbu_nm,
        top_cell: db
            .top_cell
            .and_then(|id| db.get_cell(&id))
            .map(|c| c.name.clone()),
        cells,
        layers,
    }
}

fn run_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let db = read_gds_file(&args.input)
        .with_context(|| format!("Failed to read GDS file {:?}.", args.input))?;
    let summary = summarize(&db);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("library:  {}", summary.library);
    println!("dbu:      {} nm", summary.dbu_nm);
    println!(
        "top cell: {}",
        summary.top_cell.as_deref().unwrap_or("<none>")
    );
    for cell in &summary.cells {
        let extent = cell
            .bbox
            .map(|[l, b, r, t]| format!("{} x {} nm", r - l, t - b))
            .unwrap_or_else(|| "empty".to_string());
        println!(
            "  cell {:<12} {:>7} shapes {:>7} instances  {}",
            cell.name, cell.shapes, cell.instances, extent
        );
    }
    for layer in &summary.layers {
        println!(
            "  layer {}/{}  {} shapes",
            layer.layer, layer.datatype, layer.shapes
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cross_defaults() {
        let cli = Cli::try_parse_from(["alignmark", "cross"]).unwrap();
        match cli.command {
            Command::Cross(args) => {
                assert_eq!(args.unit, Unit::Micrometer);
                assert_eq!(args.filename, EXAMPLE_FILENAME);
                assert!(!args.no_overwrite);
            }
            _ => panic!("expected cross"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_unit() {
        assert!(Cli::try_parse_from(["alignmark", "cross", "--unit", "ft"]).is_err());
    }

    #[test]
    fn test_summary_of_single_cross() {
        let db = generate_single_cross(&CrossConfig::example(), &LayerConfig::default()).unwrap();
        let summary = summarize(&db);
        assert_eq!(summary.top_cell.as_deref(), Some("TOP"));
        assert_eq!(summary.cells.len(), 2);
        assert_eq!(summary.cells[0].bbox, Some([-5_000, -5_000, 5_000, 5_000]));
        assert_eq!(summary.layers[0].shapes, 1);
        assert_eq!(summary.layers[1].shapes, 0);
    }
}

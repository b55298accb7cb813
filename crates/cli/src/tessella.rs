//! tessella - reconstruct tables from page-region geometry
//!
//! Reads one or more JSON region files (a single region object or an
//! array of regions, as produced by a rendering engine) and writes the
//! reconstructed tables as Markdown or JSON records.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tessella_core::{Region, TableFinder, TableSettings};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Output format for the reconstructed tables.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Markdown pipe tables (default)
    #[default]
    Markdown,
    /// JSON records keyed by column name
    Json,
}

/// Reconstruct tables from page-region geometry.
#[derive(Parser, Debug)]
#[command(name = "tessella")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// One or more paths to JSON region files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output file ("-" for stdout)
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    /// Output format
    #[arg(short = 't', long = "output-format", value_enum, default_value = "markdown")]
    output_format: OutputFormat,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    /// HTML-escape cell text in Markdown output
    #[arg(long, action = ArgAction::SetTrue)]
    clean: bool,

    /// Propagate neighbor values into blank cells (merged-cell
    /// approximation)
    #[arg(long = "fill-empty", action = ArgAction::SetTrue)]
    fill_empty: bool,

    /// Snap tolerance for near-duplicate edges
    #[arg(long = "snap-tolerance", default_value = "3.0")]
    snap_tolerance: f64,

    /// Join tolerance for collinear edges
    #[arg(long = "join-tolerance", default_value = "3.0")]
    join_tolerance: f64,

    /// Intersection tolerance for vertex detection
    #[arg(long = "intersection-tolerance", default_value = "3.0")]
    intersection_tolerance: f64,

    /// Minimum aligned words for a virtual vertical edge
    #[arg(long = "min-words-vertical", default_value = "3")]
    min_words_vertical: usize,

    /// Minimum aligned words for a virtual horizontal edge
    #[arg(long = "min-words-horizontal", default_value = "1")]
    min_words_horizontal: usize,

    /// Minimum edge length kept by the edge filter
    #[arg(long = "edge-min-length", default_value = "3.0")]
    edge_min_length: f64,

    /// Line clustering tolerance for cell text assembly
    #[arg(long = "line-tolerance", default_value = "2.0")]
    line_tolerance: f64,
}

fn build_settings(args: &Args) -> TableSettings {
    TableSettings {
        snap_tolerance: args.snap_tolerance,
        join_tolerance: args.join_tolerance,
        intersection_tolerance: args.intersection_tolerance,
        min_words_vertical: args.min_words_vertical,
        min_words_horizontal: args.min_words_horizontal,
        edge_min_length: args.edge_min_length,
        line_tolerance: args.line_tolerance,
    }
}

/// Read a region file: either a single region object or an array.
fn read_regions(path: &PathBuf) -> Result<Vec<Region>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_reader(io::BufReader::new(file))
        .with_context(|| format!("invalid JSON in {}", path.display()))?;
    let regions = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(regions)
}

/// Process one file's regions. A region that fails reconstruction is
/// logged and skipped; it never aborts its siblings.
fn process_regions<W: Write>(
    finder: &TableFinder,
    regions: &[Region],
    writer: &mut W,
    args: &Args,
) -> Result<()> {
    let mut records = Vec::new();
    for (idx, region) in regions.iter().enumerate() {
        let key = region
            .id
            .clone()
            .unwrap_or_else(|| format!("region-{idx}"));
        let tables = match finder.find_tables(region) {
            Ok(tables) => tables,
            Err(e) => {
                warn!(region = %key, error = %e, "region skipped");
                continue;
            }
        };
        match args.output_format {
            OutputFormat::Markdown => {
                for table in &tables {
                    writeln!(writer)?;
                    write!(writer, "{}", table.to_markdown(args.clean, args.fill_empty))?;
                    writeln!(writer)?;
                }
            }
            OutputFormat::Json => {
                for table in &tables {
                    records.push(serde_json::json!({
                        "region": key,
                        "rows": table.to_records(),
                    }));
                }
            }
        }
    }
    if matches!(args.output_format, OutputFormat::Json) {
        serde_json::to_writer_pretty(&mut *writer, &records)?;
        writeln!(writer)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let finder = TableFinder::new(build_settings(&args))?;

    let mut output: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .with_context(|| format!("failed to create output file {}", args.outfile))?;
        Box::new(BufWriter::new(file))
    };

    for path in &args.files {
        let regions = read_regions(path)?;
        process_regions(&finder, &regions, &mut output, &args)?;
    }

    output.flush()?;
    Ok(())
}

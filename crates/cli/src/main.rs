//! Floodplain CLI - valley-bottom extraction from a DEM and a stream network

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use floodplain_algorithms::terrain::{slope, SlopeParams, SlopeUnits};
use floodplain_core::io::{read_geotiff, write_geojson, write_geotiff, GeoTiffOptions};
use floodplain_core::{Raster, CRS};
use floodplain_corridor::drainage::derive_drainage_area;
use floodplain_corridor::{
    CorridorParams, DrainageAreaCache, DrainageAreaSource, NativeEngine, Pipeline, ProcessingMode,
    StreamNetwork, ThresholdPolicy,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "floodplain")]
#[command(author, version, about = "Valley-bottom corridors from terrain and stream networks", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the valley-bottom corridor of a stream network
    Corridor(CorridorArgs),
    /// Derive drainage area (km²) from a DEM
    DrainageArea {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Gradient imposed across filled depressions
        #[arg(long, default_value = "0.01")]
        min_slope: f64,
    },
    /// Calculate slope from DEM
    Slope {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Output units: degrees, percent, radians
        #[arg(short, long, default_value = "degrees")]
        units: String,
        /// Z-factor for unit conversion
        #[arg(short, long, default_value = "1.0")]
        z_factor: f64,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

#[derive(Args)]
struct CorridorArgs {
    /// Input DEM file (projected CRS, meters)
    #[arg(long)]
    dem: PathBuf,
    /// Stream network (GeoJSON lines)
    #[arg(long)]
    network: PathBuf,
    /// Output corridor (GeoJSON)
    #[arg(short, long)]
    output: PathBuf,

    /// Precomputed drainage area raster (km²)
    #[arg(long, conflicts_with = "flow_accumulation")]
    drainage_area: Option<PathBuf>,
    /// Precomputed flow accumulation raster (upstream cell counts)
    #[arg(long)]
    flow_accumulation: Option<PathBuf>,
    /// Always derive drainage area, never read or write the cache
    #[arg(long)]
    no_cache: bool,

    /// TOML parameter file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[command(flatten)]
    overrides: ParamOverrides,

    /// Write the network with its DrainageAreaSqKm attribute here
    #[arg(long)]
    segments_output: Option<PathBuf>,
    /// EPSG code of the network when the file does not declare one
    #[arg(long)]
    network_epsg: Option<u32>,

    /// Worker threads for tier construction
    #[arg(long, conflicts_with = "sequential")]
    threads: Option<usize>,
    /// Build tiers one after another
    #[arg(long)]
    sequential: bool,
}

#[derive(Args)]
struct ParamOverrides {
    /// Low drainage-area threshold (km²)
    #[arg(long)]
    low_da: Option<f64>,
    /// High drainage-area threshold (km²)
    #[arg(long)]
    high_da: Option<f64>,
    /// Large-stream buffer (m)
    #[arg(long)]
    large_buffer: Option<f64>,
    /// Large-stream slope threshold (degrees)
    #[arg(long)]
    large_slope: Option<f64>,
    /// Medium-stream buffer (m)
    #[arg(long)]
    medium_buffer: Option<f64>,
    /// Medium-stream slope threshold (degrees)
    #[arg(long)]
    medium_slope: Option<f64>,
    /// Small-stream buffer (m)
    #[arg(long)]
    small_buffer: Option<f64>,
    /// Small-stream slope threshold (degrees)
    #[arg(long)]
    small_slope: Option<f64>,
    /// Unconditional buffer around the whole network (m)
    #[arg(long)]
    minimum_buffer: Option<f64>,
    /// Merge parts closer than this (m)
    #[arg(long)]
    aggregation_distance: Option<f64>,
    /// Drop parts smaller than this (m²)
    #[arg(long)]
    min_area: Option<f64>,
    /// Fill holes smaller than this (m²)
    #[arg(long)]
    min_hole_area: Option<f64>,
    /// Boundary smoothing tolerance (m)
    #[arg(long)]
    smoothing_tolerance: Option<f64>,
    /// Drainage-area sample radius at segment midpoints (m)
    #[arg(long)]
    sample_radius: Option<f64>,
    /// The network needs more segments than this
    #[arg(long)]
    min_segments: Option<usize>,
    /// Require the network to reach past both thresholds
    #[arg(long)]
    strict_thresholds: bool,
}

impl ParamOverrides {
    fn apply(&self, params: &mut CorridorParams) {
        fn set<T: Copy>(target: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *target = v;
            }
        }

        set(&mut params.thresholds.low_da, self.low_da);
        set(&mut params.thresholds.high_da, self.high_da);
        set(&mut params.large.buffer, self.large_buffer);
        set(&mut params.large.slope, self.large_slope);
        set(&mut params.medium.buffer, self.medium_buffer);
        set(&mut params.medium.slope, self.medium_slope);
        set(&mut params.small.buffer, self.small_buffer);
        set(&mut params.small.slope, self.small_slope);
        set(&mut params.minimum_buffer, self.minimum_buffer);
        set(&mut params.aggregation.distance, self.aggregation_distance);
        set(&mut params.aggregation.min_area, self.min_area);
        set(&mut params.aggregation.min_hole_area, self.min_hole_area);
        set(&mut params.smoothing.tolerance, self.smoothing_tolerance);
        set(&mut params.sample_radius, self.sample_radius);
        set(&mut params.min_segments, self.min_segments);
        if self.strict_thresholds {
            params.threshold_policy = ThresholdPolicy::Strict;
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_dem(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_result(raster: &Raster<f64>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, Some(GeoTiffOptions::default())).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn load_params(config: Option<&Path>, overrides: &ParamOverrides) -> Result<CorridorParams> {
    let mut params = match config {
        Some(path) => CorridorParams::from_toml_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => CorridorParams::default(),
    };
    overrides.apply(&mut params);
    Ok(params)
}

fn processing_mode(threads: Option<usize>, sequential: bool) -> ProcessingMode {
    match (threads, sequential) {
        (_, true) => ProcessingMode::Sequential,
        (Some(n), false) => ProcessingMode::ParallelWith(n),
        (None, false) => ProcessingMode::Parallel,
    }
}

fn drainage_source(args: &CorridorArgs) -> Result<DrainageAreaSource> {
    Ok(if let Some(path) = &args.drainage_area {
        DrainageAreaSource::Supplied(read_dem(path)?)
    } else if let Some(path) = &args.flow_accumulation {
        DrainageAreaSource::Accumulation(read_dem(path)?)
    } else if args.no_cache {
        DrainageAreaSource::Derive
    } else {
        DrainageAreaSource::Cached(DrainageAreaCache::for_dem(&args.dem))
    })
}

// ─── Corridor ───────────────────────────────────────────────────────────

fn run_corridor(args: CorridorArgs) -> Result<()> {
    let params = load_params(args.config.as_deref(), &args.overrides)?;
    let dem = read_dem(&args.dem)?;

    let mut network = StreamNetwork::from_geojson_file(&args.network, args.network_epsg.map(CRS::from_epsg))
        .with_context(|| format!("Failed to read stream network {}", args.network.display()))?;
    info!("Network: {} segments", network.len());

    let source = drainage_source(&args)?;

    let pb = spinner("Starting...");
    let progress = pb.clone();
    let pipeline = Pipeline::new(params)
        .with_mode(processing_mode(args.threads, args.sequential))
        .with_observer(move |stage| progress.set_message(format!("{}...", stage)));

    let start = Instant::now();
    let output = pipeline
        .run(&dem, &mut network, source)
        .context("Failed to extract valley bottom")?;
    let elapsed = start.elapsed();
    pb.finish_and_clear();

    let pb = spinner("Writing output...");
    write_geojson(&args.output, &output.to_features(), network.crs()).context("Failed to write corridor")?;
    if let Some(path) = &args.segments_output {
        network.write_geojson(path).context("Failed to write segments")?;
    }
    pb.finish_and_clear();

    done("Corridor", &args.output, elapsed);
    println!("  Area: {:.1} ha in {} part(s)", output.area() / 10_000.0, output.parts());
    for (kind, count) in output.classified.tier_counts() {
        if count > 0 {
            let status = match output.tiers.iter().find(|t| t.kind() == kind) {
                Some(t) if t.polygon().is_some() => "built",
                _ => "empty",
            };
            println!("  {:<6} tier: {} segments ({})", kind, count, status);
        }
    }
    if let Some(path) = &args.segments_output {
        println!("  Segments saved to: {}", path.display());
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Corridor ─────────────────────────────────────────────────
        Commands::Corridor(args) => run_corridor(args)?,

        // ── Drainage area ────────────────────────────────────────────
        Commands::DrainageArea {
            input,
            output,
            min_slope,
        } => {
            let dem = read_dem(&input)?;
            let mut engine = NativeEngine::new();
            engine.fill.min_slope = min_slope;

            let pb = spinner("Deriving drainage area...");
            let start = Instant::now();
            let result = derive_drainage_area(&engine, &dem).context("Failed to derive drainage area")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            write_result(&result, &output)?;
            done("Drainage area", &output, elapsed);
            if let Some(max) = result.statistics().max {
                println!("  Largest drainage area: {:.2} km²", max);
            }
        }

        // ── Slope ────────────────────────────────────────────────────
        Commands::Slope {
            input,
            output,
            units,
            z_factor,
        } => {
            let units = match units.to_lowercase().as_str() {
                "degrees" | "deg" | "d" => SlopeUnits::Degrees,
                "percent" | "pct" | "%" => SlopeUnits::Percent,
                "radians" | "rad" | "r" => SlopeUnits::Radians,
                _ => anyhow::bail!("Unknown units: {}", units),
            };
            let dem = read_dem(&input)?;
            let start = Instant::now();
            let result = slope(&dem, SlopeParams { units, z_factor }).context("Failed to calculate slope")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("Slope", &output, elapsed);
        }

        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_dem(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            match raster.crs() {
                Some(crs) => println!("CRS: {} ({:?})", crs, crs.kind()),
                None => println!("CRS: none"),
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodplain_corridor::TierKind;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "floodplain",
            "corridor",
            "--dem",
            "dem.tif",
            "--network",
            "streams.geojson",
            "-o",
            "out.geojson",
            "--small-buffer",
            "150",
            "--low-da",
            "30",
            "--strict-thresholds",
        ])
        .unwrap();
        let Commands::Corridor(args) = cli.command else {
            panic!("expected the corridor command");
        };

        let params = load_params(None, &args.overrides).unwrap();
        assert_eq!(params.small.buffer, 150.0);
        assert_eq!(params.small.slope, 12.0);
        assert_eq!(params.thresholds.low_da, 30.0);
        assert_eq!(params.threshold_policy, ThresholdPolicy::Strict);
        assert_eq!(params.tier(TierKind::Large).buffer, 500.0);
    }

    #[test]
    fn test_drainage_inputs_are_exclusive() {
        let result = Cli::try_parse_from([
            "floodplain",
            "corridor",
            "--dem",
            "dem.tif",
            "--network",
            "streams.geojson",
            "-o",
            "out.geojson",
            "--drainage-area",
            "da.tif",
            "--flow-accumulation",
            "acc.tif",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_processing_mode() {
        assert_eq!(processing_mode(None, false), ProcessingMode::Parallel);
        assert_eq!(processing_mode(Some(3), false), ProcessingMode::ParallelWith(3));
        assert_eq!(processing_mode(None, true), ProcessingMode::Sequential);
    }
}

//! CLI for the playcube analytical store.
//!
//! Provides commands for listing dimensions, querying play files, and
//! benchmarking cube operations.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use playcube::{
    Category, Dimension, Down, FilterConfig, GroupRow, NumericField, Play, PlayGenerator, PlayType,
    Query, QueryConfig, QueryResult, Range, ScatterAxes, ScatterPlot, Store,
};
use tracing_subscriber::EnvFilter;

/// playcube: slice, pivot, and summarize football play data.
#[derive(Parser)]
#[command(name = "playcube", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// List every dimension with its categories, and every numeric field.
    Domains,

    /// Load plays from a JSON file, slice and group them, and print a summary per group.
    Query {
        /// Path to a JSON array of plays.
        plays: PathBuf,

        /// Query config file (JSON). Flags below are added to it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Keep one category of a dimension (e.g., "down=THIRD_DOWN").
        #[arg(long = "slice", value_name = "DIM=VALUE")]
        slices: Vec<String>,

        /// Keep a numeric range of a field (e.g., "distance_gained=0:10").
        #[arg(long = "range", value_name = "FIELD=MIN:MAX")]
        ranges: Vec<String>,

        /// Dimension to group by; give twice to nest.
        #[arg(long = "group-by", value_name = "DIM")]
        group_by: Vec<String>,

        /// Output format.
        #[arg(long, default_value = "table")]
        format: OutputFormat,

        /// What to report for each group.
        #[arg(long, default_value = "summary")]
        report: Report,

        /// Horizontal field for a scatter report.
        #[arg(long, value_name = "FIELD", default_value = "distance_needed")]
        x: String,

        /// Vertical field for a scatter report.
        #[arg(long, value_name = "FIELD", default_value = "distance_gained")]
        y: String,
    },

    /// Run an insert/slice/pivot microbenchmark on synthetic plays.
    Bench {
        /// Number of synthetic plays to insert.
        #[arg(long, default_value = "1000000")]
        plays: usize,
    },
}

/// Report printed for each group of a query.
#[derive(Clone, Copy, ValueEnum)]
enum Report {
    /// Outcome counts and yardage.
    Summary,
    /// One (x, y) point per play, split into successful plays and turnovers.
    Scatter,
}

/// Output format for query results.
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Aligned columns.
    Table,
    /// Comma-separated values.
    Csv,
    /// JSON object with one entry per group.
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Domains => {
            cmd_domains();
            Ok(())
        }
        Commands::Query {
            plays,
            config,
            slices,
            ranges,
            group_by,
            format,
            report,
            x,
            y,
        } => scatter_axes(report, &x, &y).and_then(|axes| {
            cmd_query(
                &plays,
                config.as_deref(),
                &slices,
                &ranges,
                &group_by,
                &format,
                axes,
            )
        }),
        Commands::Bench { plays } => cmd_bench(plays),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Implements `playcube domains`.
fn cmd_domains() {
    println!("Dimensions:");
    for dimension in Dimension::ALL {
        let values: Vec<&str> = dimension.domain().into_iter().map(Category::name).collect();
        println!("  {dimension}: {}", values.join(", "));
    }
    println!();
    println!("Numeric fields:");
    for field in NumericField::ALL {
        let kind = if field.is_count() { " (count)" } else { "" };
        println!("  {field}{kind}");
    }
}

/// Resolves the scatter axes, or `None` for a summary report.
fn scatter_axes(
    report: Report,
    x: &str,
    y: &str,
) -> Result<Option<ScatterAxes>, Box<dyn std::error::Error>> {
    match report {
        Report::Summary => Ok(None),
        Report::Scatter => Ok(Some(ScatterAxes::new(x.parse()?, y.parse()?)?)),
    }
}

/// Implements `playcube query <plays>`.
///
/// With scatter axes, prints one point per play instead of group summaries.
fn cmd_query(
    plays_path: &Path,
    config_path: Option<&Path>,
    slices: &[String],
    ranges: &[String],
    group_by: &[String],
    format: &OutputFormat,
    axes: Option<ScatterAxes>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => QueryConfig::load(path)?,
        None => QueryConfig::default(),
    };
    for expr in slices {
        config.filters.push(FilterConfig::parse_category(expr)?);
    }
    for expr in ranges {
        config.filters.push(FilterConfig::parse_range(expr)?);
    }
    for name in group_by {
        config.group_by.push(name.parse()?);
    }
    let query = config.build()?;

    let store = load_plays(plays_path)?;
    tracing::info!(
        plays = store.record_count(),
        path = %plays_path.display(),
        "loaded plays"
    );

    let result = query.run(&store)?;
    match axes {
        None => print_summary(&query, &result, format),
        Some(axes) => print_scatter(&query, &result, axes, format),
    }
}

fn print_summary(
    query: &Query,
    result: &QueryResult<Play>,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let dimensions = result.dimensions();
    let rows = result.rows();

    match format {
        OutputFormat::Table => print_table(&dimensions, &rows),
        OutputFormat::Csv => print_csv(&dimensions, &rows),
        OutputFormat::Json => {
            let groups: Vec<serde_json::Value> = rows
                .iter()
                .map(|row| {
                    serde_json::json!({
                        "key": key_json(&row.key),
                        "summary": row.summary,
                        "mean_gained": row.summary.mean_gained(),
                        "turnover_rate": row.summary.turnover_rate(),
                        "gained": row.gained,
                    })
                })
                .collect();

            let output = serde_json::json!({
                "filter": query.slices().map(ToString::to_string),
                "grouping": query.grouping().to_string(),
                "plays": result.store().record_count(),
                "gained": result.range(NumericField::DistanceGained),
                "groups": groups,
            });

            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn print_scatter(
    query: &Query,
    result: &QueryResult<Play>,
    axes: ScatterAxes,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let plot = result.scatter(axes);
    let keys = result.keys();

    match format {
        OutputFormat::Table => print_scatter_table(&keys, &plot),
        OutputFormat::Csv => print_scatter_csv(&result.dimensions(), &keys, &plot),
        OutputFormat::Json => {
            let groups: Vec<serde_json::Value> = keys
                .iter()
                .zip(&plot.series)
                .map(|(key, series)| {
                    serde_json::json!({
                        "key": key_json(key),
                        "successful": series.successful,
                        "turnovers": series.turnovers,
                    })
                })
                .collect();

            let output = serde_json::json!({
                "filter": query.slices().map(ToString::to_string),
                "grouping": query.grouping().to_string(),
                "x": axes.x(),
                "y": axes.y(),
                "x_range": plot.x_range,
                "y_range": plot.y_range,
                "groups": groups,
            });

            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn key_json(key: &[Category]) -> serde_json::Map<String, serde_json::Value> {
    key.iter()
        .map(|c| (c.dimension().to_string(), c.name().into()))
        .collect()
}

/// Reads a JSON array of plays into a fresh store.
fn load_plays(path: &Path) -> Result<Store, Box<dyn std::error::Error>> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read plays '{}': {e}", path.display()))?;
    let plays: Vec<Play> = serde_json::from_str(&data)
        .map_err(|e| format!("failed to parse plays '{}': {e}", path.display()))?;

    let mut store = Store::new();
    store.extend(plays)?;
    Ok(store)
}

fn group_label(key: &[Category]) -> String {
    if key.is_empty() {
        return "all".to_string();
    }
    let names: Vec<&str> = key.iter().map(|c| c.name()).collect();
    names.join(" / ")
}

fn format_rate(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn print_table(dimensions: &[Dimension], rows: &[GroupRow]) {
    let header = if dimensions.is_empty() {
        "group".to_string()
    } else {
        let names: Vec<&str> = dimensions.iter().map(|d| d.as_str()).collect();
        names.join(" / ")
    };
    let width = rows
        .iter()
        .map(|row| group_label(&row.key).len())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);

    println!(
        "{header:<width$}  {:>6}  {:>6}  {:>6}  {:>6}  {:>8}  {:>9}  {:>8}",
        "plays", "gain", "no_gain", "to", "mean", "range", "to_rate"
    );
    for row in rows {
        let summary = &row.summary;
        let range = format_range(row.gained);
        println!(
            "{:<width$}  {:>6}  {:>6}  {:>6}  {:>6}  {:>8}  {:>9}  {:>8}",
            group_label(&row.key),
            summary.plays,
            summary.positive,
            summary.non_positive,
            summary.turnovers,
            format_rate(summary.mean_gained()),
            range,
            format_rate(summary.turnover_rate()),
        );
    }
    if rows.is_empty() {
        println!("(no plays matched)");
    }
}

fn print_csv(dimensions: &[Dimension], rows: &[GroupRow]) {
    let mut header: Vec<&str> = dimensions.iter().map(|d| d.as_str()).collect();
    header.extend([
        "plays",
        "positive",
        "non_positive",
        "turnovers",
        "total_gained",
        "min_gained",
        "max_gained",
    ]);
    println!("{}", header.join(","));

    for row in rows {
        let mut fields: Vec<String> = row.key.iter().map(|c| c.name().to_string()).collect();
        let summary = &row.summary;
        fields.extend([
            summary.plays.to_string(),
            summary.positive.to_string(),
            summary.non_positive.to_string(),
            summary.turnovers.to_string(),
            summary.total_gained.to_string(),
            row.gained.map(|r| r.lower().to_string()).unwrap_or_default(),
            row.gained.map(|r| r.upper().to_string()).unwrap_or_default(),
        ]);
        println!("{}", fields.join(","));
    }
}

fn format_range(range: Option<Range>) -> String {
    range.map_or_else(|| "-".to_string(), |r| r.to_string())
}

fn format_points(points: &[(i32, i32)]) -> String {
    let points: Vec<String> = points.iter().map(|(x, y)| format!("({x}, {y})")).collect();
    points.join(" ")
}

fn print_scatter_table(keys: &[Vec<Category>], plot: &ScatterPlot) {
    println!(
        "x: {} {}    y: {} {}",
        plot.axes.x(),
        format_range(plot.x_range),
        plot.axes.y(),
        format_range(plot.y_range)
    );
    for (key, series) in keys.iter().zip(&plot.series) {
        println!();
        println!("{} ({} plays)", group_label(key), series.len());
        println!("  successful: {}", format_points(&series.successful));
        println!("  turnovers:  {}", format_points(&series.turnovers));
    }
    if plot.series.is_empty() {
        println!("(no plays matched)");
    }
}

fn print_scatter_csv(dimensions: &[Dimension], keys: &[Vec<Category>], plot: &ScatterPlot) {
    let mut header: Vec<&str> = dimensions.iter().map(|d| d.as_str()).collect();
    header.extend(["outcome", plot.axes.x().as_str(), plot.axes.y().as_str()]);
    println!("{}", header.join(","));

    for (key, series) in keys.iter().zip(&plot.series) {
        let names: Vec<&str> = key.iter().map(|c| c.name()).collect();
        let outcomes = [
            ("successful", &series.successful),
            ("turnover", &series.turnovers),
        ];
        for (outcome, points) in outcomes {
            for (x, y) in points {
                let mut fields: Vec<String> = names.iter().map(ToString::to_string).collect();
                fields.extend([outcome.to_string(), x.to_string(), y.to_string()]);
                println!("{}", fields.join(","));
            }
        }
    }
}

/// Implements `playcube bench`.
#[allow(clippy::cast_precision_loss)] // Benchmark stats are fine with f64 precision
fn cmd_bench(count: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("playcube benchmark");
    println!("  Plays: {count}");
    println!();

    let plays = PlayGenerator::new(0x5eed).plays(count);

    let start = Instant::now();
    let mut store = Store::new();
    store.extend(plays)?;
    let insert_elapsed = start.elapsed();

    let start = Instant::now();
    let mut sliced = store.clone();
    sliced.slice(Category::Down(Down::Third));
    let slice_root = start.elapsed();

    let start = Instant::now();
    let mut sliced = store.clone();
    sliced.slice(Category::PlayType(PlayType::RunMiddle));
    let slice_bucket = start.elapsed();

    let start = Instant::now();
    let mut pivoted = store.clone();
    pivoted.pivot(Dimension::PlayType);
    let pivot_one = start.elapsed();

    let start = Instant::now();
    let mut pivoted = store.clone();
    pivoted.pivot_pair(Dimension::Distance, Dimension::Down)?;
    let pivot_pair = start.elapsed();

    let start = Instant::now();
    let groups = store.cursor().count();
    let walk = start.elapsed();

    let ns_per_insert = insert_elapsed.as_nanos() as f64 / count.max(1) as f64;

    println!("Results:");
    println!("  Insert: {insert_elapsed:.3?} ({ns_per_insert:.1} ns/play)");
    println!("  Slice (root dimension): {slice_root:.3?}");
    println!("  Slice (bucket dimension): {slice_bucket:.3?}");
    println!("  Pivot (play_type): {pivot_one:.3?}");
    println!("  Pivot (distance x down): {pivot_pair:.3?}");
    println!("  Cursor walk ({groups} groups): {walk:.3?}");
    println!();

    Ok(())
}

use anyhow::{Context, Result};
use beatmap_charter::assembler::GeneratedChart;
use beatmap_charter::density_filter::Difficulty;
use beatmap_charter::exporter::ChartFormat;
use beatmap_charter::features::SongFeatures;
use beatmap_charter::lane_assigner::{Lane, LaneMode};
use beatmap_charter::onset_classifier::classify_onsets;
use beatmap_charter::{Charter, CharterConfig};
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Beat map generator for three-lane rhythm games", long_about = None)]
struct Args {
    /// Path to the analysed song features (JSON)
    #[arg(short, long)]
    features: PathBuf,

    /// Output file (defaults to <song name>.<format extension>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Song name (defaults to the features file name)
    #[arg(short, long)]
    name: Option<String>,

    /// Difficulty (easy, medium, hard, expert)
    #[arg(short, long)]
    difficulty: Option<String>,

    /// Lane assignment mode (hybrid, frequency, rhythmic, distributed)
    #[arg(short, long)]
    lane_mode: Option<String>,

    /// Time in seconds of beat 0
    #[arg(long)]
    offset: Option<f64>,

    /// Disable long note detection
    #[arg(long)]
    no_long_notes: bool,

    /// Minimum beats between notes, overrides difficulty
    #[arg(short, long)]
    spacing: Option<f64>,

    /// Beats before the song end that stay empty
    #[arg(long)]
    end_buffer: Option<f64>,

    /// Chart format (json or typescript)
    #[arg(long, default_value = "json")]
    format: String,

    /// Write one chart per difficulty
    #[arg(long)]
    all_difficulties: bool,

    /// Also write the time-domain onset track to this path
    #[arg(long)]
    beat_track: Option<PathBuf>,

    /// JSON file with charter settings; flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_default_env()
        .filter_level(level.parse()?)
        .init();

    let format = ChartFormat::from_str(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Invalid format: {}", args.format))?;

    let config = load_config(&args)?;
    let features = load_features(&args.features)?;
    let song_name = args.name.clone().unwrap_or_else(|| {
        args.features
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unknown".to_string())
    });

    log::info!("Starting chart generation for: {}", song_name);

    let charter = Charter::new(config);
    let charts: Vec<(Option<Difficulty>, GeneratedChart)> = if args.all_difficulties {
        charter
            .generate_all_difficulties(&features, &song_name)?
            .into_iter()
            .map(|(difficulty, chart)| (Some(difficulty), chart))
            .collect()
    } else {
        vec![(None, charter.generate(&features, &song_name)?)]
    };

    for (difficulty, chart) in &charts {
        let output_path = chart_path(args.output.as_deref(), &song_name, *difficulty, format);
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        chart.beatmap.save(&output_path, format)?;
        log::info!("Saved chart to: {}", output_path.display());
    }

    if let Some(path) = &args.beat_track {
        let difficulty = charter.config().difficulty.unwrap_or_default();
        let track = classify_onsets(&features, difficulty)?;
        std::fs::write(path, serde_json::to_string_pretty(&track)?)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Saved {} classified onsets to: {}", track.beat_count, path.display());
    }

    log::info!("Chart generation complete");
    print_summary(&charts);

    Ok(())
}

fn load_config(args: &Args) -> Result<CharterConfig> {
    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => CharterConfig::default(),
    };

    let config = apply_overrides(config, args);
    log::debug!("Charter config: {:?}", config);
    Ok(config)
}

/// Flags given on the command line win over the config file
fn apply_overrides(mut config: CharterConfig, args: &Args) -> CharterConfig {
    if let Some(name) = &args.difficulty {
        config.difficulty = Some(Difficulty::parse_lossy(name));
    }
    if let Some(name) = &args.lane_mode {
        config.lane_mode = LaneMode::parse_lossy(name);
    }
    if let Some(offset) = args.offset {
        config.offset_seconds = offset;
    }
    if let Some(spacing) = args.spacing {
        config.min_spacing_beats = Some(spacing);
    }
    if let Some(end_buffer) = args.end_buffer {
        config.end_buffer_beats = end_buffer;
    }
    if args.no_long_notes {
        config.include_long_notes = false;
    }
    config
}

/// Where a chart is written.
///
/// Without `--output` the file is `<song name>.<ext>`; per-difficulty charts
/// get `_<difficulty>` appended to the file stem.
fn chart_path(
    output: Option<&Path>,
    song_name: &str,
    difficulty: Option<Difficulty>,
    format: ChartFormat,
) -> PathBuf {
    let base = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(format!("{}.{}", song_name.replace(' ', "_"), format.extension())),
    };

    let Some(difficulty) = difficulty else {
        return base;
    };

    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| song_name.replace(' ', "_"));
    let file_name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, difficulty.name(), ext.to_string_lossy()),
        None => format!("{}_{}", stem, difficulty.name()),
    };
    base.with_file_name(file_name)
}

fn load_features(path: &Path) -> Result<SongFeatures> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading features {}", path.display()))?;
    let features = SongFeatures::from_json(&text)
        .with_context(|| format!("parsing features {}", path.display()))?;
    Ok(features)
}

fn print_summary(charts: &[(Option<Difficulty>, GeneratedChart)]) {
    println!("\n=== Chart Summary ===");
    for (difficulty, chart) in charts {
        let label = difficulty.map(|d| d.name()).unwrap_or("chart");
        println!(
            "{:<10} | {} notes | {} long | L0={} L1={} L2={} | gap {} beats",
            label,
            chart.beatmap.notes.len(),
            chart.beatmap.long_note_count(),
            chart.lane_counts.get(Lane::Left),
            chart.lane_counts.get(Lane::Center),
            chart.lane_counts.get(Lane::Right),
            chart.min_gap_beats
        );
    }
    println!("=== End Summary ===\n");
}

pub mod assembler;
pub mod beatmap;
pub mod density_filter;
pub mod error;
pub mod exporter;
pub mod features;
pub mod hold_detector;
pub mod lane_assigner;
pub mod onset_classifier;
pub mod quantizer;
pub mod stats;

use assembler::{BeatMapAssembler, GeneratedChart};
use density_filter::Difficulty;
use error::Result;
use features::SongFeatures;
use hold_detector::{HoldDetector, LongNoteMap};
use lane_assigner::{Lane, LaneAssigner, LaneMode};
use quantizer::BeatClock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Spacing used when neither a custom gap nor a difficulty is given
pub const FALLBACK_SPACING_BEATS: f64 = 1.5;

/// Main charter configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CharterConfig {
    pub difficulty: Option<Difficulty>,
    pub lane_mode: LaneMode,
    pub include_long_notes: bool,
    pub offset_seconds: f64,            // time of beat 0
    pub min_spacing_beats: Option<f64>, // overrides difficulty when set
    pub end_buffer_beats: f64,          // no notes in the last N beats
    pub min_long_note_beats: f64,
}

impl Default for CharterConfig {
    fn default() -> Self {
        CharterConfig {
            difficulty: Some(Difficulty::Medium),
            lane_mode: LaneMode::Hybrid,
            include_long_notes: true,
            offset_seconds: 0.0,
            min_spacing_beats: None,
            end_buffer_beats: 3.0,
            min_long_note_beats: 0.5,
        }
    }
}

/// Where the active minimum gap came from
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Spacing {
    Custom(f64),
    Difficulty(Difficulty),
    Fallback,
}

impl Spacing {
    pub fn beats(&self) -> f64 {
        match self {
            Spacing::Custom(beats) => *beats,
            Spacing::Difficulty(difficulty) => difficulty.min_gap_beats(),
            Spacing::Fallback => FALLBACK_SPACING_BEATS,
        }
    }
}

impl fmt::Display for Spacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spacing::Custom(beats) => write!(f, "{} beats (custom)", beats),
            Spacing::Difficulty(d) => write!(f, "{} beats ({})", d.min_gap_beats(), d.name()),
            Spacing::Fallback => write!(f, "{} beats (default)", FALLBACK_SPACING_BEATS),
        }
    }
}

impl CharterConfig {
    /// An explicit spacing beats a difficulty, which beats the fallback
    pub fn spacing(&self) -> Spacing {
        match (self.min_spacing_beats, self.difficulty) {
            (Some(beats), _) => Spacing::Custom(beats),
            (None, Some(difficulty)) => Spacing::Difficulty(difficulty),
            (None, None) => Spacing::Fallback,
        }
    }
}

/// Main charter that orchestrates the entire process
pub struct Charter {
    config: CharterConfig,
}

impl Charter {
    pub fn new(config: CharterConfig) -> Self {
        Charter { config }
    }

    pub fn config(&self) -> &CharterConfig {
        &self.config
    }

    /// Generate one chart from analysed song features
    pub fn generate(&self, features: &SongFeatures, song_name: &str) -> Result<GeneratedChart> {
        let onsets = features.onsets()?;
        let beats = features.beats();
        let clock = BeatClock::new(features.tempo_bpm, self.config.offset_seconds);

        let lanes: Vec<Lane> =
            LaneAssigner::new(self.config.lane_mode, features.tempo_bpm).assign_lanes(&onsets, &beats);

        let holds = if self.config.include_long_notes {
            HoldDetector::new(self.config.min_long_note_beats).detect_holds(&onsets, &clock)
        } else {
            LongNoteMap::new()
        };

        let spacing = self.config.spacing();
        let assembler = BeatMapAssembler::new(clock, spacing.beats(), self.config.end_buffer_beats);
        let chart = assembler.assemble(song_name, features.duration_seconds, &onsets, &lanes, &holds)?;

        log::info!("Generated beat map:");
        log::info!("  Song: {}", song_name);
        log::info!("  BPM: {:.1}", features.tempo_bpm);
        log::info!("  Min spacing: {}", spacing);
        log::info!("  Lane mode: {}", self.config.lane_mode.name());
        log::info!("  Total notes: {}", chart.beatmap.notes.len());
        log::info!("  Long notes: {}", chart.beatmap.long_note_count());
        log::info!(
            "  Lane distribution: L0={}, L1={}, L2={}",
            chart.lane_counts.get(Lane::Left),
            chart.lane_counts.get(Lane::Center),
            chart.lane_counts.get(Lane::Right)
        );

        Ok(chart)
    }

    /// Generate a chart for every difficulty, ignoring any custom spacing
    pub fn generate_all_difficulties(
        &self,
        features: &SongFeatures,
        song_name: &str,
    ) -> Result<Vec<(Difficulty, GeneratedChart)>> {
        [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard, Difficulty::Expert]
            .into_iter()
            .map(|difficulty| -> Result<(Difficulty, GeneratedChart)> {
                let charter = Charter::new(CharterConfig {
                    difficulty: Some(difficulty),
                    min_spacing_beats: None,
                    ..self.config.clone()
                });
                Ok((difficulty, charter.generate(features, song_name)?))
            })
            .collect()
    }
}

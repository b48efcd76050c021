use crate::density_filter::{DensityFilter, Difficulty, Spaced};
use crate::error::Result;
use crate::features::SongFeatures;
use crate::lane_assigner::is_on_beat;
use crate::quantizer::round_to;
use serde::{Deserialize, Serialize};

/// Whether an onset lands on a main beat
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum OnsetKind {
    MainBeat, // 1
    OffBeat,  // 2
}

impl From<OnsetKind> for u8 {
    fn from(kind: OnsetKind) -> u8 {
        match kind {
            OnsetKind::MainBeat => 1,
            OnsetKind::OffBeat => 2,
        }
    }
}

impl TryFrom<u8> for OnsetKind {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(OnsetKind::MainBeat),
            2 => Ok(OnsetKind::OffBeat),
            other => Err(format!("unknown onset type: {}", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimedOnset {
    pub time: f64, // seconds, millisecond precision
    #[serde(rename = "type")]
    pub kind: OnsetKind,
}

impl Spaced for TimedOnset {
    fn position(&self) -> f64 {
        self.time
    }

    fn priority(&self) -> u8 {
        match self.kind {
            OnsetKind::MainBeat => 1,
            OnsetKind::OffBeat => 0,
        }
    }
}

/// Onsets thinned out in the time domain, for clients that time notes in seconds
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BeatTrack {
    pub tempo: f64,
    pub difficulty: Difficulty,
    pub min_gap_ms: u32,
    pub beats: Vec<TimedOnset>,
    pub duration: f64,
    pub beat_count: usize,
}

/// Tag every onset as main beat or off beat and enforce the difficulty's
/// minimum gap in seconds, preferring main beats when two collide.
pub fn classify_onsets(features: &SongFeatures, difficulty: Difficulty) -> Result<BeatTrack> {
    features.validate()?;
    let beats = features.beats();

    let onsets: Vec<TimedOnset> = features
        .onset_times
        .iter()
        .map(|&time| TimedOnset {
            time: round_to(time, 3),
            kind: if is_on_beat(time, &beats) {
                OnsetKind::MainBeat
            } else {
                OnsetKind::OffBeat
            },
        })
        .collect();

    let min_gap = difficulty.min_gap_seconds();
    let kept = DensityFilter::priority(min_gap).apply(onsets);

    log::info!(
        "Classified {} onsets, kept {} at {} difficulty ({} ms gap)",
        features.onset_times.len(),
        kept.len(),
        difficulty.name(),
        (min_gap * 1000.0).round()
    );

    Ok(BeatTrack {
        tempo: round_to(features.tempo_bpm, 1),
        difficulty,
        min_gap_ms: (min_gap * 1000.0).round() as u32,
        beat_count: kept.len(),
        beats: kept,
        duration: round_to(features.duration_seconds, 2),
    })
}

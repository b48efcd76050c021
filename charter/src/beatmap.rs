use crate::density_filter::Spaced;
use crate::lane_assigner::{Lane, LaneCounts};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub beat: f64,
    pub lane: Lane,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_long_note: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_beat: Option<f64>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Note {
    pub fn tap(beat: f64, lane: Lane) -> Self {
        Note {
            beat,
            lane,
            is_long_note: false,
            end_beat: None,
        }
    }

    pub fn hold(beat: f64, lane: Lane, end_beat: f64) -> Self {
        Note {
            beat,
            lane,
            is_long_note: true,
            end_beat: Some(end_beat),
        }
    }
}

impl Spaced for Note {
    fn position(&self) -> f64 {
        self.beat
    }
}

/// A playable chart
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BeatMap {
    pub song_name: String,
    pub bpm: f64,
    #[serde(rename = "offset")]
    pub offset_seconds: f64,
    pub notes: Vec<Note>,
}

impl BeatMap {
    pub fn lane_counts(&self) -> LaneCounts {
        self.notes.iter().map(|n| n.lane).collect()
    }

    pub fn long_note_count(&self) -> usize {
        self.notes.iter().filter(|n| n.is_long_note).count()
    }
}

use crate::features::OnsetEvent;
use crate::quantizer::{round_to, BeatClock};
use crate::stats::median;
use std::collections::BTreeMap;

/// End beat of each long note, keyed by the index of the onset that starts it
pub type LongNoteMap = BTreeMap<usize, f64>;

#[derive(Clone, Debug)]
pub struct HoldDetector {
    pub min_duration_beats: f64, // hold length, and half the gap needed after the onset
}

impl Default for HoldDetector {
    fn default() -> Self {
        HoldDetector {
            min_duration_beats: 0.5,
        }
    }
}

impl HoldDetector {
    pub fn new(min_duration_beats: f64) -> Self {
        HoldDetector { min_duration_beats }
    }

    /// Flag onsets that are stronger than the song median and followed by
    /// a gap of at least twice the minimum hold length.
    ///
    /// Only the earlier onset of each qualifying pair is flagged, so the last
    /// onset never starts a hold.
    pub fn detect_holds(&self, onsets: &[OnsetEvent], clock: &BeatClock) -> LongNoteMap {
        let mut holds = LongNoteMap::new();
        if onsets.len() < 2 {
            return holds;
        }

        let strengths: Vec<f64> = onsets.iter().map(|o| o.strength).collect();
        let Some(median_strength) = median(&strengths) else {
            return holds;
        };

        for (i, pair) in onsets.windows(2).enumerate() {
            let gap_beats = (pair[1].time - pair[0].time) * clock.beats_per_second();

            if gap_beats >= 2.0 * self.min_duration_beats && pair[0].strength > median_strength {
                let start_beat = clock.time_to_beat(pair[0].time);
                let end_beat = round_to(start_beat + self.min_duration_beats, 2);
                holds.insert(i, end_beat);
            }
        }

        log::debug!(
            "Detected {} long notes from {} onsets (median strength {:.3})",
            holds.len(),
            onsets.len(),
            median_strength
        );

        holds
    }
}

use crate::beatmap::{BeatMap, Note};
use crate::density_filter::DensityFilter;
use crate::error::{ChartError, Result};
use crate::features::OnsetEvent;
use crate::hold_detector::LongNoteMap;
use crate::lane_assigner::{Lane, LaneCounts};
use crate::quantizer::{round_to, BeatClock};

/// A finished chart plus what it took to make it
#[derive(Clone, Debug)]
pub struct GeneratedChart {
    pub beatmap: BeatMap,
    pub lane_counts: LaneCounts,
    pub min_gap_beats: f64,
    pub cutoff_beat: f64,
}

/// Turns annotated onsets into a beat map
#[derive(Clone, Debug)]
pub struct BeatMapAssembler {
    pub clock: BeatClock,
    pub min_gap_beats: f64,
    pub end_buffer_beats: f64,
}

impl BeatMapAssembler {
    pub fn new(clock: BeatClock, min_gap_beats: f64, end_buffer_beats: f64) -> Self {
        BeatMapAssembler {
            clock,
            min_gap_beats,
            end_buffer_beats,
        }
    }

    /// Convert, annotate, thin out and trim.
    ///
    /// `lanes` must hold one lane per onset; `holds` is keyed by onset index.
    pub fn assemble(
        &self,
        song_name: &str,
        duration_seconds: f64,
        onsets: &[OnsetEvent],
        lanes: &[Lane],
        holds: &LongNoteMap,
    ) -> Result<GeneratedChart> {
        if lanes.len() != onsets.len() {
            return Err(ChartError::InvalidInput(format!(
                "{} onsets but {} lanes",
                onsets.len(),
                lanes.len()
            )));
        }

        let notes: Vec<Note> = onsets
            .iter()
            .zip(lanes)
            .enumerate()
            .filter_map(|(i, (onset, &lane))| {
                let beat = self.clock.time_to_beat(onset.time);
                if beat < 0.0 {
                    return None; // before the musical offset
                }
                Some(match holds.get(&i) {
                    Some(&end_beat) => Note::hold(beat, lane, end_beat),
                    None => Note::tap(beat, lane),
                })
            })
            .collect();
        let converted = notes.len();

        let mut notes = DensityFilter::first_wins(self.min_gap_beats).apply(notes);
        let spaced = notes.len();

        let cutoff_beat = self.clock.song_length_beats(duration_seconds) - self.end_buffer_beats;
        notes.retain(|note| note.beat <= cutoff_beat);

        log::debug!(
            "Assembled {} onsets -> {} after offset, {} after spacing, {} before beat {:.2}",
            onsets.len(),
            converted,
            spaced,
            notes.len(),
            cutoff_beat
        );

        let beatmap = BeatMap {
            song_name: song_name.to_string(),
            bpm: round_to(self.clock.bpm, 1),
            offset_seconds: self.clock.offset,
            notes,
        };

        Ok(GeneratedChart {
            lane_counts: beatmap.lane_counts(),
            beatmap,
            min_gap_beats: self.min_gap_beats,
            cutoff_beat,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn onsets_at(times: &[f64]) -> Vec<OnsetEvent> {
        times
            .iter()
            .map(|&time| OnsetEvent {
                time,
                strength: 1.0,
                brightness: 0.0,
            })
            .collect()
    }

    fn assembler(offset: f64, min_gap: f64, end_buffer: f64) -> BeatMapAssembler {
        BeatMapAssembler::new(BeatClock::new(120.0, offset), min_gap, end_buffer)
    }

    #[test]
    fn test_medium_spacing_scenario() {
        let onsets = onsets_at(&[0.5, 0.75, 2.5]);
        let lanes = vec![Lane::Center; 3];

        let chart = assembler(0.0, 1.0, 3.0)
            .assemble("song", 60.0, &onsets, &lanes, &LongNoteMap::new())
            .unwrap();
        let beats: Vec<f64> = chart.beatmap.notes.iter().map(|n| n.beat).collect();
        assert_eq!(beats, vec![1.0, 5.0]);
    }

    #[test]
    fn test_end_buffer_trims_tail() {
        // 10s at 120 BPM = 20 beats, cutoff at 17
        let onsets = onsets_at(&[7.0, 8.5, 8.6, 9.5]);
        let lanes = vec![Lane::Left; 4];

        let chart = assembler(0.0, 0.1, 3.0)
            .assemble("song", 10.0, &onsets, &lanes, &LongNoteMap::new())
            .unwrap();
        assert_eq!(chart.cutoff_beat, 17.0);
        let beats: Vec<f64> = chart.beatmap.notes.iter().map(|n| n.beat).collect();
        assert_eq!(beats, vec![14.0, 17.0]);
        assert!(chart.beatmap.notes.iter().all(|n| n.beat <= 17.0));
    }

    #[test]
    fn test_onsets_before_offset_are_dropped() {
        let onsets = onsets_at(&[0.0, 0.2, 1.0]);
        let lanes = vec![Lane::Right; 3];

        let chart = assembler(0.5, 0.25, 0.0)
            .assemble("song", 30.0, &onsets, &lanes, &LongNoteMap::new())
            .unwrap();
        assert_eq!(chart.beatmap.notes, vec![Note::tap(1.0, Lane::Right)]);
        assert_eq!(chart.beatmap.offset_seconds, 0.5);
    }

    #[test]
    fn test_onset_rounding_to_offset_serializes_as_zero() {
        let onsets = onsets_at(&[0.498]);
        let chart = assembler(0.5, 1.0, 0.0)
            .assemble("song", 30.0, &onsets, &[Lane::Left], &LongNoteMap::new())
            .unwrap();

        let json = serde_json::to_string(&chart.beatmap.notes).unwrap();
        assert_eq!(json, r#"[{"beat":0.0,"lane":0}]"#);
    }

    #[test]
    fn test_holds_attach_by_index() {
        let onsets = onsets_at(&[0.5, 1.1, 3.0]);
        let lanes = vec![Lane::Left, Lane::Center, Lane::Right];
        let mut holds = LongNoteMap::new();
        holds.insert(0, 1.5);

        let chart = assembler(0.0, 1.0, 0.0)
            .assemble("song", 30.0, &onsets, &lanes, &holds)
            .unwrap();
        let notes = &chart.beatmap.notes;
        assert_eq!(notes[0], Note::hold(1.0, Lane::Left, 1.5));
        assert_eq!(notes[1], Note::tap(2.2, Lane::Center));
        assert_eq!(notes[2], Note::tap(6.0, Lane::Right));
        assert_eq!(chart.beatmap.long_note_count(), 1);
    }

    #[test]
    fn test_lane_counts_match_notes() {
        let onsets = onsets_at(&[0.0, 1.0, 2.0, 3.0]);
        let lanes = vec![Lane::Left, Lane::Right, Lane::Right, Lane::Center];

        let chart = assembler(0.0, 1.0, 0.0)
            .assemble("song", 30.0, &onsets, &lanes, &LongNoteMap::new())
            .unwrap();
        assert_eq!(chart.lane_counts.get(Lane::Right), 2);
        assert_eq!(chart.lane_counts.total(), 4);
    }

    #[test]
    fn test_empty_input_gives_empty_map() {
        let chart = assembler(0.0, 1.0, 3.0)
            .assemble("silence", 10.0, &[], &[], &LongNoteMap::new())
            .unwrap();
        assert!(chart.beatmap.notes.is_empty());
        assert_eq!(chart.beatmap.song_name, "silence");
    }

    #[test]
    fn test_lane_length_mismatch() {
        let result = assembler(0.0, 1.0, 3.0).assemble(
            "song",
            10.0,
            &onsets_at(&[0.0, 1.0]),
            &[Lane::Left],
            &LongNoteMap::new(),
        );
        assert!(matches!(result, Err(ChartError::InvalidInput(_))));
    }

    #[test]
    fn test_bpm_rounded_for_output() {
        let clock = BeatClock::new(123.456, 0.0);
        let chart = BeatMapAssembler::new(clock, 1.0, 0.0)
            .assemble("song", 10.0, &[], &[], &LongNoteMap::new())
            .unwrap();
        assert_eq!(chart.beatmap.bpm, 123.5);
    }
}

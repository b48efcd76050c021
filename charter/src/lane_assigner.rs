use crate::features::{BeatEvent, OnsetEvent};
use crate::quantizer::BeatClock;
use crate::stats::percentile;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Max distance in seconds for an onset to count as landing on a beat
pub const BEAT_TOLERANCE: f64 = 0.05;

/// A lane may hold this multiple of its fair share before hybrid redirects
const REBALANCE_FACTOR: f64 = 1.5;

/// Window around each whole beat treated as on-beat by the rhythmic strategy
const ON_BEAT_WINDOW: f64 = 0.1;

const OFF_BEAT_PATTERN: [Lane; 4] = [Lane::Left, Lane::Right, Lane::Left, Lane::Right];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Lane {
    Left,   // 0, low
    Center, // 1, mid
    Right,  // 2, high
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Left, Lane::Center, Lane::Right];

    pub fn index(self) -> usize {
        match self {
            Lane::Left => 0,
            Lane::Center => 1,
            Lane::Right => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Lane::ALL.get(index).copied()
    }
}

impl From<Lane> for u8 {
    fn from(lane: Lane) -> u8 {
        lane.index() as u8
    }
}

impl TryFrom<u8> for Lane {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Lane::from_index(value as usize).ok_or_else(|| format!("lane out of range: {}", value))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneMode {
    /// Beat-aligned onsets go center, the rest by brightness with rebalancing
    #[default]
    Hybrid,
    /// Brightness percentiles split onsets into low, mid and high
    Frequency,
    /// Position within a 4/4 measure
    Rhythmic,
    /// Beat-aligned onsets go center, the rest alternate left and right
    Distributed,
}

impl LaneMode {
    pub fn name(&self) -> &'static str {
        match self {
            LaneMode::Hybrid => "hybrid",
            LaneMode::Frequency => "frequency",
            LaneMode::Rhythmic => "rhythmic",
            LaneMode::Distributed => "distributed",
        }
    }

    /// Parse a mode name, falling back to `Distributed` for anything unknown
    pub fn parse_lossy(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            log::warn!("Unknown lane mode '{}', using distributed", name);
            LaneMode::Distributed
        })
    }
}

impl FromStr for LaneMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hybrid" => Ok(LaneMode::Hybrid),
            "frequency" => Ok(LaneMode::Frequency),
            "rhythmic" => Ok(LaneMode::Rhythmic),
            "distributed" => Ok(LaneMode::Distributed),
            other => Err(format!("Unknown lane mode: {}", other)),
        }
    }
}

/// Running number of notes placed in each lane
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LaneCounts([usize; 3]);

impl LaneCounts {
    pub fn record(&mut self, lane: Lane) {
        self.0[lane.index()] += 1;
    }

    pub fn get(&self, lane: Lane) -> usize {
        self.0[lane.index()]
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// Lane with the fewest notes, lowest index on ties
    pub fn least_used(&self) -> Lane {
        Lane::ALL
            .into_iter()
            .min_by_key(|lane| self.get(*lane))
            .unwrap_or(Lane::Center)
    }
}

impl FromIterator<Lane> for LaneCounts {
    fn from_iter<I: IntoIterator<Item = Lane>>(iter: I) -> Self {
        let mut counts = LaneCounts::default();
        for lane in iter {
            counts.record(lane);
        }
        counts
    }
}

/// True if `time` is within `BEAT_TOLERANCE` of any beat
pub fn is_on_beat(time: f64, beats: &[BeatEvent]) -> bool {
    beats.iter().any(|beat| (time - beat.time).abs() < BEAT_TOLERANCE)
}

pub struct LaneAssigner {
    pub mode: LaneMode,
    pub bpm: f64,
}

impl LaneAssigner {
    pub fn new(mode: LaneMode, bpm: f64) -> Self {
        LaneAssigner { mode, bpm }
    }

    /// Assign one lane per onset, in onset order
    pub fn assign_lanes(&self, onsets: &[OnsetEvent], beats: &[BeatEvent]) -> Vec<Lane> {
        if onsets.is_empty() {
            return Vec::new();
        }

        match self.mode {
            LaneMode::Hybrid => self.assign_hybrid(onsets, beats),
            LaneMode::Frequency => self.assign_by_frequency(onsets),
            LaneMode::Rhythmic => self.assign_rhythmic(onsets),
            LaneMode::Distributed => self.assign_distributed(onsets, beats),
        }
    }

    /// Split by the song's own 33rd/66th brightness percentiles
    fn assign_by_frequency(&self, onsets: &[OnsetEvent]) -> Vec<Lane> {
        let brightness: Vec<f64> = onsets.iter().map(|o| o.brightness).collect();
        let (Some(p33), Some(p66)) = (percentile(&brightness, 33.0), percentile(&brightness, 66.0))
        else {
            return Vec::new();
        };

        brightness
            .iter()
            .map(|&b| {
                if b < p33 {
                    Lane::Left
                } else if b < p66 {
                    Lane::Center
                } else {
                    Lane::Right
                }
            })
            .collect()
    }

    fn assign_rhythmic(&self, onsets: &[OnsetEvent]) -> Vec<Lane> {
        let clock = BeatClock::new(self.bpm, 0.0);

        onsets
            .iter()
            .map(|onset| {
                let measure_pos = clock.raw_beat(onset.time).rem_euclid(4.0);
                let fraction = measure_pos.fract();

                if fraction < ON_BEAT_WINDOW || fraction > 1.0 - ON_BEAT_WINDOW {
                    match measure_pos.round() as usize % 4 {
                        1 => Lane::Left,
                        3 => Lane::Right,
                        _ => Lane::Center, // beats 1 and 3
                    }
                } else {
                    let eighth = (measure_pos * 2.0).floor() as usize % 4;
                    OFF_BEAT_PATTERN[eighth]
                }
            })
            .collect()
    }

    fn assign_distributed(&self, onsets: &[OnsetEvent], beats: &[BeatEvent]) -> Vec<Lane> {
        let mut next_side = Lane::Left;

        onsets
            .iter()
            .map(|onset| {
                if is_on_beat(onset.time, beats) {
                    Lane::Center
                } else {
                    let lane = next_side;
                    next_side = if lane == Lane::Left { Lane::Right } else { Lane::Left };
                    lane
                }
            })
            .collect()
    }

    /// Single forward pass; the running counts only see onsets already placed
    fn assign_hybrid(&self, onsets: &[OnsetEvent], beats: &[BeatEvent]) -> Vec<Lane> {
        let by_frequency = self.assign_by_frequency(onsets);
        let mut counts = LaneCounts::default();
        let mut lanes = Vec::with_capacity(onsets.len());

        for (onset, &frequency_lane) in onsets.iter().zip(&by_frequency) {
            let lane = if is_on_beat(onset.time, beats) {
                Lane::Center
            } else {
                rebalance(frequency_lane, &counts)
            };

            counts.record(lane);
            lanes.push(lane);
        }

        log::debug!("Hybrid lane counts: {:?}", counts);
        lanes
    }
}

/// Redirect `candidate` to the least used lane once it holds more than its share
fn rebalance(candidate: Lane, counts: &LaneCounts) -> Lane {
    // includes the note being placed
    let total = counts.total() + 1;
    if total <= 3 {
        return candidate;
    }

    let expected = total as f64 / 3.0;
    if counts.get(candidate) as f64 > expected * REBALANCE_FACTOR {
        counts.least_used()
    } else {
        candidate
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
                brightness: 1000.0,
            })
            .collect()
    }

    fn beats_at(times: &[f64]) -> Vec<BeatEvent> {
        times.iter().map(|&time| BeatEvent { time }).collect()
    }

    #[test]
    fn test_empty_input_for_every_mode() {
        for mode in [LaneMode::Hybrid, LaneMode::Frequency, LaneMode::Rhythmic, LaneMode::Distributed] {
            let assigner = LaneAssigner::new(mode, 120.0);
            assert!(assigner.assign_lanes(&[], &beats_at(&[0.0])).is_empty());
        }
    }

    #[test]
    fn test_frequency_uses_song_percentiles() {
        let assigner = LaneAssigner::new(LaneMode::Frequency, 120.0);
        let mut onsets = onsets_at(&[0.0, 1.0, 2.0]);
        onsets[0].brightness = 100.0;
        onsets[1].brightness = 200.0;
        onsets[2].brightness = 300.0;

        let lanes = assigner.assign_lanes(&onsets, &[]);
        assert_eq!(lanes, vec![Lane::Left, Lane::Center, Lane::Right]);

        // Same relative brightness in a brighter song gives the same lanes
        for onset in &mut onsets {
            onset.brightness *= 10.0;
        }
        assert_eq!(assigner.assign_lanes(&onsets, &[]), lanes);
    }

    #[test]
    fn test_rhythmic_on_beats() {
        let assigner = LaneAssigner::new(LaneMode::Rhythmic, 120.0);
        // 120 BPM: one beat every 0.5s
        let lanes = assigner.assign_lanes(&onsets_at(&[0.0, 0.5, 1.0, 1.5, 2.0]), &[]);
        assert_eq!(
            lanes,
            vec![Lane::Center, Lane::Left, Lane::Center, Lane::Right, Lane::Center]
        );
    }

    #[test]
    fn test_rhythmic_near_beat_counts_as_on_beat() {
        let assigner = LaneAssigner::new(LaneMode::Rhythmic, 120.0);
        // 0.48s = beat 0.96, within 0.1 of beat 1
        let lanes = assigner.assign_lanes(&onsets_at(&[0.48]), &[]);
        assert_eq!(lanes, vec![Lane::Left]);
    }

    #[test]
    fn test_rhythmic_off_beats() {
        let assigner = LaneAssigner::new(LaneMode::Rhythmic, 120.0);
        // measure positions 0.25, 0.5, 1.5
        let lanes = assigner.assign_lanes(&onsets_at(&[0.125, 0.25, 0.75]), &[]);
        assert_eq!(lanes, vec![Lane::Left, Lane::Right, Lane::Right]);
    }

    #[test]
    fn test_distributed_alternates_sides() {
        let assigner = LaneAssigner::new(LaneMode::Distributed, 120.0);
        let onsets = onsets_at(&[0.0, 0.2, 0.3, 0.52, 0.7]);
        let lanes = assigner.assign_lanes(&onsets, &beats_at(&[0.0, 0.5]));
        assert_eq!(
            lanes,
            vec![Lane::Center, Lane::Left, Lane::Right, Lane::Center, Lane::Left]
        );
    }

    #[test]
    fn test_hybrid_beat_aligned_goes_center() {
        let assigner = LaneAssigner::new(LaneMode::Hybrid, 120.0);
        let mut onsets = onsets_at(&[0.0, 0.26, 0.5]);
        onsets[0].brightness = 9000.0;
        onsets[1].brightness = 50.0;
        onsets[2].brightness = 9000.0;

        let lanes = assigner.assign_lanes(&onsets, &beats_at(&[0.01, 0.5]));
        assert_eq!(lanes[0], Lane::Center);
        assert_eq!(lanes[1], Lane::Left);
        assert_eq!(lanes[2], Lane::Center);
    }

    #[test]
    fn test_hybrid_rebalances_crowded_lane() {
        let assigner = LaneAssigner::new(LaneMode::Hybrid, 120.0);
        // Equal brightness puts every onset at or above p66, i.e. the right lane
        let onsets = onsets_at(&[0.1, 0.2, 0.3, 0.4, 0.6, 0.7, 0.8]);
        let lanes = assigner.assign_lanes(&onsets, &[]);
        assert_eq!(
            lanes,
            vec![
                Lane::Right,
                Lane::Right,
                Lane::Right,
                Lane::Left,
                Lane::Center,
                Lane::Right,
                Lane::Left,
            ]
        );
    }

    #[test]
    fn test_every_mode_is_deterministic() {
        let mut onsets = onsets_at(&[0.1, 0.37, 0.5, 0.81, 1.02, 1.5, 1.77, 2.0]);
        for (i, onset) in onsets.iter_mut().enumerate() {
            onset.brightness = ((i * 7919) % 13) as f64 * 100.0;
        }
        let beats = beats_at(&[0.0, 0.5, 1.0, 1.5, 2.0]);

        for mode in [LaneMode::Hybrid, LaneMode::Frequency, LaneMode::Rhythmic, LaneMode::Distributed] {
            let assigner = LaneAssigner::new(mode, 120.0);
            let first = assigner.assign_lanes(&onsets, &beats);
            assert_eq!(first.len(), onsets.len());
            for _ in 0..3 {
                assert_eq!(assigner.assign_lanes(&onsets, &beats), first);
            }
        }
    }

    #[test]
    fn test_lane_mode_parsing() {
        assert_eq!("Rhythmic".parse::<LaneMode>(), Ok(LaneMode::Rhythmic));
        assert!("zigzag".parse::<LaneMode>().is_err());
        assert_eq!(LaneMode::parse_lossy("zigzag"), LaneMode::Distributed);
        assert_eq!(LaneMode::parse_lossy("frequency"), LaneMode::Frequency);
    }

    #[test]
    fn test_lane_counts() {
        let counts: LaneCounts = [Lane::Right, Lane::Right, Lane::Center].into_iter().collect();
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.get(Lane::Right), 2);
        assert_eq!(counts.least_used(), Lane::Left);
    }

    #[test]
    fn test_lane_serializes_as_index() {
        assert_eq!(serde_json::to_string(&Lane::Right).unwrap(), "2");
        assert_eq!(serde_json::from_str::<Lane>("0").unwrap(), Lane::Left);
        assert!(serde_json::from_str::<Lane>("3").is_err());
    }
}

/// Converts between seconds and beat-number coordinates for one song
#[derive(Clone, Copy, Debug)]
pub struct BeatClock {
    pub bpm: f64,
    pub offset: f64, // seconds before beat 0
}

impl BeatClock {
    pub fn new(bpm: f64, offset: f64) -> Self {
        BeatClock { bpm, offset }
    }

    pub fn beats_per_second(&self) -> f64 {
        self.bpm / 60.0
    }

    /// Unrounded beat position of a time in seconds
    pub fn raw_beat(&self, time: f64) -> f64 {
        (time - self.offset) * self.beats_per_second()
    }

    /// Beat position rounded to 2 decimals, the chart's coordinate
    pub fn time_to_beat(&self, time: f64) -> f64 {
        let beat = round_to(self.raw_beat(time), 2);
        // values just below zero round to -0.0
        if beat == 0.0 {
            0.0
        } else {
            beat
        }
    }

    /// Length of a song in beats, measured from time zero
    pub fn song_length_beats(&self, duration: f64) -> f64 {
        duration * self.beats_per_second()
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_to_beat() {
        let clock = BeatClock::new(120.0, 0.0);
        // Beat duration at 120 BPM = 0.5 seconds
        assert_eq!(clock.time_to_beat(0.5), 1.0);
        assert_eq!(clock.time_to_beat(0.75), 1.5);
        assert_eq!(clock.time_to_beat(2.5), 5.0);
    }

    #[test]
    fn test_offset_shifts_beats() {
        let clock = BeatClock::new(120.0, 0.25);
        assert_eq!(clock.time_to_beat(0.25), 0.0);
        assert!(clock.time_to_beat(0.0) < 0.0);
    }

    #[test]
    fn test_just_before_offset_is_positive_zero() {
        let clock = BeatClock::new(120.0, 0.5);
        // 0.498s = beat -0.004, rounds to zero
        let beat = clock.time_to_beat(0.498);
        assert_eq!(beat, 0.0);
        assert!(beat.is_sign_positive());
    }

    #[test]
    fn test_rounding_to_two_decimals() {
        let clock = BeatClock::new(133.0, 0.0);
        // 1.0 s at 133 BPM = 2.21666.. beats
        assert_eq!(clock.time_to_beat(1.0), 2.22);
    }

    #[test]
    fn test_song_length_ignores_offset() {
        let clock = BeatClock::new(120.0, 1.0);
        assert_eq!(clock.song_length_beats(10.0), 20.0);
    }
}

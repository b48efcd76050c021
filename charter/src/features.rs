use crate::error::{ChartError, Result};
use serde::{Deserialize, Serialize};

/// A detected note attack
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OnsetEvent {
    pub time: f64,       // time in seconds
    pub strength: f64,   // onset envelope value at the attack
    pub brightness: f64, // spectral centroid at the attack
}

/// A detected main pulse
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeatEvent {
    pub time: f64,
}

/// Spectral centroid per time frame, sampled at a fixed hop
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BrightnessTrack {
    pub frame_seconds: f64,
    pub values: Vec<f64>,
}

impl BrightnessTrack {
    /// Value of the frame containing `time`, clamped to the last frame
    pub fn at(&self, time: f64) -> Option<f64> {
        let last = self.values.len().checked_sub(1)?;
        if self.frame_seconds <= 0.0 {
            return None;
        }
        let frame = (time.max(0.0) / self.frame_seconds).floor() as usize;
        self.values.get(frame.min(last)).copied()
    }
}

/// Brightness is either aligned to the onsets or looked up by time
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum Brightness {
    PerOnset(Vec<f64>),
    Track(BrightnessTrack),
}

impl Default for Brightness {
    fn default() -> Self {
        Brightness::PerOnset(Vec::new())
    }
}

/// Analysis output handed over by the feature extractor.
///
/// All sequences are in seconds. `onset_strengths` and a per-onset
/// `brightness` must have exactly one entry per onset.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct SongFeatures {
    pub tempo_bpm: f64,
    pub duration_seconds: f64,
    #[serde(default)]
    pub beat_times: Vec<f64>,
    #[serde(default)]
    pub onset_times: Vec<f64>,
    #[serde(default)]
    pub onset_strengths: Vec<f64>,
    #[serde(default)]
    pub brightness: Brightness,
}

impl SongFeatures {
    /// Load features from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the contract the rest of the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if !self.tempo_bpm.is_finite() || self.tempo_bpm <= 0.0 {
            return Err(ChartError::InvalidInput(format!(
                "tempo must be a positive number, got {}",
                self.tempo_bpm
            )));
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds < 0.0 {
            return Err(ChartError::InvalidInput(format!(
                "duration must be non-negative, got {}",
                self.duration_seconds
            )));
        }

        let onset_count = self.onset_times.len();
        if self.onset_strengths.len() != onset_count {
            return Err(ChartError::InvalidInput(format!(
                "{} onsets but {} onset strengths",
                onset_count,
                self.onset_strengths.len()
            )));
        }

        match &self.brightness {
            Brightness::PerOnset(values) if values.len() != onset_count => {
                return Err(ChartError::InvalidInput(format!(
                    "{} onsets but {} brightness values",
                    onset_count,
                    values.len()
                )));
            }
            Brightness::Track(track) if onset_count > 0 && track.values.is_empty() => {
                return Err(ChartError::InvalidInput(
                    "brightness track is empty".to_string(),
                ));
            }
            Brightness::Track(track) if track.frame_seconds.is_nan() || track.frame_seconds <= 0.0 => {
                return Err(ChartError::InvalidInput(format!(
                    "brightness frame length must be positive, got {}",
                    track.frame_seconds
                )));
            }
            _ => {}
        }

        if self.onset_times.iter().any(|t| !t.is_finite()) {
            return Err(ChartError::InvalidInput(
                "onset times must be finite".to_string(),
            ));
        }
        if self.onset_times.windows(2).any(|w| w[1] < w[0]) {
            return Err(ChartError::InvalidInput(
                "onset times must be in ascending order".to_string(),
            ));
        }

        Ok(())
    }

    /// Zip onset times, strengths and brightness into events
    pub fn onsets(&self) -> Result<Vec<OnsetEvent>> {
        self.validate()?;

        let onsets = self
            .onset_times
            .iter()
            .zip(&self.onset_strengths)
            .enumerate()
            .map(|(i, (&time, &strength))| {
                let brightness = match &self.brightness {
                    Brightness::PerOnset(values) => values[i],
                    // validated non-empty above
                    Brightness::Track(track) => track.at(time).unwrap_or(0.0),
                };
                OnsetEvent {
                    time,
                    strength,
                    brightness,
                }
            })
            .collect();

        Ok(onsets)
    }

    pub fn beats(&self) -> Vec<BeatEvent> {
        self.beat_times
            .iter()
            .map(|&time| BeatEvent { time })
            .collect()
    }
}

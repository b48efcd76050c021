use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub fn name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }

    /// Minimum spacing between chart notes, in beats
    pub fn min_gap_beats(&self) -> f64 {
        match self {
            Difficulty::Easy => 2.0,
            Difficulty::Medium => 1.0,
            Difficulty::Hard => 0.5,
            Difficulty::Expert => 0.25,
        }
    }

    /// Minimum spacing between classified onsets, in seconds
    pub fn min_gap_seconds(&self) -> f64 {
        match self {
            Difficulty::Easy => 0.25,
            Difficulty::Medium => 0.18,
            Difficulty::Hard => 0.12,
            Difficulty::Expert => 0.08,
        }
    }

    /// Parse a difficulty name, falling back to `Medium` for anything unknown
    pub fn parse_lossy(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            log::warn!("Unknown difficulty '{}', using medium", name);
            Difficulty::Medium
        })
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "expert" => Ok(Difficulty::Expert),
            other => Err(format!("Unknown difficulty: {}", other)),
        }
    }
}

/// Something with a position on a single axis (seconds or beats)
pub trait Spaced {
    fn position(&self) -> f64;

    /// Higher wins under `TieBreak::Priority`
    fn priority(&self) -> u8 {
        0
    }
}

impl Spaced for f64 {
    fn position(&self) -> f64 {
        *self
    }
}

/// What happens when a candidate lands too close to the last kept event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TieBreak {
    /// Drop the candidate
    FirstWins,
    /// Replace the last kept event if the candidate has strictly higher priority
    Priority,
}

#[derive(Clone, Copy, Debug)]
pub struct DensityFilter {
    pub min_gap: f64,
    pub tie_break: TieBreak,
}

impl DensityFilter {
    pub fn new(min_gap: f64, tie_break: TieBreak) -> Self {
        DensityFilter { min_gap, tie_break }
    }

    pub fn first_wins(min_gap: f64) -> Self {
        DensityFilter::new(min_gap, TieBreak::FirstWins)
    }

    pub fn priority(min_gap: f64) -> Self {
        DensityFilter::new(min_gap, TieBreak::Priority)
    }

    /// Keep events so that consecutive kept positions differ by at least `min_gap`.
    ///
    /// Input is stably sorted by position first; the first event is always kept.
    pub fn apply<T: Spaced>(&self, mut events: Vec<T>) -> Vec<T> {
        events.sort_by(|a, b| a.position().total_cmp(&b.position()));

        let mut kept: Vec<T> = Vec::with_capacity(events.len());
        for event in events {
            if let Some(last) = kept.last() {
                if event.position() - last.position() < self.min_gap {
                    let promote =
                        self.tie_break == TieBreak::Priority && event.priority() > last.priority();
                    if promote {
                        if let Some(slot) = kept.last_mut() {
                            *slot = event;
                        }
                    }
                    continue;
                }
            }
            kept.push(event);
        }

        kept
    }
}

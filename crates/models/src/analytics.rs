//! Progress analytics: response shapes plus the pure math behind them.

use crate::WorkoutSet;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PROGRESS_LIMIT: i64 = 10;
pub const DEFAULT_PLATEAU_WINDOW: usize = 3;
pub const CONSISTENCY_WINDOW_DAYS: i64 = 7;
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OneRepMaxFormula {
    #[default]
    Epley,
    Brzycki,
}

impl FromStr for OneRepMaxFormula {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "epley" => Ok(OneRepMaxFormula::Epley),
            "brzycki" => Ok(OneRepMaxFormula::Brzycki),
            _ => Err(format!("Unknown one-rep-max formula: {s}")),
        }
    }
}

impl fmt::Display for OneRepMaxFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OneRepMaxFormula::Epley => write!(f, "epley"),
            OneRepMaxFormula::Brzycki => write!(f, "brzycki"),
        }
    }
}

/// Top weight of one session, used for strength curves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct ProgressPoint {
    pub date: NaiveDate,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonalBest {
    pub exercise_id: i64,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Consistency {
    pub workouts_last_7_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OneRepMaxEstimate {
    pub exercise_id: i64,
    pub formula: OneRepMaxFormula,
    pub estimate: Option<f64>,
    /// The set the estimate was derived from.
    pub weight: Option<f64>,
    pub reps: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryVolume {
    pub category: String,
    pub volume: f64,
    pub sets: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlateauStatus {
    pub exercise_id: i64,
    pub window: usize,
    pub sessions: usize,
    pub plateaued: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OneRepMaxQuery {
    pub formula: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlateauQuery {
    pub window: Option<usize>,
    pub tolerance: Option<f64>,
}

/// Estimated one-repetition maximum. `None` when the set carries no
/// information (zero reps) or the formula is undefined for the rep count.
pub fn estimate_one_rep_max(weight: f64, reps: i64, formula: OneRepMaxFormula) -> Option<f64> {
    if reps <= 0 || !weight.is_finite() || weight < 0.0 {
        return None;
    }
    if reps == 1 {
        return Some(weight);
    }
    let r = reps as f64;
    match formula {
        OneRepMaxFormula::Epley => Some(weight * (1.0 + r / 30.0)),
        OneRepMaxFormula::Brzycki => {
            if reps >= 37 {
                None
            } else {
                Some(weight * 36.0 / (37.0 - r))
            }
        }
    }
}

/// Best estimate across `sets`, together with the set that produced it.
pub fn best_one_rep_max<'a, I>(sets: I, formula: OneRepMaxFormula) -> Option<(f64, &'a WorkoutSet)>
where
    I: IntoIterator<Item = &'a WorkoutSet>,
{
    sets.into_iter()
        .filter_map(|s| estimate_one_rep_max(s.weight, s.reps, formula).map(|e| (e, s)))
        .fold(None, |best, (estimate, set)| match best {
            Some((b, _)) if b >= estimate => best,
            _ => Some((estimate, set)),
        })
}

/// Σ weight × reps.
pub fn volume_load<'a, I>(sets: I) -> f64
where
    I: IntoIterator<Item = &'a WorkoutSet>,
{
    sets.into_iter().map(|s| s.weight * s.reps as f64).sum()
}

/// Whether the last `window` sessions failed to beat the earlier best by more
/// than `tolerance`. Needs at least `window + 1` sessions; `points` must be
/// ordered oldest first.
pub fn detect_plateau(points: &[ProgressPoint], window: usize, tolerance: f64) -> bool {
    if window == 0 || points.len() <= window {
        return false;
    }
    let split = points.len() - window;
    let best_before = points[..split]
        .iter()
        .map(|p| p.weight)
        .fold(f64::NEG_INFINITY, f64::max);
    let best_recent = points[split..]
        .iter()
        .map(|p| p.weight)
        .fold(f64::NEG_INFINITY, f64::max);
    best_recent <= best_before + tolerance
}

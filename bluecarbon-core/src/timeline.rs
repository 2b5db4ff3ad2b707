//! Study timeline: snapshot years, transitions and the timestep mapping.
//!
//! The timeline is defined by the years of the cover rasters (`transition
//! years`, baseline first) plus an optional analysis year that extends the
//! run past the last raster without introducing a new cover. One timestep is
//! one year; timestep 0 is the baseline year.

use crate::errors::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// Validated snapshot years and the transition/timestep arithmetic built on
/// them.
///
/// With `S` cover rasters there are `K = S - 1` transitions. Transition `i`
/// is the change from cover `i` to cover `i + 1` and takes effect at the
/// year of cover `i + 1`; the baseline year carries no disturbance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    snapshot_years: Vec<i32>,
    transitions: usize,
}

impl Timeline {
    /// Build a timeline from the cover-raster years and an optional analysis
    /// year, validating ordering up front (before any raster is touched).
    pub fn new(transition_years: &[i32], analysis_year: Option<i32>) -> ModelResult<Self> {
        if transition_years.is_empty() {
            return Err(ModelError::Error(
                "at least one snapshot year is required".to_string(),
            ));
        }
        for pair in transition_years.windows(2) {
            if pair[0] >= pair[1] {
                return Err(ModelError::UnorderedSnapshotYears {
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }
        let mut snapshot_years = transition_years.to_vec();
        if let Some(year) = analysis_year {
            let last = snapshot_years[snapshot_years.len() - 1];
            if year <= last {
                return Err(ModelError::AnalysisYearTooEarly {
                    analysis_year: year,
                    last_transition_year: last,
                });
            }
            snapshot_years.push(year);
        }
        Ok(Self {
            transitions: transition_years.len() - 1,
            snapshot_years,
        })
    }

    /// All snapshot years, analysis year included.
    pub fn snapshot_years(&self) -> &[i32] {
        &self.snapshot_years
    }

    pub fn first_year(&self) -> i32 {
        self.snapshot_years[0]
    }

    pub fn last_year(&self) -> i32 {
        self.snapshot_years[self.snapshot_years.len() - 1]
    }

    /// Number of simulated years; per-timestep arrays have this length and
    /// stock arrays one more.
    pub fn timesteps(&self) -> usize {
        (self.last_year() - self.first_year()) as usize
    }

    /// Number of cover transitions, `K`.
    pub fn transitions(&self) -> usize {
        self.transitions
    }

    /// Number of cover rasters, `K + 1`.
    pub fn covers(&self) -> usize {
        self.transitions + 1
    }

    /// Number of inter-snapshot periods (aggregation windows).
    pub fn periods(&self) -> usize {
        self.snapshot_years.len() - 1
    }

    /// Timestep at which transition `i` takes effect.
    pub fn transition_timestep(&self, i: usize) -> usize {
        (self.snapshot_years[i + 1] - self.first_year()) as usize
    }

    /// Timestep of snapshot `idx` (analysis year included).
    pub fn snapshot_timestep(&self, idx: usize) -> usize {
        (self.snapshot_years[idx] - self.first_year()) as usize
    }

    /// Index of the cover raster in effect at timestep `t`. The analysis
    /// extension keeps the last cover.
    pub fn active_cover(&self, t: usize) -> usize {
        (0..self.transitions)
            .take_while(|&i| self.transition_timestep(i) <= t)
            .count()
    }

    /// The transition occurring exactly at timestep `t`, if any.
    pub fn transition_at(&self, t: usize) -> Option<usize> {
        (0..self.transitions).find(|&i| self.transition_timestep(i) == t)
    }
}

//! Typed run configuration.
//!
//! Everything the simulation core consumes is collected here once, up
//! front, and passed by reference into the scheduler and engine; no
//! loosely keyed dictionaries travel through the call graph. The struct is
//! serde-derived so a run can be described in a TOML file.

use crate::errors::{ModelError, ModelResult};
use crate::timeline::Timeline;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Years of the cover rasters, baseline first, strictly increasing.
    pub transition_years: Vec<i32>,
    /// Optional extension of the run past the last cover raster.
    pub analysis_year: Option<i32>,
    /// Whether to run the valuation pass.
    #[serde(default)]
    pub do_economic_analysis: bool,
    /// Use the price table instead of a compounding flat price.
    #[serde(default)]
    pub do_price_table: bool,
    /// Price per unit of net sequestered carbon at the base year.
    pub price: Option<f64>,
    /// Yearly interest rate on the price, as a percentage (3.0 for 3 %).
    pub interest_rate: Option<f64>,
    /// Yearly discount rate on future valuations, as a percentage.
    pub discount_rate: Option<f64>,
    /// Appended to every output name; normalized to a leading underscore.
    #[serde(default)]
    pub results_suffix: String,
}

impl RunConfig {
    /// Parse a TOML run description.
    pub fn from_toml_str(text: &str) -> ModelResult<Self> {
        toml::from_str(text)
            .map_err(|e| ModelError::Error(format!("could not parse run configuration: {e}")))
    }

    /// Validate the years and build the study timeline.
    pub fn timeline(&self) -> ModelResult<Timeline> {
        Timeline::new(&self.transition_years, self.analysis_year)
    }

    /// A minimal configuration with economics disabled.
    pub fn default_for_years(transition_years: Vec<i32>) -> Self {
        Self {
            transition_years,
            ..Self::default()
        }
    }
}

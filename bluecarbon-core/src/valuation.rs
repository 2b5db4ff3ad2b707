//! Discounted carbon price trajectories for the economic analysis.

use crate::config::RunConfig;
use crate::errors::{ModelError, ModelResult};
use crate::lookup::PriceRow;
use crate::timeline::Timeline;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the undiscounted yearly price is produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PriceSchedule {
    /// A base-year price compounding at a yearly interest rate
    /// (a percentage, 3.0 for 3 %).
    Flat { price: f64, interest_rate: f64 },
    /// An explicit year-to-price table covering every year of the run.
    Table(HashMap<i32, f64>),
}

impl PriceSchedule {
    pub fn from_rows(rows: &[PriceRow]) -> Self {
        PriceSchedule::Table(rows.iter().map(|row| (row.year, row.price)).collect())
    }
}

/// Build the discounted per-year price array for `[first_year, last_year]`
/// inclusive (`timesteps + 1` entries).
///
/// Each entry is the schedule's raw price divided by the discount factor
/// `(1 + discount_rate)^t`. A table schedule missing any year of the span is
/// a fatal configuration error naming the year.
pub fn price_trajectory(
    schedule: &PriceSchedule,
    first_year: i32,
    last_year: i32,
    discount_rate: f64,
) -> ModelResult<Vec<f32>> {
    let discount = 1.0 + discount_rate * 0.01;
    let mut prices = Vec::with_capacity((last_year - first_year + 1) as usize);
    for (t, year) in (first_year..=last_year).enumerate() {
        let raw = match schedule {
            PriceSchedule::Flat {
                price,
                interest_rate,
            } => price * (1.0 + interest_rate * 0.01).powi(t as i32),
            PriceSchedule::Table(table) => *table
                .get(&year)
                .ok_or(ModelError::MissingPriceYear(year))?,
        };
        prices.push((raw / discount.powi(t as i32)) as f32);
    }
    Ok(prices)
}

/// Resolve the run configuration's economic inputs into a discounted price
/// trajectory, or `None` when economic analysis is disabled.
pub fn run_trajectory(
    config: &RunConfig,
    prices: &[PriceRow],
    timeline: &Timeline,
) -> ModelResult<Option<Vec<f32>>> {
    if !config.do_economic_analysis {
        return Ok(None);
    }
    let discount_rate = config.discount_rate.ok_or(ModelError::MissingPriceInputs)?;
    let schedule = if config.do_price_table {
        if prices.is_empty() {
            return Err(ModelError::MissingPriceInputs);
        }
        PriceSchedule::from_rows(prices)
    } else {
        PriceSchedule::Flat {
            price: config.price.ok_or(ModelError::MissingPriceInputs)?,
            interest_rate: config.interest_rate.ok_or(ModelError::MissingPriceInputs)?,
        }
    };
    price_trajectory(
        &schedule,
        timeline.first_year(),
        timeline.last_year(),
        discount_rate,
    )
    .map(Some)
}

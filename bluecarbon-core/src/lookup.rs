//! Lookup Builder: typed parameter maps from the tabular inputs.
//!
//! Table files are parsed into row records by the caller (the front end owns
//! CSV handling); this module resolves the cross-references between them and
//! produces the keyed maps the reclassifier and engine consume. Class names
//! are matched case-insensitively, every legend class must have a row in
//! both pool tables, and every reference that fails to resolve is a fatal
//! configuration error naming the missing key and source table.

use crate::errors::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Integer category label for the ecosystem/use type of a pixel.
pub type LulcCode = i32;

/// Row of the land-cover legend: class name to integer code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LulcClassRow {
    pub lulc_class: String,
    pub code: LulcCode,
}

/// Row of the initial carbon pool table (stocks at the baseline year, in
/// mass CO2e per area).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialPoolRow {
    pub lulc_class: String,
    pub biomass: f32,
    pub soil: f32,
    pub litter: f32,
}

/// Transient parameters for one carbon pool of one land-cover class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolTransient {
    /// Accumulation rate while this class is in place, per year.
    pub yearly_accumulation: f32,
    /// Half-life of disturbed material, in years.
    pub half_life: f32,
    /// Disturbance magnitudes keyed by transition-matrix column name
    /// (e.g. `low-impact-disturb`), as stock fractions.
    pub disturbances: HashMap<String, f32>,
}

/// Row of the transient table: per-pool parameters for one class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransientRow {
    pub lulc_class: String,
    pub biomass: PoolTransient,
    pub soil: PoolTransient,
}

/// One cell of the transition matrix: what happens when `from_class`
/// becomes `to_class`. The value names a disturbance column of the transient
/// table, or something else (`accum`, blank) meaning no disturbance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionCell {
    pub from_class: String,
    pub to_class: String,
    pub value: String,
}

/// Row of the carbon price table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRow {
    pub year: i32,
    pub price: f64,
}

/// All parsed parameter tables for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterTables {
    pub legend: Vec<LulcClassRow>,
    pub initial: Vec<InitialPoolRow>,
    pub transient: Vec<TransientRow>,
    pub transition_matrix: Vec<TransitionCell>,
    pub prices: Vec<PriceRow>,
}

/// Keyed parameter maps driving the reclassifier and the engine.
#[derive(Debug, Clone, Default)]
pub struct LandcoverMaps {
    pub initial_biomass: HashMap<LulcCode, f32>,
    pub initial_soil: HashMap<LulcCode, f32>,
    pub litter: HashMap<LulcCode, f32>,
    pub accumulation_biomass: HashMap<LulcCode, f32>,
    pub accumulation_soil: HashMap<LulcCode, f32>,
    pub half_life_biomass: HashMap<LulcCode, f32>,
    pub half_life_soil: HashMap<LulcCode, f32>,
    pub disturbance_biomass: HashMap<(LulcCode, LulcCode), f32>,
    pub disturbance_soil: HashMap<(LulcCode, LulcCode), f32>,
}

impl LandcoverMaps {
    /// Resolve all table cross-references into code-keyed maps.
    pub fn build(tables: &ParameterTables) -> ModelResult<Self> {
        let codes: HashMap<String, LulcCode> = tables
            .legend
            .iter()
            .map(|row| (row.lulc_class.to_lowercase(), row.code))
            .collect();
        let code_of = |table: &'static str, class: &str| -> ModelResult<LulcCode> {
            codes
                .get(&class.to_lowercase())
                .copied()
                .ok_or_else(|| ModelError::MissingLookupEntry {
                    table,
                    key: class.to_string(),
                })
        };

        let mut maps = LandcoverMaps::default();

        for row in &tables.initial {
            let code = code_of("carbon_pool_initial", &row.lulc_class)?;
            maps.initial_biomass.insert(code, row.biomass);
            maps.initial_soil.insert(code, row.soil);
            maps.litter.insert(code, row.litter);
        }

        let mut transient_by_class: HashMap<String, &TransientRow> = HashMap::new();
        for row in &tables.transient {
            let code = code_of("carbon_pool_transient", &row.lulc_class)?;
            maps.accumulation_biomass
                .insert(code, row.biomass.yearly_accumulation);
            maps.accumulation_soil
                .insert(code, row.soil.yearly_accumulation);
            maps.half_life_biomass.insert(code, row.biomass.half_life);
            maps.half_life_soil.insert(code, row.soil.half_life);
            transient_by_class.insert(row.lulc_class.to_lowercase(), row);
        }

        // Every legend entry must have pool parameters; only codes that
        // appear in imagery without a legend row fall back to per-pixel
        // nodata.
        for row in &tables.legend {
            if !maps.initial_biomass.contains_key(&row.code) {
                return Err(ModelError::MissingLookupEntry {
                    table: "carbon_pool_initial",
                    key: row.lulc_class.clone(),
                });
            }
            if !maps.accumulation_biomass.contains_key(&row.code) {
                return Err(ModelError::MissingLookupEntry {
                    table: "carbon_pool_transient",
                    key: row.lulc_class.clone(),
                });
            }
        }

        for cell in &tables.transition_matrix {
            // Cells that do not name a disturbance column (accumulation,
            // blank legend rows) contribute no pair entry.
            if !cell.value.ends_with("disturb") {
                continue;
            }
            let from = code_of("lulc_transition_matrix", &cell.from_class)?;
            let to = code_of("lulc_transition_matrix", &cell.to_class)?;
            let transient = transient_by_class
                .get(&cell.from_class.to_lowercase())
                .ok_or_else(|| ModelError::MissingLookupEntry {
                    table: "carbon_pool_transient",
                    key: cell.from_class.clone(),
                })?;
            let biomass = lookup_disturbance(&transient.biomass, "biomass", &cell.value)?;
            let soil = lookup_disturbance(&transient.soil, "soil", &cell.value)?;
            maps.disturbance_biomass.insert((from, to), biomass);
            maps.disturbance_soil.insert((from, to), soil);
        }

        Ok(maps)
    }
}

fn lookup_disturbance(pool: &PoolTransient, pool_name: &str, column: &str) -> ModelResult<f32> {
    pool.disturbances
        .get(column)
        .copied()
        .ok_or_else(|| ModelError::MissingLookupEntry {
            table: "carbon_pool_transient",
            key: format!("{pool_name}-{column}"),
        })
}

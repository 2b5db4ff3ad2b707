//! Blocked transient analysis of coastal carbon stocks.
//!
//! Given a baseline land-cover raster, a series of later cover rasters and
//! the parameter tables describing each cover class, the model simulates
//! carbon accumulation, disturbance and emission year by year, and writes
//! stock, flux and (optionally) net-present-value rasters. The simulation
//! core lives in `bluecarbon-core`; this crate adds the block scheduler and
//! the output registry that stream a run through bounded memory.

pub mod model;
pub mod registry;

pub use bluecarbon_core::config::RunConfig;
pub use bluecarbon_core::errors::{ModelError, ModelResult};
pub use bluecarbon_core::lookup::ParameterTables;
pub use bluecarbon_core::raster::{CodeRaster, MemoryRaster, OutputRaster};

pub use crate::model::{BlueCarbonModel, LogProgress, ProgressEvent, ProgressSink};
pub use crate::registry::OutputRegistry;

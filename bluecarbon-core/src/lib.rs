pub mod config;
pub mod engine;
pub mod lookup;
pub mod raster;
pub mod reclass;
pub mod timeline;
pub mod valuation;

pub mod errors;

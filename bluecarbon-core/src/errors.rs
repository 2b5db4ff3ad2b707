use thiserror::Error;

/// Error type for configuration and data-alignment failures.
///
/// Every variant is fatal. Validation happens before or during setup, and a
/// run aborts on the first error; there is no partial-output contract.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("{0}")]
    Error(String),
    #[error("no entry for key `{key}` in table `{table}`")]
    MissingLookupEntry { table: &'static str, key: String },
    #[error("could not read `{key}` from table `{table}`: {message}")]
    TableValue {
        table: &'static str,
        key: String,
        message: String,
    },
    #[error("snapshot years must be strictly increasing: {previous} is not before {next}")]
    UnorderedSnapshotYears { previous: i32, next: i32 },
    #[error("analysis year {analysis_year} must be greater than the last transition year {last_transition_year}")]
    AnalysisYearTooEarly {
        analysis_year: i32,
        last_transition_year: i32,
    },
    #[error("carbon price table does not contain a price value for {0}")]
    MissingPriceYear(i32),
    #[error("economic analysis requires a discount rate and either a price with an interest rate or a price table")]
    MissingPriceInputs,
    #[error("{years} snapshot years were provided for {rasters} cover rasters")]
    SnapshotCountMismatch { years: usize, rasters: usize },
    #[error("block at ({row_off}, {col_off}) of size {rows}x{cols} does not fit the raster")]
    BlockOutOfBounds {
        row_off: usize,
        col_off: usize,
        rows: usize,
        cols: usize,
    },
}

/// Convenience type for `Result<T, ModelError>`.
pub type ModelResult<T> = Result<T, ModelError>;

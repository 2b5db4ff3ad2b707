//! Block-streaming scheduler for the transient carbon model.
//!
//! Drives one run end to end: validates the configuration, resolves the
//! lookup tables, then iterates the baseline raster's native block tiling,
//! reclassifying the co-registered cover blocks and handing each block to
//! the simulation engine. Only one spatial block is in memory at a time;
//! blocks are self-contained, so the loop carries no state between them
//! beyond the progress counter.

use std::time::{Duration, Instant};

use bluecarbon_core::config::RunConfig;
use bluecarbon_core::engine::{simulate_block, BlockInput, CoverParams, TransitionParams};
use bluecarbon_core::errors::{ModelError, ModelResult};
use bluecarbon_core::lookup::{LandcoverMaps, LulcCode, ParameterTables};
use bluecarbon_core::raster::{block_windows, CodeRaster, OutputRaster};
use bluecarbon_core::reclass::{reclass, reclass_transition, zero_unmapped, PairMap};
use bluecarbon_core::timeline::Timeline;
use bluecarbon_core::valuation;
use log::info;
use ndarray::Array2;

use crate::registry::OutputRegistry;

/// Progress of the block loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub blocks_completed: usize,
    pub blocks_total: usize,
}

/// Receiver for throttled progress events.
///
/// The scheduler never touches process-wide logging state itself; callers
/// decide where progress goes. [`LogProgress`] forwards to the `log` facade.
pub trait ProgressSink {
    fn on_progress(&mut self, event: ProgressEvent);
    fn on_complete(&mut self) {}
}

/// Forwards progress to `log::info!`.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_progress(&mut self, event: ProgressEvent) {
        info!(
            "processing block {} of {}",
            event.blocks_completed, event.blocks_total
        );
    }

    fn on_complete(&mut self) {
        info!("transient carbon analysis complete");
    }
}

/// A fully validated run: configuration, timeline, parameter maps and the
/// discounted price trajectory, built once before any raster is read.
#[derive(Debug)]
pub struct BlueCarbonModel {
    timeline: Timeline,
    maps: LandcoverMaps,
    /// Disturbance pair maps, packed once so the block loop is gather-only.
    disturbance_biomass: PairMap,
    disturbance_soil: PairMap,
    price_t: Option<Vec<f32>>,
    economic_analysis: bool,
    results_suffix: String,
    progress_interval: Duration,
}

impl BlueCarbonModel {
    /// Validate the configuration and resolve every table cross-reference.
    /// All `ConfigurationError`-class failures surface here, before any
    /// raster I/O.
    pub fn new(config: &RunConfig, tables: &ParameterTables) -> ModelResult<Self> {
        let timeline = config.timeline()?;
        let maps = LandcoverMaps::build(tables)?;
        let price_t = valuation::run_trajectory(config, &tables.prices, &timeline)?;
        Ok(Self {
            timeline,
            disturbance_biomass: PairMap::new(&maps.disturbance_biomass),
            disturbance_soil: PairMap::new(&maps.disturbance_soil),
            maps,
            economic_analysis: config.do_economic_analysis,
            price_t,
            results_suffix: config.results_suffix.clone(),
            progress_interval: Duration::from_secs(2),
        })
    }

    /// Override the progress throttle (default: at most one event every
    /// two seconds).
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn economic_analysis(&self) -> bool {
        self.economic_analysis
    }

    pub fn results_suffix(&self) -> &str {
        &self.results_suffix
    }

    /// Run the full block loop.
    ///
    /// `transition_rasters` must hold one raster per transition, ordered and
    /// co-registered with the baseline (grid alignment is the external I/O
    /// layer's contract and is not re-validated per block).
    pub fn run<R: CodeRaster, O: OutputRaster>(
        &self,
        baseline: &R,
        transition_rasters: &[R],
        outputs: &mut OutputRegistry<O>,
        progress: &mut dyn ProgressSink,
    ) -> ModelResult<()> {
        if transition_rasters.len() != self.timeline.transitions() {
            return Err(ModelError::SnapshotCountMismatch {
                years: self.timeline.covers(),
                rasters: transition_rasters.len() + 1,
            });
        }

        let nodata = baseline.nodata();
        let windows = block_windows(baseline.shape(), baseline.block_shape());
        let blocks_total = windows.len();
        let mut last_report = Instant::now();

        for (index, window) in windows.into_iter().enumerate() {
            let mut covers = Vec::with_capacity(self.timeline.covers());
            covers.push(baseline.read_block(window)?);
            for raster in transition_rasters {
                covers.push(raster.read_block(window)?);
            }

            let input = self.block_input(&covers, nodata);
            let output = simulate_block(&self.timeline, &input, self.price_t.as_deref());
            outputs.write_block(window, &output)?;

            let completed = index + 1;
            if last_report.elapsed() >= self.progress_interval || completed == blocks_total {
                progress.on_progress(ProgressEvent {
                    blocks_completed: completed,
                    blocks_total,
                });
                last_report = Instant::now();
            }
        }

        progress.on_complete();
        Ok(())
    }

    /// Reclassify one block's cover codes into the engine's parameter
    /// layers.
    fn block_input(&self, covers: &[Array2<LulcCode>], nodata: Option<LulcCode>) -> BlockInput {
        let maps = &self.maps;
        let cover_params = covers
            .iter()
            .map(|cover| CoverParams {
                accumulation_biomass: reclass(cover, &maps.accumulation_biomass, nodata),
                accumulation_soil: reclass(cover, &maps.accumulation_soil, nodata),
                litter: reclass(cover, &maps.litter, nodata),
            })
            .collect();

        let transitions = (0..self.timeline.transitions())
            .map(|i| {
                let mut disturbance_biomass =
                    reclass_transition(&covers[i], &covers[i + 1], &self.disturbance_biomass, nodata);
                zero_unmapped(&mut disturbance_biomass, &covers[i], nodata);
                let mut disturbance_soil =
                    reclass_transition(&covers[i], &covers[i + 1], &self.disturbance_soil, nodata);
                zero_unmapped(&mut disturbance_soil, &covers[i], nodata);
                TransitionParams {
                    disturbance_biomass,
                    disturbance_soil,
                    half_life_biomass: reclass(&covers[i], &maps.half_life_biomass, nodata),
                    half_life_soil: reclass(&covers[i], &maps.half_life_soil, nodata),
                }
            })
            .collect();

        BlockInput {
            initial_biomass: reclass(&covers[0], &maps.initial_biomass, nodata),
            initial_soil: reclass(&covers[0], &maps.initial_soil, nodata),
            covers: cover_params,
            transitions,
        }
    }
}

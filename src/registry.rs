//! Pre-allocated output rasters with year-tagged names.
//!
//! Output files are created once, before the block loop, from the baseline
//! raster's extent; every block then writes a disjoint window into each of
//! them. Names encode the snapshot years they summarize, with an optional
//! results suffix.

use bluecarbon_core::engine::BlockOutput;
use bluecarbon_core::errors::ModelResult;
use bluecarbon_core::raster::{BlockWindow, OutputRaster, NODATA_FLOAT};
use bluecarbon_core::timeline::Timeline;
use ndarray::Array2;

/// The named output rasters for one run.
#[derive(Debug)]
pub struct OutputRegistry<O> {
    /// Total carbon stock, one raster per snapshot year.
    pub stock: Vec<(String, O)>,
    /// Accumulation, emission and net sequestration, one raster per
    /// inter-snapshot period.
    pub accumulation: Vec<(String, O)>,
    pub emission: Vec<(String, O)>,
    pub net_sequestration: Vec<(String, O)>,
    /// Net sequestration summed over the whole run.
    pub total_net_sequestration: (String, O),
    /// Present when economic analysis is enabled.
    pub net_present_value: Option<(String, O)>,
}

impl<O: OutputRaster> OutputRegistry<O> {
    /// Create every output raster through `create`, which receives the
    /// year-tagged name and is expected to allocate a raster matching the
    /// baseline's extent (the `new_raster_from_template` contract of the
    /// external I/O layer).
    pub fn build(
        timeline: &Timeline,
        results_suffix: &str,
        economic_analysis: bool,
        mut create: impl FnMut(&str) -> ModelResult<O>,
    ) -> ModelResult<Self> {
        let suffix = normalize_suffix(results_suffix);
        let years = timeline.snapshot_years();

        let mut stock = Vec::with_capacity(years.len());
        for &year in years {
            let name = format!("carbon_stock_at_{year}{suffix}.tif");
            let raster = create(&name)?;
            stock.push((name, raster));
        }

        let mut accumulation = Vec::with_capacity(timeline.periods());
        let mut emission = Vec::with_capacity(timeline.periods());
        let mut net_sequestration = Vec::with_capacity(timeline.periods());
        for pair in years.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let name = format!("carbon_accumulation_between_{start}_and_{end}{suffix}.tif");
            let raster = create(&name)?;
            accumulation.push((name, raster));
            let name = format!("carbon_emissions_between_{start}_and_{end}{suffix}.tif");
            let raster = create(&name)?;
            emission.push((name, raster));
            let name = format!("net_carbon_sequestration_between_{start}_and_{end}{suffix}.tif");
            let raster = create(&name)?;
            net_sequestration.push((name, raster));
        }

        let total_name = format!("total_net_carbon_sequestration{suffix}.tif");
        let total_net_sequestration = (total_name.clone(), create(&total_name)?);

        let net_present_value = if economic_analysis {
            let name = format!("net_present_value{suffix}.tif");
            let raster = create(&name)?;
            Some((name, raster))
        } else {
            None
        };

        Ok(Self {
            stock,
            accumulation,
            emission,
            net_sequestration,
            total_net_sequestration,
            net_present_value,
        })
    }

    /// Persist one block's results into every output raster.
    pub fn write_block(&mut self, window: BlockWindow, output: &BlockOutput) -> ModelResult<()> {
        for (raster, data) in self
            .stock
            .iter_mut()
            .map(|(_, r)| r)
            .zip(&output.stock_snapshots)
        {
            write_masked(raster, window, data)?;
        }
        for (raster, data) in self
            .accumulation
            .iter_mut()
            .map(|(_, r)| r)
            .zip(&output.accumulation)
        {
            write_masked(raster, window, data)?;
        }
        for (raster, data) in self
            .emission
            .iter_mut()
            .map(|(_, r)| r)
            .zip(&output.emission)
        {
            write_masked(raster, window, data)?;
        }
        for (raster, data) in self
            .net_sequestration
            .iter_mut()
            .map(|(_, r)| r)
            .zip(&output.net_sequestration)
        {
            write_masked(raster, window, data)?;
        }
        write_masked(
            &mut self.total_net_sequestration.1,
            window,
            &output.total_net_sequestration,
        )?;
        if let (Some((_, raster)), Some(npv)) =
            (self.net_present_value.as_mut(), output.net_present_value.as_ref())
        {
            write_masked(raster, window, npv)?;
        }
        Ok(())
    }
}

/// Convert NaN to the nodata sentinel and write at the block offset.
fn write_masked<O: OutputRaster>(
    raster: &mut O,
    window: BlockWindow,
    data: &Array2<f32>,
) -> ModelResult<()> {
    let masked = data.mapv(|v| if v.is_nan() { NODATA_FLOAT } else { v });
    raster.write_block(window, &masked)
}

fn normalize_suffix(suffix: &str) -> String {
    if suffix.is_empty() || suffix.starts_with('_') {
        suffix.to_string()
    } else {
        format!("_{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluecarbon_core::raster::MemoryRaster;

    fn registry(
        timeline: &Timeline,
        suffix: &str,
        economic: bool,
    ) -> OutputRegistry<MemoryRaster<f32>> {
        OutputRegistry::build(timeline, suffix, economic, |_| {
            Ok(MemoryRaster::from_template((1, 1)))
        })
        .unwrap()
    }

    #[test]
    fn names_encode_snapshot_years() {
        let timeline = Timeline::new(&[2000, 2005], Some(2010)).unwrap();
        let registry = registry(&timeline, "", true);
        let stock_names: Vec<&str> = registry.stock.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            stock_names,
            vec![
                "carbon_stock_at_2000.tif",
                "carbon_stock_at_2005.tif",
                "carbon_stock_at_2010.tif"
            ]
        );
        assert_eq!(
            registry.accumulation[1].0,
            "carbon_accumulation_between_2005_and_2010.tif"
        );
        assert_eq!(
            registry.net_sequestration[0].0,
            "net_carbon_sequestration_between_2000_and_2005.tif"
        );
        assert_eq!(
            registry.total_net_sequestration.0,
            "total_net_carbon_sequestration.tif"
        );
        assert_eq!(
            registry.net_present_value.as_ref().map(|(n, _)| n.as_str()),
            Some("net_present_value.tif")
        );
    }

    #[test]
    fn suffix_is_normalized_to_a_leading_underscore() {
        let timeline = Timeline::new(&[2000], Some(2001)).unwrap();
        let registry = registry(&timeline, "scenario", false);
        assert_eq!(registry.stock[0].0, "carbon_stock_at_2000_scenario.tif");
        assert!(registry.net_present_value.is_none());

        let registry = registry_with(&timeline, "_already");
        assert_eq!(registry.stock[0].0, "carbon_stock_at_2000_already.tif");
    }

    fn registry_with(timeline: &Timeline, suffix: &str) -> OutputRegistry<MemoryRaster<f32>> {
        registry(timeline, suffix, false)
    }

    #[test]
    fn nan_is_written_as_the_nodata_sentinel() {
        let mut raster = MemoryRaster::from_template((1, 2));
        let window = BlockWindow {
            row_off: 0,
            col_off: 0,
            rows: 1,
            cols: 2,
        };
        write_masked(&mut raster, window, &ndarray::array![[f32::NAN, 3.0]]).unwrap();
        assert_eq!(raster.data()[[0, 0]], NODATA_FLOAT);
        assert_eq!(raster.data()[[0, 1]], 3.0);
    }
}

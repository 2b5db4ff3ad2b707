//! Per-block transient carbon simulation.
//!
//! Runs the full multi-year stock/accumulation/emission time series for one
//! spatial block. Every pixel is an independent time series (no spatial
//! coupling), which is what lets the scheduler stream arbitrarily large
//! rasters one block at a time.
//!
//! # Pool dynamics
//!
//! For each pool (biomass, soil) and each timestep `t`:
//!
//! - at the instant transition `i` occurs, the disturbed stock is recorded
//!   once: `R[i] = D[i] * stock[t]`;
//! - accumulation is the active cover's yearly rate: `A[t] = Y[cover(t)]`;
//! - every past disturbance releases the year's slice of a geometric decay:
//!   `E[t] = sum_i R[i] * (0.5^(t - tau_i) - 0.5^(t - tau_i + 1))`, so the
//!   cumulative emission over an unbounded run equals `R[i]` exactly;
//! - net sequestration `N[t] = A[t] - E[t]` advances the stock:
//!   `stock[t + 1] = stock[t] + N[t]`.
//!
//! The litter pool is static: reclassified per cover snapshot and added to
//! every stock output. All arithmetic is `f32`, with NaN carrying nodata
//! through every derived quantity.

use crate::timeline::Timeline;
use ndarray::Array2;

/// Parameter blocks derived from one cover raster.
#[derive(Debug, Clone)]
pub struct CoverParams {
    pub accumulation_biomass: Array2<f32>,
    pub accumulation_soil: Array2<f32>,
    pub litter: Array2<f32>,
}

/// Parameter blocks derived from one cover transition.
#[derive(Debug, Clone)]
pub struct TransitionParams {
    /// Fraction of standing stock disturbed at the transition, zero-filled
    /// where the table defines no disturbance for the pair.
    pub disturbance_biomass: Array2<f32>,
    pub disturbance_soil: Array2<f32>,
    /// Half-life of the disturbed material, reclassified from the source
    /// cover. Carried alongside the disturbance layers, but the emission
    /// curve decays with a fixed one-year half-life and does not consult
    /// them.
    pub half_life_biomass: Array2<f32>,
    pub half_life_soil: Array2<f32>,
}

/// Everything the engine needs for one spatial block.
#[derive(Debug, Clone)]
pub struct BlockInput {
    pub initial_biomass: Array2<f32>,
    pub initial_soil: Array2<f32>,
    /// One entry per cover raster (`timeline.covers()`).
    pub covers: Vec<CoverParams>,
    /// One entry per transition (`timeline.transitions()`).
    pub transitions: Vec<TransitionParams>,
}

/// Per-block results, ready for the output writer.
#[derive(Debug, Clone)]
pub struct BlockOutput {
    /// Total stock (biomass + soil + litter) at each snapshot year.
    pub stock_snapshots: Vec<Array2<f32>>,
    /// Summed accumulation over each inter-snapshot period.
    pub accumulation: Vec<Array2<f32>>,
    /// Summed emission over each inter-snapshot period.
    pub emission: Vec<Array2<f32>>,
    /// Summed net sequestration over each inter-snapshot period.
    pub net_sequestration: Vec<Array2<f32>>,
    /// Net sequestration summed over the whole run.
    pub total_net_sequestration: Array2<f32>,
    /// Discounted valuation summed over the whole run, when a price
    /// trajectory was supplied.
    pub net_present_value: Option<Array2<f32>>,
}

/// Run the transient analysis for one block.
///
/// `price_t`, when present, must cover `timeline.timesteps() + 1` years.
/// Arrays in `input` must all share the block's shape; the output arrays do
/// too.
pub fn simulate_block(
    timeline: &Timeline,
    input: &BlockInput,
    price_t: Option<&[f32]>,
) -> BlockOutput {
    let t_count = timeline.timesteps();
    let k = timeline.transitions();
    let dim = input.initial_biomass.raw_dim();

    let mut stock_biomass: Vec<Array2<f32>> = Vec::with_capacity(t_count + 1);
    let mut stock_soil: Vec<Array2<f32>> = Vec::with_capacity(t_count + 1);
    stock_biomass.push(input.initial_biomass.clone());
    stock_soil.push(input.initial_soil.clone());

    // Disturbed-carbon ledger: captured once per transition, immutable after.
    let mut disturbed_biomass: Vec<Array2<f32>> = vec![Array2::zeros(dim.clone()); k];
    let mut disturbed_soil: Vec<Array2<f32>> = vec![Array2::zeros(dim.clone()); k];

    let mut accum_biomass: Vec<Array2<f32>> = Vec::with_capacity(t_count);
    let mut accum_soil: Vec<Array2<f32>> = Vec::with_capacity(t_count);
    let mut emit_biomass: Vec<Array2<f32>> = Vec::with_capacity(t_count);
    let mut emit_soil: Vec<Array2<f32>> = Vec::with_capacity(t_count);
    let mut net_biomass: Vec<Array2<f32>> = Vec::with_capacity(t_count);
    let mut net_soil: Vec<Array2<f32>> = Vec::with_capacity(t_count);
    let mut valuation: Vec<Array2<f32>> = Vec::with_capacity(t_count);

    for t in 0..t_count {
        // Capture disturbed stock with the values standing just before this
        // year's update.
        if let Some(i) = timeline.transition_at(t) {
            disturbed_biomass[i] = &input.transitions[i].disturbance_biomass * &stock_biomass[t];
            disturbed_soil[i] = &input.transitions[i].disturbance_soil * &stock_soil[t];
        }

        let cover = timeline.active_cover(t);
        let a_biomass = input.covers[cover].accumulation_biomass.clone();
        let a_soil = input.covers[cover].accumulation_soil.clone();

        let mut e_biomass = Array2::<f32>::zeros(dim.clone());
        let mut e_soil = Array2::<f32>::zeros(dim.clone());
        for i in 0..k {
            let tau = timeline.transition_timestep(i);
            if tau <= t {
                let age = (t - tau) as i32;
                let fraction = 0.5f32.powi(age) - 0.5f32.powi(age + 1);
                e_biomass.scaled_add(fraction, &disturbed_biomass[i]);
                e_soil.scaled_add(fraction, &disturbed_soil[i]);
            }
        }

        let n_biomass = &a_biomass - &e_biomass;
        let n_soil = &a_soil - &e_soil;

        stock_biomass.push(&stock_biomass[t] + &n_biomass);
        stock_soil.push(&stock_soil[t] + &n_soil);

        net_biomass.push(n_biomass);
        net_soil.push(n_soil);
        accum_biomass.push(a_biomass);
        accum_soil.push(a_soil);
        emit_biomass.push(e_biomass);
        emit_soil.push(e_soil);

        if let Some(prices) = price_t {
            // The soil term is deliberately the year-zero net flux, not the
            // current year's.
            valuation.push(&(&net_biomass[t] + &net_soil[0]) * prices[t]);
        }
    }

    // Aggregate per-timestep fluxes over each inter-snapshot period.
    let periods = timeline.periods();
    let mut accumulation = Vec::with_capacity(periods);
    let mut emission = Vec::with_capacity(periods);
    let mut net_sequestration = Vec::with_capacity(periods);
    for p in 0..periods {
        let start = timeline.snapshot_timestep(p);
        let end = timeline.snapshot_timestep(p + 1);
        let mut a_sum = Array2::<f32>::zeros(dim.clone());
        let mut e_sum = Array2::<f32>::zeros(dim.clone());
        let mut n_sum = Array2::<f32>::zeros(dim.clone());
        for t in start..end {
            a_sum += &(&accum_biomass[t] + &accum_soil[t]);
            e_sum += &(&emit_biomass[t] + &emit_soil[t]);
            n_sum += &(&net_biomass[t] + &net_soil[t]);
        }
        accumulation.push(a_sum);
        emission.push(e_sum);
        net_sequestration.push(n_sum);
    }

    // Stock snapshots at each snapshot's exact timestep, litter added. The
    // analysis-year snapshot reuses the last cover's litter.
    let mut stock_snapshots = Vec::with_capacity(periods + 1);
    for idx in 0..=periods {
        let t = timeline.snapshot_timestep(idx);
        let cover = idx.min(k);
        stock_snapshots
            .push(&(&stock_biomass[t] + &stock_soil[t]) + &input.covers[cover].litter);
    }

    let mut total_net_sequestration = Array2::<f32>::zeros(dim.clone());
    for n in &net_sequestration {
        total_net_sequestration += n;
    }

    let net_present_value = price_t.map(|_| {
        let mut npv = Array2::<f32>::zeros(dim);
        for v in &valuation {
            npv += v;
        }
        npv
    });

    BlockOutput {
        stock_snapshots,
        accumulation,
        emission,
        net_sequestration,
        total_net_sequestration,
        net_present_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    /// Single-pixel block with uniform parameters, the hand-checkable case.
    #[derive(Clone)]
    struct PixelRun {
        initial_biomass: f32,
        initial_soil: f32,
        accumulation_biomass: f32,
        accumulation_soil: f32,
        litter: f32,
        disturbance_biomass: f32,
        disturbance_soil: f32,
        half_life: f32,
    }

    impl Default for PixelRun {
        fn default() -> Self {
            Self {
                initial_biomass: 0.0,
                initial_soil: 0.0,
                accumulation_biomass: 0.0,
                accumulation_soil: 0.0,
                litter: 0.0,
                disturbance_biomass: 0.0,
                disturbance_soil: 0.0,
                half_life: 1.0,
            }
        }
    }

    impl PixelRun {
        fn input(&self, timeline: &Timeline) -> BlockInput {
            let pixel = |v: f32| Array2::from_elem((1, 1), v);
            BlockInput {
                initial_biomass: pixel(self.initial_biomass),
                initial_soil: pixel(self.initial_soil),
                covers: (0..timeline.covers())
                    .map(|_| CoverParams {
                        accumulation_biomass: pixel(self.accumulation_biomass),
                        accumulation_soil: pixel(self.accumulation_soil),
                        litter: pixel(self.litter),
                    })
                    .collect(),
                transitions: (0..timeline.transitions())
                    .map(|_| TransitionParams {
                        disturbance_biomass: pixel(self.disturbance_biomass),
                        disturbance_soil: pixel(self.disturbance_soil),
                        half_life_biomass: pixel(self.half_life),
                        half_life_soil: pixel(self.half_life),
                    })
                    .collect(),
            }
        }
    }

    fn at(array: &Array2<f32>) -> f32 {
        array[[0, 0]]
    }

    #[test]
    fn stock_is_conserved_without_disturbance_or_accumulation() {
        let timeline = Timeline::new(&[2000, 2005, 2010], Some(2030)).unwrap();
        let run = PixelRun {
            initial_biomass: 4.0,
            initial_soil: 6.0,
            ..PixelRun::default()
        };
        let out = simulate_block(&timeline, &run.input(&timeline), None);
        for snapshot in &out.stock_snapshots {
            assert_relative_eq!(at(snapshot), 10.0);
        }
        assert_relative_eq!(at(&out.total_net_sequestration), 0.0);
    }

    #[test]
    fn baseline_only_run_accumulates_under_the_baseline_cover() {
        // One cover, no transitions, ten analysis years at 2.0/yr.
        let timeline = Timeline::new(&[2000], Some(2010)).unwrap();
        let run = PixelRun {
            accumulation_biomass: 2.0,
            ..PixelRun::default()
        };
        let out = simulate_block(&timeline, &run.input(&timeline), None);
        assert_eq!(out.stock_snapshots.len(), 2);
        assert_relative_eq!(at(&out.stock_snapshots[0]), 0.0);
        assert_relative_eq!(at(&out.stock_snapshots[1]), 20.0);
        assert_relative_eq!(at(&out.total_net_sequestration), 20.0);
        assert_relative_eq!(at(&out.accumulation[0]), 20.0);
        assert_relative_eq!(at(&out.emission[0]), 0.0);
    }

    #[test]
    fn full_disturbance_decays_geometrically_from_the_transition_year() {
        // Cover A (stock 10) becomes cover B at 2005 with full biomass
        // disturbance and no accumulation afterwards.
        let timeline = Timeline::new(&[2000, 2005], Some(2015)).unwrap();
        let run = PixelRun {
            initial_biomass: 10.0,
            disturbance_biomass: 1.0,
            ..PixelRun::default()
        };
        let out = simulate_block(&timeline, &run.input(&timeline), None);

        // Nothing happens before the transition.
        assert_relative_eq!(at(&out.emission[0]), 0.0);
        assert_relative_eq!(at(&out.stock_snapshots[1]), 10.0);

        // E[5] = 5.0, E[6] = 2.5, ... summing to 10 * (1 - 0.5^10) over the
        // ten post-transition years.
        assert_relative_eq!(
            at(&out.emission[1]),
            10.0 * (1.0 - 0.5f32.powi(10)),
            epsilon = 1e-4
        );
        assert_relative_eq!(
            at(&out.stock_snapshots[2]),
            10.0 - 10.0 * (1.0 - 0.5f32.powi(10)),
            epsilon = 1e-4
        );
        assert_relative_eq!(
            at(&out.total_net_sequestration),
            -10.0 * (1.0 - 0.5f32.powi(10)),
            epsilon = 1e-4
        );
    }

    #[test]
    fn decay_approaches_the_recorded_disturbance_in_the_limit() {
        let timeline = Timeline::new(&[2000, 2001], Some(2061)).unwrap();
        let run = PixelRun {
            initial_soil: 8.0,
            disturbance_soil: 1.0,
            ..PixelRun::default()
        };
        let out = simulate_block(&timeline, &run.input(&timeline), None);
        let emitted: f32 = out.emission.iter().map(at).sum();
        assert_relative_eq!(emitted, 8.0, epsilon = 1e-4);
    }

    #[test]
    fn half_life_layers_do_not_alter_the_decay_rate() {
        let timeline = Timeline::new(&[2000, 2005], Some(2015)).unwrap();
        let base = PixelRun {
            initial_biomass: 10.0,
            disturbance_biomass: 1.0,
            ..PixelRun::default()
        };
        let slow = PixelRun {
            half_life: 100.0,
            ..base.clone()
        };
        let out_base = simulate_block(&timeline, &base.input(&timeline), None);
        let out_slow = simulate_block(&timeline, &slow.input(&timeline), None);
        assert_eq!(at(&out_base.emission[1]), at(&out_slow.emission[1]));
    }

    #[test]
    fn period_sums_match_the_whole_run_total() {
        let timeline = Timeline::new(&[2000, 2003, 2009], Some(2020)).unwrap();
        let run = PixelRun {
            initial_biomass: 5.0,
            initial_soil: 7.0,
            accumulation_biomass: 0.4,
            accumulation_soil: 0.1,
            disturbance_biomass: 0.3,
            disturbance_soil: 0.2,
            ..PixelRun::default()
        };
        let out = simulate_block(&timeline, &run.input(&timeline), None);
        let period_total: f32 = out.net_sequestration.iter().map(at).sum();
        assert_relative_eq!(period_total, at(&out.total_net_sequestration), epsilon = 1e-5);
        // Fluxes balance within each period too.
        for p in 0..timeline.periods() {
            assert_relative_eq!(
                at(&out.net_sequestration[p]),
                at(&out.accumulation[p]) - at(&out.emission[p]),
                epsilon = 1e-5
            );
        }
    }

    #[test]
    fn litter_is_added_to_every_stock_snapshot() {
        let timeline = Timeline::new(&[2000, 2005], None).unwrap();
        let run = PixelRun {
            initial_biomass: 1.0,
            litter: 0.25,
            ..PixelRun::default()
        };
        let out = simulate_block(&timeline, &run.input(&timeline), None);
        assert_relative_eq!(at(&out.stock_snapshots[0]), 1.25);
        assert_relative_eq!(at(&out.stock_snapshots[1]), 1.25);
    }

    #[test]
    fn valuation_uses_the_year_zero_soil_flux() {
        // Soil flux varies after the 2001 disturbance, biomass accumulates
        // at a constant 1.0/yr. V[t] must stay N_biomass[t] * price because
        // N_soil[0] is zero.
        let timeline = Timeline::new(&[2000, 2001], Some(2004)).unwrap();
        let run = PixelRun {
            initial_soil: 10.0,
            disturbance_soil: 1.0,
            accumulation_biomass: 1.0,
            ..PixelRun::default()
        };
        let prices = vec![1.0f32; timeline.timesteps() + 1];
        let out = simulate_block(&timeline, &run.input(&timeline), Some(&prices));
        let npv = out.net_present_value.expect("economic analysis requested");
        assert_relative_eq!(at(&npv), timeline.timesteps() as f32, epsilon = 1e-5);
    }

    #[test]
    fn nodata_pixels_propagate_through_every_output() {
        let timeline = Timeline::new(&[2000, 2005], Some(2010)).unwrap();
        let run = PixelRun {
            initial_biomass: f32::NAN,
            initial_soil: f32::NAN,
            ..PixelRun::default()
        };
        let mut input = run.input(&timeline);
        for cover in &mut input.covers {
            cover.accumulation_biomass.fill(f32::NAN);
            cover.accumulation_soil.fill(f32::NAN);
            cover.litter.fill(f32::NAN);
        }
        let prices = vec![1.0f32; timeline.timesteps() + 1];
        let out = simulate_block(&timeline, &input, Some(&prices));
        for snapshot in &out.stock_snapshots {
            assert!(at(snapshot).is_nan());
        }
        for p in 0..timeline.periods() {
            assert!(at(&out.accumulation[p]).is_nan());
            assert!(at(&out.net_sequestration[p]).is_nan());
        }
        assert!(at(&out.total_net_sequestration).is_nan());
        assert!(at(&out.net_present_value.expect("valuation enabled")).is_nan());
    }
}

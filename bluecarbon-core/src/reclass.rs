//! Reclassification of categorical code blocks into continuous parameter
//! blocks.
//!
//! All functions are pure: the caller's mapping is never modified and a new
//! array of the same shape is returned. NaN is the in-flight nodata marker;
//! it is converted to the on-disk sentinel only when a block is written.

use crate::lookup::LulcCode;
use ndarray::{Array2, Zip};
use num::Float;
use std::collections::HashMap;

/// Map every code in `block` through `map`.
///
/// Codes without an entry, and pixels equal to the raster's `nodata` code,
/// become NaN: a code that is never referenced by the parameter tables is
/// missing data for every derived quantity, never silently zero.
pub fn reclass<F: Float>(
    block: &Array2<LulcCode>,
    map: &HashMap<LulcCode, F>,
    nodata: Option<LulcCode>,
) -> Array2<F> {
    block.mapv(|code| {
        if Some(code) == nodata {
            F::nan()
        } else {
            map.get(&code).copied().unwrap_or_else(F::nan)
        }
    })
}

/// Pair-keyed mapping packed for the per-block gather.
///
/// Each `(from, to)` code pair is encoded into one 64-bit key when the map
/// is built, once per run, so [`reclass_transition`] is a single hash
/// lookup per pixel with no tuple allocation and no per-block repacking.
#[derive(Debug, Clone, Default)]
pub struct PairMap {
    packed: HashMap<i64, f32>,
}

impl PairMap {
    pub fn new(map: &HashMap<(LulcCode, LulcCode), f32>) -> Self {
        Self {
            packed: map
                .iter()
                .map(|(&(a, b), &v)| (pair_key(a, b), v))
                .collect(),
        }
    }

    pub fn get(&self, from: LulcCode, to: LulcCode) -> Option<f32> {
        self.packed.get(&pair_key(from, to)).copied()
    }
}

/// Pairwise reclassification over two co-registered code blocks.
///
/// Each `(prev, next)` pair is resolved through the packed `map` in a
/// single pass over the block. Unmapped pairs and nodata pixels become NaN.
/// "No disturbance defined for this transition" is only turned into zero
/// where the caller explicitly asks for it via [`zero_unmapped`].
pub fn reclass_transition(
    prev: &Array2<LulcCode>,
    next: &Array2<LulcCode>,
    map: &PairMap,
    nodata: Option<LulcCode>,
) -> Array2<f32> {
    let mut out = Array2::from_elem(prev.raw_dim(), f32::NAN);
    Zip::from(&mut out)
        .and(prev)
        .and(next)
        .for_each(|value, &a, &b| {
            if Some(a) != nodata && Some(b) != nodata {
                if let Some(v) = map.get(a, b) {
                    *value = v;
                }
            }
        });
    out
}

/// Replace NaN with zero wherever `cover` holds a valid code.
///
/// The explicit caller-side substitution for transition pairs with no table
/// entry; genuine nodata pixels stay NaN.
pub fn zero_unmapped(block: &mut Array2<f32>, cover: &Array2<LulcCode>, nodata: Option<LulcCode>) {
    Zip::from(block).and(cover).for_each(|value, &code| {
        if value.is_nan() && Some(code) != nodata {
            *value = 0.0;
        }
    });
}

fn pair_key(a: LulcCode, b: LulcCode) -> i64 {
    ((a as i64) << 32) | (b as i64 & 0xffff_ffff)
}

//! Block-windowed raster access.
//!
//! Production runs read and write GDAL rasters through an external I/O layer;
//! the traits here capture the slice of that contract the simulation needs:
//! the native block tiling, nodata lookup, block reads at an offset and block
//! writes at an offset. [`MemoryRaster`] backs the test suite and small
//! in-process runs.

use crate::errors::{ModelError, ModelResult};
use ndarray::Array2;

/// The float nodata sentinel written to every output raster.
///
/// Largest-magnitude negative integer exactly representable in an `f32`;
/// model outputs are overwhelmingly positive, so the value cannot collide
/// with real data.
pub const NODATA_FLOAT: f32 = -16_777_216.0;

/// A rectangular window into a raster, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockWindow {
    pub row_off: usize,
    pub col_off: usize,
    pub rows: usize,
    pub cols: usize,
}

impl BlockWindow {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn fits(&self, shape: (usize, usize)) -> bool {
        self.row_off + self.rows <= shape.0 && self.col_off + self.cols <= shape.1
    }

    fn out_of_bounds(&self) -> ModelError {
        ModelError::BlockOutOfBounds {
            row_off: self.row_off,
            col_off: self.col_off,
            rows: self.rows,
            cols: self.cols,
        }
    }
}

/// Enumerate the tiling of a raster of `shape` in `block`-sized windows.
///
/// Edge windows are clipped to the raster extent. Windows are returned in
/// row-major order, matching the iteration order of the external block
/// reader.
pub fn block_windows(shape: (usize, usize), block: (usize, usize)) -> Vec<BlockWindow> {
    let (rows, cols) = shape;
    let (block_rows, block_cols) = block;
    let mut windows = Vec::new();
    let mut row_off = 0;
    while row_off < rows {
        let mut col_off = 0;
        while col_off < cols {
            windows.push(BlockWindow {
                row_off,
                col_off,
                rows: block_rows.min(rows - row_off),
                cols: block_cols.min(cols - col_off),
            });
            col_off += block_cols;
        }
        row_off += block_rows;
    }
    windows
}

/// A categorical (land-cover code) raster readable in blocks.
pub trait CodeRaster {
    fn shape(&self) -> (usize, usize);
    /// The native tile size used for block iteration.
    fn block_shape(&self) -> (usize, usize);
    fn nodata(&self) -> Option<i32>;
    fn read_block(&self, window: BlockWindow) -> ModelResult<Array2<i32>>;
}

/// A continuous-valued output raster writable in blocks.
///
/// Implementations must not hold a file handle open between calls: each
/// write opens the target in update mode, writes the block at the offset and
/// releases the handle, so concurrent writers to *different* files stay
/// correct.
pub trait OutputRaster {
    fn shape(&self) -> (usize, usize);
    fn write_block(&mut self, window: BlockWindow, data: &Array2<f32>) -> ModelResult<()>;
}

/// An in-memory raster with a fixed block tiling.
#[derive(Debug, Clone)]
pub struct MemoryRaster<T> {
    data: Array2<T>,
    nodata: Option<T>,
    block_shape: (usize, usize),
}

impl<T: Copy> MemoryRaster<T> {
    pub fn new(data: Array2<T>, nodata: Option<T>) -> Self {
        Self {
            data,
            nodata,
            block_shape: (256, 256),
        }
    }

    pub fn with_block_shape(mut self, block_shape: (usize, usize)) -> Self {
        self.block_shape = block_shape;
        self
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }
}

impl MemoryRaster<f32> {
    /// New output raster matching a template's extent, filled with the
    /// nodata sentinel.
    pub fn from_template(shape: (usize, usize)) -> Self {
        Self::new(Array2::from_elem(shape, NODATA_FLOAT), Some(NODATA_FLOAT))
    }
}

impl CodeRaster for MemoryRaster<i32> {
    fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    fn block_shape(&self) -> (usize, usize) {
        self.block_shape
    }

    fn nodata(&self) -> Option<i32> {
        self.nodata
    }

    fn read_block(&self, window: BlockWindow) -> ModelResult<Array2<i32>> {
        if !window.fits(self.data.dim()) {
            return Err(window.out_of_bounds());
        }
        Ok(self
            .data
            .slice(ndarray::s![
                window.row_off..window.row_off + window.rows,
                window.col_off..window.col_off + window.cols
            ])
            .to_owned())
    }
}

impl OutputRaster for MemoryRaster<f32> {
    fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    fn write_block(&mut self, window: BlockWindow, data: &Array2<f32>) -> ModelResult<()> {
        if !window.fits(self.data.dim()) || data.dim() != window.shape() {
            return Err(window.out_of_bounds());
        }
        self.data
            .slice_mut(ndarray::s![
                window.row_off..window.row_off + window.rows,
                window.col_off..window.col_off + window.cols
            ])
            .assign(data);
        Ok(())
    }
}

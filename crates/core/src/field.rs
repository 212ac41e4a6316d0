//! Layered grid of unit direction vectors with nearest-cell lookup.
//!
//! A [`VectorField`] covers a `width × height` plane with square cells of
//! edge `resolution`. The grid is indexed `[layer][col][row]`, where rows
//! run along the plane's x axis (`rows = round(width / resolution)`) and
//! columns along its y axis (`cols = round(height / resolution)`).
//! Generation and lookup both follow this convention, so a position's x
//! coordinate selects the row and its y coordinate selects the column.
//!
//! Cells hold unit vectors whose angle lies in [-1, 1] radians. Noise fields
//! hold `depth` layers sampled along a third noise axis; [`VectorField::push_layer`]
//! steps through them for animation. Image fields hold a single layer whose
//! angles come from block-averaged red brightness.
//!
//! Image fields generate on a background thread. The field reports
//! readiness through [`VectorField::poll_ready`] and [`VectorField::wait_ready`];
//! [`VectorField::lookup`] refuses to answer until then.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FieldError;
use crate::image_source::{ImageLoader, PixelBuffer, BYTES_PER_PIXEL};
use crate::noise_source::NoiseSource;
use crate::source::{FieldSource, NoiseConfig, NoiseResolution};
use crate::vector::Vector;

/// Plane size, layer count and cell size of a field, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDims {
    /// Plane width in world units.
    pub width: usize,
    /// Plane height in world units.
    pub height: usize,
    /// Number of layers; image fields force this to 1.
    pub depth: usize,
    /// Cell edge length in world units.
    pub resolution: usize,
}

impl FieldDims {
    /// Bundles plane size, layer count and cell size. Nothing is validated
    /// until [`grid_size`](Self::grid_size) runs.
    pub fn new(width: usize, height: usize, depth: usize, resolution: usize) -> Self {
        Self {
            width,
            height,
            depth,
            resolution,
        }
    }

    /// Cells along the x axis, `round(width / resolution)`.
    pub fn rows(&self) -> usize {
        rounded_ratio(self.width, self.resolution)
    }

    /// Cells along the y axis, `round(height / resolution)`.
    pub fn cols(&self) -> usize {
        rounded_ratio(self.height, self.resolution)
    }

    /// Returns `(rows, cols)`, or `InvalidDimensions` if the grid would be empty
    /// or too large to address.
    pub fn grid_size(&self) -> Result<(usize, usize), FieldError> {
        if self.resolution == 0 || self.depth == 0 {
            return Err(FieldError::InvalidDimensions);
        }
        let (rows, cols) = (self.rows(), self.cols());
        if rows == 0 || cols == 0 {
            return Err(FieldError::InvalidDimensions);
        }
        rows.checked_mul(cols)
            .and_then(|n| n.checked_mul(self.depth))
            .ok_or(FieldError::InvalidDimensions)?;
        Ok((rows, cols))
    }

    fn single_layer(self) -> Self {
        if self.depth > 1 {
            log::warn!(
                "image fields have a single layer; ignoring requested depth {}",
                self.depth
            );
        }
        Self { depth: 1, ..self }
    }
}

fn rounded_ratio(len: usize, resolution: usize) -> usize {
    if resolution == 0 {
        return 0;
    }
    (len as f64 / resolution as f64).round() as usize
}

/// Linear map of `value` from `[in_min, in_max]` onto `[out_min, out_max]`.
fn map_range(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    out_min + (value - in_min) * (out_max - out_min) / (in_max - in_min)
}

/// Unit vector whose angle is `sample` mapped from `[lo, hi]` onto [-1, 1] radians.
fn direction(sample: f64, lo: f64, hi: f64) -> Vector {
    Vector::from_polar(1.0, map_range(sample, lo, hi, -1.0, 1.0))
}

/// Samples every layer, column and row of a noise grid.
///
/// `x_off` advances per column and `z_off` per layer, both as running totals
/// across the whole grid; `y_off` restarts at 0 for every column.
fn noise_grid<N: NoiseSource + ?Sized>(
    rows: usize,
    cols: usize,
    depth: usize,
    step: &NoiseResolution,
    noise: &N,
) -> Vec<Vector> {
    let mut grid = Vec::with_capacity(depth * cols * rows);
    let mut x_off = 0.0;
    let mut z_off = 0.0;
    for _ in 0..depth {
        for _ in 0..cols {
            let mut y_off = 0.0;
            for _ in 0..rows {
                grid.push(direction(noise.noise(x_off, y_off, z_off), 0.0, 1.0));
                y_off += step.y;
            }
            x_off += step.x;
        }
        z_off += step.z;
    }
    grid
}

/// Average red brightness of the block feeding cell `(col, row)`.
///
/// The block's top-left pixel is `x = col * resolution`,
/// `y = row * resolution`. Image sampling runs on the transposed axes of
/// [`VectorField::lookup`], where x selects the row. Successive block lines
/// start `cols * resolution` pixels apart, which only equals the image width
/// when `cols * resolution == width`; otherwise the lines drift across the
/// image. Pixels past the end of the buffer read as 0.
fn block_brightness(
    pixels: &PixelBuffer,
    cols: usize,
    resolution: usize,
    col: usize,
    row: usize,
) -> f64 {
    let start = row * resolution * pixels.width() + col * resolution;
    let stride = cols * resolution;
    let sum: u64 = (0..resolution)
        .flat_map(|line| {
            let line_start = start + line * stride;
            line_start..line_start + resolution
        })
        .map(|i| u64::from(pixels.red_at(i)))
        .sum();
    sum as f64 / (resolution * resolution) as f64
}

fn image_grid(rows: usize, cols: usize, resolution: usize, pixels: &PixelBuffer) -> Vec<Vector> {
    let mut grid = Vec::with_capacity(cols * rows);
    for col in 0..cols {
        for row in 0..rows {
            let brightness = block_brightness(pixels, cols, resolution, col, row);
            grid.push(direction(brightness, 0.0, 255.0));
        }
    }
    grid
}

fn check_buffer(dims: &FieldDims, pixels: &PixelBuffer) -> Result<(), FieldError> {
    if pixels.width() != dims.width || pixels.height() != dims.height {
        return Err(FieldError::PixelBufferSize {
            expected: dims.width * dims.height * BYTES_PER_PIXEL,
            got: pixels.data().len(),
        });
    }
    Ok(())
}

type Generated = Result<Vec<Vector>, FieldError>;

#[derive(Debug)]
enum Readiness {
    Ready,
    Pending(Receiver<Generated>),
    Failed(FieldError),
}

/// A layered grid of unit direction vectors over a bounded plane.
#[derive(Debug)]
pub struct VectorField {
    dims: FieldDims,
    rows: usize,
    cols: usize,
    active_layer: usize,
    grid: Vec<Vector>,
    dirty: bool,
    readiness: Readiness,
}

impl VectorField {
    fn generated(dims: FieldDims, rows: usize, cols: usize, grid: Vec<Vector>) -> Self {
        Self {
            dims,
            rows,
            cols,
            active_layer: 0,
            grid,
            dirty: true,
            readiness: Readiness::Ready,
        }
    }

    fn unready(dims: FieldDims, rows: usize, cols: usize, readiness: Readiness) -> Self {
        Self {
            dims,
            rows,
            cols,
            active_layer: 0,
            grid: Vec::new(),
            dirty: false,
            readiness,
        }
    }

    /// Builds a noise field synchronously with the generator named by `config.kind`.
    pub fn from_noise(dims: FieldDims, config: &NoiseConfig) -> Result<Self, FieldError> {
        let mut noise = config.kind.build(config.seed);
        Self::from_noise_source(dims, config, &mut noise)
    }

    /// Builds a noise field from a caller-supplied generator, reseeding it
    /// with `config.seed` first.
    pub fn from_noise_source<N: NoiseSource + ?Sized>(
        dims: FieldDims,
        config: &NoiseConfig,
        noise: &mut N,
    ) -> Result<Self, FieldError> {
        let (rows, cols) = dims.grid_size()?;
        noise.seed(config.seed);
        let grid = noise_grid(rows, cols, dims.depth, &config.res, noise);
        log::debug!(
            "noise field ready: {rows} rows x {cols} cols x {} layers (seed {})",
            dims.depth,
            config.seed
        );
        Ok(Self::generated(dims, rows, cols, grid))
    }

    /// Builds a single-layer field from an already decoded pixel buffer.
    ///
    /// The buffer must cover exactly `width × height` pixels.
    pub fn from_pixels(dims: FieldDims, pixels: &PixelBuffer) -> Result<Self, FieldError> {
        let dims = dims.single_layer();
        let (rows, cols) = dims.grid_size()?;
        check_buffer(&dims, pixels)?;
        let grid = image_grid(rows, cols, dims.resolution, pixels);
        Ok(Self::generated(dims, rows, cols, grid))
    }

    /// Starts generating a single-layer field from an image reference.
    ///
    /// Loading and sampling run on a background thread. The returned field
    /// is not ready until [`poll_ready`](Self::poll_ready) or
    /// [`wait_ready`](Self::wait_ready) observes completion.
    pub fn from_image<L: ImageLoader>(
        dims: FieldDims,
        reference: &str,
        loader: L,
    ) -> Result<Self, FieldError> {
        let dims = dims.single_layer();
        let (rows, cols) = dims.grid_size()?;
        let (tx, rx) = mpsc::channel();
        let reference = reference.to_owned();
        thread::Builder::new()
            .name("flowfield-image".into())
            .spawn(move || {
                let result = loader
                    .load(&reference, dims.width, dims.height)
                    .and_then(|pixels| {
                        check_buffer(&dims, &pixels)?;
                        Ok(image_grid(rows, cols, dims.resolution, &pixels))
                    });
                // The field may have been dropped while loading.
                let _ = tx.send(result);
            })
            .map_err(|e| FieldError::Image(format!("failed to start image loader: {e}")))?;
        Ok(Self::unready(dims, rows, cols, Readiness::Pending(rx)))
    }

    /// Builds a field from a typed source descriptor.
    pub fn new<L: ImageLoader>(
        dims: FieldDims,
        source: &FieldSource,
        loader: L,
    ) -> Result<Self, FieldError> {
        match source {
            FieldSource::Image(reference) => Self::from_image(dims, reference, loader),
            FieldSource::Noise(config) => Self::from_noise(dims, config),
        }
    }

    /// Builds a field from a JSON source descriptor.
    ///
    /// An unrecognized descriptor is not fatal: it is logged, and the field
    /// comes back permanently unready with [`error`](Self::error) set.
    /// Invalid dimensions are still returned as `Err`.
    pub fn from_json<L: ImageLoader>(
        dims: FieldDims,
        source: &Value,
        loader: L,
    ) -> Result<Self, FieldError> {
        match FieldSource::from_json(source) {
            Ok(source) => Self::new(dims, &source, loader),
            Err(err) => {
                log::error!("cannot build vector field: {err}");
                let (rows, cols) = dims.grid_size()?;
                Ok(Self::unready(dims, rows, cols, Readiness::Failed(err)))
            }
        }
    }

    fn complete(&mut self, result: Generated) {
        match result {
            Ok(grid) => {
                log::debug!(
                    "image field ready: {} rows x {} cols",
                    self.rows,
                    self.cols
                );
                self.grid = grid;
                self.readiness = Readiness::Ready;
                self.dirty = true;
            }
            Err(err) => {
                log::error!("image field generation failed: {err}");
                self.readiness = Readiness::Failed(err);
            }
        }
    }

    /// Checks for background completion without blocking. Returns readiness.
    pub fn poll_ready(&mut self) -> bool {
        let outcome = match &self.readiness {
            Readiness::Pending(rx) => match rx.try_recv() {
                Ok(result) => Some(result),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(Err(FieldError::Image(
                    "image loader exited without a result".into(),
                ))),
            },
            _ => None,
        };
        if let Some(result) = outcome {
            self.complete(result);
        }
        self.is_ready()
    }

    /// Blocks until generation finishes. Returns the failure if it failed.
    pub fn wait_ready(&mut self) -> Result<(), FieldError> {
        let outcome = match &self.readiness {
            Readiness::Pending(rx) => Some(rx.recv().unwrap_or_else(|_| {
                Err(FieldError::Image(
                    "image loader exited without a result".into(),
                ))
            })),
            _ => None,
        };
        if let Some(result) = outcome {
            self.complete(result);
        }
        match &self.readiness {
            Readiness::Ready => Ok(()),
            Readiness::Failed(err) => Err(err.clone()),
            Readiness::Pending(_) => Err(FieldError::NotReady),
        }
    }

    /// Whether the whole grid is populated and `lookup` may be called.
    pub fn is_ready(&self) -> bool {
        matches!(self.readiness, Readiness::Ready)
    }

    /// Why the field will never become ready, if it won't.
    pub fn error(&self) -> Option<&FieldError> {
        match &self.readiness {
            Readiness::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Advances to the next layer, wrapping after the last, and marks the
    /// field dirty.
    pub fn push_layer(&mut self) {
        self.active_layer = (self.active_layer + 1) % self.dims.depth;
        self.dirty = true;
    }

    /// Copy of the active-layer cell under `position`.
    ///
    /// `position.x` selects the row and `position.y` the column; both are
    /// divided by the resolution, clamped to the grid and truncated, so any
    /// position (including NaN, which maps to 0) resolves to a cell.
    pub fn lookup(&self, position: &Vector) -> Result<Vector, FieldError> {
        if !self.is_ready() {
            return Err(FieldError::NotReady);
        }
        let res = self.dims.resolution as f64;
        let row = clamp_index(position.x() / res, self.rows);
        let col = clamp_index(position.y() / res, self.cols);
        Ok(self.grid[self.index(self.active_layer, col, row)])
    }

    fn index(&self, layer: usize, col: usize, row: usize) -> usize {
        (layer * self.cols + col) * self.rows + row
    }

    /// Cell at `(layer, col, row)`, or `None` if out of range or not ready.
    pub fn cell(&self, layer: usize, col: usize, row: usize) -> Option<Vector> {
        if layer >= self.dims.depth || col >= self.cols || row >= self.rows {
            return None;
        }
        self.grid.get(self.index(layer, col, row)).copied()
    }

    /// Cells of one layer in `[col][row]` order, or `None` if out of range or not ready.
    pub fn layer(&self, layer: usize) -> Option<&[Vector]> {
        if layer >= self.dims.depth || !self.is_ready() {
            return None;
        }
        let len = self.cols * self.rows;
        self.grid.get(layer * len..(layer + 1) * len)
    }

    /// Iterates the active layer as `(col, row, cell)`. Empty until ready.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Vector)> + '_ {
        let rows = self.rows;
        self.layer(self.active_layer)
            .unwrap_or(&[])
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i / rows, i % rows, v))
    }

    /// Plane width in world units.
    pub fn width(&self) -> usize {
        self.dims.width
    }

    /// Plane height in world units.
    pub fn height(&self) -> usize {
        self.dims.height
    }

    /// Number of layers. Always 1 for image fields.
    pub fn depth(&self) -> usize {
        self.dims.depth
    }

    /// Cell edge length in world units.
    pub fn resolution(&self) -> usize {
        self.dims.resolution
    }

    /// Cells along x.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Cells along y.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Index of the layer `lookup` and `cells` read, always below `depth`.
    pub fn active_layer(&self) -> usize {
        self.active_layer
    }

    /// Whether the field changed since the renderer last cleared the flag.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Called by the renderer after redrawing.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

fn clamp_index(scaled: f64, len: usize) -> usize {
    // NaN survives clamp but saturates to 0 in the cast.
    scaled.clamp(0.0, (len - 1) as f64) as usize
}

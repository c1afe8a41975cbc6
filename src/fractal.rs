//! Fractal terrain generation via diamond-square midpoint displacement.
//!
//! The generator works on a square `2^n + 1` grid, copies the result onto
//! the target DEM through the reference field's no-data mask, renormalizes
//! the valid cells to span exactly `[min_height, max_height]`, and
//! optionally applies a separable Gaussian blur.

use std::fmt;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::dem::ElevationField;

/// Upper bound on the blur radius to keep kernel sizes sane.
pub const MAX_BLUR_RADIUS: f64 = 10.0;

/// Parameters for fractal terrain generation.
#[derive(Clone, Debug)]
pub struct FractalConfig {
    /// Amplitude decay exponent in (0, 1]. Higher roughness decays the
    /// random offsets faster, giving smoother terrain at fine scales.
    pub roughness: f64,
    /// Lowest elevation of the generated terrain.
    pub min_height: f64,
    /// Highest elevation of the generated terrain.
    pub max_height: f64,
    /// Gaussian blur radius in grid pixels (0 disables the blur).
    pub blur_radius: f64,
}

impl Default for FractalConfig {
    fn default() -> Self {
        Self {
            roughness: 0.8,
            min_height: 0.0,
            max_height: 500.0,
            blur_radius: 2.0,
        }
    }
}

/// Invalid generator configuration. These indicate programming mistakes,
/// not user input, so generation fails fast instead of clamping.
#[derive(Clone, Debug, PartialEq)]
pub enum GeneratorError {
    RoughnessOutOfRange(f64),
    InvalidHeightRange { min: f64, max: f64 },
    InvalidDimensions { width: usize, height: usize },
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorError::RoughnessOutOfRange(r) => {
                write!(f, "roughness {} must be in (0, 1]", r)
            }
            GeneratorError::InvalidHeightRange { min, max } => {
                write!(f, "max_height {} must be greater than min_height {}", max, min)
            }
            GeneratorError::InvalidDimensions { width, height } => {
                write!(f, "target dimensions {}x{} must be positive", width, height)
            }
        }
    }
}

impl std::error::Error for GeneratorError {}

impl FractalConfig {
    pub fn validate(&self, width: usize, height: usize) -> Result<(), GeneratorError> {
        if width == 0 || height == 0 {
            return Err(GeneratorError::InvalidDimensions { width, height });
        }
        if !(self.roughness > 0.0 && self.roughness <= 1.0) {
            return Err(GeneratorError::RoughnessOutOfRange(self.roughness));
        }
        if self.max_height <= self.min_height {
            return Err(GeneratorError::InvalidHeightRange {
                min: self.min_height,
                max: self.max_height,
            });
        }
        Ok(())
    }
}

/// Generate a fresh fractal elevation field with the same dimensions and
/// registration as `reference`, masked by its no-data cells.
///
/// Each invocation seeds its own RNG from OS entropy, so repeated calls
/// produce visually distinct terrains.
pub fn generate_fractal(
    reference: &ElevationField,
    config: &FractalConfig,
) -> Result<ElevationField, GeneratorError> {
    let mut rng = ChaCha8Rng::from_entropy();
    generate_fractal_seeded(reference, config, &mut rng)
}

/// Deterministic variant of [`generate_fractal`] for tests and tooling.
pub fn generate_fractal_seeded(
    reference: &ElevationField,
    config: &FractalConfig,
    rng: &mut ChaCha8Rng,
) -> Result<ElevationField, GeneratorError> {
    config.validate(reference.width, reference.height)?;
    let started = Instant::now();

    let target = reference.width.max(reference.height);
    let work = diamond_square(target, config, rng);

    // Copy onto the target grid through the no-data mask, clamped to the
    // configured height range.
    let mut field = ElevationField::new(
        reference.width,
        reference.height,
        reference.no_data_value,
        reference.pixel_size_meters,
        reference.origin_x_meters,
        reference.origin_y_meters,
        reference.bounds,
    );

    let last = work.size - 1;
    let row_denom = (reference.height - 1).max(1) as f64;
    let col_denom = (reference.width - 1).max(1) as f64;

    for row in 0..reference.height {
        for col in 0..reference.width {
            if reference.is_no_data(row, col) {
                continue;
            }
            let work_row = (row as f64 / row_denom * last as f64).floor() as usize;
            let work_col = (col as f64 / col_denom * last as f64).floor() as usize;
            if let Some(v) = work.get(work_row, work_col) {
                let v = (v as f64).clamp(config.min_height, config.max_height) as f32;
                field.set(row, col, v);
            }
        }
    }

    renormalize(&mut field, config.min_height as f32, config.max_height as f32);

    if config.blur_radius > 0.0 {
        field = gaussian_blur(&field, config.blur_radius);
    }

    log::debug!(
        "generated {}x{} fractal terrain in {:.1?}",
        reference.width,
        reference.height,
        started.elapsed()
    );
    Ok(field)
}

/// Working grid for midpoint displacement: a flat array of optional
/// samples, square, side `2^n + 1`.
struct WorkGrid {
    size: usize,
    cells: Vec<Option<f32>>,
}

impl WorkGrid {
    fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    fn get(&self, row: usize, col: usize) -> Option<f32> {
        self.cells[row * self.size + col]
    }

    fn set(&mut self, row: usize, col: usize, value: f32) {
        self.cells[row * self.size + col] = Some(value);
    }

    /// Average the set values among the given coordinates; `None` when
    /// none of them are set yet.
    fn average(&self, points: &[(i64, i64)]) -> Option<f32> {
        let mut sum = 0.0f32;
        let mut count = 0u32;
        for &(row, col) in points {
            if row < 0 || col < 0 || row as usize >= self.size || col as usize >= self.size {
                continue;
            }
            if let Some(v) = self.get(row as usize, col as usize) {
                sum += v;
                count += 1;
            }
        }
        if count > 0 {
            Some(sum / count as f32)
        } else {
            None
        }
    }
}

/// Run diamond-square on the smallest `2^n + 1` grid covering
/// `target_size`.
fn diamond_square(target_size: usize, config: &FractalConfig, rng: &mut ChaCha8Rng) -> WorkGrid {
    let mut n = 1usize;
    while (1usize << n) + 1 < target_size {
        n += 1;
    }
    let size = (1usize << n) + 1;
    let last = size - 1;

    let mut grid = WorkGrid::new(size);

    // Seed the four corners with independent uniform values.
    let corner_max = config.max_height.max(0.0);
    for &(row, col) in &[(0, 0), (0, last), (last, 0), (last, last)] {
        grid.set(row, col, rng.gen_range(0.0..=corner_max) as f32);
    }

    let decay = 2f64.powf(-config.roughness);
    let mut scale = config.max_height - config.min_height;
    let mut step = last;

    while step > 1 {
        let half = step / 2;

        // Diamond step: each square's midpoint becomes the average of its
        // four corners plus a random offset.
        for row in (0..last).step_by(step) {
            for col in (0..last).step_by(step) {
                let corners = [
                    (row as i64, col as i64),
                    (row as i64, (col + step) as i64),
                    ((row + step) as i64, col as i64),
                    ((row + step) as i64, (col + step) as i64),
                ];
                if let Some(avg) = grid.average(&corners) {
                    let offset = rng.gen_range(-scale..=scale) as f32;
                    grid.set(row + half, col + half, avg + offset);
                }
            }
        }

        // Square step: every half-step point not yet set becomes the
        // average of its up-to-4 set neighbors at half-step distance.
        for row in (0..size).step_by(half) {
            let col_start = if (row / half) % 2 == 0 { half } else { 0 };
            for col in (col_start..size).step_by(step) {
                if grid.get(row, col).is_some() {
                    continue;
                }
                let neighbors = [
                    (row as i64 - half as i64, col as i64),
                    (row as i64 + half as i64, col as i64),
                    (row as i64, col as i64 - half as i64),
                    (row as i64, col as i64 + half as i64),
                ];
                if let Some(avg) = grid.average(&neighbors) {
                    let offset = rng.gen_range(-scale..=scale) as f32;
                    grid.set(row, col, avg + offset);
                }
            }
        }

        scale *= decay;
        step = half;
    }

    grid
}

/// Linearly rescale all valid cells so their min/max span exactly
/// `[min_height, max_height]`.
fn renormalize(field: &mut ElevationField, min_height: f32, max_height: f32) {
    let mut gen_min = f32::MAX;
    let mut gen_max = f32::MIN;
    let mut any = false;
    for v in field.valid_values() {
        gen_min = gen_min.min(v);
        gen_max = gen_max.max(v);
        any = true;
    }
    if !any {
        return;
    }

    let range = gen_max - gen_min;
    if range <= f32::EPSILON {
        // Degenerate terrain; pin it to the floor rather than divide by a
        // zero range.
        field.fill_valid(min_height);
        return;
    }

    let span = max_height - min_height;
    let no_data = field.no_data_value;
    for row in 0..field.height {
        for col in 0..field.width {
            if let Some(v) = field.get(row, col) {
                if v != no_data {
                    field.set(row, col, min_height + (v - gen_min) / range * span);
                }
            }
        }
    }
}

/// Separable Gaussian blur over the valid cells of a field.
///
/// Kernel size is `ceil(radius * 2) + 1` with `sigma = radius / 3`. Each
/// output sample sums only over non-sentinel neighbors and divides by the
/// weight actually used, so edges and no-data boundaries keep their
/// brightness; cells with no valid neighbor keep their original value.
/// No-data cells pass through untouched.
pub fn gaussian_blur(field: &ElevationField, radius: f64) -> ElevationField {
    let radius = radius.min(MAX_BLUR_RADIUS);
    if radius <= 0.0 {
        return field.clone();
    }

    let kernel = gaussian_kernel_1d(radius);
    let horizontal = blur_pass(field.data(), field.width, field.height, field.no_data_value, &kernel, Axis::Horizontal);
    let vertical = blur_pass(&horizontal, field.width, field.height, field.no_data_value, &kernel, Axis::Vertical);

    let mut out = field.clone();
    out.replace_data(vertical);
    out
}

#[derive(Clone, Copy, PartialEq)]
enum Axis {
    Horizontal,
    Vertical,
}

fn gaussian_kernel_1d(radius: f64) -> Vec<f32> {
    let size = (radius * 2.0).ceil() as usize + 1;
    let center = (size / 2) as f64;
    let sigma = (radius / 3.0).max(1e-6);
    let denom = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / denom).exp() as f32
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// One blur pass along an axis. Rows of the output are independent, so the
/// pass runs row-parallel.
fn blur_pass(
    src: &[f32],
    width: usize,
    height: usize,
    no_data: f32,
    kernel: &[f32],
    axis: Axis,
) -> Vec<f32> {
    let center = (kernel.len() / 2) as i64;
    let mut out = vec![no_data; src.len()];

    out.par_chunks_mut(width).enumerate().for_each(|(row, out_row)| {
        for col in 0..width {
            let original = src[row * width + col];
            if original == no_data {
                continue;
            }

            let mut sum = 0.0f32;
            let mut weight_used = 0.0f32;
            for (i, &w) in kernel.iter().enumerate() {
                let offset = i as i64 - center;
                let (r, c) = match axis {
                    Axis::Horizontal => (row as i64, col as i64 + offset),
                    Axis::Vertical => (row as i64 + offset, col as i64),
                };
                if r < 0 || c < 0 || r as usize >= height || c as usize >= width {
                    continue;
                }
                let v = src[r as usize * width + c as usize];
                if v == no_data {
                    continue;
                }
                sum += v * w;
                weight_used += w;
            }

            out_row[col] = if weight_used > 0.0 {
                sum / weight_used
            } else {
                original
            };
        }
    });

    out
}

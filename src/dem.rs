//! Digital elevation model storage.
//!
//! A DEM is a fixed-size rectangular grid of 32-bit elevation samples with
//! geospatial registration (Web Mercator origin, pixel size, geographic
//! bounding box) and a no-data sentinel marking cells outside the valid
//! terrain. One immutable *reference* field is loaded once and used for
//! masking and scoring; a single *current* field is the only one ever
//! mutated or replaced.

use serde::{Deserialize, Serialize};

/// Geographic bounding box in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }
}

/// A rectangular grid of elevation samples, row-major, with the row axis
/// growing southward (row 0 is the northern edge).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElevationField {
    pub width: usize,
    pub height: usize,
    /// Sentinel marking a cell as outside the valid terrain. Cells equal to
    /// this value in the reference field stay equal to it in every derived
    /// field.
    pub no_data_value: f32,
    pub pixel_size_meters: f64,
    pub origin_x_meters: f64,
    pub origin_y_meters: f64,
    pub bounds: GeoBounds,
    data: Vec<f32>,
}

impl ElevationField {
    /// Create a field with every cell set to the no-data sentinel.
    pub fn new(
        width: usize,
        height: usize,
        no_data_value: f32,
        pixel_size_meters: f64,
        origin_x_meters: f64,
        origin_y_meters: f64,
        bounds: GeoBounds,
    ) -> Self {
        Self {
            width,
            height,
            no_data_value,
            pixel_size_meters,
            origin_x_meters,
            origin_y_meters,
            bounds,
            data: vec![no_data_value; width * height],
        }
    }

    fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.height && col < self.width
    }

    /// Get the sample at a cell, or `None` when out of bounds. No-data
    /// cells return their sentinel value; use [`is_no_data`] to tell them
    /// apart from real elevations.
    ///
    /// [`is_no_data`]: ElevationField::is_no_data
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if self.in_bounds(row, col) {
            Some(self.data[self.index(row, col)])
        } else {
            None
        }
    }

    /// Set the sample at a cell. Out-of-bounds writes are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        if self.in_bounds(row, col) {
            let idx = self.index(row, col);
            self.data[idx] = value;
        }
    }

    pub fn is_no_data(&self, row: usize, col: usize) -> bool {
        match self.get(row, col) {
            Some(v) => self.is_no_data_value(v),
            None => true,
        }
    }

    pub fn is_no_data_value(&self, value: f32) -> bool {
        value == self.no_data_value
    }

    /// Read-only view of the raw buffer, row-major. This is the shape the
    /// renderer and persistence collaborators consume.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn replace_data(&mut self, data: Vec<f32>) {
        debug_assert_eq!(data.len(), self.width * self.height);
        self.data = data;
    }

    /// True when the buffer length matches the declared dimensions. Loaded
    /// snapshots are checked with this before use.
    pub fn is_consistent(&self) -> bool {
        self.data.len() == self.width * self.height
    }

    /// Iterate over all non-sentinel finite samples.
    pub fn valid_values(&self) -> impl Iterator<Item = f32> + '_ {
        let no_data = self.no_data_value;
        self.data
            .iter()
            .copied()
            .filter(move |v| *v != no_data && v.is_finite())
    }

    /// Set every valid (non-sentinel) cell to `value`.
    pub fn fill_valid(&mut self, value: f32) {
        let no_data = self.no_data_value;
        for v in &mut self.data {
            if *v != no_data {
                *v = value;
            }
        }
    }

    /// Min/max over valid samples, for color/texture scaling downstream.
    ///
    /// Falls back to `(0, 100)` when the field has no valid data or is
    /// perfectly flat, so consumers never divide by a zero range.
    pub fn elevation_range(&self) -> (f32, f32) {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        let mut any = false;

        for v in self.valid_values() {
            min = min.min(v);
            max = max.max(v);
            any = true;
        }

        if !any || min == max {
            (0.0, 100.0)
        } else {
            (min, max)
        }
    }

    /// Maximum valid elevation, used as the brush's reference scale.
    pub fn max_elevation(&self) -> f32 {
        self.elevation_range().1
    }
}

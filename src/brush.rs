//! Terraforming brush: a circular Gaussian-weighted elevation delta.
//!
//! The kernel is normalized so its *center* weight is exactly 1, not so the
//! kernel sums to 1. The brush is a height addition, and painting the same
//! spot for longer should raise the peak linearly; a sum-normalized kernel
//! would asymptote instead.

use crate::dem::ElevationField;

/// Unit-intensity frames needed to raise a point from 0 to the reference
/// maximum. Makes brush strength independent of frame rate and of the
/// absolute elevation scale of the loaded terrain.
pub const FULL_HEIGHT_SCALING_FRAMES: f64 = 75.0;

/// Reference frame rate the intensity scale is normalized to.
const REFERENCE_FPS: f64 = 60.0;

/// Terraforming tool direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Up,
    Down,
}

impl Tool {
    fn sign(self) -> f64 {
        match self {
            Tool::Up => 1.0,
            Tool::Down => -1.0,
        }
    }
}

/// Apply one Gaussian kernel stamp centered on a grid cell.
///
/// `radius_px` is the brush radius in grid pixels (already converted from
/// screen space), `intensity` the tool strength, and `delta_time_seconds`
/// the wall-clock share this application represents. Out-of-bounds and
/// no-data cells are skipped; results are clamped to
/// `[0, max(reference_max_elevation * 1.25, 0)]`.
///
/// Returns the number of cells whose value actually changed; a non-zero
/// count tells the caller a re-render/re-score is warranted.
pub fn apply_kernel(
    field: &mut ElevationField,
    center_row: usize,
    center_col: usize,
    radius_px: f64,
    tool: Tool,
    intensity: f64,
    reference_max_elevation: f64,
    delta_time_seconds: f64,
) -> usize {
    let frames = delta_time_seconds * REFERENCE_FPS;
    let scaled_intensity =
        tool.sign() * intensity * (reference_max_elevation / FULL_HEIGHT_SCALING_FRAMES) * frames;

    let ceiling = (reference_max_elevation * 1.25).max(0.0);

    let reach = radius_px.ceil().max(0.0) as i64;
    let radius_sq = radius_px * radius_px;
    let sigma = (radius_px / 3.0).max(1e-9);
    let denom = 2.0 * sigma * sigma;

    let mut modified = 0usize;

    for dr in -reach..=reach {
        for dc in -reach..=reach {
            let dist_sq = (dr * dr + dc * dc) as f64;
            if dist_sq > radius_sq {
                continue; // outside the circular cutoff
            }

            let row = center_row as i64 + dr;
            let col = center_col as i64 + dc;
            if row < 0 || col < 0 {
                continue;
            }
            let (row, col) = (row as usize, col as usize);

            let current = match field.get(row, col) {
                Some(v) => v,
                None => continue,
            };
            if field.is_no_data_value(current) {
                continue;
            }

            // Center weight is exp(0) = 1 by construction.
            let weight = (-dist_sq / denom).exp();
            let new_value = (current as f64 + weight * scaled_intensity).clamp(0.0, ceiling) as f32;

            if new_value != current {
                field.set(row, col, new_value);
                modified += 1;
            }
        }
    }

    modified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dem::GeoBounds;

    fn flat_field(size: usize, value: f32) -> ElevationField {
        let mut field = ElevationField::new(
            size,
            size,
            -9999.0,
            30.0,
            0.0,
            0.0,
            GeoBounds {
                min_lon: -1.0,
                min_lat: -1.0,
                max_lon: 1.0,
                max_lat: 1.0,
            },
        );
        for row in 0..size {
            for col in 0..size {
                field.set(row, col, value);
            }
        }
        field
    }

    #[test]
    fn test_center_raised_most_corners_untouched() {
        // 5x5 all-valid field, reference all zeros: kernel at the center
        // raises the center strictly above every other modified cell, and
        // corners (distance > 1.5) stay exactly 0.
        let mut field = flat_field(5, 0.0);
        let modified = apply_kernel(&mut field, 2, 2, 1.5, Tool::Up, 1.0, 100.0, 1.0 / 60.0);
        assert!(modified > 0);

        let center = field.get(2, 2).unwrap();
        assert!(center > 0.0);

        for row in 0..5 {
            for col in 0..5 {
                if (row, col) == (2, 2) {
                    continue;
                }
                let v = field.get(row, col).unwrap();
                assert!(v < center, "cell ({}, {}) = {} >= center {}", row, col, v, center);
            }
        }

        for &(row, col) in &[(0, 0), (0, 4), (4, 0), (4, 4)] {
            assert_eq!(field.get(row, col), Some(0.0), "corner ({}, {})", row, col);
        }
    }

    #[test]
    fn test_monotonic_up_until_saturation() {
        let mut field = flat_field(5, 0.0);
        let mut previous = 0.0f32;
        let ceiling = 125.0f32; // 100 * 1.25

        // Strictly increases until it clamps at the ceiling.
        for _ in 0..1_000 {
            apply_kernel(&mut field, 2, 2, 1.5, Tool::Up, 1.0, 100.0, 1.0 / 60.0);
            let center = field.get(2, 2).unwrap();
            if center == ceiling {
                return;
            }
            assert!(center > previous);
            previous = center;
        }
        panic!("center never saturated");
    }

    #[test]
    fn test_monotonic_down_until_floor() {
        let mut field = flat_field(5, 50.0);
        let mut previous = 50.0f32;

        for _ in 0..10_000 {
            let modified = apply_kernel(&mut field, 2, 2, 1.5, Tool::Down, 1.0, 100.0, 1.0 / 60.0);
            let center = field.get(2, 2).unwrap();
            if center == 0.0 {
                return;
            }
            assert!(modified > 0);
            assert!(center < previous);
            previous = center;
        }
        panic!("center never reached the floor");
    }

    #[test]
    fn test_range_invariant_after_many_applications() {
        let mut field = flat_field(7, 10.0);
        for _ in 0..2_000 {
            apply_kernel(&mut field, 3, 3, 2.5, Tool::Up, 1.0, 100.0, 1.0 / 30.0);
        }
        for v in field.valid_values() {
            assert!(v >= 0.0 && v <= 125.0, "value {} out of range", v);
        }
    }

    #[test]
    fn test_no_data_cells_skipped() {
        let mut field = flat_field(5, 0.0);
        field.set(2, 3, -9999.0);

        apply_kernel(&mut field, 2, 2, 1.5, Tool::Up, 1.0, 100.0, 1.0 / 60.0);
        assert!(field.is_no_data(2, 3));
    }

    #[test]
    fn test_kernel_near_edge_does_not_panic() {
        let mut field = flat_field(5, 0.0);
        let modified = apply_kernel(&mut field, 0, 0, 2.0, Tool::Up, 1.0, 100.0, 1.0 / 60.0);
        assert!(modified > 0);
        assert!(field.get(0, 0).unwrap() > 0.0);
    }

    #[test]
    fn test_zero_delta_time_changes_nothing() {
        let mut field = flat_field(5, 5.0);
        let modified = apply_kernel(&mut field, 2, 2, 1.5, Tool::Up, 1.0, 100.0, 0.0);
        assert_eq!(modified, 0);
        assert_eq!(field.get(2, 2), Some(5.0));
    }
}

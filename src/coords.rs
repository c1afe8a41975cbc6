//! Coordinate transforms between geographic, Web Mercator, grid, and screen
//! space.
//!
//! All functions are pure. The DEM grid is registered in spherical Web
//! Mercator meters: `origin_x/origin_y` is the north-west corner of cell
//! (0, 0) and rows grow southward.

use crate::dem::GeoBounds;

/// Earth radius for the spherical Web Mercator approximation.
pub const EARTH_RADIUS_M: f64 = 6378137.0;

/// Latitude beyond which Web Mercator is undefined.
pub const MAX_MERCATOR_LAT_DEG: f64 = 85.05112878;

/// Project geographic coordinates to Web Mercator meters.
pub fn lon_lat_to_meters(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_MERCATOR_LAT_DEG, MAX_MERCATOR_LAT_DEG);
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M
        * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0)
            .tan()
            .ln();
    (x, y)
}

/// Inverse of [`lon_lat_to_meters`].
pub fn meters_to_lon_lat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lon, lat)
}

/// Map geographic coordinates to a grid cell, or `None` when the point
/// falls outside `bounds`.
pub fn lon_lat_to_grid(
    lon: f64,
    lat: f64,
    bounds: &GeoBounds,
    origin_x: f64,
    origin_y: f64,
    pixel_size: f64,
) -> Option<(usize, usize)> {
    if !bounds.contains(lon, lat) {
        return None;
    }

    let (x, y) = lon_lat_to_meters(lon, lat);
    let col = ((x - origin_x) / pixel_size).floor();
    let row = ((origin_y - y) / pixel_size).floor();
    if row < 0.0 || col < 0.0 {
        return None;
    }

    Some((row as usize, col as usize))
}

/// Map a grid cell back to the geographic coordinates of its center, or
/// `None` when the cell is outside the grid.
pub fn grid_to_lon_lat(
    row: usize,
    col: usize,
    width: usize,
    height: usize,
    origin_x: f64,
    origin_y: f64,
    pixel_size: f64,
) -> Option<(f64, f64)> {
    if row >= height || col >= width {
        return None;
    }

    let x = origin_x + (col as f64 + 0.5) * pixel_size;
    let y = origin_y - (row as f64 + 0.5) * pixel_size;
    Some(meters_to_lon_lat(x, y))
}

/// Screen-space projection supplied by the map collaborator.
///
/// `project` maps geographic coordinates to screen pixels; `unproject` is
/// its inverse. The engine only ever samples these, it never renders.
pub trait MapProjection {
    fn project(&self, lon: f64, lat: f64) -> (f64, f64);
    fn unproject(&self, x: f64, y: f64) -> (f64, f64);
}

/// Convert a fixed on-screen brush radius to grid pixels at a given screen
/// position.
///
/// Samples the brush center and a point offset by `screen_radius` along the
/// screen X axis, measures their Mercator distance, and divides by the
/// grid's pixel size. Grid-pixels-per-screen-pixel changes with zoom and
/// latitude, so this is recomputed for every brush application.
pub fn screen_radius_to_grid_radius(
    projection: &dyn MapProjection,
    screen_radius: f64,
    screen_x: f64,
    screen_y: f64,
    pixel_size: f64,
) -> f64 {
    let (lon0, lat0) = projection.unproject(screen_x, screen_y);
    let (lon1, lat1) = projection.unproject(screen_x + screen_radius, screen_y);

    let (x0, y0) = lon_lat_to_meters(lon0, lat0);
    let (x1, y1) = lon_lat_to_meters(lon1, lat1);

    let meters = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
    meters / pixel_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mercator_round_trip() {
        for &(lon, lat) in &[(0.0, 0.0), (12.5, 41.9), (-122.4, 37.8), (151.2, -33.9)] {
            let (x, y) = lon_lat_to_meters(lon, lat);
            let (lon2, lat2) = meters_to_lon_lat(x, y);
            assert!((lon - lon2).abs() < 1e-9, "lon {} -> {}", lon, lon2);
            assert!((lat - lat2).abs() < 1e-9, "lat {} -> {}", lat, lat2);
        }
    }

    #[test]
    fn test_mercator_origin() {
        let (x, y) = lon_lat_to_meters(0.0, 0.0);
        assert!(x.abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn test_lon_lat_to_grid_outside_bounds() {
        let bounds = GeoBounds {
            min_lon: 10.0,
            min_lat: 40.0,
            max_lon: 11.0,
            max_lat: 41.0,
        };
        assert_eq!(lon_lat_to_grid(9.0, 40.5, &bounds, 0.0, 0.0, 30.0), None);
        assert_eq!(lon_lat_to_grid(10.5, 39.0, &bounds, 0.0, 0.0, 30.0), None);
    }

    #[test]
    fn test_grid_round_trip() {
        let bounds = GeoBounds {
            min_lon: 10.0,
            min_lat: 40.0,
            max_lon: 11.0,
            max_lat: 41.0,
        };
        let (origin_x, origin_y) = lon_lat_to_meters(bounds.min_lon, bounds.max_lat);
        let pixel_size = 100.0;

        let (lon, lat) = grid_to_lon_lat(7, 13, 800, 600, origin_x, origin_y, pixel_size)
            .expect("cell in range");
        let (row, col) = lon_lat_to_grid(lon, lat, &bounds, origin_x, origin_y, pixel_size)
            .expect("inside bounds");
        assert_eq!((row, col), (7, 13));
    }

    #[test]
    fn test_grid_to_lon_lat_out_of_range() {
        assert_eq!(grid_to_lon_lat(5, 0, 10, 5, 0.0, 0.0, 30.0), None);
        assert_eq!(grid_to_lon_lat(0, 10, 10, 5, 0.0, 0.0, 30.0), None);
    }

    /// Projection where one screen pixel is one Mercator meter at the
    /// equator.
    struct MeterProjection;

    impl MapProjection for MeterProjection {
        fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
            lon_lat_to_meters(lon, lat)
        }
        fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
            meters_to_lon_lat(x, y)
        }
    }

    #[test]
    fn test_screen_radius_to_grid_radius() {
        // 30 screen pixels = 30 meters = 3 grid pixels at 10 m/pixel.
        let radius = screen_radius_to_grid_radius(&MeterProjection, 30.0, 0.0, 0.0, 10.0);
        assert!((radius - 3.0).abs() < 1e-6, "radius {}", radius);
    }
}

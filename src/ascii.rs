//! ASCII rendering of elevation fields for terminal previews.

use crate::dem::ElevationField;

/// Density ramp from low to high elevation.
const HEIGHT_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Render an elevation field as ASCII art, downsampled to at most
/// `max_cols` columns. No-data cells render as blanks.
pub fn render_elevation(field: &ElevationField, max_cols: usize) -> String {
    let max_cols = max_cols.max(1);
    let step = ((field.width + max_cols - 1) / max_cols).max(1);
    let (min, max) = field.elevation_range();
    let range = max - min;

    let mut out = String::new();
    for row in (0..field.height).step_by(step) {
        for col in (0..field.width).step_by(step) {
            if field.is_no_data(row, col) {
                out.push(' ');
                continue;
            }
            let v = field.get(row, col).unwrap_or(min);
            let t = ((v - min) / range).clamp(0.0, 1.0);
            let idx = (t * (HEIGHT_RAMP.len() - 1) as f32).round() as usize;
            out.push(HEIGHT_RAMP[idx]);
        }
        out.push('\n');
    }
    out
}

//! Elevation similarity scoring.
//!
//! Compares the current field against the reference via normalized
//! mean-squared error, measured relative to the error a perfectly flat
//! terrain would have achieved. 1.0 means identical shape, 0.0 means no
//! better than flat ground.

use crate::dem::ElevationField;

/// Similarity score in `[0, 1]` between the current and reference fields.
///
/// Only indices where both fields hold finite, non-sentinel samples are
/// compared. Each side is min-max normalized independently, so the score
/// measures terrain *shape*, not absolute elevation scale.
pub fn score(current: &ElevationField, reference: &ElevationField) -> f64 {
    if current.width != reference.width || current.height != reference.height {
        return 0.0;
    }

    let mut pairs: Vec<(f64, f64)> = Vec::new();
    for (c, r) in current.data().iter().zip(reference.data().iter()) {
        if current.is_no_data_value(*c) || reference.is_no_data_value(*r) {
            continue;
        }
        if !c.is_finite() || !r.is_finite() {
            continue;
        }
        pairs.push((*c as f64, *r as f64));
    }
    if pairs.is_empty() {
        return 0.0;
    }

    let normalize = |values: &mut dyn Iterator<Item = f64>| -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            min = min.min(v);
            max = max.max(v);
        }
        (min, max - min)
    };

    let (cur_min, cur_range) = normalize(&mut pairs.iter().map(|p| p.0));
    let (ref_min, ref_range) = normalize(&mut pairs.iter().map(|p| p.1));

    // A zero range normalizes every value to 0.
    let norm = |v: f64, min: f64, range: f64| if range > 0.0 { (v - min) / range } else { 0.0 };

    let count = pairs.len() as f64;
    let mut mse = 0.0;
    let mut flat_mse = 0.0;
    for &(c, r) in &pairs {
        let nc = norm(c, cur_min, cur_range);
        let nr = norm(r, ref_min, ref_range);
        let diff = nc - nr;
        mse += diff * diff;
        flat_mse += nr * nr;
    }
    mse /= count;
    flat_mse /= count;

    if flat_mse == 0.0 {
        // Degenerate reference: flat terrain is already a perfect answer.
        return if mse == 0.0 { 1.0 } else { 0.0 };
    }

    (1.0 - mse / flat_mse).clamp(0.0, 1.0)
}

/// Display percentage for a score. The square-root stretch makes mid-range
/// scores visually more differentiated.
pub fn percentage(score: f64) -> f64 {
    score.sqrt() * 100.0
}

/// Fixed percentage-to-grade step table. Presentation concern, but the
/// breakpoints are part of the product's feel and must not drift.
pub fn letter_grade(percentage: f64) -> &'static str {
    if percentage >= 92.0 {
        "A+"
    } else if percentage >= 87.0 {
        "A"
    } else if percentage >= 82.0 {
        "A-"
    } else if percentage >= 77.0 {
        "B+"
    } else if percentage >= 72.0 {
        "B"
    } else if percentage >= 67.0 {
        "B-"
    } else if percentage >= 62.0 {
        "C+"
    } else if percentage >= 57.0 {
        "C"
    } else if percentage >= 52.0 {
        "C-"
    } else if percentage >= 47.0 {
        "D+"
    } else if percentage >= 42.0 {
        "D"
    } else if percentage >= 37.0 {
        "D-"
    } else if percentage >= 31.0 {
        "E+"
    } else if percentage >= 25.0 {
        "E"
    } else if percentage >= 19.0 {
        "E-"
    } else if percentage >= 14.0 {
        "F+"
    } else if percentage >= 9.0 {
        "F-"
    } else {
        "F"
    }
}

//! Stroke throttling: turns a continuous pointer drag into a deduplicated,
//! time-apportioned sequence of brush applications.
//!
//! Pointer-move samples are interpolated into a discrete line of grid
//! cells, queued (bounded, oldest dropped), deduplicated against a rolling
//! time window, and handed out in batches. Each batch carries a fair
//! time-share of the stroke's elapsed duration so total applied intensity
//! stays roughly proportional to dwell time regardless of how samples were
//! batched across frames.

use std::collections::{HashMap, VecDeque};

use log::warn;

use crate::brush::Tool;

/// Hard cap on queued points; bounds memory when brush application cannot
/// keep up with input. Oldest points are dropped first.
pub const MAX_QUEUE_LEN: usize = 500;

/// Rolling dedup window. A cell already painted within this many
/// milliseconds is not repainted; a cell revisited later in a long stroke
/// is painted again.
pub const DELTA_REPROCESSING_MS: f64 = 250.0;

/// A grid cell as (row, col).
pub type Cell = (usize, usize);

fn cell_key(cell: Cell) -> u64 {
    ((cell.0 as u64) << 32) | cell.1 as u64
}

/// One batch of cells due for brush application, in sample order.
#[derive(Debug, Default)]
pub struct StrokeBatch {
    pub cells: Vec<Cell>,
    /// Wall-clock share, in seconds, each cell's kernel application
    /// represents.
    pub time_per_point_seconds: f64,
}

/// Ephemeral state for one pointer-down-to-pointer-up gesture. Dropped on
/// pointer release.
pub struct StrokeState {
    pub tool: Tool,
    queued: VecDeque<Cell>,
    /// Cell key -> timestamp it was processed; entries older than the dedup
    /// window are evicted on every tick.
    processed: HashMap<u64, f64>,
    stroke_start_ms: f64,
    last_cell: Option<Cell>,
}

impl StrokeState {
    /// Start a stroke at the first sampled cell. A click without movement
    /// still yields exactly one brush application from this seed point.
    pub fn begin(tool: Tool, start_cell: Cell, now_ms: f64) -> Self {
        let mut state = Self {
            tool,
            queued: VecDeque::new(),
            processed: HashMap::new(),
            stroke_start_ms: now_ms,
            last_cell: Some(start_cell),
        };
        state.push(start_cell);
        state
    }

    /// Feed a pointer-move sample. Interpolates a discrete line from the
    /// previous sample and queues every cell on it except the previous
    /// endpoint. Samples landing on the previous cell are ignored.
    pub fn extend(&mut self, cell: Cell) {
        let prev = match self.last_cell {
            Some(prev) => prev,
            None => {
                // First sample after re-entering valid terrain.
                self.push(cell);
                self.last_cell = Some(cell);
                return;
            }
        };

        if cell == prev {
            return;
        }

        for c in line_between(prev, cell).into_iter().skip(1) {
            self.push(c);
        }
        self.last_cell = Some(cell);
    }

    /// The pointer left valid terrain mid-drag: drop everything pending so
    /// nothing is partially applied on re-entry.
    pub fn leave_bounds(&mut self) {
        self.queued.clear();
        self.processed.clear();
        self.last_cell = None;
    }

    pub fn pending(&self) -> usize {
        self.queued.len()
    }

    fn push(&mut self, cell: Cell) {
        self.queued.push_back(cell);
        if self.queued.len() > MAX_QUEUE_LEN {
            let dropped = self.queued.len() - MAX_QUEUE_LEN;
            self.queued.drain(..dropped);
            warn!(
                "stroke queue exceeded {} points, dropped {} oldest",
                MAX_QUEUE_LEN, dropped
            );
        }
    }

    /// Drain the queue into a batch of unique, not-recently-painted cells
    /// and compute their time apportionment.
    ///
    /// The elapsed stroke time is measured from the oldest timestamp still
    /// in the dedup window (or the stroke start if the window is empty) and
    /// divided across all unique points including this batch. That the
    /// per-point share shrinks as a long stroke accumulates points is
    /// intentional, preserved behavior: it affects felt brush strength.
    pub fn take_batch(&mut self, now_ms: f64) -> StrokeBatch {
        // Evict dedup entries older than the rolling window.
        self.processed
            .retain(|_, t| now_ms - *t <= DELTA_REPROCESSING_MS);

        let effective_start_ms = self
            .processed
            .values()
            .fold(f64::INFINITY, |min, &t| min.min(t));
        let effective_start_ms = if effective_start_ms.is_finite() {
            effective_start_ms
        } else {
            self.stroke_start_ms
        };

        let prior_unique = self.processed.len();

        let mut cells = Vec::new();
        while let Some(cell) = self.queued.pop_front() {
            let key = cell_key(cell);
            if self.processed.contains_key(&key) {
                continue; // painted within the dedup window, drop it
            }
            self.processed.insert(key, now_ms);
            cells.push(cell);
        }

        if cells.is_empty() {
            return StrokeBatch::default();
        }

        let total_stroke_seconds = (now_ms - effective_start_ms).max(0.0) / 1000.0;
        let total_unique = prior_unique + cells.len();
        let time_per_point_seconds = total_stroke_seconds / total_unique as f64;

        StrokeBatch {
            cells,
            time_per_point_seconds,
        }
    }
}

/// Discrete line between two grid cells (Bresenham), inclusive of both
/// endpoints.
pub fn line_between(a: Cell, b: Cell) -> Vec<Cell> {
    let (mut row0, mut col0) = (a.0 as i64, a.1 as i64);
    let (row1, col1) = (b.0 as i64, b.1 as i64);

    let d_col = (col1 - col0).abs();
    let d_row = -(row1 - row0).abs();
    let step_col = if col0 < col1 { 1 } else { -1 };
    let step_row = if row0 < row1 { 1 } else { -1 };
    let mut err = d_col + d_row;

    let mut cells = Vec::with_capacity((d_col - d_row) as usize + 1);
    loop {
        cells.push((row0 as usize, col0 as usize));
        if row0 == row1 && col0 == col1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= d_row {
            err += d_row;
            col0 += step_col;
        }
        if e2 <= d_col {
            err += d_col;
            row0 += step_row;
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_between_endpoints_and_connectivity() {
        let cells = line_between((0, 0), (3, 7));
        assert_eq!(cells.first(), Some(&(0, 0)));
        assert_eq!(cells.last(), Some(&(3, 7)));
        for pair in cells.windows(2) {
            let dr = pair[1].0 as i64 - pair[0].0 as i64;
            let dc = pair[1].1 as i64 - pair[0].1 as i64;
            assert!(dr.abs() <= 1 && dc.abs() <= 1);
            assert!(dr != 0 || dc != 0);
        }
    }

    #[test]
    fn test_line_between_single_cell() {
        assert_eq!(line_between((5, 5), (5, 5)), vec![(5, 5)]);
    }

    #[test]
    fn test_click_without_move_applies_once() {
        let mut stroke = StrokeState::begin(Tool::Up, (3, 3), 0.0);
        let batch = stroke.take_batch(16.0);
        assert_eq!(batch.cells, vec![(3, 3)]);

        // Nothing further queued, nothing further applied.
        let batch = stroke.take_batch(32.0);
        assert!(batch.cells.is_empty());
    }

    #[test]
    fn test_dedup_within_window() {
        let mut stroke = StrokeState::begin(Tool::Up, (0, 0), 0.0);
        let batch = stroke.take_batch(10.0);
        assert_eq!(batch.cells, vec![(0, 0)]);

        // Revisit the same cell 90 ms later: inside the window, dropped.
        stroke.extend((0, 1));
        stroke.extend((0, 0));
        let batch = stroke.take_batch(100.0);
        assert_eq!(batch.cells, vec![(0, 1)]);
    }

    #[test]
    fn test_reprocess_after_window_expires() {
        let mut stroke = StrokeState::begin(Tool::Up, (0, 0), 0.0);
        assert_eq!(stroke.take_batch(10.0).cells, vec![(0, 0)]);

        // Revisit the same cell 300 ms later: the 10 ms entry has aged out
        // of the 250 ms window, so it paints again.
        stroke.extend((0, 1));
        stroke.extend((0, 0));
        let batch = stroke.take_batch(310.0);
        assert_eq!(batch.cells, vec![(0, 1), (0, 0)]);
    }

    #[test]
    fn test_queue_cap_drops_oldest() {
        let mut stroke = StrokeState::begin(Tool::Up, (0, 0), 0.0);
        // A very long horizontal drag: 600 new cells on one row.
        stroke.extend((0, 600));
        assert_eq!(stroke.pending(), MAX_QUEUE_LEN);

        let batch = stroke.take_batch(100.0);
        assert_eq!(batch.cells.len(), MAX_QUEUE_LEN);
        // The most recent cells survive.
        assert_eq!(batch.cells.last(), Some(&(0, 600)));
        assert_eq!(batch.cells.first(), Some(&(0, 101)));
    }

    #[test]
    fn test_time_apportionment() {
        let mut stroke = StrokeState::begin(Tool::Up, (0, 0), 0.0);

        // First batch: dedup map empty, so time runs from stroke start and
        // is split across 1 unique point.
        let batch = stroke.take_batch(100.0);
        assert!((batch.time_per_point_seconds - 0.1).abs() < 1e-12);

        // Second batch: the (0,0) entry at t=100 is the effective start;
        // elapsed 100 ms over 2 unique points total.
        stroke.extend((0, 1));
        let batch = stroke.take_batch(200.0);
        assert_eq!(batch.cells, vec![(0, 1)]);
        assert!((batch.time_per_point_seconds - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_leave_bounds_clears_state() {
        let mut stroke = StrokeState::begin(Tool::Up, (0, 0), 0.0);
        stroke.extend((0, 5));
        stroke.leave_bounds();
        assert_eq!(stroke.pending(), 0);

        // Re-entry starts fresh from the new sample, no line from the old
        // position.
        stroke.extend((9, 9));
        let batch = stroke.take_batch(50.0);
        assert_eq!(batch.cells, vec![(9, 9)]);
    }

    #[test]
    fn test_duplicate_within_batch_applied_once() {
        let mut stroke = StrokeState::begin(Tool::Up, (0, 0), 0.0);
        // Drag out and back before any tick runs.
        stroke.extend((0, 2));
        stroke.extend((0, 0));
        let batch = stroke.take_batch(10.0);
        assert_eq!(batch.cells, vec![(0, 0), (0, 1), (0, 2)]);
    }
}

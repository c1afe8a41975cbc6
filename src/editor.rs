//! Owning facade over the terraforming engine.
//!
//! The editor holds the immutable reference field and the single mutable
//! current field, wires the stroke pipeline to the brush, replaces the
//! current field for generation-mode requests, notifies the renderer after
//! visible changes, and debounces persistence. All mutation happens on the
//! host's frame tick; there is no background work.

use std::io;

use log::warn;

use crate::brush::{apply_kernel, Tool};
use crate::coords::{screen_radius_to_grid_radius, MapProjection};
use crate::dem::ElevationField;
use crate::fractal::{generate_fractal, FractalConfig, GeneratorError};
use crate::score;
use crate::stroke::{Cell, StrokeState};

/// Quiet period after the last mutation before a save fires.
pub const SAVE_DEBOUNCE_MS: f64 = 500.0;

/// The closed set of generation-mode requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationMode {
    /// Fresh fractal terrain.
    Random,
    /// All valid cells set to elevation 0.
    Flat,
    /// Copy of the reference field.
    Actual,
}

impl GenerationMode {
    /// Parse a mode request tag. Unknown tags are a no-op for the caller.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "random" => Some(GenerationMode::Random),
            "flat" => Some(GenerationMode::Flat),
            "actual" => Some(GenerationMode::Actual),
            _ => None,
        }
    }
}

/// Renderer collaborator: receives a read-only elevation buffer and its
/// declared range whenever the terrain changes. It never mutates the
/// buffer.
pub trait RenderSink {
    fn terrain_changed(&mut self, elevations: &[f32], min: f32, max: f32);
}

/// Persistence collaborator. Failures are logged and treated as "no saved
/// state"; they never block or fail the editing session.
pub trait TerrainStore {
    fn save(&mut self, field: &ElevationField) -> io::Result<()>;
    fn load(&mut self, width: usize, height: usize) -> io::Result<Option<ElevationField>>;
}

pub struct TerrainEditor {
    reference: ElevationField,
    current: Option<ElevationField>,
    fractal_config: FractalConfig,
    stroke: Option<StrokeState>,
    render: Option<Box<dyn RenderSink>>,
    store: Option<Box<dyn TerrainStore>>,
    save_due_ms: Option<f64>,
}

impl TerrainEditor {
    pub fn new(reference: ElevationField) -> Self {
        Self {
            reference,
            current: None,
            fractal_config: FractalConfig::default(),
            stroke: None,
            render: None,
            store: None,
            save_due_ms: None,
        }
    }

    pub fn set_render_sink(&mut self, sink: Box<dyn RenderSink>) {
        self.render = Some(sink);
    }

    pub fn set_store(&mut self, store: Box<dyn TerrainStore>) {
        self.store = Some(store);
    }

    pub fn set_fractal_config(&mut self, config: FractalConfig) {
        self.fractal_config = config;
    }

    pub fn reference(&self) -> &ElevationField {
        &self.reference
    }

    /// The current field, or `None` while no terrain is loaded yet.
    pub fn current(&self) -> Option<&ElevationField> {
        self.current.as_ref()
    }

    /// Elevation at a grid cell, or `None` when the current field is
    /// unavailable or the cell is out of bounds. Callers should treat
    /// `None` as "try again later", not as fatal.
    pub fn elevation_at(&self, row: usize, col: usize) -> Option<f32> {
        self.current.as_ref()?.get(row, col)
    }

    /// Initialize the current field from the store, falling back to a copy
    /// of the reference. Store failures read as "no saved state".
    pub fn load_or_default(&mut self) {
        let (width, height) = (self.reference.width, self.reference.height);
        let loaded = match self.store.as_mut() {
            Some(store) => match store.load(width, height) {
                Ok(field) => field,
                Err(e) => {
                    warn!("failed to load saved terrain, starting fresh: {}", e);
                    None
                }
            },
            None => None,
        };

        self.current = Some(loaded.unwrap_or_else(|| self.reference.clone()));
        self.notify_render();
    }

    /// Replace the current field wholesale for a generation-mode request
    /// and save immediately.
    pub fn generate(&mut self, mode: GenerationMode) -> Result<(), GeneratorError> {
        let field = match mode {
            GenerationMode::Random => generate_fractal(&self.reference, &self.fractal_config)?,
            GenerationMode::Flat => {
                let mut field = self.reference.clone();
                field.fill_valid(0.0);
                field
            }
            GenerationMode::Actual => self.reference.clone(),
        };

        self.current = Some(field);
        self.notify_render();
        self.save_now();
        Ok(())
    }

    /// Handle a raw generation request tag. Unknown tags are a no-op;
    /// returns whether anything happened.
    pub fn generate_from_tag(&mut self, tag: &str) -> Result<bool, GeneratorError> {
        match GenerationMode::from_tag(tag) {
            Some(mode) => self.generate(mode).map(|_| true),
            None => Ok(false),
        }
    }

    /// Convert the fixed on-screen brush radius to grid pixels at the given
    /// screen position. Recomputed per application since the ratio varies
    /// with zoom.
    pub fn grid_radius_for_screen(
        &self,
        projection: &dyn MapProjection,
        screen_radius: f64,
        screen_x: f64,
        screen_y: f64,
    ) -> f64 {
        screen_radius_to_grid_radius(
            projection,
            screen_radius,
            screen_x,
            screen_y,
            self.reference.pixel_size_meters,
        )
    }

    /// Begin a terraforming stroke at the given grid cell.
    pub fn begin_stroke(&mut self, tool: Tool, cell: Cell, now_ms: f64) {
        self.stroke = Some(StrokeState::begin(tool, cell, now_ms));
    }

    /// Feed a pointer-move sample to the active stroke.
    pub fn extend_stroke(&mut self, cell: Cell) {
        if let Some(stroke) = self.stroke.as_mut() {
            stroke.extend(cell);
        }
    }

    /// The pointer left valid terrain mid-drag: discard pending work so
    /// nothing is partially applied on re-entry.
    pub fn stroke_left_bounds(&mut self) {
        if let Some(stroke) = self.stroke.as_mut() {
            stroke.leave_bounds();
        }
    }

    /// Frame tick while the pointer is down: drain the stroke queue and
    /// apply kernels in sample order. Returns the number of cells modified;
    /// the renderer is notified once, after the last point of the batch.
    pub fn tick(&mut self, radius_px: f64, intensity: f64, now_ms: f64) -> usize {
        self.flush_due_save(now_ms);

        if self.current.is_none() {
            return 0;
        }
        let (batch, tool) = match self.stroke.as_mut() {
            Some(stroke) => (stroke.take_batch(now_ms), stroke.tool),
            None => return 0,
        };

        let reference_max = self.reference.max_elevation() as f64;
        let mut modified = 0usize;
        if let Some(current) = self.current.as_mut() {
            for &(row, col) in &batch.cells {
                modified += apply_kernel(
                    current,
                    row,
                    col,
                    radius_px,
                    tool,
                    intensity,
                    reference_max,
                    batch.time_per_point_seconds,
                );
            }
        }

        if modified > 0 {
            self.notify_render();
            self.save_due_ms = Some(now_ms + SAVE_DEBOUNCE_MS);
        }
        modified
    }

    /// Pointer release: destroy the stroke state and flush any pending save
    /// immediately.
    pub fn end_stroke(&mut self) {
        self.stroke = None;
        if self.save_due_ms.take().is_some() {
            self.save_now();
        }
    }

    pub fn stroke_active(&self) -> bool {
        self.stroke.is_some()
    }

    /// Similarity of the current field to the reference, when available.
    pub fn score(&self) -> Option<f64> {
        let current = self.current.as_ref()?;
        Some(score::score(current, &self.reference))
    }

    /// Display percentage and letter grade for the current terrain.
    pub fn grade(&self) -> Option<(f64, &'static str)> {
        let pct = score::percentage(self.score()?);
        Some((pct, score::letter_grade(pct)))
    }

    fn flush_due_save(&mut self, now_ms: f64) {
        if matches!(self.save_due_ms, Some(due) if now_ms >= due) {
            self.save_due_ms = None;
            self.save_now();
        }
    }

    fn save_now(&mut self) {
        let (store, field) = match (self.store.as_mut(), self.current.as_ref()) {
            (Some(store), Some(field)) => (store, field),
            _ => return,
        };
        if let Err(e) = store.save(field) {
            warn!("failed to save terrain snapshot: {}", e);
        }
    }

    fn notify_render(&mut self) {
        if let (Some(sink), Some(field)) = (self.render.as_mut(), self.current.as_ref()) {
            let (min, max) = field.elevation_range();
            sink.terrain_changed(field.data(), min, max);
        }
    }
}

//! Terrain-elevation editing engine for a terraforming toy.
//!
//! Owns the DEM data model, the diamond-square fractal generator, the
//! Gaussian-kernel terraforming brush with its stroke throttling, and the
//! elevation-similarity scorer. Rendering, camera, and input plumbing live
//! in the host; this crate only ever sees grid cells, timestamps, and a
//! projection seam.

pub mod ascii;
pub mod brush;
pub mod coords;
pub mod dem;
pub mod editor;
pub mod fractal;
pub mod persist;
pub mod score;
pub mod stroke;

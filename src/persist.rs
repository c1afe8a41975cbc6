//! Snapshot persistence for the current elevation field.
//!
//! Saves the full buffer plus registration as a versioned JSON snapshot.
//! Loading is deliberately forgiving: a missing file, a dimension mismatch,
//! or a newer format version all read as "no saved data" so the editing
//! session can start fresh instead of failing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::dem::ElevationField;
use crate::editor::TerrainStore;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(serde::Serialize, serde::Deserialize)]
struct TerrainSnapshot {
    /// Format version for forward compatibility.
    version: u32,
    field: ElevationField,
}

/// Save an elevation field to a snapshot file.
pub fn save_snapshot(field: &ElevationField, path: &Path) -> io::Result<()> {
    let snapshot = TerrainSnapshot {
        version: SNAPSHOT_VERSION,
        field: field.clone(),
    };

    let bytes = serde_json::to_vec(&snapshot).map_err(|e| {
        io::Error::new(io::ErrorKind::Other, format!("serialization failed: {}", e))
    })?;

    fs::write(path, bytes)
}

/// Load a snapshot, returning `Ok(None)` when there is no usable saved
/// state for the expected grid dimensions.
pub fn load_snapshot(
    path: &Path,
    expected_width: usize,
    expected_height: usize,
) -> io::Result<Option<ElevationField>> {
    if !path.exists() {
        return Ok(None);
    }

    let bytes = fs::read(path)?;
    let snapshot: TerrainSnapshot = serde_json::from_slice(&bytes).map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidData, format!("deserialization failed: {}", e))
    })?;

    if snapshot.version > SNAPSHOT_VERSION {
        return Ok(None);
    }

    let field = snapshot.field;
    if field.width != expected_width || field.height != expected_height || !field.is_consistent()
    {
        return Ok(None);
    }

    Ok(Some(field))
}

/// File-backed [`TerrainStore`] for hosts that persist to disk.
pub struct FileTerrainStore {
    path: PathBuf,
}

impl FileTerrainStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TerrainStore for FileTerrainStore {
    fn save(&mut self, field: &ElevationField) -> io::Result<()> {
        save_snapshot(field, &self.path)
    }

    fn load(&mut self, width: usize, height: usize) -> io::Result<Option<ElevationField>> {
        load_snapshot(&self.path, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dem::GeoBounds;

    fn sample_field() -> ElevationField {
        let mut field = ElevationField::new(
            4,
            3,
            -9999.0,
            30.0,
            1000.0,
            2000.0,
            GeoBounds {
                min_lon: 10.0,
                min_lat: 40.0,
                max_lon: 11.0,
                max_lat: 41.0,
            },
        );
        field.set(0, 0, 1.5);
        field.set(1, 2, 77.0);
        field.set(2, 3, 12.25);
        field
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("terraformer_test_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_snapshot_round_trip() {
        let path = temp_path("round_trip");
        let field = sample_field();

        save_snapshot(&field, &path).unwrap();
        let loaded = load_snapshot(&path, 4, 3).unwrap().expect("saved data");
        fs::remove_file(&path).ok();

        assert_eq!(loaded.width, 4);
        assert_eq!(loaded.height, 3);
        assert_eq!(loaded.no_data_value, -9999.0);
        assert_eq!(loaded.data(), field.data());
        assert_eq!(loaded.bounds, field.bounds);
        assert_eq!(loaded.origin_x_meters, 1000.0);
    }

    #[test]
    fn test_dimension_mismatch_reads_as_no_data() {
        let path = temp_path("dim_mismatch");
        save_snapshot(&sample_field(), &path).unwrap();
        let loaded = load_snapshot(&path, 8, 8).unwrap();
        fs::remove_file(&path).ok();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_missing_file_reads_as_no_data() {
        let path = temp_path("missing_never_written");
        assert!(load_snapshot(&path, 4, 3).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let path = temp_path("corrupt");
        fs::write(&path, b"not json at all").unwrap();
        let result = load_snapshot(&path, 4, 3);
        fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}

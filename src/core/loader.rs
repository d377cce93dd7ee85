//! Record loading utilities
//!
//! Generic helpers for loading records from the filesystem, reducing
//! boilerplate in command implementations.

use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::entity::Record;

/// Load all records of type T from a directory
///
/// Scans the directory for .yaml files and deserializes them.
/// Files that fail to parse are silently skipped.
pub fn load_all<T: Record + 'static>(dir: &Path) -> Result<Vec<T>> {
    let mut records = Vec::new();

    if !dir.exists() {
        return Ok(records);
    }

    // Only files named for T's prefix; stray files in the directory are not
    // candidate records
    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.extension().is_some_and(|e| e == "yaml"))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(T::PREFIX))
        })
        .collect();
    paths.sort();

    for path in paths {
        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(record) = serde_yml::from_str::<T>(&content) {
                records.push(record);
            }
        }
    }

    Ok(records)
}

/// Find a record file by ID (supports partial matching)
///
/// Searches for a file whose stem contains the given ID.
/// Returns the first match found.
pub fn find_record_file(dir: &Path, id: &str) -> Option<PathBuf> {
    if !dir.exists() {
        return None;
    }

    for entry in fs::read_dir(dir).ok()? {
        let entry = entry.ok()?;
        let path = entry.path();

        if path.extension().is_some_and(|e| e == "yaml") {
            let filename = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            if filename.contains(id) || filename.starts_with(id) {
                return Some(path);
            }
        }
    }

    None
}

/// Load a single record by ID
///
/// Searches for a record file matching the ID and deserializes it.
/// Returns the path and record if found.
pub fn load_record<T: Record + 'static>(dir: &Path, id: &str) -> Result<Option<(PathBuf, T)>> {
    if let Some(path) = find_record_file(dir, id) {
        let content = fs::read_to_string(&path).into_diagnostic()?;
        let record: T = serde_yml::from_str(&content).into_diagnostic()?;
        return Ok(Some((path, record)));
    }
    Ok(None)
}

/// Serialize a record to YAML and write it to the given path
pub fn save_record<T: serde::Serialize>(path: &Path, record: &T) -> Result<()> {
    let yaml = serde_yml::to_string(record).into_diagnostic()?;
    fs::write(path, yaml).into_diagnostic()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    use crate::entities::Supplier;

    #[test]
    fn test_load_all_empty_dir() {
        let dir = tempdir().unwrap();
        let result: Result<Vec<Supplier>> = load_all(dir.path());
        assert!(result.is_ok());
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_load_all_nonexistent_dir() {
        let result: Result<Vec<Supplier>> = load_all(Path::new("/nonexistent/path"));
        assert!(result.is_ok());
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_load_all_only_considers_matching_prefix() {
        let dir = tempdir().unwrap();
        let sup = Supplier::new("ABC Verf".to_string(), "a@b.nl".to_string(), "t".to_string());
        save_record(&dir.path().join(format!("{}.kbt.yaml", sup.id)), &sup).unwrap();
        let mat = crate::entities::Material::new(
            "Brush".to_string(),
            "ABC Verf".to_string(),
            "t".to_string(),
        );
        save_record(&dir.path().join(format!("{}.kbt.yaml", mat.id)), &mat).unwrap();

        let suppliers: Vec<Supplier> = load_all(dir.path()).unwrap();
        assert_eq!(suppliers.len(), 1);
        assert_eq!(suppliers[0].id, sup.id);
    }

    #[test]
    fn test_load_all_skips_unparseable_files() {
        let dir = tempdir().unwrap();
        let sup = Supplier::new("ABC Verf".to_string(), "a@b.nl".to_string(), "t".to_string());
        save_record(&dir.path().join(format!("{}.kbt.yaml", sup.id)), &sup).unwrap();
        fs::write(dir.path().join("SUP-broken.kbt.yaml"), "name: [unclosed").unwrap();

        let loaded: Vec<Supplier> = load_all(dir.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, sup.id);
    }

    #[test]
    fn test_find_record_file_nonexistent() {
        let result = find_record_file(Path::new("/nonexistent/path"), "SUP-123");
        assert!(result.is_none());
    }

    #[test]
    fn test_find_record_file_partial_id() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("SUP-01J123456789ABCDEF.kbt.yaml");
        fs::write(&file_path, "id: SUP-01J123456789ABCDEF").unwrap();

        let result = find_record_file(dir.path(), "SUP-01J123");
        assert_eq!(result, Some(file_path));
    }
}

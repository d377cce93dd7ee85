//! Supplier consolidation (merge)
//!
//! Merging repoints every material that references the source identity's
//! name onto the target supplier's name, then retires the source: its
//! record file is deleted if it was persisted, and an inferred source
//! simply stops being synthesized once nothing names it.
//!
//! Invoices are deliberately left alone. Their `supplier_name` keeps the
//! pre-merge text permanently, so historical revenue stays attributed to
//! the old name. That is an accepted limitation of the data model, not
//! something the engine compensates for.
//!
//! There are no cross-file transactions. Material rewrites are issued one
//! at a time, and a failure mid-sequence leaves earlier rewrites in place.
//! To make an interrupted merge resumable, the engine journals a merge
//! intent under `.kbt/merges/` before touching anything and trims it as
//! materials complete; `resume_merge` re-processes only the recorded
//! remainder, and re-applying a completed rewrite is harmless (the exact
//! name match no longer fires).

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

use crate::core::identity::{RecordId, RecordPrefix};
use crate::core::loader;
use crate::core::project::Project;
use crate::entities::{Material, Supplier};
use crate::resolve::identity::SupplierIdentity;

/// One material that could not be repointed
#[derive(Debug, Clone)]
pub struct MigrationFailure {
    pub material: RecordId,
    pub reason: String,
}

/// Errors surfaced by a merge attempt
#[derive(Debug, Error)]
pub enum MergeError {
    /// Source and target resolve to the same supplier; rejected before any
    /// mutation
    #[error("source and target are the same supplier")]
    SourceIsTarget,

    /// Some material rewrites failed; the ones that succeeded are not
    /// rolled back, and the merge intent is kept for a later resume
    #[error("{migrated} of {total} materials migrated to '{target}'; {} failed", failed.len())]
    PartialFailure {
        migrated: usize,
        total: usize,
        target: String,
        failed: Vec<MigrationFailure>,
    },

    /// All materials migrated, but the persisted source record could not
    /// be removed
    #[error("materials migrated, but source supplier '{name}' could not be deleted: {reason}")]
    SourceDeleteFailed { name: String, reason: String },

    /// The recorded merge target no longer exists (deleted since the
    /// intent was journaled)
    #[error("merge target {0} no longer exists")]
    TargetVanished(RecordId),

    #[error("store error: {0}")]
    Store(String),
}

/// Result of a completed merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Materials repointed to the target name
    pub materials_migrated: usize,
    /// Whether a persisted source record was deleted
    pub supplier_deleted: bool,
}

/// A journaled merge in progress, one YAML file per intent under
/// `.kbt/merges/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeIntent {
    /// Intent id (bare ULID; intents are not records)
    pub id: String,

    /// Name the dependent materials currently carry
    pub source_name: String,

    /// Persisted source record to delete afterwards, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<RecordId>,

    /// Target supplier (always persisted)
    pub target_id: RecordId,
    pub target_name: String,

    /// Materials still to repoint
    #[serde(default)]
    pub remaining: Vec<RecordId>,

    pub started: DateTime<Utc>,
}

impl MergeIntent {
    fn path(&self, project: &Project) -> PathBuf {
        project.merges_dir().join(format!("{}.yaml", self.id))
    }
}

/// Merge `source` into `target`: repoint all dependent materials, then
/// retire the source identity.
///
/// The target is a persisted [`Supplier`] by construction; resolving an id
/// to one (and reporting an unresolvable id) is the caller's job.
pub fn merge_suppliers(
    project: &Project,
    source: &SupplierIdentity,
    target: &Supplier,
) -> Result<MergeOutcome, MergeError> {
    match source {
        SupplierIdentity::Persisted(s) if s.id == target.id => {
            return Err(MergeError::SourceIsTarget)
        }
        SupplierIdentity::Inferred(i) if i.name == target.name => {
            return Err(MergeError::SourceIsTarget)
        }
        _ => {}
    }

    let materials: Vec<Material> = loader::load_all(&project.record_dir(RecordPrefix::Mat))
        .map_err(|e| MergeError::Store(e.to_string()))?;

    let mut intent = MergeIntent {
        id: Ulid::new().to_string(),
        source_name: source.name().to_string(),
        source_id: source.as_persisted().map(|s| s.id.clone()),
        target_id: target.id.clone(),
        target_name: target.name.clone(),
        remaining: materials
            .iter()
            .filter(|m| m.supplier == source.name())
            .map(|m| m.id.clone())
            .collect(),
        started: Utc::now(),
    };

    // Journal first: nothing is mutated until the intent is on disk
    let intent_path = intent.path(project);
    write_intent(&intent_path, &intent).map_err(MergeError::Store)?;

    complete(project, &mut intent, &intent_path)
}

/// Merge intents still journaled under `.kbt/merges/`, oldest first
pub fn pending_intents(project: &Project) -> Result<Vec<(PathBuf, MergeIntent)>, MergeError> {
    let dir = project.merges_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut intents = Vec::new();
    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
        .map_err(|e| MergeError::Store(e.to_string()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "yaml"))
        .collect();
    paths.sort();

    for path in paths {
        let content = fs::read_to_string(&path).map_err(|e| MergeError::Store(e.to_string()))?;
        let intent: MergeIntent =
            serde_yml::from_str(&content).map_err(|e| MergeError::Store(e.to_string()))?;
        intents.push((path, intent));
    }

    Ok(intents)
}

/// Continue a journaled merge: repoint the recorded remainder, retire the
/// source, and clear the intent.
pub fn resume_merge(project: &Project, mut intent: MergeIntent) -> Result<MergeOutcome, MergeError> {
    let target: Option<(PathBuf, Supplier)> = loader::load_record(
        &project.record_dir(RecordPrefix::Sup),
        &intent.target_id.to_string(),
    )
    .map_err(|e| MergeError::Store(e.to_string()))?;
    if target.is_none() {
        return Err(MergeError::TargetVanished(intent.target_id.clone()));
    }

    let intent_path = intent.path(project);
    complete(project, &mut intent, &intent_path)
}

/// Run the remainder of an intent: sequential material rewrites, source
/// retirement, journal cleanup.
fn complete(
    project: &Project,
    intent: &mut MergeIntent,
    intent_path: &Path,
) -> Result<MergeOutcome, MergeError> {
    let total = intent.remaining.len();
    let mut migrated = 0usize;
    let mut failed: Vec<MigrationFailure> = Vec::new();

    for id in intent.remaining.clone() {
        match repoint_material(project, &id, &intent.source_name, &intent.target_name) {
            Ok(()) => {
                migrated += 1;
                intent.remaining.retain(|r| r != &id);
                // Journal updates are best-effort; a stale entry only means
                // a no-op re-check on resume
                let _ = write_intent(intent_path, intent);
            }
            Err(reason) => failed.push(MigrationFailure {
                material: id,
                reason,
            }),
        }
    }

    if !failed.is_empty() {
        return Err(MergeError::PartialFailure {
            migrated,
            total,
            target: intent.target_name.clone(),
            failed,
        });
    }

    let supplier_deleted = retire_source(project, intent)?;
    let _ = fs::remove_file(intent_path);

    Ok(MergeOutcome {
        materials_migrated: migrated,
        supplier_deleted,
    })
}

/// Rewrite one material's supplier reference. Skips materials that no
/// longer carry the source name (already migrated by an earlier attempt)
/// or whose file is gone.
fn repoint_material(
    project: &Project,
    id: &RecordId,
    source_name: &str,
    target_name: &str,
) -> Result<(), String> {
    let path = project.record_path(id);
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.to_string()),
    };

    let mut material: Material = serde_yml::from_str(&content).map_err(|e| e.to_string())?;
    if material.supplier != source_name {
        return Ok(());
    }

    material.supplier = target_name.to_string();
    let yaml = serde_yml::to_string(&material).map_err(|e| e.to_string())?;
    fs::write(&path, yaml).map_err(|e| e.to_string())
}

/// Delete the persisted source record, if the intent has one. A file that
/// is already gone satisfies the postcondition.
fn retire_source(project: &Project, intent: &MergeIntent) -> Result<bool, MergeError> {
    let Some(source_id) = &intent.source_id else {
        return Ok(false);
    };

    match fs::remove_file(project.record_path(source_id)) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(MergeError::SourceDeleteFailed {
            name: intent.source_name.clone(),
            reason: e.to_string(),
        }),
    }
}

fn write_intent(path: &Path, intent: &MergeIntent) -> Result<(), String> {
    let yaml = serde_yml::to_string(intent).map_err(|e| e.to_string())?;
    fs::write(path, yaml).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::identity::InferredSupplier;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Project) {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        (tmp, project)
    }

    fn save_supplier(project: &Project, name: &str) -> Supplier {
        let sup = Supplier::new(name.to_string(), "x@y.be".to_string(), "test".to_string());
        loader::save_record(&project.record_path(&sup.id), &sup).unwrap();
        sup
    }

    fn save_material(project: &Project, supplier: &str) -> Material {
        let mat = Material::new("Paint".to_string(), supplier.to_string(), "test".to_string());
        loader::save_record(&project.record_path(&mat.id), &mat).unwrap();
        mat
    }

    fn load_materials(project: &Project) -> Vec<Material> {
        loader::load_all(&project.record_dir(RecordPrefix::Mat)).unwrap()
    }

    #[test]
    fn test_merge_persisted_source() {
        let (_tmp, project) = setup();
        let source = save_supplier(&project, "Verfgroothandel");
        let target = save_supplier(&project, "Verfgroothandel BV");
        for _ in 0..3 {
            save_material(&project, "Verfgroothandel");
        }
        save_material(&project, "Verfgroothandel BV");

        let outcome = merge_suppliers(
            &project,
            &SupplierIdentity::Persisted(source.clone()),
            &target,
        )
        .unwrap();

        assert_eq!(outcome.materials_migrated, 3);
        assert!(outcome.supplier_deleted);
        assert!(!project.record_path(&source.id).exists());

        let materials = load_materials(&project);
        assert!(materials.iter().all(|m| m.supplier == "Verfgroothandel BV"));
        // journal cleared on completion
        assert!(pending_intents(&project).unwrap().is_empty());
    }

    #[test]
    fn test_merge_inferred_source_deletes_nothing() {
        let (_tmp, project) = setup();
        let target = save_supplier(&project, "Verfwinkel Centraal");
        for _ in 0..3 {
            save_material(&project, "Lokale Verfwinkel");
        }

        let source = SupplierIdentity::Inferred(InferredSupplier {
            name: "Lokale Verfwinkel".to_string(),
        });
        let outcome = merge_suppliers(&project, &source, &target).unwrap();

        assert_eq!(outcome.materials_migrated, 3);
        assert!(!outcome.supplier_deleted);
        assert!(project.record_path(&target.id).exists());
        assert!(load_materials(&project)
            .iter()
            .all(|m| m.supplier == "Verfwinkel Centraal"));
    }

    #[test]
    fn test_merge_rejects_same_persisted_supplier() {
        let (_tmp, project) = setup();
        let sup = save_supplier(&project, "ABC Verf");

        let err = merge_suppliers(&project, &SupplierIdentity::Persisted(sup.clone()), &sup)
            .unwrap_err();
        assert!(matches!(err, MergeError::SourceIsTarget));
        assert!(project.record_path(&sup.id).exists());
    }

    #[test]
    fn test_merge_rejects_inferred_source_with_target_name() {
        let (_tmp, project) = setup();
        let target = save_supplier(&project, "ABC Verf");
        save_material(&project, "ABC Verf");

        let source = SupplierIdentity::Inferred(InferredSupplier {
            name: "ABC Verf".to_string(),
        });
        let err = merge_suppliers(&project, &source, &target).unwrap_err();
        assert!(matches!(err, MergeError::SourceIsTarget));
    }

    #[test]
    fn test_merge_with_no_dependents_still_retires_source() {
        let (_tmp, project) = setup();
        let source = save_supplier(&project, "Verfgroothandel");
        let target = save_supplier(&project, "Verfgroothandel BV");

        let outcome =
            merge_suppliers(&project, &SupplierIdentity::Persisted(source.clone()), &target)
                .unwrap();
        assert_eq!(outcome.materials_migrated, 0);
        assert!(outcome.supplier_deleted);
        assert!(!project.record_path(&source.id).exists());
    }

    #[test]
    fn test_resume_finishes_recorded_remainder() {
        let (_tmp, project) = setup();
        let source = save_supplier(&project, "Verfgroothandel");
        let target = save_supplier(&project, "Verfgroothandel BV");
        let done = save_material(&project, "Verfgroothandel BV"); // already repointed
        let todo = save_material(&project, "Verfgroothandel");

        let intent = MergeIntent {
            id: Ulid::new().to_string(),
            source_name: "Verfgroothandel".to_string(),
            source_id: Some(source.id.clone()),
            target_id: target.id.clone(),
            target_name: target.name.clone(),
            remaining: vec![done.id.clone(), todo.id.clone()],
            started: Utc::now(),
        };
        write_intent(&intent.path(&project), &intent).unwrap();

        let outcome = resume_merge(&project, intent).unwrap();
        assert_eq!(outcome.materials_migrated, 2);
        assert!(outcome.supplier_deleted);
        assert!(load_materials(&project)
            .iter()
            .all(|m| m.supplier == "Verfgroothandel BV"));
        assert!(pending_intents(&project).unwrap().is_empty());
    }

    #[test]
    fn test_resume_fails_when_target_vanished() {
        let (_tmp, project) = setup();
        let source = save_supplier(&project, "Verfgroothandel");
        let gone = RecordId::new(RecordPrefix::Sup);

        let intent = MergeIntent {
            id: Ulid::new().to_string(),
            source_name: "Verfgroothandel".to_string(),
            source_id: Some(source.id.clone()),
            target_id: gone.clone(),
            target_name: "Verfgroothandel BV".to_string(),
            remaining: Vec::new(),
            started: Utc::now(),
        };
        write_intent(&intent.path(&project), &intent).unwrap();

        let err = resume_merge(&project, intent).unwrap_err();
        assert!(matches!(err, MergeError::TargetVanished(id) if id == gone));
        // source untouched, intent kept
        assert!(project.record_path(&source.id).exists());
        assert_eq!(pending_intents(&project).unwrap().len(), 1);
    }

    #[test]
    fn test_partial_failure_keeps_intent_and_applied_work() {
        let (_tmp, project) = setup();
        let source = save_supplier(&project, "Verfgroothandel");
        let target = save_supplier(&project, "Verfgroothandel BV");
        let good = save_material(&project, "Verfgroothandel");
        let bad = save_material(&project, "Verfgroothandel");
        // corrupt one material file so its rewrite fails
        fs::write(project.record_path(&bad.id), "supplier: [unclosed").unwrap();

        let intent = MergeIntent {
            id: Ulid::new().to_string(),
            source_name: "Verfgroothandel".to_string(),
            source_id: Some(source.id.clone()),
            target_id: target.id.clone(),
            target_name: target.name.clone(),
            remaining: vec![good.id.clone(), bad.id.clone()],
            started: Utc::now(),
        };
        write_intent(&intent.path(&project), &intent).unwrap();

        let err = resume_merge(&project, intent).unwrap_err();
        match err {
            MergeError::PartialFailure {
                migrated,
                total,
                failed,
                ..
            } => {
                assert_eq!(migrated, 1);
                assert_eq!(total, 2);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].material, bad.id);
            }
            other => panic!("expected PartialFailure, got {:?}", other),
        }

        // the applied rewrite stands, the source survives, and the intent
        // remains for another resume
        let pending = pending_intents(&project).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].1.remaining, vec![bad.id.clone()]);
        assert!(project.record_path(&source.id).exists());
    }
}

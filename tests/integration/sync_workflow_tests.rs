/*!
 * Marker files synchronized on disk after a document changed
 */

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use stsync::app_config::RepositoryConfig;
use stsync::fix::AddInitialPersistentSubtitleIds;
use stsync::subtitle::{
    AffectedStid, IdInventory, Operation, OperationType, OperationsForFile, OperationsForRepository,
    PersistentIdAllocator, PersistentIdConfig, SubtitleMarkerCsv,
};
use stsync::{CaptionExtractor, SubtitleSync};
use tempfile::TempDir;

use crate::common;

const CONTENT: &str = "content/57/eng57-0001.at";
const MARKERS: &str = "content/57/eng57-0001.subtitle_markers.csv";
const IMPORT: &str = "content/57/eng57-0001.subtitle_import.csv";

fn allocator() -> PersistentIdAllocator {
    PersistentIdAllocator::new(&PersistentIdConfig::default()).unwrap()
}

fn syncer() -> SubtitleSync {
    SubtitleSync::new(CaptionExtractor::default(), allocator(), RepositoryConfig::default()).unwrap()
}

fn text(s: &str) -> Option<String> {
    Some(s.to_string())
}

fn operations(ops: Vec<Operation>) -> OperationsForRepository {
    OperationsForRepository::new("english", "v1", "v2", vec![OperationsForFile::new("0001", "v1", "v2", ops)])
}

fn insert_after_first() -> OperationsForRepository {
    operations(vec![Operation::new(
        "op-1",
        OperationType::Insert,
        vec![AffectedStid::new("new-1", None, text("@inserted line")).with_after_stid(text("1000001"))],
    )
    .unwrap()])
}

/// Repository with one content file holding two subtitles of record r1
fn repository(content: &str) -> Result<(TempDir, PathBuf)> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), CONTENT, content)?;
    let markers = common::create_test_file(
        temp_dir.path(),
        MARKERS,
        &common::marker_file(&[("1000001", "r1"), ("1000002", "r1")]),
    )?;
    Ok((temp_dir, markers))
}

fn load(path: &Path) -> SubtitleMarkerCsv {
    SubtitleMarkerCsv::load(path).unwrap()
}

#[test]
fn test_syncRepository_insertWithImport_shouldRewriteMarkerFile() -> Result<()> {
    let (temp_dir, markers) = repository("@first one\n@inserted line\n@second one\n")?;
    common::create_test_file(temp_dir.path(), IMPORT, &common::import_file(3))?;
    let mut inventory = IdInventory::in_memory("1000001\n1000002\n");

    let report = syncer().sync_repository(temp_dir.path(), &insert_after_first(), &mut inventory)?;

    assert!(report.is_complete());
    assert_eq!(report.synced, vec![markers.clone()]);

    let updated = load(&markers);
    assert!(!updated.is_legacy());
    let ids = updated.persistent_ids();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], "1000001");
    assert_eq!(ids[2], "1000002");
    assert!(inventory.contents().lines().any(|line| line == ids[1]));

    let rows = updated.rows();
    assert!(rows.iter().all(|r| r.record_id.as_deref() == Some("r1")));
    assert_eq!(rows[1].relative_milliseconds, 1500);
    assert_eq!(rows[1].char_length, "inserted line".len());
    Ok(())
}

#[test]
fn test_syncRepository_countMismatch_shouldReportAndKeepMarkerFile() -> Result<()> {
    let (temp_dir, markers) = repository("@first one\n@inserted line\n@second one\n")?;
    common::create_test_file(temp_dir.path(), IMPORT, &common::import_file(2))?;
    let before = fs::read_to_string(&markers)?;
    let mut inventory = IdInventory::in_memory("1000001\n1000002\n");

    let report = syncer().sync_repository(temp_dir.path(), &insert_after_first(), &mut inventory)?;

    assert!(!report.is_complete());
    assert!(report.synced.is_empty());
    assert!(report.failures[0].path.ends_with("eng57-0001.at"));
    assert_eq!(fs::read_to_string(&markers)?, before);
    assert_eq!(inventory.contents(), "1000001\n1000002\n");
    Ok(())
}

#[test]
fn test_syncRepository_fileWithoutOperations_shouldBeSkipped() -> Result<()> {
    let (temp_dir, _) = repository("@first one\n@inserted line\n@second one\n")?;
    common::create_test_file(temp_dir.path(), IMPORT, &common::import_file(3))?;
    common::create_test_file(temp_dir.path(), "content/57/eng57-0002.at", "@untouched\n")?;
    common::create_test_file(temp_dir.path(), "notes/readme-0003.md", "@not content\n")?;
    let mut inventory = IdInventory::in_memory("1000001\n1000002\n");

    let report = syncer().sync_repository(temp_dir.path(), &insert_after_first(), &mut inventory)?;

    assert_eq!(report.synced.len(), 1);
    assert_eq!(report.skipped, 1);
    assert!(report.is_complete());
    Ok(())
}

#[test]
fn test_syncRepository_contentChangeWithoutImport_shouldKeepTimings() -> Result<()> {
    let (temp_dir, markers) = repository("@first one\n@second one, longer now\n")?;
    let ops = operations(vec![Operation::new(
        "op-1",
        OperationType::ContentChange,
        vec![AffectedStid::new("1000002", text("@second one"), text("@second one, longer now"))],
    )
    .unwrap()]);
    let mut inventory = IdInventory::in_memory("1000001\n1000002\n");

    let report = syncer().sync_repository(temp_dir.path(), &ops, &mut inventory)?;

    assert!(report.is_complete());
    let rows = load(&markers).rows().to_vec();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].relative_milliseconds, 1000);
    assert_eq!(rows[1].sample_count, 44100);
    assert_eq!(rows[1].char_length, "second one, longer now".len());
    assert_eq!(rows[1].persistent_id.as_deref(), Some("1000002"));
    assert_eq!(inventory.contents(), "1000001\n1000002\n");
    Ok(())
}

#[test]
fn test_syncRepository_insertWithoutImport_shouldFail() -> Result<()> {
    let (temp_dir, markers) = repository("@first one\n@inserted line\n@second one\n")?;
    let before = fs::read_to_string(&markers)?;
    let mut inventory = IdInventory::in_memory("1000001\n1000002\n");

    let report = syncer().sync_repository(temp_dir.path(), &insert_after_first(), &mut inventory)?;

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.contains("subtitle import"));
    assert_eq!(fs::read_to_string(&markers)?, before);
    Ok(())
}

#[test]
fn test_syncRepository_legacyMarkerFile_shouldAskForInitialIds() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), CONTENT, "@first one\n@inserted line\n@second one\n")?;
    common::create_test_file(temp_dir.path(), MARKERS, &common::import_file(2))?;
    common::create_test_file(temp_dir.path(), IMPORT, &common::import_file(3))?;
    let mut inventory = IdInventory::in_memory("1000001\n1000002\n");

    let report = syncer().sync_repository(temp_dir.path(), &insert_after_first(), &mut inventory)?;

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.contains("assign initial ids first"));
    Ok(())
}

#[test]
fn test_initialIds_thenSync_shouldKeepAssignedIds() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let inventory_path = temp_dir.path().join("ids.txt");
    let content = common::create_test_file(
        temp_dir.path(),
        CONTENT,
        "^^^ {: .rid #rid-r1}\n\n@first one\n\n^^^ {: .rid #rid-r2}\n\n@second one\n",
    )?;
    let markers = common::create_test_file(temp_dir.path(), MARKERS, &common::import_file(2))?;

    let fixer = AddInitialPersistentSubtitleIds::new(CaptionExtractor::default(), allocator());
    let assigned = fixer.run_for_file(&content, ".subtitle_markers.csv", &mut IdInventory::open(&inventory_path)?)?;

    assert_eq!(assigned, 2);
    let initial = load(&markers);
    let rids: Vec<Option<&str>> = initial.rows().iter().map(|r| r.record_id.as_deref()).collect();
    assert_eq!(rids, vec![Some("r1"), Some("r2")]);
    assert_eq!(
        fs::read_to_string(&inventory_path)?.lines().collect::<Vec<_>>(),
        initial.persistent_ids()
    );

    let again = fixer.run_for_file(&content, ".subtitle_markers.csv", &mut IdInventory::open(&inventory_path)?);
    assert!(again.is_err());
    assert_eq!(load(&markers), initial);
    Ok(())
}

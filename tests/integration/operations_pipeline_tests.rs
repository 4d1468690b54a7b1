/*!
 * Operations computed end to end from a version control collaborator
 */

use std::collections::HashMap;

use anyhow::Result;
use regex::Regex;
use stsync::compute::{OperationComputerConfig, SubtitleOperationsForFile, SubtitleOperationsForRepository};
use stsync::subtitle::{OperationType, OperationsForRepository};
use stsync::vcs::CachedVersionControl;
use stsync::CaptionConfig;

use crate::common::{self, MockVersionControl};

const OLD_TEXT: &str = "@first caption here\n@second caption here\n@third caption here\n";
const NEW_TEXT: &str = "@first caption here\n@second caption changed\n@third caption here\n@fourth caption added\n";

const DIFF: &str = "\
diff --git a/content/eng-0001.at b/content/eng-0001.at
--- a/content/eng-0001.at
+++ b/content/eng-0001.at
@@ -2 +2 @@
-@second caption here
+@second caption changed
@@ -3,0 +4 @@
+@fourth caption added
diff --git a/notes/todo.md b/notes/todo.md
--- a/notes/todo.md
+++ b/notes/todo.md
@@ -1 +1 @@
-old
+new
";

fn mock() -> MockVersionControl {
    MockVersionControl::new("english", DIFF)
        .with_blob("content/eng-0001.at", "v1", OLD_TEXT)
        .with_blob("content/eng-0001.at", "v2", NEW_TEXT)
}

fn runner(vcs: CachedVersionControl<MockVersionControl>) -> SubtitleOperationsForRepository<CachedVersionControl<MockVersionControl>> {
    SubtitleOperationsForRepository::new(
        vcs,
        SubtitleOperationsForFile::new(CaptionConfig::default(), OperationComputerConfig::default()),
        Regex::new(r"^content/.+\d{4}\.at$").unwrap(),
    )
}

fn existing_stids() -> HashMap<String, Vec<String>> {
    let mut stids = HashMap::new();
    stids.insert(
        "0001".to_string(),
        vec!["1000001".to_string(), "1000002".to_string(), "1000003".to_string()],
    );
    stids
}

#[tokio::test]
async fn test_compute_withExistingStids_shouldReferencePersistentIds() -> Result<()> {
    let runner = runner(CachedVersionControl::new(mock())).with_existing_stids(existing_stids());

    let result = runner.compute("v1", "v2").await?;

    assert!(result.is_complete());
    let ops = result.operations.for_file("0001").expect("operations for 0001");
    let types: Vec<OperationType> = ops.operations.iter().map(|o| o.operation_type()).collect();
    assert_eq!(types, vec![OperationType::ContentChange, OperationType::Insert]);

    let change = &ops.operations[0].affected_stids()[0];
    assert_eq!(change.stid, "1000002");
    assert_eq!(change.before.as_deref(), Some("@second caption here"));
    assert_eq!(change.after.as_deref(), Some("@second caption changed"));

    let insert = &ops.operations[1].affected_stids()[0];
    assert_eq!(insert.after_stid.as_deref(), Some("1000003"));
    assert_eq!(ops.subtitles_count_delta(), 1);
    Ok(())
}

#[tokio::test]
async fn test_compute_withoutExistingStids_shouldUsePlaceholders() -> Result<()> {
    let result = runner(CachedVersionControl::new(mock())).compute("v1", "v2").await?;

    let ops = &result.operations.operations_for_files[0];
    assert_eq!(ops.operations[0].affected_stids()[0].stid, "tmp-1");
    assert_eq!(ops.operations[1].affected_stids()[0].after_stid.as_deref(), Some("tmp-2"));
    Ok(())
}

#[tokio::test]
async fn test_compute_nonContentFiles_shouldNeverBeFetched() -> Result<()> {
    let mock = mock();
    let log = mock.request_log();

    let result = runner(CachedVersionControl::new(mock)).compute("v1", "v2").await?;

    assert_eq!(result.operations.operations_for_files.len(), 1);
    let requested: Vec<String> = log.lock().iter().map(|(path, _)| path.clone()).collect();
    assert!(requested.iter().all(|path| path == "content/eng-0001.at"));
    assert_eq!(requested.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_compute_twice_shouldServeBlobsFromCache() -> Result<()> {
    let mock = mock();
    let log = mock.request_log();
    let runner = runner(CachedVersionControl::new(mock));

    let first = runner.compute("v1", "v2").await?;
    let second = runner.compute("v1", "v2").await?;

    assert_eq!(first.operations.operations_count(), second.operations.operations_count());
    assert_eq!(log.lock().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_save_computedOperations_shouldReloadIdentically() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("subtitle_operations.json");
    let result = runner(CachedVersionControl::new(mock()))
        .with_existing_stids(existing_stids())
        .compute("v1", "v2")
        .await?;

    result.operations.save(&path)?;
    let loaded = OperationsForRepository::load(&path)?;

    assert_eq!(loaded, result.operations);
    assert_eq!(loaded.repository_name, "english");
    assert_eq!(loaded.from_revision, "v1");
    assert_eq!(loaded.operations_count(), 2);

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(json["repository"], "english");
    assert_eq!(json["fromGitCommit"], "v1");
    assert_eq!(json["toGitCommit"], "v2");
    Ok(())
}

#[test]
fn test_compute_missingBlob_shouldReportFailure() -> Result<()> {
    let mock = MockVersionControl::new("english", DIFF).with_blob("content/eng-0001.at", "v1", OLD_TEXT);
    let runner = runner(CachedVersionControl::new(mock));

    let result = tokio_test::block_on(async { runner.compute("v1", "v2").await })?;

    assert!(!result.is_complete());
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].path, "content/eng-0001.at");
    assert!(result.operations.operations_for_files.is_empty());
    Ok(())
}

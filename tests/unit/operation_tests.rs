/*!
 * Tests for subtitle operations
 */

use stsync::errors::OperationError;
use stsync::subtitle::{AffectedStid, Operation, OperationType, OperationsForFile};

fn text(s: &str) -> Option<String> {
    Some(s.to_string())
}

/// One valid operation of every type
fn one_of_each() -> Vec<Operation> {
    vec![
        Operation::new(
            "op-content",
            OperationType::ContentChange,
            vec![AffectedStid::new("1000001", text("@old words"), text("@new words"))],
        )
        .unwrap(),
        Operation::new(
            "op-insert",
            OperationType::Insert,
            vec![AffectedStid::new("new-1", None, text("@added")).with_after_stid(text("1000001"))],
        )
        .unwrap(),
        Operation::new(
            "op-delete",
            OperationType::Delete,
            vec![AffectedStid::new("1000002", text("@removed"), None)],
        )
        .unwrap(),
        Operation::new(
            "op-merge",
            OperationType::Merge,
            vec![
                AffectedStid::new("1000003", text("@first"), text("@first second")),
                AffectedStid::new("1000004", text("@second"), None),
            ],
        )
        .unwrap(),
        Operation::new(
            "op-split",
            OperationType::Split,
            vec![
                AffectedStid::new("1000005", text("@one two"), text("@one")),
                AffectedStid::new("new-2", None, text("@two")),
            ],
        )
        .unwrap(),
        Operation::new(
            "op-left",
            OperationType::MoveLeft,
            vec![
                AffectedStid::new("1000006", text("@a b"), text("@a b c")),
                AffectedStid::new("1000007", text("@c d"), text("@d")),
            ],
        )
        .unwrap(),
        Operation::new(
            "op-right",
            OperationType::MoveRight,
            vec![
                AffectedStid::new("1000008", text("@a b c"), text("@a b")),
                AffectedStid::new("1000009", text("@d"), text("@c d")),
            ],
        )
        .unwrap(),
    ]
}

#[test]
fn test_decode_encodedOperationOfEveryType_shouldRoundtrip() {
    let ops = one_of_each();
    assert_eq!(ops.len(), OperationType::ALL.len());

    for op in ops {
        assert_eq!(Operation::decode(&op.encode()).unwrap(), op);
        assert_eq!(Operation::from_json(&op.to_json()).unwrap(), op);
    }
}

#[test]
fn test_inverse_appliedTwice_shouldRestoreOperation() {
    for op in one_of_each() {
        let inverse = op.inverse();
        assert_eq!(inverse.operation_type(), op.operation_type().inverse());
        assert_eq!(inverse.inverse(), op);
    }
}

#[test]
fn test_inverse_insert_shouldBeDeleteWithSwappedText() {
    let insert = &one_of_each()[1];
    let delete = insert.inverse();

    assert_eq!(delete.operation_type(), OperationType::Delete);
    assert_ne!(delete.operation_id(), insert.operation_id());
    let record = &delete.affected_stids()[0];
    assert_eq!(record.stid, "new-1");
    assert_eq!(record.before.as_deref(), Some("@added"));
    assert_eq!(record.after, None);
}

#[test]
fn test_encode_shouldUseWireKeys() {
    let value = one_of_each()[1].encode();

    assert_eq!(value["operationId"], "op-insert");
    assert_eq!(value["operationType"], "insert");
    assert_eq!(value["affectedStids"][0]["stid"], "new-1");
    assert_eq!(value["affectedStids"][0]["afterStid"], "1000001");
}

#[test]
fn test_new_insertWithBefore_shouldFailShapeValidation() {
    let result = Operation::new(
        "bad",
        OperationType::Insert,
        vec![AffectedStid::new("x", text("@before"), text("@after"))],
    );
    assert!(matches!(result, Err(OperationError::InvalidOperationShape { .. })));
}

#[test]
fn test_decode_unknownType_shouldFail() {
    let value = serde_json::json!({
        "operationId": "x",
        "operationType": "teleport",
        "affectedStids": [{"stid": "1", "before": "@a", "after": "@b"}]
    });
    assert!(matches!(
        Operation::decode(&value),
        Err(OperationError::UnknownOperationType(_))
    ));
}

#[test]
fn test_subtitlesCountDelta_perOperationType_shouldMatchRecords() {
    let deltas: Vec<i64> = one_of_each().iter().map(Operation::subtitles_count_delta).collect();
    assert_eq!(deltas, vec![0, 1, -1, -1, 1, 0, 0]);

    let all = OperationsForFile::new("0001", "a", "b", one_of_each());
    assert_eq!(all.subtitles_count_delta(), 0);
    assert!(all.adds_or_removes_subtitles());
}

/*!
 * Subtitle operations.
 *
 * An operation explains how one or more subtitles changed between two
 * revisions of a document. Operations are immutable once constructed; the
 * constructor validates the affected records against the shape each
 * operation type requires:
 *
 * | type          | records | shape                                              |
 * |---------------|---------|----------------------------------------------------|
 * | insert        | 1       | before = none, after = text                        |
 * | delete        | 1       | before = text, after = none                        |
 * | contentChange | 1       | before and after present and different             |
 * | merge         | >= 2    | all before present, one after, last after = none   |
 * | split         | >= 2    | all after present, one before, last before = none  |
 * | moveLeft/Right| 2       | before and after present on both                   |
 */

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::OperationError;

/// Suffix that marks the id of an inverted operation
const INVERSE_ID_SUFFIX: &str = ":inverse";

/// The seven kinds of subtitle operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationType {
    ContentChange,
    Insert,
    Delete,
    Merge,
    Split,
    MoveLeft,
    MoveRight,
}

impl OperationType {
    /// All operation types, in encoding order
    pub const ALL: [OperationType; 7] = [
        Self::ContentChange,
        Self::Insert,
        Self::Delete,
        Self::Merge,
        Self::Split,
        Self::MoveLeft,
        Self::MoveRight,
    ];

    /// The encoded name of this type
    pub fn name(&self) -> &'static str {
        match self {
            Self::ContentChange => "contentChange",
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Merge => "merge",
            Self::Split => "split",
            Self::MoveLeft => "moveLeft",
            Self::MoveRight => "moveRight",
        }
    }

    /// The dual operation type
    pub fn inverse(&self) -> Self {
        match self {
            Self::ContentChange => Self::ContentChange,
            Self::Insert => Self::Delete,
            Self::Delete => Self::Insert,
            Self::Merge => Self::Split,
            Self::Split => Self::Merge,
            Self::MoveLeft => Self::MoveRight,
            Self::MoveRight => Self::MoveLeft,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OperationType {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|t| t.name() == s)
            .copied()
            .ok_or_else(|| OperationError::UnknownOperationType(s.to_string()))
    }
}

/// A subtitle touched by an operation, with its text before and after
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedStid {
    /// Subtitle reference; may be a placeholder pending allocation
    pub stid: String,

    /// Text before the operation, none for newly created subtitles
    pub before: Option<String>,

    /// Text after the operation, none for removed subtitles
    pub after: Option<String>,

    /// Subtitle the affected one follows, used to position new identities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_stid: Option<String>,
}

impl AffectedStid {
    /// Create an affected record
    pub fn new(stid: impl Into<String>, before: Option<String>, after: Option<String>) -> Self {
        Self {
            stid: stid.into(),
            before,
            after,
            after_stid: None,
        }
    }

    /// Set the subtitle this record follows
    pub fn with_after_stid(mut self, after_stid: Option<String>) -> Self {
        self.after_stid = after_stid;
        self
    }

    /// Record with before and after swapped
    fn swapped(&self) -> Self {
        Self {
            stid: self.stid.clone(),
            before: self.after.clone(),
            after: self.before.clone(),
            after_stid: self.after_stid.clone(),
        }
    }
}

/// Wire representation used for persistence and transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncodedOperation {
    operation_id: String,
    operation_type: String,
    affected_stids: Vec<AffectedStid>,
}

/// A validated, immutable subtitle operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "EncodedOperation", try_from = "EncodedOperation")]
pub struct Operation {
    operation_id: String,
    operation_type: OperationType,
    affected_stids: Vec<AffectedStid>,
}

impl Operation {
    /// Create an operation, validating the affected records against the type's shape
    pub fn new(
        operation_id: impl Into<String>,
        operation_type: OperationType,
        affected_stids: Vec<AffectedStid>,
    ) -> Result<Self, OperationError> {
        validate_shape(operation_type, &affected_stids)?;
        Ok(Self {
            operation_id: operation_id.into(),
            operation_type,
            affected_stids,
        })
    }

    /// Opaque operation id
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Operation type
    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    /// Affected records in document order
    pub fn affected_stids(&self) -> &[AffectedStid] {
        &self.affected_stids
    }

    /// Net change in subtitle count caused by this operation
    pub fn subtitles_count_delta(&self) -> i64 {
        let extra = self.affected_stids.len() as i64 - 1;
        match self.operation_type {
            OperationType::Insert => 1,
            OperationType::Delete => -1,
            OperationType::Merge => -extra,
            OperationType::Split => extra,
            OperationType::ContentChange | OperationType::MoveLeft | OperationType::MoveRight => 0,
        }
    }

    /// Whether this operation adds or removes subtitles
    pub fn adds_or_removes_subtitles(&self) -> bool {
        matches!(
            self.operation_type,
            OperationType::Insert | OperationType::Delete | OperationType::Merge | OperationType::Split
        )
    }

    /// The dual operation: before and after swapped on every record.
    ///
    /// Inverting twice yields the original operation.
    pub fn inverse(&self) -> Operation {
        Operation {
            operation_id: inverse_operation_id(&self.operation_id),
            operation_type: self.operation_type.inverse(),
            affected_stids: self.affected_stids.iter().map(AffectedStid::swapped).collect(),
        }
    }

    /// Encode as a key/value structure
    pub fn encode(&self) -> serde_json::Value {
        serde_json::json!({
            "operationId": self.operation_id,
            "operationType": self.operation_type.name(),
            "affectedStids": self.affected_stids,
        })
    }

    /// Decode from a key/value structure, validating the shape
    pub fn decode(value: &serde_json::Value) -> Result<Self, OperationError> {
        let encoded: EncodedOperation = serde_json::from_value(value.clone())
            .map_err(|e| OperationError::Decode(e.to_string()))?;
        Self::try_from(encoded)
    }

    /// Encode as a JSON string
    pub fn to_json(&self) -> String {
        self.encode().to_string()
    }

    /// Decode from a JSON string
    pub fn from_json(json: &str) -> Result<Self, OperationError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| OperationError::Decode(e.to_string()))?;
        Self::decode(&value)
    }
}

impl From<Operation> for EncodedOperation {
    fn from(op: Operation) -> Self {
        Self {
            operation_id: op.operation_id,
            operation_type: op.operation_type.name().to_string(),
            affected_stids: op.affected_stids,
        }
    }
}

impl TryFrom<EncodedOperation> for Operation {
    type Error = OperationError;

    fn try_from(encoded: EncodedOperation) -> Result<Self, Self::Error> {
        let operation_type = encoded.operation_type.parse()?;
        Operation::new(encoded.operation_id, operation_type, encoded.affected_stids)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stids: Vec<&str> = self.affected_stids.iter().map(|a| a.stid.as_str()).collect();
        write!(f, "{} [{}]", self.operation_type, stids.join(", "))
    }
}

fn inverse_operation_id(id: &str) -> String {
    if id.is_empty() {
        return String::new();
    }
    match id.strip_suffix(INVERSE_ID_SUFFIX) {
        Some(original) => original.to_string(),
        None => format!("{}{}", id, INVERSE_ID_SUFFIX),
    }
}

fn validate_shape(operation_type: OperationType, records: &[AffectedStid]) -> Result<(), OperationError> {
    let invalid = |reason: String| {
        Err(OperationError::InvalidOperationShape {
            operation_type: operation_type.to_string(),
            reason,
        })
    };

    if records.is_empty() {
        return invalid("no affected records".to_string());
    }
    if let Some(idx) = records.iter().position(|r| r.before.is_none() && r.after.is_none()) {
        return invalid(format!("record {} has neither before nor after", idx));
    }

    let befores = records.iter().filter(|r| r.before.is_some()).count();
    let afters = records.iter().filter(|r| r.after.is_some()).count();
    let count = records.len();
    let last = &records[count - 1];

    match operation_type {
        OperationType::Insert => {
            if count != 1 || befores != 0 {
                return invalid(format!("expected 1 record without before, got {} records", count));
            }
        }
        OperationType::Delete => {
            if count != 1 || afters != 0 {
                return invalid(format!("expected 1 record without after, got {} records", count));
            }
        }
        OperationType::ContentChange => {
            if count != 1 || befores != 1 || afters != 1 {
                return invalid(format!("expected 1 record with before and after, got {} records", count));
            }
            if records[0].before == records[0].after {
                return invalid("before and after are identical".to_string());
            }
        }
        OperationType::Merge => {
            if count < 2 {
                return invalid(format!("expected at least 2 records, got {}", count));
            }
            if befores != count {
                return invalid("every merged record needs before text".to_string());
            }
            if afters != 1 || last.after.is_some() {
                return invalid("exactly one record other than the last carries the merged text".to_string());
            }
        }
        OperationType::Split => {
            if count < 2 {
                return invalid(format!("expected at least 2 records, got {}", count));
            }
            if afters != count {
                return invalid("every split record needs after text".to_string());
            }
            if befores != 1 || last.before.is_some() {
                return invalid("exactly one record other than the last carries the original text".to_string());
            }
        }
        OperationType::MoveLeft | OperationType::MoveRight => {
            if count != 2 || befores != 2 || afters != 2 {
                return invalid(format!(
                    "expected 2 records with before and after, got {} records",
                    count
                ));
            }
        }
    }

    Ok(())
}

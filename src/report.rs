//! # Result Reporting
//!
//! Turns bulk and single-item results into the uniform shapes handed to the
//! request layer. Reporting is lossless: every failed item keeps its index,
//! error kind and details.

use serde::Serialize;
use serde_json::Value;

use crate::bulk::{Applied, BulkOutcome};
use crate::error::{ErrorKind, LibraryError, LibraryResult};
use crate::records::Record;

/// Whether a bulk batch fully succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Complete,
    Partial,
}

/// One failed bulk item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureEntry {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub error: ErrorKind,
    pub details: String,
}

/// Caller-facing shape of a bulk batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkReport {
    pub message: String,
    pub operation: &'static str,
    pub status: ReportStatus,
    pub succeeded: usize,
    pub failed: usize,
    pub data: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FailureEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl BulkReport {
    pub fn is_partial(&self) -> bool {
        self.status == ReportStatus::Partial
    }
}

/// Caller-facing shape of a single-item operation
#[derive(Debug, Clone, PartialEq)]
pub enum SingleReport {
    /// The record, or a deletion receipt
    Done(Value),
    NotFound(String),
    Conflict(String),
    BadInput(String),
    Unavailable(String),
}

/// Record listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListReport {
    pub count: usize,
    pub data: Vec<Value>,
}

/// Builds reports from outcomes
pub struct ResultReporter;

impl ResultReporter {
    /// Report a bulk batch; `Partial` as soon as one item failed
    pub fn bulk(outcome: &BulkOutcome) -> BulkReport {
        let data: Vec<Value> = outcome.succeeded().map(Applied::to_json).collect();
        let errors: Vec<FailureEntry> = outcome
            .outcomes
            .iter()
            .filter_map(|o| {
                o.result.as_ref().err().map(|e| FailureEntry {
                    index: o.index,
                    id: o.id,
                    error: e.kind(),
                    details: e.to_string(),
                })
            })
            .collect();

        let status = if errors.is_empty() {
            ReportStatus::Complete
        } else {
            ReportStatus::Partial
        };

        BulkReport {
            message: format!("{} {} completed", outcome.kind, outcome.operation),
            operation: outcome.operation.as_str(),
            status,
            succeeded: data.len(),
            failed: errors.len(),
            data,
            errors,
            aborted: outcome.aborted.clone(),
        }
    }

    /// Collapse a single-item result
    pub fn single(result: LibraryResult<Applied>) -> SingleReport {
        match result {
            Ok(applied) => SingleReport::Done(applied.to_json()),
            Err(err) => Self::error(&err),
        }
    }

    /// Map an error to its distinguished signal
    pub fn error(err: &LibraryError) -> SingleReport {
        let details = err.to_string();
        match err.kind() {
            ErrorKind::ValidationFailed => SingleReport::BadInput(details),
            ErrorKind::NotFound => SingleReport::NotFound(details),
            ErrorKind::DuplicateKey => SingleReport::Conflict(details),
            ErrorKind::StorageUnavailable => SingleReport::Unavailable(details),
        }
    }

    pub fn list(records: &[Record]) -> ListReport {
        ListReport {
            count: records.len(),
            data: records.iter().map(Record::to_json).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::{BulkOperation, ItemOutcome};
    use crate::records::{EntityKind, NewRecord};
    use chrono::Utc;
    use serde_json::json;

    fn stored(id: u64, title: &str) -> LibraryResult<Applied> {
        let fields = json!({ "title": title }).as_object().cloned().unwrap();
        Ok(Applied::Stored(Record::stamped(
            NewRecord::new(EntityKind::Songs, id, fields),
            Utc::now(),
        )))
    }

    fn batch(results: Vec<LibraryResult<Applied>>) -> BulkOutcome {
        BulkOutcome {
            kind: EntityKind::Songs,
            operation: BulkOperation::Create,
            outcomes: results
                .into_iter()
                .enumerate()
                .map(|(index, result)| ItemOutcome {
                    index,
                    id: None,
                    result,
                })
                .collect(),
            aborted: None,
        }
    }

    #[test]
    fn test_full_success_has_no_errors() {
        let report = ResultReporter::bulk(&batch(vec![stored(1, "A"), stored(2, "B")]));

        assert_eq!(report.status, ReportStatus::Complete);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 0);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("errors").is_none());
        assert_eq!(json["message"], "songs create completed");
    }

    #[test]
    fn test_partial_keeps_index_and_details() {
        let report = ResultReporter::bulk(&batch(vec![
            stored(1, "A"),
            Err(LibraryError::DuplicateKey {
                field: "title".to_string(),
                value: "A".to_string(),
            }),
        ]));

        assert!(report.is_partial());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].index, 1);
        assert_eq!(report.errors[0].error, ErrorKind::DuplicateKey);
        assert!(report.errors[0].details.contains("title"));
    }

    #[test]
    fn test_all_failed_is_still_a_report() {
        let report = ResultReporter::bulk(&batch(vec![
            Err(LibraryError::validation("title is required")),
            Err(LibraryError::validation("title is required")),
        ]));

        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 2);
        assert!(report.data.is_empty());
    }

    #[test]
    fn test_single_collapse() {
        assert!(matches!(
            ResultReporter::single(stored(1, "A")),
            SingleReport::Done(ref v) if v["songId"] == 1
        ));
        assert!(matches!(
            ResultReporter::single(Err(LibraryError::NotFound {
                kind: EntityKind::Songs,
                id: 1
            })),
            SingleReport::NotFound(_)
        ));
        assert!(matches!(
            ResultReporter::single(Err(LibraryError::validation("bad"))),
            SingleReport::BadInput(_)
        ));
        assert!(matches!(
            ResultReporter::single(Err(LibraryError::unavailable("down"))),
            SingleReport::Unavailable(_)
        ));
    }
}

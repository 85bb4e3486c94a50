use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TranscriptSegment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Any well-formed UUID parses; ids this service never issued are simply not found.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Derived from what is on disk for a job, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[serde(rename = "ok")]
    Done,
    Pending,
    NotFound,
    #[serde(rename = "invalid_task_id")]
    InvalidId,
}

impl JobStatus {
    pub fn from_presence(result_exists: bool, input_exists: bool) -> Self {
        match (result_exists, input_exists) {
            (true, _) => JobStatus::Done,
            (false, true) => JobStatus::Pending,
            (false, false) => JobStatus::NotFound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobOutcome {
    Completed(Vec<TranscriptSegment>),
    Failed { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_garbage_but_accepts_any_uuid_version() {
        assert!(JobId::parse("not-a-uuid").is_none());
        assert!(JobId::parse("6f1c1f2e-8a43").is_none());
        let id = JobId::generate();
        assert_eq!(JobId::parse(&id.to_string()), Some(id));

        let nil = JobId::parse("00000000-0000-0000-0000-000000000000").expect("nil uuid parses");
        assert_eq!(nil.to_string(), "00000000-0000-0000-0000-000000000000");
        let v1 = JobId::parse(" C232AB00-9414-11EC-B3C8-9F6BDECED846 ").expect("v1 uuid parses");
        assert_eq!(v1.to_string(), "c232ab00-9414-11ec-b3c8-9f6bdeced846");
    }

    #[test]
    fn status_serializes_to_wire_names() {
        assert_eq!(serde_json::to_string(&JobStatus::Done).unwrap(), "\"ok\"");
        assert_eq!(serde_json::to_string(&JobStatus::Pending).unwrap(), "\"pending\"");
        assert_eq!(serde_json::to_string(&JobStatus::NotFound).unwrap(), "\"not_found\"");
        assert_eq!(
            serde_json::to_string(&JobStatus::InvalidId).unwrap(),
            "\"invalid_task_id\""
        );
    }

    #[test]
    fn result_presence_wins_over_input() {
        assert_eq!(JobStatus::from_presence(true, true), JobStatus::Done);
        assert_eq!(JobStatus::from_presence(false, true), JobStatus::Pending);
        assert_eq!(JobStatus::from_presence(false, false), JobStatus::NotFound);
    }

    #[test]
    fn failed_outcome_reads_back_as_error_object() {
        let outcome: JobOutcome = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert_eq!(outcome, JobOutcome::Failed { error: "boom".into() });
        let empty: JobOutcome = serde_json::from_str("[]").unwrap();
        assert_eq!(empty, JobOutcome::Completed(Vec::new()));
    }
}

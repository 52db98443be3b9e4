use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{Phase, Submissions};
use crate::storage::{self, Storage, StorageError};

const PROGRESS_KEY_PREFIX: &str = "linguistics_lab_progress_";

/// Durable resume state for one learner.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub student_name: String,
    #[serde(default)]
    pub submissions: Submissions,
    #[serde(default)]
    pub current_question_index: usize,
    #[serde(default = "resume_phase")]
    pub current_step: Phase,
    pub updated_at: DateTime<Utc>,
}

fn resume_phase() -> Phase {
    Phase::InProgress
}

/// Trims, lowercases and collapses inner whitespace so "  Ada  Lovelace" and
/// "ada lovelace" share one record.
pub fn normalize_identity(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn progress_key(name: &str) -> String {
    format!("{}{}", PROGRESS_KEY_PREFIX, normalize_identity(name))
}

#[derive(Clone)]
pub struct ProgressStore {
    storage: Arc<dyn Storage>,
}

impl ProgressStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn load(&self, name: &str) -> Option<ProgressRecord> {
        storage::read_json(self.storage.as_ref(), &progress_key(name))
    }

    pub fn save(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        storage::write_json(
            self.storage.as_ref(),
            &progress_key(&record.student_name),
            record,
        )
    }

    pub fn clear(&self, name: &str) -> Result<(), StorageError> {
        self.storage.remove(&progress_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fixtures::graded;
    use crate::quiz::Submission;
    use crate::storage::MemoryStore;

    fn record(name: &str) -> ProgressRecord {
        let mut submissions = Submissions::new();
        submissions.insert("q1".into(), graded("q1", "language shapes thought", 3.0));
        submissions.insert(
            "q2".into(),
            Submission {
                answer: "half written".into(),
                ..Submission::new("q2")
            },
        );

        ProgressRecord {
            student_name: name.to_string(),
            submissions,
            current_question_index: 1,
            current_step: Phase::InProgress,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn identity_normalization_is_case_and_whitespace_blind() {
        assert_eq!(normalize_identity("  Ada\tLovelace  "), "ada lovelace");
        assert_eq!(progress_key("ADA  lovelace"), progress_key("ada lovelace"));
    }

    #[test]
    fn saved_record_loads_back_identically() {
        let store = ProgressStore::new(Arc::new(MemoryStore::new()));
        let saved = record("Ada");
        store.save(&saved).unwrap();

        let loaded = store.load(" ada ").unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(
            serde_json::to_string(&loaded).unwrap(),
            serde_json::to_string(&saved).unwrap()
        );
    }

    #[test]
    fn clear_forgets_the_record() {
        let store = ProgressStore::new(Arc::new(MemoryStore::new()));
        store.save(&record("Ada")).unwrap();
        store.clear("ADA").unwrap();
        assert_eq!(store.load("Ada"), None);
    }

    #[test]
    fn malformed_record_is_discarded() {
        let storage = Arc::new(MemoryStore::new());
        storage.write(&progress_key("ada"), "{\"studentName\": 4").unwrap();

        let store = ProgressStore::new(storage);
        assert_eq!(store.load("ada"), None);
    }

    #[test]
    fn sparse_record_defaults_to_quiz_start() {
        let storage = Arc::new(MemoryStore::new());
        storage
            .write(
                &progress_key("ada"),
                r#"{"studentName":"Ada","updatedAt":"2026-01-01T00:00:00Z"}"#,
            )
            .unwrap();

        let loaded = ProgressStore::new(storage).load("ada").unwrap();
        assert!(loaded.submissions.is_empty());
        assert_eq!(loaded.current_question_index, 0);
        assert_eq!(loaded.current_step, Phase::InProgress);
    }
}

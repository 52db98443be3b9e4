use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{max_score, total_score, Question, Submissions};
use crate::storage::{self, Storage};

const ROSTER_KEY: &str = "linguistics_lab_sessions";

/// Frozen snapshot of one completed attempt.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerSession {
    pub id: String,
    pub student_name: String,
    pub timestamp: DateTime<Utc>,
    pub submissions: Submissions,
    pub total_score: f64,
    pub max_score: u32,
}

/// Append-only list of completed attempts, newest first.
#[derive(Clone)]
pub struct Roster {
    storage: Arc<dyn Storage>,
}

impl Roster {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn sessions(&self) -> Vec<LearnerSession> {
        storage::read_json(self.storage.as_ref(), ROSTER_KEY).unwrap_or_default()
    }

    /// Snapshots an attempt and prepends it. Every call appends a new entry,
    /// duplicates included.
    pub fn complete(
        &self,
        learner: &str,
        submissions: &Submissions,
        questions: &[Question],
    ) -> LearnerSession {
        let session = LearnerSession {
            id: Uuid::new_v4().to_string(),
            student_name: learner.to_string(),
            timestamp: Utc::now(),
            submissions: submissions.clone(),
            total_score: total_score(questions, submissions),
            max_score: max_score(questions),
        };

        let mut sessions = self.sessions();
        sessions.insert(0, session.clone());
        if let Err(e) = storage::write_json(self.storage.as_ref(), ROSTER_KEY, &sessions) {
            log::error!("Failed to save roster entry for {}: {}", learner, e);
        }

        log::info!(
            "{} completed the check-in: {}/{}",
            learner,
            session.total_score,
            session.max_score
        );
        session
    }
}

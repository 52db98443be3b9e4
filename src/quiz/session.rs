//! Submission store and navigation for one learner.
//!
//! All mutation goes through the named operations below. Each of them mirrors
//! the whole state into the learner's [`ProgressRecord`] while the phase is
//! [`Phase::InProgress`] or [`Phase::Completed`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use super::progress::{ProgressRecord, ProgressStore};
use super::roster::{LearnerSession, Roster};
use super::{graded_count, max_score, total_score, Feedback, Phase, Question, Submission, Submissions};

/// Shortest trimmed answer accepted for grading.
pub const MIN_ANSWER_CHARS: usize = 5;

/// What a grading call needs once the session lock is released.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingRequest {
    pub question: Question,
    pub answer: String,
    /// Only the newest request for a question may resolve it.
    pub token: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Moved(usize),
    Completed(LearnerSession),
    /// Current question has no feedback yet, or the quiz is not running.
    Blocked,
}

pub struct QuizSession {
    learner: Option<String>,
    questions: Arc<[Question]>,
    phase: Phase,
    index: usize,
    submissions: Submissions,
    // Question id to the token of the grading call issued by this instance
    pending: HashMap<String, u64>,
    next_token: u64,
    progress: ProgressStore,
    roster: Roster,
}

impl QuizSession {
    /// `learner == None` is the restricted "access required" mode: only the
    /// instructor view is reachable.
    pub fn new(
        learner: Option<String>,
        questions: Arc<[Question]>,
        progress: ProgressStore,
        roster: Roster,
    ) -> Self {
        Self {
            learner: learner.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            questions,
            phase: Phase::Welcome,
            index: 0,
            submissions: Submissions::new(),
            pending: HashMap::new(),
            next_token: 0,
            progress,
            roster,
        }
    }

    pub fn learner(&self) -> Option<&str> {
        self.learner.as_deref()
    }

    pub fn has_access(&self) -> bool {
        self.learner.is_some()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn submissions(&self) -> &Submissions {
        &self.submissions
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }

    pub fn current_submission(&self) -> Option<&Submission> {
        self.current_question()
            .and_then(|q| self.submissions.get(&q.id))
    }

    pub fn is_last_question(&self) -> bool {
        self.index + 1 >= self.questions.len()
    }

    pub fn graded_count(&self) -> usize {
        graded_count(&self.questions, &self.submissions)
    }

    pub fn total_score(&self) -> f64 {
        total_score(&self.questions, &self.submissions)
    }

    pub fn max_score(&self) -> u32 {
        max_score(&self.questions)
    }

    pub fn saved_progress(&self) -> Option<ProgressRecord> {
        self.learner.as_deref().and_then(|l| self.progress.load(l))
    }

    /// Fresh attempt: clears submissions and starts at the first question.
    pub fn start_new(&mut self) -> bool {
        if !self.has_access() {
            return false;
        }
        self.submissions.clear();
        self.pending.clear();
        self.index = 0;
        self.phase = Phase::InProgress;
        log::info!("{} started a new session", self.learner_name());
        self.persist();
        true
    }

    /// Loads the stored record as-is, phase included. In-flight flags with no
    /// call pending in this instance are stale and get cleared.
    pub fn resume(&mut self) -> bool {
        let Some(record) = self.saved_progress() else {
            return false;
        };

        self.submissions = record.submissions;
        for (id, submission) in self.submissions.iter_mut() {
            if submission.is_submitting && !self.pending.contains_key(id) {
                log::warn!("Clearing stale grading flag on {}", id);
                submission.is_submitting = false;
            }
        }
        self.index = record
            .current_question_index
            .min(self.questions.len().saturating_sub(1));
        self.phase = match record.current_step {
            Phase::Completed => Phase::Completed,
            _ => Phase::InProgress,
        };
        log::info!(
            "{} resumed at question {} ({:?})",
            self.learner_name(),
            self.index + 1,
            self.phase
        );
        self.persist();
        true
    }

    /// Replaces the answer text. Attached feedback survives edits.
    pub fn set_answer(&mut self, question_id: &str, answer: &str) -> bool {
        if self.phase != Phase::InProgress || self.question(question_id).is_none() {
            return false;
        }
        self.submissions
            .entry(question_id.to_string())
            .or_insert_with(|| Submission::new(question_id))
            .answer = answer.to_string();
        self.persist();
        true
    }

    /// Marks the submission in flight and hands back what the grader needs.
    /// `None` when already in flight, too short, or not answerable now.
    pub fn begin_submit(&mut self, question_id: &str) -> Option<GradingRequest> {
        if self.phase != Phase::InProgress {
            return None;
        }
        let question = self.question(question_id)?.clone();
        let submission = self.submissions.get_mut(question_id)?;
        if submission.is_submitting || submission.answer.trim().chars().count() < MIN_ANSWER_CHARS {
            return None;
        }

        submission.is_submitting = true;
        let answer = submission.answer.clone();
        self.next_token += 1;
        let token = self.next_token;
        self.pending.insert(question_id.to_string(), token);
        self.persist();

        Some(GradingRequest {
            question,
            answer,
            token,
        })
    }

    /// Applies a grading resolution wherever the learner is now. Overwrites
    /// earlier feedback. Dropped if the submission was cleared meanwhile or a
    /// newer request for the same question superseded this one.
    pub fn finish_submit(&mut self, request: &GradingRequest, feedback: Feedback) -> bool {
        let question_id = request.question.id.as_str();
        if self.pending.get(question_id) != Some(&request.token) {
            log::warn!(
                "Discarding feedback for {}, request {} is no longer pending",
                question_id,
                request.token
            );
            return false;
        }
        self.pending.remove(question_id);
        let Some(submission) = self.submissions.get_mut(question_id) else {
            log::warn!("Discarding feedback for {}, submission is gone", question_id);
            return false;
        };

        submission.is_submitting = false;
        submission.feedback = Some(feedback);
        self.persist();
        true
    }

    /// Next question, or completion past the last one. A no-op until the
    /// current question is graded.
    pub fn advance(&mut self) -> Advance {
        if self.phase != Phase::InProgress {
            return Advance::Blocked;
        }
        if !self.current_submission().is_some_and(Submission::is_graded) {
            return Advance::Blocked;
        }

        if !self.is_last_question() {
            self.index += 1;
            self.persist();
            return Advance::Moved(self.index);
        }

        let Some(learner) = self.learner.clone() else {
            return Advance::Blocked;
        };
        let session = self
            .roster
            .complete(&learner, &self.submissions, &self.questions);
        self.phase = Phase::Completed;
        self.persist();
        Advance::Completed(session)
    }

    pub fn back(&mut self) -> bool {
        if self.phase != Phase::InProgress || self.index == 0 {
            return false;
        }
        self.index -= 1;
        self.persist();
        true
    }

    /// From the results screen: forget the stored record and start over.
    pub fn restart(&mut self) -> bool {
        if self.phase != Phase::Completed {
            return false;
        }
        if let Some(learner) = self.learner.as_deref() {
            if let Err(e) = self.progress.clear(learner) {
                log::error!("Failed to clear progress for {}: {}", learner, e);
            }
        }
        self.start_new()
    }

    pub fn open_instructor_view(&mut self) {
        self.phase = Phase::InstructorView;
    }

    pub fn close_instructor_view(&mut self) {
        if self.phase == Phase::InstructorView {
            self.phase = Phase::Welcome;
        }
    }

    fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    fn learner_name(&self) -> &str {
        self.learner.as_deref().unwrap_or("anonymous")
    }

    fn persist(&self) {
        if !self.phase.is_persisted() {
            return;
        }
        let Some(learner) = self.learner.as_deref() else {
            return;
        };

        let record = ProgressRecord {
            student_name: learner.to_string(),
            submissions: self.submissions.clone(),
            current_question_index: self.index,
            current_step: self.phase,
            updated_at: Utc::now(),
        };
        if let Err(e) = self.progress.save(&record) {
            log::error!("Failed to save progress for {}: {}", learner, e);
        }
    }
}

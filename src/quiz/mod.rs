pub mod ai_helper;
pub mod bank;
pub mod insights;
pub mod progress;
pub mod roster;
pub mod session;

use std::collections::BTreeMap;

/// Answers keyed by question id.
pub type Submissions = BTreeMap<String, Submission>;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub id: String,
    pub number: String,
    pub text: String,
    pub points: u32,
    /// Rubric handed to the grader.
    pub guidance: String,
    pub reinforcement: String,
    pub clarification: String,
}

impl Question {
    /// Canned template shown next to the AI notes.
    pub fn template_for(&self, status: FeedbackStatus) -> &str {
        match status {
            FeedbackStatus::Reinforcement => &self.reinforcement,
            FeedbackStatus::Clarification => &self.clarification,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    Reinforcement,
    Clarification,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub score: f64,
    pub status: FeedbackStatus,
    pub ai_notes: String,
    pub socratic_question: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub question_id: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(default)]
    pub is_submitting: bool,
}

impl Submission {
    pub fn new(question_id: &str) -> Self {
        Self {
            question_id: question_id.to_string(),
            answer: String::new(),
            feedback: None,
            is_submitting: false,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.feedback.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    Welcome,
    #[serde(rename = "QUIZ")]
    InProgress,
    #[serde(rename = "RESULTS")]
    Completed,
    #[serde(rename = "TEACHER")]
    InstructorView,
}

impl Phase {
    /// Phases whose changes are mirrored into the learner's progress record.
    pub fn is_persisted(self) -> bool {
        matches!(self, Phase::InProgress | Phase::Completed)
    }
}

/// Sum of attached scores over `questions`; ungraded or missing answers count 0.
pub fn total_score(questions: &[Question], submissions: &Submissions) -> f64 {
    questions
        .iter()
        .filter_map(|q| submissions.get(&q.id))
        .filter_map(|s| s.feedback.as_ref())
        .map(|f| f.score)
        .sum()
}

pub fn max_score(questions: &[Question]) -> u32 {
    questions.iter().map(|q| q.points).sum()
}

pub fn graded_count(questions: &[Question], submissions: &Submissions) -> usize {
    questions
        .iter()
        .filter(|q| submissions.get(&q.id).is_some_and(Submission::is_graded))
        .count()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn question(id: &str, points: u32) -> Question {
        Question {
            id: id.to_string(),
            number: id.to_uppercase(),
            text: format!("Prompt for {}", id),
            points,
            guidance: format!("Rubric for {}", id),
            reinforcement: "well done".to_string(),
            clarification: "keep going".to_string(),
        }
    }

    pub fn feedback(score: f64, status: FeedbackStatus) -> Feedback {
        Feedback {
            score,
            status,
            ai_notes: "clear".to_string(),
            socratic_question: "why?".to_string(),
        }
    }

    pub fn graded(id: &str, answer: &str, score: f64) -> Submission {
        Submission {
            question_id: id.to_string(),
            answer: answer.to_string(),
            feedback: Some(feedback(score, FeedbackStatus::Reinforcement)),
            is_submitting: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn total_ignores_ungraded_and_unknown_answers() {
        let questions = vec![question("q1", 3), question("q2", 2)];
        let mut submissions = Submissions::new();
        submissions.insert("q1".into(), graded("q1", "a", 2.0));
        submissions.insert("q2".into(), Submission::new("q2"));
        submissions.insert("q9".into(), graded("q9", "stale", 4.0));

        assert_eq!(total_score(&questions, &submissions), 2.0);
        assert_eq!(max_score(&questions), 5);
        assert_eq!(graded_count(&questions, &submissions), 1);
    }

    #[test]
    fn feedback_uses_wire_field_names() {
        let value = serde_json::to_value(feedback(3.0, FeedbackStatus::Reinforcement)).unwrap();
        assert_eq!(value["status"], "reinforcement");
        assert_eq!(value["aiNotes"], "clear");
        assert_eq!(value["socraticQuestion"], "why?");
    }

    #[test]
    fn phase_serializes_like_stored_progress() {
        assert_eq!(serde_json::to_string(&Phase::InProgress).unwrap(), "\"QUIZ\"");
        assert_eq!(serde_json::to_string(&Phase::Completed).unwrap(), "\"RESULTS\"");
        assert_eq!(serde_json::to_string(&Phase::Welcome).unwrap(), "\"WELCOME\"");
        assert!(!Phase::InstructorView.is_persisted());
    }

    #[test]
    fn template_follows_status() {
        let q = question("q1", 3);
        assert_eq!(q.template_for(FeedbackStatus::Clarification), "keep going");
    }
}

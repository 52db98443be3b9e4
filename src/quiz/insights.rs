//! Read-only regroupings of the roster for the instructor console.

use super::roster::LearnerSession;
use super::{Question, Submission};

#[derive(Debug)]
pub struct QuestionResponses<'a> {
    pub question: &'a Question,
    /// (learner, graded submission), in roster order.
    pub responses: Vec<(&'a str, &'a Submission)>,
}

#[derive(Debug)]
pub struct LearnerResponses<'a> {
    pub session: &'a LearnerSession,
    /// Graded answers in question order.
    pub answers: Vec<(&'a Question, &'a Submission)>,
}

pub fn by_question<'a>(
    questions: &'a [Question],
    roster: &'a [LearnerSession],
) -> Vec<QuestionResponses<'a>> {
    questions
        .iter()
        .map(|question| QuestionResponses {
            question,
            responses: roster
                .iter()
                .filter_map(|session| {
                    session
                        .submissions
                        .get(&question.id)
                        .filter(|s| s.is_graded())
                        .map(|s| (session.student_name.as_str(), s))
                })
                .collect(),
        })
        .collect()
}

pub fn by_learner<'a>(
    questions: &'a [Question],
    roster: &'a [LearnerSession],
) -> Vec<LearnerResponses<'a>> {
    roster
        .iter()
        .map(|session| LearnerResponses {
            session,
            answers: questions
                .iter()
                .filter_map(|question| {
                    session
                        .submissions
                        .get(&question.id)
                        .filter(|s| s.is_graded())
                        .map(|s| (question, s))
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fixtures::{graded, question};
    use crate::quiz::Submissions;
    use chrono::Utc;

    fn session(name: &str, submissions: Vec<Submission>) -> LearnerSession {
        let submissions: Submissions = submissions
            .into_iter()
            .map(|s| (s.question_id.clone(), s))
            .collect();
        LearnerSession {
            id: format!("id-{}", name),
            student_name: name.to_string(),
            timestamp: Utc::now(),
            submissions,
            total_score: 0.0,
            max_score: 0,
        }
    }

    #[test]
    fn by_question_keeps_roster_order_and_skips_ungraded() {
        let questions = vec![question("q1", 3), question("q2", 3)];
        let roster = vec![
            session("Bea", vec![graded("q1", "bea q1", 2.0), Submission::new("q2")]),
            session("Ada", vec![graded("q1", "ada q1", 3.0), graded("q2", "ada q2", 1.0)]),
        ];

        let view = by_question(&questions, &roster);
        assert_eq!(view.len(), 2);

        let names: Vec<_> = view[0].responses.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["Bea", "Ada"]);

        assert_eq!(view[1].responses.len(), 1);
        assert_eq!(view[1].responses[0].1.answer, "ada q2");
    }

    #[test]
    fn by_learner_follows_question_order() {
        let questions = vec![question("q1", 3), question("q2", 3), question("q3", 3)];
        let roster = vec![session(
            "Ada",
            vec![graded("q3", "third", 1.0), graded("q1", "first", 2.0), Submission::new("q2")],
        )];

        let view = by_learner(&questions, &roster);
        let ids: Vec<_> = view[0].answers.iter().map(|(q, _)| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q3"]);
    }

    #[test]
    fn questions_added_after_an_attempt_are_simply_absent() {
        let questions = vec![question("q1", 3), question("q_new", 5)];
        let roster = vec![session("Ada", vec![graded("q1", "first", 2.0)])];

        assert!(by_question(&questions, &roster)[1].responses.is_empty());
        assert_eq!(by_learner(&questions, &roster)[0].answers.len(), 1);
    }

    #[test]
    fn empty_roster_yields_empty_groups() {
        let questions = vec![question("q1", 3)];
        assert!(by_question(&questions, &[])[0].responses.is_empty());
        assert!(by_learner(&questions, &[]).is_empty());
    }
}

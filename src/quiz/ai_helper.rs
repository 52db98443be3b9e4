use crate::quiz::{Feedback, FeedbackStatus, Question};
use chatgpt::prelude::*;
use chatgpt::types::CompletionResponse;
use serde_json::Value;

pub const FALLBACK_NOTES: &str = "Unable to evaluate at this moment.";
pub const FALLBACK_QUESTION: &str = "What do you think is the core connection between the language structure and the behavior mentioned in the reading?";

/// Grades short answers against a question's rubric.
pub struct QuizHelper {
    chat_gpt: Option<ChatGPT>,
}

#[derive(Debug, thiserror::Error)]
pub enum GradingError {
    #[error("grading is disabled, no API key configured")]
    Disabled,
    #[error("ChatGPT request failed: {0}")]
    ChatGPT(#[from] chatgpt::err::Error),
    #[error("reply contained no JSON object")]
    NoJson,
    #[error("reply JSON was not an object")]
    NotAnObject,
    #[error("reply JSON was malformed: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

impl QuizHelper {
    pub fn new(chat_gpt: ChatGPT) -> Self {
        Self {
            chat_gpt: Some(chat_gpt),
        }
    }

    /// Every evaluation resolves to the fallback feedback.
    pub fn disabled() -> Self {
        Self { chat_gpt: None }
    }

    /// Never fails: any transport, parse or validation problem is logged and
    /// answered with [`fallback_feedback`].
    pub async fn evaluate(&self, question: &Question, answer: &str) -> Feedback {
        match self.request_feedback(question, answer).await {
            Ok(feedback) => feedback,
            Err(e) => {
                log::error!("Evaluation of {} failed: {}", question.id, e);
                fallback_feedback()
            }
        }
    }

    async fn request_feedback(
        &self,
        question: &Question,
        answer: &str,
    ) -> std::result::Result<Feedback, GradingError> {
        let chat_gpt = self.chat_gpt.as_ref().ok_or(GradingError::Disabled)?;

        let prompt = grading_prompt(question, answer);
        log::debug!("Grading {} with prompt: {:?}", question.id, prompt);

        let response: CompletionResponse = chat_gpt.send_message(&prompt).await?;
        let content = response.message().clone().content;
        log::debug!("Completion for {}: {:?}", question.id, content);

        let reply = parse_reply(&content)?;
        Ok(normalize_feedback(&reply, question.points))
    }
}

pub fn fallback_feedback() -> Feedback {
    Feedback {
        score: 0.0,
        status: FeedbackStatus::Clarification,
        ai_notes: FALLBACK_NOTES.to_string(),
        socratic_question: FALLBACK_QUESTION.to_string(),
    }
}

pub fn grading_prompt(question: &Question, answer: &str) -> String {
    format!(
        "You are an AI teaching assistant for a Linguistics course.
        Evaluate the student's short answer using the grading guidance below.

        Question: {}
        Points available: {}
        Grading guidance: {}

        Categorize the status as \"reinforcement\" if the answer meets the core requirements of the guidance, or \"clarification\" if it needs more work.
        Assign a score between 0 and {}.
        You MUST always include a Socratic follow-up question:
        - if the answer is correct, ask a deeper question that extends the student's understanding;
        - if the answer is missing points, ask a question that guides the student towards the missing concept without giving the answer away.

        Reply with a single JSON object and nothing else, with exactly these fields:
        {{\"score\": number, \"status\": \"reinforcement\" | \"clarification\", \"aiNotes\": one sentence about this specific answer, \"socraticQuestion\": string}}

        Student answer: \"{}\"",
        question.text, question.points, question.guidance, question.points, answer
    )
}

/// Pulls the outermost `{...}` out of a completion, tolerating code fences
/// and chatter around it.
pub fn parse_reply(content: &str) -> std::result::Result<Value, GradingError> {
    let start = content.find('{').ok_or(GradingError::NoJson)?;
    let end = content.rfind('}').ok_or(GradingError::NoJson)?;
    if end < start {
        return Err(GradingError::NoJson);
    }

    let value: Value = serde_json::from_str(&content[start..=end])?;
    if !value.is_object() {
        return Err(GradingError::NotAnObject);
    }
    Ok(value)
}

/// Field-by-field coercion of an untrusted reply into [`Feedback`].
pub fn normalize_feedback(reply: &Value, max_points: u32) -> Feedback {
    let score = match reply.get("score") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|s| s.is_finite())
    .unwrap_or(0.0)
    .clamp(0.0, f64::from(max_points));

    let status = match reply.get("status").and_then(Value::as_str) {
        Some("reinforcement") => FeedbackStatus::Reinforcement,
        _ => FeedbackStatus::Clarification,
    };

    let text_field = |name: &str| {
        reply
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Feedback {
        score,
        status,
        ai_notes: text_field("aiNotes"),
        socratic_question: text_field("socraticQuestion"),
    }
}

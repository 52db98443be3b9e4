use teloxide::types::{KeyboardButton, KeyboardMarkup};
use teloxide::utils::html::{bold, escape, italic};

use crate::instructor::AuthError;
use crate::quiz::insights::{by_learner, by_question};
use crate::quiz::roster::LearnerSession;
use crate::quiz::session::{QuizSession, MIN_ANSWER_CHARS};
use crate::quiz::{Feedback, FeedbackStatus, Phase, Question};

pub const START_NEW: &str = "Start new session";
pub const RESUME: &str = "Resume saved progress";
pub const INSTRUCTOR: &str = "Instructor console";
pub const SUBMIT: &str = "Submit answer";
pub const PREVIOUS: &str = "← Previous";
pub const NEXT: &str = "Next question →";
pub const FINISH: &str = "Finish & save results";
pub const RESTART: &str = "Restart";
pub const RESEND_CODE: &str = "Resend code";
pub const BY_QUESTION: &str = "By questions";
pub const BY_LEARNER: &str = "By user submission";
pub const SIGN_OUT: &str = "Sign out";
pub const BACK: &str = "Back";

/// Kept below Telegram's 4096 UTF-16 units of text per message.
pub const MESSAGE_LIMIT: usize = 4000;

pub struct Screen {
    pub text: String,
    pub keyboard: KeyboardMarkup,
}

impl Screen {
    fn new(text: String, rows: Vec<Vec<&str>>) -> Self {
        let keyboard = KeyboardMarkup::new(
            rows.into_iter()
                .filter(|row| !row.is_empty())
                .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
        );
        Self { text, keyboard }
    }

    fn with_notice(mut self, notice: Option<&str>) -> Self {
        if let Some(notice) = notice {
            self.text = format!("{}\n\n{}", italic(&escape(notice)), self.text);
        }
        self
    }
}

/// Whatever the learner should see for the session's current phase.
pub fn learner(session: &QuizSession, notice: Option<&str>) -> Screen {
    let screen = match (session.has_access(), session.phase()) {
        (false, _) => access_required(),
        (true, Phase::Welcome) | (true, Phase::InstructorView) => welcome(session),
        (true, Phase::InProgress) => question(session),
        (true, Phase::Completed) => summary(session),
    };
    screen.with_notice(notice)
}

fn access_required() -> Screen {
    let text = format!(
        "{}\nPlease open this bot through the school portal link so your user ID is included, \
         or send /start userId=&lt;your id&gt;.",
        bold("Access Required")
    );
    Screen::new(text, vec![vec![INSTRUCTOR]])
}

fn welcome(session: &QuizSession) -> Screen {
    let text = format!(
        "{}\nAnalyze how language shapes our reality. Complete the self-check to see where your understanding stands.\n\nActive student: {}",
        bold("Sapir-Whorf Check-in"),
        bold(&escape(session.learner().unwrap_or_default()))
    );

    let resume = if session.saved_progress().is_some() {
        vec![RESUME]
    } else {
        vec![]
    };
    Screen::new(text, vec![vec![START_NEW], resume, vec![INSTRUCTOR]])
}

fn question(session: &QuizSession) -> Screen {
    let Some(question) = session.current_question() else {
        return summary(session);
    };
    let submission = session.current_submission();

    let mut text = format!(
        "Progress: {} of {} complete\n\n{} ({} points)\n{}\n\n",
        session.graded_count(),
        session.questions().len(),
        bold(&escape(&question.number)),
        question.points,
        escape(&question.text)
    );

    match submission.map(|s| s.answer.as_str()).filter(|a| !a.trim().is_empty()) {
        Some(answer) => text.push_str(&format!("Your answer:\n{}", escape(answer))),
        None => text.push_str(&italic("Type your answer as a message.")),
    }

    if submission.is_some_and(|s| s.is_submitting) {
        text.push_str(&format!("\n\n{}", italic("Evaluating your answer...")));
    }
    if let Some(feedback) = submission.and_then(|s| s.feedback.as_ref()) {
        text.push_str(&format!("\n\n{}", feedback_block(question, feedback)));
    }

    let graded = submission.is_some_and(|s| s.is_graded());
    let mut navigation = Vec::new();
    if session.index() > 0 {
        navigation.push(PREVIOUS);
    }
    if graded {
        navigation.push(if session.is_last_question() { FINISH } else { NEXT });
    }
    Screen::new(text, vec![vec![SUBMIT], navigation, vec![INSTRUCTOR]])
}

pub fn feedback_block(question: &Question, feedback: &Feedback) -> String {
    format!(
        "{}\n{} {}/{}\n{}\n🤔 {}",
        escape(question.template_for(feedback.status)),
        bold("Score:"),
        feedback.score,
        question.points,
        escape(&feedback.ai_notes),
        escape(&feedback.socratic_question)
    )
}

fn summary(session: &QuizSession) -> Screen {
    let total = session.total_score();
    let max = session.max_score();
    let mut text = format!(
        "{}\n{} / {} points ({}%)\n\n{}",
        bold("Check-in Complete!"),
        total,
        max,
        percentage(total, max),
        bold("Quick review")
    );

    for question in session.questions() {
        let line = match session.submissions().get(&question.id).and_then(|s| s.feedback.as_ref()) {
            Some(feedback) => format!("{} {}/{} {}", status_mark(feedback.status), feedback.score, question.points, escape(&feedback.ai_notes)),
            None => format!("– 0/{} not answered", question.points),
        };
        text.push_str(&format!("\n{}: {}", escape(&question.number), line));
    }
    Screen::new(text, vec![vec![RESTART], vec![INSTRUCTOR]])
}

pub fn percentage(total: f64, max: u32) -> u32 {
    if max == 0 {
        return 0;
    }
    (total / f64::from(max) * 100.0).round() as u32
}

fn status_mark(status: FeedbackStatus) -> &'static str {
    match status {
        FeedbackStatus::Reinforcement => "✅",
        FeedbackStatus::Clarification => "❗",
    }
}

pub fn instructor_sign_in(domain: &str, error: Option<&AuthError>) -> Screen {
    let mut text = format!(
        "{}\nEnter your {} email to receive a 6 digit code.",
        bold("Teacher Login"),
        escape(domain)
    );
    if let Some(error) = error {
        text.push_str(&format!("\n\n❗ {}", escape(&error.to_string())));
    }
    Screen::new(text, vec![vec![BACK]])
}

pub fn code_prompt(email: &str, error: Option<&AuthError>) -> Screen {
    let mut text = format!("A 6 digit code was sent to {}. Reply with the code.", escape(email));
    if let Some(error) = error {
        text.push_str(&format!("\n\n❗ {}", escape(&error.to_string())));
    }
    Screen::new(text, vec![vec![RESEND_CODE], vec![BACK]])
}

pub fn console_menu(email: &str, sessions: usize) -> Screen {
    let text = format!(
        "{}\nSigned in as {}.\n{} completed check-ins on record.",
        bold("Teacher Insights"),
        escape(email),
        sessions
    );
    Screen::new(text, vec![vec![BY_QUESTION, BY_LEARNER], vec![SIGN_OUT, BACK]])
}

const NO_SUBMISSIONS: &str = "No student submissions yet.\nCheck back once students have completed their self-checks.";

pub fn question_report(questions: &[Question], roster: &[LearnerSession]) -> String {
    if roster.is_empty() {
        return NO_SUBMISSIONS.to_string();
    }

    let mut text = String::new();
    for group in by_question(questions, roster) {
        let count = group.responses.len();
        text.push_str(&format!(
            "\n{} {}\n{} {}\n",
            bold(&escape(&group.question.number)),
            escape(&group.question.text),
            count,
            if count == 1 { "response" } else { "responses" }
        ));
        if group.responses.is_empty() {
            text.push_str(&format!("{}\n", italic("No answers submitted for this question yet.")));
        }
        for (learner, submission) in group.responses {
            if let Some(feedback) = submission.feedback.as_ref() {
                text.push_str(&format!(
                    "• {} {} {}/{}: {}\n",
                    status_mark(feedback.status),
                    bold(&escape(learner)),
                    feedback.score,
                    group.question.points,
                    escape(&submission.answer)
                ));
            }
        }
    }
    text
}

pub fn learner_report(questions: &[Question], roster: &[LearnerSession]) -> String {
    if roster.is_empty() {
        return NO_SUBMISSIONS.to_string();
    }

    let mut text = String::new();
    for group in by_learner(questions, roster) {
        let session = group.session;
        text.push_str(&format!(
            "\n{} ({}) {}/{}\n",
            bold(&escape(&session.student_name)),
            session.timestamp.format("%Y-%m-%d %H:%M UTC"),
            session.total_score,
            session.max_score
        ));
        for (question, submission) in group.answers {
            if let Some(feedback) = submission.feedback.as_ref() {
                text.push_str(&format!(
                    "{} {} {}/{}: {}\n",
                    status_mark(feedback.status),
                    escape(&question.number),
                    feedback.score,
                    question.points,
                    escape(&submission.answer)
                ));
            }
        }
    }
    text
}

/// Splits rendered HTML into messages of at most `limit` UTF-16 units of
/// visible text, which is how Telegram measures them. Cuts fall on line breaks
/// where possible and never inside a tag or an entity. Tags still open at a
/// cut are closed at the end of one part and reopened at the start of the next.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut part = Part::default();
    let mut rest = text;

    while let Some(atom) = next_atom(rest) {
        rest = &rest[atom.source().len()..];
        let units = atom.units();

        if part.units > 0 && part.units + units > limit && matches!(atom, Atom::Text("\n", _)) {
            let next = part.reopened();
            parts.push(std::mem::replace(&mut part, next).finish());
            continue;
        }
        while part.units > 0 && part.units + units > limit {
            let tail = part.cut();
            parts.push(std::mem::replace(&mut part, tail).finish());
        }
        part.push(atom);
    }

    parts.push(part.finish());
    parts.retain(|p| !is_blank(p));
    if parts.is_empty() {
        parts.push(String::from(" "));
    }
    parts
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Atom<'a> {
    Tag(&'a str),
    /// A character or an entity, with its UTF-16 length once parsed.
    Text(&'a str, usize),
}

impl<'a> Atom<'a> {
    fn source(&self) -> &'a str {
        match *self {
            Atom::Tag(tag) | Atom::Text(tag, _) => tag,
        }
    }

    fn units(&self) -> usize {
        match *self {
            Atom::Tag(_) => 0,
            Atom::Text(_, units) => units,
        }
    }
}

fn next_atom(text: &str) -> Option<Atom<'_>> {
    let first = text.chars().next()?;
    let up_to = |close: char| text.find(close).map(|end| &text[..=end]);

    match first {
        '<' => {
            if let Some(tag) = up_to('>') {
                return Some(Atom::Tag(tag));
            }
        }
        '&' => {
            let entity = up_to(';').filter(|e| {
                let name = &e[1..e.len() - 1];
                !name.is_empty() && name.len() <= 8 && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '#')
            });
            if let Some(entity) = entity {
                return Some(Atom::Text(entity, 1));
            }
        }
        _ => {}
    }
    Some(Atom::Text(&text[..first.len_utf8()], first.len_utf16()))
}

fn is_blank(html: &str) -> bool {
    let mut rest = html;
    while let Some(atom) = next_atom(rest) {
        if let Atom::Text(text, _) = atom {
            if !text.trim().is_empty() {
                return false;
            }
        }
        rest = &rest[atom.source().len()..];
    }
    true
}

#[derive(Debug, Clone)]
struct OpenTag {
    name: String,
    tag: String,
}

#[derive(Debug, Clone)]
struct LineBreak {
    at: usize,
    units: usize,
    open: Vec<OpenTag>,
}

/// One outgoing message under construction.
#[derive(Debug, Default)]
struct Part {
    html: String,
    units: usize,
    open: Vec<OpenTag>,
    // Last line break, where a cut keeps whole lines together
    line_break: Option<LineBreak>,
}

impl Part {
    fn push(&mut self, atom: Atom<'_>) {
        match atom {
            Atom::Text("\n", _) => {
                self.line_break = Some(LineBreak {
                    at: self.html.len(),
                    units: self.units,
                    open: self.open.clone(),
                });
            }
            Atom::Tag(tag) if tag.starts_with("</") => {
                self.open.pop();
            }
            Atom::Tag(tag) if !tag.ends_with("/>") => {
                let name = tag[1..]
                    .split(|c: char| c.is_whitespace() || c == '>')
                    .next()
                    .unwrap_or_default();
                self.open.push(OpenTag {
                    name: name.to_string(),
                    tag: tag.to_string(),
                });
            }
            _ => {}
        }
        self.html.push_str(atom.source());
        self.units += atom.units();
    }

    /// An empty part that continues inside the tags open here.
    fn reopened(&self) -> Part {
        Part {
            html: self.open.iter().map(|t| t.tag.as_str()).collect(),
            open: self.open.clone(),
            ..Part::default()
        }
    }

    /// Shortens this part at its last line break, or at the end if it has
    /// none, and returns the remainder as the start of the next part.
    fn cut(&mut self) -> Part {
        let Some(line_break) = self.line_break.take() else {
            return self.reopened();
        };

        // Skips the line break itself
        let remainder = self.html.split_off(line_break.at);
        let mut tail = Part {
            html: line_break.open.iter().map(|t| t.tag.as_str()).collect(),
            units: self.units - line_break.units - 1,
            open: std::mem::replace(&mut self.open, line_break.open),
            line_break: None,
        };
        tail.html.push_str(&remainder[1..]);
        self.units = line_break.units;
        tail
    }

    fn finish(mut self) -> String {
        for open in self.open.iter().rev() {
            self.html.push_str(&format!("</{}>", open.name));
        }
        self.html
    }
}

pub fn cannot_submit(session: &QuizSession) -> String {
    match session.current_submission() {
        Some(s) if s.is_submitting => "Still evaluating your previous submission.".to_string(),
        _ => format!("Type an answer of at least {} characters first.", MIN_ANSWER_CHARS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fixtures::{feedback, graded, question};
    use crate::quiz::progress::ProgressStore;
    use crate::quiz::roster::Roster;
    use crate::quiz::Submissions;
    use crate::storage::MemoryStore;
    use chrono::Utc;
    use std::sync::Arc;

    fn session(learner: Option<&str>) -> QuizSession {
        let storage = Arc::new(MemoryStore::new());
        QuizSession::new(
            learner.map(str::to_string),
            vec![question("q1", 3), question("q2", 2)].into(),
            ProgressStore::new(storage.clone()),
            Roster::new(storage),
        )
    }

    fn labels(screen: &Screen) -> Vec<String> {
        screen
            .keyboard
            .keyboard
            .iter()
            .flatten()
            .map(|b| b.text.clone())
            .collect()
    }

    #[test]
    fn missing_identity_shows_access_required() {
        let screen = learner(&session(None), None);
        assert!(screen.text.contains("Access Required"));
        assert_eq!(labels(&screen), vec![INSTRUCTOR]);
    }

    #[test]
    fn welcome_offers_resume_only_with_saved_progress() {
        let mut s = session(Some("Ada"));
        assert_eq!(labels(&learner(&s, None)), vec![START_NEW, INSTRUCTOR]);

        s.start_new();
        s.open_instructor_view();
        s.close_instructor_view();
        assert_eq!(labels(&learner(&s, None)), vec![START_NEW, RESUME, INSTRUCTOR]);
    }

    #[test]
    fn next_appears_once_graded() {
        let mut s = session(Some("Ada"));
        s.start_new();
        s.set_answer("q1", "an answer <b>");
        let screen = learner(&s, None);
        assert_eq!(labels(&screen), vec![SUBMIT, INSTRUCTOR]);
        assert!(screen.text.contains("an answer &lt;b&gt;"));

        let request = s.begin_submit("q1").unwrap();
        s.finish_submit(&request, feedback(2.0, FeedbackStatus::Reinforcement));
        let screen = learner(&s, Some("done"));
        assert_eq!(labels(&screen), vec![SUBMIT, NEXT, INSTRUCTOR]);
        assert!(screen.text.contains("well done"));
        assert!(screen.text.contains("2/3"));
    }

    #[test]
    fn summary_reports_percentage() {
        assert_eq!(percentage(3.0, 3), 100);
        assert_eq!(percentage(1.0, 3), 33);
        assert_eq!(percentage(0.0, 0), 0);
    }

    #[test]
    fn reports_handle_an_empty_roster() {
        let questions = vec![question("q1", 3)];
        assert!(question_report(&questions, &[]).starts_with("No student submissions yet."));
        assert!(learner_report(&questions, &[]).starts_with("No student submissions yet."));
    }

    #[test]
    fn question_report_counts_responses() {
        let questions = vec![question("q1", 3), question("q2", 2)];
        let mut submissions = Submissions::new();
        submissions.insert("q1".into(), graded("q1", "language shapes thought", 3.0));
        let roster = vec![LearnerSession {
            id: "1".into(),
            student_name: "Ada".into(),
            timestamp: Utc::now(),
            submissions,
            total_score: 3.0,
            max_score: 5,
        }];

        let report = question_report(&questions, &roster);
        assert!(report.contains("1 response\n"));
        assert!(report.contains("0 responses"));
        assert!(report.contains("language shapes thought"));

        let report = learner_report(&questions, &roster);
        assert!(report.contains("3/5"));
    }

    #[test]
    fn long_text_is_split_on_lines() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(split_message(text, 9), vec!["aaaa\nbbbb", "cccc"]);
        assert_eq!(split_message("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(split_message("", 10), vec![" "]);
    }

    #[test]
    fn entities_are_never_cut() {
        let text = format!("Your answer:\n{}", escape(&format!("{}<b>", "a".repeat(3998))));
        let parts = split_message(&text, 4000);
        assert_eq!(
            parts,
            vec![
                "Your answer:".to_string(),
                format!("{}&lt;b", "a".repeat(3998)),
                "&gt;".to_string(),
            ]
        );
    }

    #[test]
    fn tags_count_as_nothing_and_are_reopened_across_parts() {
        let fits = format!("{}{}", "y".repeat(3995), bold("Ada"));
        assert_eq!(split_message(&fits, 4000), vec![fits.clone()]);

        let overflows = format!("{}{}", "y".repeat(3998), bold("Ada"));
        assert_eq!(
            split_message(&overflows, 4000),
            vec![format!("{}<b>Ad</b>", "y".repeat(3998)), "<b>a</b>".to_string()]
        );
    }

    #[test]
    fn line_cuts_keep_formatting_balanced() {
        let text = format!("{}\n{}", bold("first line"), bold("second\nthird"));
        assert_eq!(
            split_message(&text, 10),
            vec!["<b>first line</b>", "<b>second</b>", "<b>third</b>"]
        );
    }

    #[test]
    fn length_is_measured_in_utf16_units() {
        assert_eq!(split_message("😀😀😀", 4), vec!["😀😀", "😀"]);
        assert_eq!(split_message("ééé", 3), vec!["ééé"]);
    }
}

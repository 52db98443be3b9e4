pub mod screens;

use std::collections::HashMap;
use std::sync::Arc;

use teloxide::{
    dispatching::{dialogue::ErasedStorage, UpdateHandler},
    prelude::*,
    types::{ChatAction, ChatId, ParseMode},
};
use tokio::sync::Mutex;

use crate::identity::{resolve_identity, LastUser};
use crate::instructor::{self, PasscodeProvider};
use crate::quiz::ai_helper::QuizHelper;
use crate::quiz::progress::ProgressStore;
use crate::quiz::roster::Roster;
use crate::quiz::session::{Advance, GradingRequest, QuizSession};
use crate::quiz::{Feedback, Phase, Question};
use crate::storage::Storage;
use screens::Screen;

pub type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// What the chat expects next. The quiz itself lives in the chat's
/// [`QuizSession`].
#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    Learning,
    InstructorEmail,
    InstructorCode {
        email: String,
    },
    Instructor {
        email: String,
    },
}

/// Process-wide state shared by every handler.
pub struct Lab {
    questions: Arc<[Question]>,
    storage: Arc<dyn Storage>,
    helper: QuizHelper,
    passcodes: Arc<dyn PasscodeProvider>,
    instructor_domain: String,
    sessions: Mutex<HashMap<ChatId, QuizSession>>,
}

impl Lab {
    pub fn new(
        questions: Vec<Question>,
        storage: Arc<dyn Storage>,
        helper: QuizHelper,
        passcodes: Arc<dyn PasscodeProvider>,
        instructor_domain: String,
    ) -> Self {
        Self {
            questions: questions.into(),
            storage,
            helper,
            passcodes,
            instructor_domain,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn roster(&self) -> Roster {
        Roster::new(self.storage.clone())
    }

    fn session_for(&self, learner: Option<String>) -> QuizSession {
        QuizSession::new(
            learner,
            self.questions.clone(),
            ProgressStore::new(self.storage.clone()),
            self.roster(),
        )
    }

    fn last_user(&self, chat: ChatId) -> LastUser<'_> {
        LastUser::new(self.storage.as_ref(), &chat.0.to_string())
    }

    /// Runs `f` on the chat's session, rebuilding it from the chat's last
    /// identity if this process has not seen the chat yet.
    async fn with_session<R>(&self, chat: ChatId, f: impl FnOnce(&mut QuizSession) -> R) -> R {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry(chat)
            .or_insert_with(|| self.session_for(resolve_identity(None, &self.last_user(chat))));
        f(session)
    }

    async fn replace_session(&self, chat: ChatId, session: QuizSession) -> Screen {
        let screen = screens::learner(&session, None);
        self.sessions.lock().await.insert(chat, session);
        screen
    }
}

pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    Update::filter_message()
        .enter_dialogue::<Message, ErasedStorage<State>, State>()
        .branch(dptree::filter(|msg: Message| is_start_command(&msg)).endpoint(start))
        .branch(dptree::case![State::Start].endpoint(start))
        .branch(dptree::case![State::Learning].endpoint(learning))
        .branch(dptree::case![State::InstructorEmail].endpoint(receive_instructor_email))
        .branch(dptree::case![State::InstructorCode { email }].endpoint(receive_instructor_code))
        .branch(dptree::case![State::Instructor { email }].endpoint(instructor_console))
}

fn is_start_command(msg: &Message) -> bool {
    msg.text()
        .and_then(|text| text.split_whitespace().next())
        .is_some_and(|command| command == "/start" || command.starts_with("/start@"))
}

/// `/start <query>`: the payload plays the part of the portal's URL query.
fn start_payload(text: &str) -> &str {
    match text.trim().split_once(char::is_whitespace) {
        Some((command, payload)) if command.starts_with("/start") => payload.trim(),
        _ => "",
    }
}

async fn send_screen(bot: &Bot, chat: ChatId, screen: Screen) -> HandlerResult {
    let mut parts = screens::split_message(&screen.text, screens::MESSAGE_LIMIT)
        .into_iter()
        .peekable();
    while let Some(part) = parts.next() {
        let request = bot.send_message(chat, part).parse_mode(ParseMode::Html);
        if parts.peek().is_none() {
            request.reply_markup(screen.keyboard.clone()).await?;
        } else {
            request.await?;
        }
    }
    Ok(())
}

async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message, lab: Arc<Lab>) -> HandlerResult {
    let payload = msg.text().map(start_payload).unwrap_or_default();
    let learner = resolve_identity(Some(payload), &lab.last_user(msg.chat.id));
    match &learner {
        Some(learner) => log::info!("Chat {} is learner {}", msg.chat.id.0, learner),
        None => log::info!("Chat {} has no learner identity", msg.chat.id.0),
    }

    let screen = lab
        .replace_session(msg.chat.id, lab.session_for(learner))
        .await;
    dialogue.update(State::Learning).await?;
    send_screen(&bot, msg.chat.id, screen).await
}

async fn learning(bot: Bot, dialogue: QuizDialogue, msg: Message, lab: Arc<Lab>) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Please reply with text.").await?;
        return Ok(());
    };

    match text {
        screens::SUBMIT => submit_answer(&bot, msg.chat.id, &lab).await,
        screens::INSTRUCTOR => {
            lab.with_session(msg.chat.id, QuizSession::open_instructor_view)
                .await;
            dialogue.update(State::InstructorEmail).await?;
            send_screen(&bot, msg.chat.id, screens::instructor_sign_in(&lab.instructor_domain, None)).await
        }
        _ => {
            let screen = lab
                .with_session(msg.chat.id, |session| learner_input(session, text))
                .await;
            send_screen(&bot, msg.chat.id, screen).await
        }
    }
}

fn learner_input(session: &mut QuizSession, text: &str) -> Screen {
    let notice = match session.phase() {
        Phase::Welcome => match text {
            screens::START_NEW => {
                session.start_new();
                None
            }
            screens::RESUME => (!session.resume()).then_some("There is no saved progress to resume."),
            _ => None,
        },
        Phase::InProgress => match text {
            screens::PREVIOUS => {
                session.back();
                None
            }
            screens::NEXT | screens::FINISH => match session.advance() {
                Advance::Blocked => Some("Submit your answer and wait for feedback before moving on."),
                Advance::Moved(_) | Advance::Completed(_) => None,
            },
            answer => {
                let id = session.current_question().map(|q| q.id.clone());
                id.and_then(|id| {
                    session
                        .set_answer(&id, answer)
                        .then_some("Answer saved. Press \"Submit answer\" when you are ready.")
                })
            }
        },
        Phase::Completed => {
            if text == screens::RESTART {
                session.restart();
            }
            None
        }
        Phase::InstructorView => {
            session.close_instructor_view();
            None
        }
    };
    screens::learner(session, notice)
}

/// Marks the answer in flight and grades it in a task of its own, leaving the
/// chat free for edits and navigation until the feedback arrives.
async fn submit_answer(bot: &Bot, chat: ChatId, lab: &Arc<Lab>) -> HandlerResult {
    let begun = lab
        .with_session(chat, |session| {
            let id = session.current_question()?.id.clone();
            let request = session.begin_submit(&id)?;
            Some((request, screens::learner(session, None)))
        })
        .await;

    let Some((request, screen)) = begun else {
        let screen = lab
            .with_session(chat, |session| {
                let notice = screens::cannot_submit(session);
                screens::learner(session, Some(&notice))
            })
            .await;
        return send_screen(bot, chat, screen).await;
    };

    tokio::spawn(deliver_feedback(bot.clone(), chat, lab.clone(), request));
    send_screen(bot, chat, screen).await?;
    // Only cosmetic, so a failure here is ignored
    let _ = bot.send_chat_action(chat, ChatAction::Typing).await;
    Ok(())
}

async fn deliver_feedback(bot: Bot, chat: ChatId, lab: Arc<Lab>, request: GradingRequest) {
    let feedback = lab.helper.evaluate(&request.question, &request.answer).await;
    let screen = lab
        .with_session(chat, |session| apply_feedback(session, &request, feedback))
        .await;

    if let Some(screen) = screen {
        if let Err(e) = send_screen(&bot, chat, screen).await {
            log::error!("Failed to deliver feedback to chat {}: {}", chat.0, e);
        }
    }
}

/// The screen to show once grading resolves, if the learner is still on the
/// quiz. Accepted feedback is stored even when nothing is shown.
fn apply_feedback(session: &mut QuizSession, request: &GradingRequest, feedback: Feedback) -> Option<Screen> {
    if !session.finish_submit(request, feedback) || session.phase() != Phase::InProgress {
        return None;
    }
    let elsewhere = session
        .current_question()
        .map_or(true, |q| q.id != request.question.id);
    let notice = elsewhere.then(|| format!("Feedback for {} is ready.", request.question.number));
    Some(screens::learner(session, notice.as_deref()))
}

async fn leave_instructor_view(
    bot: &Bot,
    dialogue: &QuizDialogue,
    chat: ChatId,
    lab: &Lab,
) -> HandlerResult {
    let screen = lab
        .with_session(chat, |session| {
            session.close_instructor_view();
            screens::learner(session, None)
        })
        .await;
    dialogue.update(State::Learning).await?;
    send_screen(bot, chat, screen).await
}

async fn receive_instructor_email(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    lab: Arc<Lab>,
) -> HandlerResult {
    let text = msg.text().unwrap_or_default();
    if text == screens::BACK {
        return leave_instructor_view(&bot, &dialogue, msg.chat.id, &lab).await;
    }

    match instructor::request_code(lab.passcodes.as_ref(), text, &lab.instructor_domain) {
        Ok(email) => {
            let screen = screens::code_prompt(&email, None);
            dialogue.update(State::InstructorCode { email }).await?;
            send_screen(&bot, msg.chat.id, screen).await
        }
        Err(e) => {
            let screen = screens::instructor_sign_in(&lab.instructor_domain, Some(&e));
            send_screen(&bot, msg.chat.id, screen).await
        }
    }
}

async fn receive_instructor_code(
    bot: Bot,
    dialogue: QuizDialogue,
    email: String,
    msg: Message,
    lab: Arc<Lab>,
) -> HandlerResult {
    let text = msg.text().unwrap_or_default();
    let domain = &lab.instructor_domain;

    match text {
        screens::BACK => leave_instructor_view(&bot, &dialogue, msg.chat.id, &lab).await,
        screens::RESEND_CODE => {
            let error = instructor::request_code(lab.passcodes.as_ref(), &email, domain).err();
            send_screen(&bot, msg.chat.id, screens::code_prompt(&email, error.as_ref())).await
        }
        code => match instructor::sign_in(lab.passcodes.as_ref(), &email, code, domain) {
            Ok(email) => {
                let screen = screens::console_menu(&email, lab.roster().sessions().len());
                dialogue.update(State::Instructor { email }).await?;
                send_screen(&bot, msg.chat.id, screen).await
            }
            Err(e) => send_screen(&bot, msg.chat.id, screens::code_prompt(&email, Some(&e))).await,
        },
    }
}

async fn instructor_console(
    bot: Bot,
    dialogue: QuizDialogue,
    email: String,
    msg: Message,
    lab: Arc<Lab>,
) -> HandlerResult {
    let roster = lab.roster().sessions();
    let menu = screens::console_menu(&email, roster.len());

    match msg.text().unwrap_or_default() {
        screens::BY_QUESTION => {
            let report = screens::question_report(&lab.questions, &roster);
            send_screen(&bot, msg.chat.id, Screen { text: report, ..menu }).await
        }
        screens::BY_LEARNER => {
            let report = screens::learner_report(&lab.questions, &roster);
            send_screen(&bot, msg.chat.id, Screen { text: report, ..menu }).await
        }
        screens::SIGN_OUT => {
            log::info!("Instructor {} signed out", email);
            dialogue.update(State::InstructorEmail).await?;
            send_screen(&bot, msg.chat.id, screens::instructor_sign_in(&lab.instructor_domain, None)).await
        }
        screens::BACK => leave_instructor_view(&bot, &dialogue, msg.chat.id, &lab).await,
        _ => send_screen(&bot, msg.chat.id, menu).await,
    }
}

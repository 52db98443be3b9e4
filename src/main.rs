mod bot;
mod config;
mod identity;
mod instructor;
mod quiz;
mod storage;

use std::sync::Arc;

use bot::{Lab, State};
use chatgpt::client::ChatGPT;
use chatgpt::config::ModelConfiguration;
use config::Config;
use dotenv::dotenv;
use instructor::LoggedPasscodes;
use quiz::ai_helper::QuizHelper;
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, InMemStorage, SqliteStorage, Storage},
    prelude::*,
};

type DialogueStorage = Arc<ErasedStorage<State>>;

#[tokio::main]
async fn main() {
    // Loaded before the logger so RUST_LOG may come from .env
    let dotenv_loaded = dotenv().is_ok();

    pretty_env_logger::init();
    log::info!("Starting Sapir-Whorf check-in bot...");
    if !dotenv_loaded {
        log::debug!("No .env file found, using the process environment");
    }

    let Config {
        chatgpt_api_key,
        engine,
        grading_timeout,
        data_dir,
        dialogue_db,
        instructor_domain,
    } = Config::from_env();

    let helper = match chatgpt_api_key {
        None => {
            log::error!("CHATGPT_API_KEY is not set, every answer will get the fallback feedback");
            QuizHelper::disabled()
        }
        Some(key) => match ChatGPT::new_with_config(
            key,
            ModelConfiguration {
                engine,
                timeout: grading_timeout,
                ..Default::default()
            },
        ) {
            Ok(gpt) => QuizHelper::new(gpt),
            Err(e) => {
                log::error!("Unable to set up ChatGPT, grading is disabled: {}", e);
                QuizHelper::disabled()
            }
        },
    };

    let records: Arc<dyn storage::Storage> = match storage::JsonFileStore::open(&data_dir) {
        Ok(store) => {
            log::info!("Keeping records in {}", data_dir.display());
            Arc::new(store)
        }
        Err(e) => {
            log::error!(
                "Cannot use {} ({}), records will only live in memory",
                data_dir.display(),
                e
            );
            Arc::new(storage::MemoryStore::new())
        }
    };

    log::info!("Opening the dialogue database {}", dialogue_db);
    let dialogues: DialogueStorage = match SqliteStorage::open(&dialogue_db, Json).await {
        Ok(storage) => storage.erase(),
        Err(e) => {
            log::error!("Cannot open {} ({}), dialogues will only live in memory", dialogue_db, e);
            InMemStorage::<State>::new().erase()
        }
    };

    let lab = Arc::new(Lab::new(
        quiz::bank::questions(),
        records,
        helper,
        Arc::new(LoggedPasscodes::new()),
        instructor_domain,
    ));

    let bot = Bot::from_env();

    Dispatcher::builder(bot, bot::schema())
        .dependencies(dptree::deps![dialogues, lab])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

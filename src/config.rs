use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chatgpt::config::ChatGPTEngine;

pub const DEFAULT_INSTRUCTOR_DOMAIN: &str = "@ri.edu.sg";

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` degrades every grading call to the fallback feedback.
    pub chatgpt_api_key: Option<String>,
    pub engine: ChatGPTEngine,
    pub grading_timeout: Duration,
    pub data_dir: PathBuf,
    pub dialogue_db: String,
    pub instructor_domain: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let engine = match var("LAB_GRADING_ENGINE").as_deref() {
            None | Some("gpt-3.5-turbo") => ChatGPTEngine::Gpt35Turbo,
            Some("gpt-4") => ChatGPTEngine::Gpt4,
            Some(other) => {
                log::warn!("Unknown LAB_GRADING_ENGINE {:?}, using gpt-3.5-turbo", other);
                ChatGPTEngine::Gpt35Turbo
            }
        };

        Self {
            chatgpt_api_key: var("CHATGPT_API_KEY"),
            engine,
            grading_timeout: Duration::from_secs(parse_or(var("LAB_GRADING_TIMEOUT_SECS"), 15)),
            data_dir: var("LAB_DATA_DIR").unwrap_or_else(|| "data".to_string()).into(),
            dialogue_db: var("LAB_DIALOGUE_DB").unwrap_or_else(|| "db.sqlite".to_string()),
            instructor_domain: var("LAB_INSTRUCTOR_DOMAIN")
                .unwrap_or_else(|| DEFAULT_INSTRUCTOR_DOMAIN.to_string()),
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    match value {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring unparseable value {:?}", raw);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = config(&[]);
        assert_eq!(config.chatgpt_api_key, None);
        assert_eq!(config.grading_timeout, Duration::from_secs(15));
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.dialogue_db, "db.sqlite");
        assert_eq!(config.instructor_domain, "@ri.edu.sg");
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        assert_eq!(config(&[("CHATGPT_API_KEY", "  ")]).chatgpt_api_key, None);
        assert_eq!(
            config(&[("CHATGPT_API_KEY", "sk-test")]).chatgpt_api_key.as_deref(),
            Some("sk-test")
        );
    }

    #[test]
    fn bad_numbers_fall_back_to_defaults() {
        let config = config(&[("LAB_GRADING_TIMEOUT_SECS", "soon"), ("LAB_DATA_DIR", "/tmp/lab")]);
        assert_eq!(config.grading_timeout, Duration::from_secs(15));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/lab"));
    }
}

//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{session::SessionPolicy, state_machine::Timings};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BUZZER_QUIZ_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// JSON array of questions loaded at startup.
    pub question_bank_path: PathBuf,
    /// JSON document remembering which questions were asked.
    pub usage_history_path: PathBuf,
    /// Per-question countdown, in seconds.
    pub countdown_secs: u32,
    /// Delay between the game start and the first question.
    pub first_question_delay: Duration,
    /// Delay between a timeout and the automatic reveal.
    pub reveal_delay: Duration,
    /// Length of freshly minted room identifiers.
    pub room_id_length: usize,
    /// Highest slot a follower can be assigned.
    pub max_follower_slot: u32,
    /// Buffer of each participant's SSE hub.
    pub sse_capacity: usize,
    /// Buffer of each room channel.
    pub room_capacity: usize,
    /// Base URL share links point to.
    pub public_base_url: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|err| {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse config; falling back to defaults"
                );
                Self::default()
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document; missing keys keep their default.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        let raw = serde_json::from_str::<RawConfig>(contents)?;
        let config: Self = raw.into();
        info!(
            bank = %config.question_bank_path.display(),
            countdown_secs = config.countdown_secs,
            "loaded configuration"
        );
        Ok(config)
    }

    /// Game timing constants derived from the configuration.
    pub fn timings(&self) -> Timings {
        Timings {
            countdown_secs: self.countdown_secs,
            first_question_delay: self.first_question_delay,
            reveal_delay: self.reveal_delay,
            ..Timings::default()
        }
    }

    /// Room and slot allocation policy.
    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            room_id_length: self.room_id_length,
            max_follower_slot: self.max_follower_slot,
        }
    }

    /// Link inviting others into `room`.
    pub fn share_url(&self, room: &str) -> String {
        let base = self.public_base_url.trim_end_matches('/');
        format!("{base}/?room={room}")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    question_bank_path: PathBuf,
    usage_history_path: PathBuf,
    countdown_secs: u32,
    first_question_delay_ms: u64,
    reveal_delay_ms: u64,
    room_id_length: usize,
    max_follower_slot: u32,
    sse_capacity: usize,
    room_capacity: usize,
    public_base_url: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            question_bank_path: PathBuf::from("data/questions.json"),
            usage_history_path: PathBuf::from("data/usage.json"),
            countdown_secs: 20,
            first_question_delay_ms: 1000,
            reveal_delay_ms: 1000,
            room_id_length: 6,
            max_follower_slot: 3,
            sse_capacity: 64,
            room_capacity: 64,
            public_base_url: "http://localhost:8080".into(),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            question_bank_path: value.question_bank_path,
            usage_history_path: value.usage_history_path,
            countdown_secs: value.countdown_secs.max(1),
            first_question_delay: Duration::from_millis(value.first_question_delay_ms),
            reveal_delay: Duration::from_millis(value.reveal_delay_ms),
            room_id_length: value.room_id_length.clamp(4, 32),
            max_follower_slot: value.max_follower_slot.max(2),
            sse_capacity: value.sse_capacity.max(1),
            room_capacity: value.room_capacity.max(1),
            public_base_url: value.public_base_url,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_game_rules() {
        let config = AppConfig::default();
        let timings = config.timings();

        assert_eq!(timings.countdown_secs, 20);
        assert_eq!(timings.warning_secs, 5);
        assert_eq!(timings.first_question_delay, Duration::from_secs(1));
        assert_eq!(timings.reveal_delay, Duration::from_secs(1));
        assert_eq!(config.session_policy().room_id_length, 6);
        assert_eq!(config.session_policy().max_follower_slot, 3);
    }

    #[test]
    fn partial_documents_keep_remaining_defaults() {
        let config = AppConfig::from_json(
            r#"{"countdown_secs": 30, "public_base_url": "https://quiz.example/"}"#,
        )
        .unwrap();

        assert_eq!(config.countdown_secs, 30);
        assert_eq!(config.reveal_delay, Duration::from_secs(1));
        assert_eq!(
            config.share_url("ABC123"),
            "https://quiz.example/?room=ABC123"
        );
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config =
            AppConfig::from_json(r#"{"countdown_secs": 0, "max_follower_slot": 1}"#).unwrap();
        assert_eq!(config.countdown_secs, 1);
        assert_eq!(config.max_follower_slot, 2);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(AppConfig::from_json(r#"{"countdown_secs": "soon"}"#).is_err());
    }
}

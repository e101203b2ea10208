use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bot::catalog::{Catalog, CatalogError};
use crate::bot::presenter::{Presenter, PresenterError, Referral};
use crate::bot::transport::KeyboardRows;

/// Environment variable consulted when the config file carries no token.
pub const TOKEN_ENV: &str = "TG_API_BOT_TOKEN";

const DEFAULT_GREETING: &str =
    "Press a button to get a voice message, or use the referral link.";
const DEFAULT_REFUSAL: &str = "Pick another voice message";
const DEFAULT_MENU_CLEARED: &str = "Menu hidden. Send /start to bring it back.";

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// No token in the file nor in the environment.
    MissingToken,
    /// Trigger list is malformed or references missing voice files.
    Catalog(CatalogError),
    /// Keyboard or referral settings don't agree with the trigger list.
    Keyboard(PresenterError),
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::MissingToken => write!(
                f,
                "telegram_bot_token is required (set it in the config file or {})",
                TOKEN_ENV
            ),
            Self::Catalog(e) => write!(f, "invalid triggers: {}", e),
            Self::Keyboard(e) => write!(f, "invalid keyboard: {}", e),
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Catalog(e) => Some(e),
            Self::Keyboard(e) => Some(e),
            Self::MissingToken | Self::Validation(_) => None,
        }
    }
}

impl From<CatalogError> for ConfigError {
    fn from(e: CatalogError) -> Self {
        Self::Catalog(e)
    }
}

impl From<PresenterError> for ConfigError {
    fn from(e: PresenterError) -> Self {
        Self::Keyboard(e)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TriggerEntry {
    text: String,
    /// Voice file, relative to `assets_dir` unless absolute.
    voice: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ReferralEntry {
    label: String,
    base_url: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    telegram_bot_token: String,
    /// Base directory for voice files. Defaults to the config file's directory.
    assets_dir: Option<String>,
    triggers: Vec<TriggerEntry>,
    #[serde(default = "default_repeat_limit")]
    repeat_limit: u32,
    greeting: Option<String>,
    refusal_text: Option<String>,
    menu_cleared_text: Option<String>,
    /// Button rows for /start. Derived from `triggers` when absent.
    keyboard: Option<KeyboardRows>,
    referral: Option<ReferralEntry>,
    #[serde(default = "default_state_idle_ttl_secs")]
    state_idle_ttl_secs: u64,
    #[serde(default = "default_state_max_conversations")]
    state_max_conversations: u64,
    /// Directory for state files (logs). Defaults to current directory.
    data_dir: Option<String>,
}

fn default_repeat_limit() -> u32 {
    3
}

fn default_state_idle_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_state_max_conversations() -> u64 {
    100_000
}

pub struct Config {
    pub telegram_bot_token: String,
    pub catalog: Catalog,
    pub presenter: Presenter,
    /// Largest number of identical clips sent in a row.
    pub repeat_limit: u32,
    pub refusal_text: String,
    pub state_idle_ttl: Duration,
    pub state_max_conversations: u64,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
}

impl Config {
    /// Load and validate the config file, falling back to `TG_API_BOT_TOKEN`
    /// for the token. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_token(path, std::env::var(TOKEN_ENV).ok())
    }

    fn load_with_token<P: AsRef<Path>>(path: P, env_token: Option<String>) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        let telegram_bot_token = if file.telegram_bot_token.is_empty() {
            env_token.filter(|t| !t.is_empty()).ok_or(ConfigError::MissingToken)?
        } else {
            file.telegram_bot_token
        };
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }

        if file.repeat_limit == 0 {
            return Err(ConfigError::Validation("repeat_limit must be at least 1".into()));
        }
        if file.state_idle_ttl_secs == 0 {
            return Err(ConfigError::Validation("state_idle_ttl_secs must be positive".into()));
        }
        if file.state_max_conversations == 0 {
            return Err(ConfigError::Validation("state_max_conversations must be positive".into()));
        }

        let assets_dir = match file.assets_dir {
            Some(dir) => PathBuf::from(dir),
            None => config_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        let catalog = Catalog::new(
            file.triggers
                .into_iter()
                .map(|t| (t.text, assets_dir.join(t.voice))),
        )?;
        catalog.verify_assets()?;

        let referral = file.referral.map(|r| Referral {
            label: r.label,
            base_url: r.base_url,
            text: r.text,
        });
        let presenter = Presenter::new(
            &catalog,
            file.greeting.unwrap_or_else(|| DEFAULT_GREETING.to_string()),
            file.menu_cleared_text.unwrap_or_else(|| DEFAULT_MENU_CLEARED.to_string()),
            file.keyboard,
            referral,
        )?;

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token,
            catalog,
            presenter,
            repeat_limit: file.repeat_limit,
            refusal_text: file.refusal_text.unwrap_or_else(|| DEFAULT_REFUSAL.to_string()),
            state_idle_ttl: Duration::from_secs(file.state_idle_ttl_secs),
            state_max_conversations: file.state_max_conversations,
            data_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TOKEN: &str = "123456789:ABCdefGHIjklMNOpqrsTUVwxyz";

    /// Temp dir with `voice/hi.ogg` and `voice/bye.ogg`.
    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("voice")).unwrap();
        std::fs::write(dir.path().join("voice/hi.ogg"), b"OggS").unwrap();
        std::fs::write(dir.path().join("voice/bye.ogg"), b"OggS").unwrap();
        dir
    }

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("voicebot.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn load(dir: &TempDir, content: &str) -> Result<Config, ConfigError> {
        Config::load_with_token(write_config(dir, content), None)
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config_with_defaults() {
        let dir = fixture();
        let config = load(&dir, &format!(r#"{{
            "telegram_bot_token": "{TOKEN}",
            "triggers": [
                {{ "text": "hi", "voice": "voice/hi.ogg" }},
                {{ "text": "bye", "voice": "voice/bye.ogg" }}
            ]
        }}"#)).expect("should load valid config");

        assert_eq!(config.repeat_limit, 3);
        assert_eq!(config.catalog.len(), 2);
        assert_eq!(
            config.catalog.lookup("hi").unwrap().asset.path(),
            dir.path().join("voice/hi.ogg")
        );
        assert_eq!(config.refusal_text, DEFAULT_REFUSAL);
        assert_eq!(config.state_idle_ttl, Duration::from_secs(86_400));
        assert_eq!(config.state_max_conversations, 100_000);
        assert_eq!(config.presenter.keyboard(), &vec![vec!["hi".to_string(), "bye".to_string()]]);
        assert!(config.presenter.referral().is_none());
    }

    #[test]
    fn test_full_config() {
        let dir = fixture();
        let config = load(&dir, &format!(r#"{{
            "telegram_bot_token": "{TOKEN}",
            "assets_dir": "{}",
            "triggers": [
                {{ "text": "hi", "voice": "hi.ogg" }},
                {{ "text": "bye", "voice": "bye.ogg" }}
            ],
            "repeat_limit": 5,
            "greeting": "yo",
            "refusal_text": "enough",
            "keyboard": [["bye"], ["hi", "Referral"]],
            "referral": {{ "label": "Referral", "base_url": "https://example.com/r", "text": "Link:" }},
            "state_idle_ttl_secs": 60,
            "state_max_conversations": 10
        }}"#, dir.path().join("voice").display())).expect("should load full config");

        assert_eq!(config.repeat_limit, 5);
        assert_eq!(config.refusal_text, "enough");
        assert_eq!(config.presenter.greeting(), "yo");
        assert_eq!(config.presenter.keyboard()[1], vec!["hi".to_string(), "Referral".to_string()]);
        assert_eq!(config.presenter.referral().unwrap().base_url, "https://example.com/r");
        assert_eq!(config.state_idle_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_token_from_env_fallback() {
        let dir = fixture();
        let path = write_config(&dir, r#"{ "triggers": [{ "text": "hi", "voice": "voice/hi.ogg" }] }"#);

        let config = Config::load_with_token(&path, Some(TOKEN.to_string())).unwrap();
        assert_eq!(config.telegram_bot_token, TOKEN);

        let err = assert_err(Config::load_with_token(&path, None));
        assert!(matches!(err, ConfigError::MissingToken));
        assert!(err.to_string().contains(TOKEN_ENV));
    }

    #[test]
    fn test_invalid_token_format() {
        let dir = fixture();
        for token in ["invalid_token_no_colon", "notanumber:ABCdef", "123456789:"] {
            let err = assert_err(load(&dir, &format!(r#"{{
                "telegram_bot_token": "{token}",
                "triggers": [{{ "text": "hi", "voice": "voice/hi.ogg" }}]
            }}"#)));
            assert!(matches!(err, ConfigError::Validation(_)), "token {token}");
        }
    }

    #[test]
    fn test_missing_voice_file() {
        let dir = fixture();
        let err = assert_err(load(&dir, &format!(r#"{{
            "telegram_bot_token": "{TOKEN}",
            "triggers": [{{ "text": "hi", "voice": "voice/nope.ogg" }}]
        }}"#)));
        assert!(matches!(err, ConfigError::Catalog(CatalogError::MissingAsset { .. })));
        assert!(err.to_string().contains("nope.ogg"));
    }

    #[test]
    fn test_empty_triggers() {
        let dir = fixture();
        let err = assert_err(load(&dir, &format!(r#"{{
            "telegram_bot_token": "{TOKEN}",
            "triggers": []
        }}"#)));
        assert!(matches!(err, ConfigError::Catalog(CatalogError::Empty)));
    }

    #[test]
    fn test_keyboard_with_unknown_button() {
        let dir = fixture();
        let err = assert_err(load(&dir, &format!(r#"{{
            "telegram_bot_token": "{TOKEN}",
            "triggers": [{{ "text": "hi", "voice": "voice/hi.ogg" }}],
            "keyboard": [["hi", "hello"]]
        }}"#)));
        assert!(matches!(err, ConfigError::Keyboard(PresenterError::UnknownButton(_))));
    }

    #[test]
    fn test_zero_repeat_limit() {
        let dir = fixture();
        let err = assert_err(load(&dir, &format!(r#"{{
            "telegram_bot_token": "{TOKEN}",
            "triggers": [{{ "text": "hi", "voice": "voice/hi.ogg" }}],
            "repeat_limit": 0
        }}"#)));
        assert!(err.to_string().contains("repeat_limit"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = fixture();
        let err = assert_err(load(&dir, &format!(r#"{{
            "telegram_bot_token": "{TOKEN}",
            "triggers": [{{ "text": "hi", "voice": "voice/hi.ogg" }}],
            "repeat_limt": 4
        }}"#)));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }

    #[test]
    fn test_unknown_nested_field_rejected() {
        let dir = fixture();
        let err = assert_err(load(&dir, &format!(r#"{{
            "telegram_bot_token": "{TOKEN}",
            "triggers": [{{ "text": "hi", "voice": "voice/hi.ogg" }}],
            "referral": {{ "label": "Referral", "base_url": "https://example.com/r", "txt": "Link:" }}
        }}"#)));
        assert!(matches!(err, ConfigError::ParseJson { .. }));

        let err = assert_err(load(&dir, &format!(r#"{{
            "telegram_bot_token": "{TOKEN}",
            "triggers": [{{ "text": "hi", "voice": "voice/hi.ogg", "voise": "x.ogg" }}]
        }}"#)));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/voicebot.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let dir = fixture();
        let err = assert_err(load(&dir, "{ invalid json }"));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}

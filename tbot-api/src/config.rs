//! Connection and polling config. Loaded from env: BOT_TOKEN, TELEGRAM_API_URL,
//! TELEGRAM_POLL_TIMEOUT_SECS, TELEGRAM_POLL_LIMIT, LOG_FILE.

use anyhow::Result;
use std::env;

use crate::client::{ApiClient, DEFAULT_API_URL};
use crate::methods::GetUpdates;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bot_token: String,
    pub telegram_api_url: Option<String>,
    /// Long-poll timeout passed to getUpdates.
    pub poll_timeout_secs: u32,
    /// getUpdates page size; 0 leaves it to the server.
    pub poll_limit: u32,
    pub log_file: String,
}

impl ApiConfig {
    /// Loads from env. `token` overrides BOT_TOKEN when given.
    pub fn from_env(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(t) => t,
            None => env::var("BOT_TOKEN").map_err(|_| anyhow::anyhow!("BOT_TOKEN not set"))?,
        };
        let telegram_api_url = env::var("TELEGRAM_API_URL").ok();
        let poll_timeout_secs = parse_var("TELEGRAM_POLL_TIMEOUT_SECS", 30)?;
        let poll_limit = parse_var("TELEGRAM_POLL_LIMIT", 0)?;
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/tbot.log".to_string());

        let config = Self {
            bot_token,
            telegram_api_url,
            poll_timeout_secs,
            poll_limit,
            log_file,
        };
        config.validate()?;
        Ok(config)
    }

    /// Config with the given token and defaults elsewhere.
    pub fn with_token(bot_token: String) -> Self {
        Self {
            bot_token,
            telegram_api_url: None,
            poll_timeout_secs: 30,
            poll_limit: 0,
            log_file: "logs/tbot.log".to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bot_token.is_empty() {
            anyhow::bail!("BOT_TOKEN is empty");
        }
        if let Some(ref url_str) = self.telegram_api_url {
            if reqwest::Url::parse(url_str).is_err() {
                anyhow::bail!("TELEGRAM_API_URL is set but not a valid URL: {}", url_str);
            }
        }
        if self.poll_limit > 100 {
            anyhow::bail!(
                "TELEGRAM_POLL_LIMIT must be between 1 and 100 (0 for server default), got {}",
                self.poll_limit
            );
        }
        Ok(())
    }

    pub fn api_client(&self) -> ApiClient {
        ApiClient::new(self.bot_token.clone())
            .with_api_url(self.telegram_api_url.as_deref().unwrap_or(DEFAULT_API_URL))
    }

    /// First page request of a poll loop starting at `offset`.
    pub fn get_updates(&self, offset: i64) -> GetUpdates {
        GetUpdates::new(offset)
            .with_limit(self.poll_limit)
            .with_timeout(self.poll_timeout_secs)
    }
}

fn parse_var(name: &str, default: u32) -> Result<u32> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer, got {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "BOT_TOKEN",
            "TELEGRAM_API_URL",
            "TELEGRAM_POLL_TIMEOUT_SECS",
            "TELEGRAM_POLL_LIMIT",
            "LOG_FILE",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn test_with_token() {
        let config = ApiConfig::with_token("test_token".to_string());
        assert_eq!(config.bot_token, "test_token");
        assert!(config.telegram_api_url.is_none());
        assert_eq!(config.poll_timeout_secs, 30);
        assert_eq!(config.poll_limit, 0);
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        env::set_var("BOT_TOKEN", "env_token");

        let config = ApiConfig::from_env(None).unwrap();
        assert_eq!(config.bot_token, "env_token");
        assert_eq!(config.log_file, "logs/tbot.log");
        assert_eq!(config.get_updates(7), GetUpdates::new(7));
    }

    #[test]
    #[serial]
    fn test_from_env_custom_values() {
        clear_env();
        env::set_var("TELEGRAM_API_URL", "http://localhost:8081");
        env::set_var("TELEGRAM_POLL_TIMEOUT_SECS", "50");
        env::set_var("TELEGRAM_POLL_LIMIT", "20");

        let config = ApiConfig::from_env(Some("override".to_string())).unwrap();
        assert_eq!(config.bot_token, "override");
        assert_eq!(config.poll_timeout_secs, 50);
        let req = config.get_updates(0);
        assert_eq!(req.limit, 20);
        assert_eq!(req.timeout, 50);
        assert_eq!(
            config.api_client().method_url("getMe"),
            "http://localhost:8081/botoverride/getMe"
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_missing_token() {
        clear_env();
        assert!(ApiConfig::from_env(None).is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_values() {
        clear_env();
        env::set_var("TELEGRAM_POLL_LIMIT", "101");
        assert!(ApiConfig::from_env(Some("t".to_string())).is_err());

        env::set_var("TELEGRAM_POLL_LIMIT", "ten");
        assert!(ApiConfig::from_env(Some("t".to_string())).is_err());

        env::remove_var("TELEGRAM_POLL_LIMIT");
        env::set_var("TELEGRAM_API_URL", "not a url");
        assert!(ApiConfig::from_env(Some("t".to_string())).is_err());
        clear_env();
    }
}

use std::env;
use std::time::Duration;

use crate::error::TimelineError;

/// Per-platform OAuth client credentials, present only when both
/// `{PLATFORM}_CLIENT_ID` and `{PLATFORM}_CLIENT_SECRET` are set.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Process-wide configuration, resolved once at startup and handed down
/// as an `Arc` to every component that needs it. Never mutated after
/// construction.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub encryption_key: String,
    pub app_url: String,
    pub frontend_url: String,
    pub database_url: Option<String>,
    pub tick_interval: Duration,
    pub tick_budget: Duration,
    pub max_concurrent_fetches: usize,
    pub github: Option<OAuthClientConfig>,
    pub bluesky: Option<OAuthClientConfig>,
    pub youtube: Option<OAuthClientConfig>,
    pub reddit: Option<OAuthClientConfig>,
    pub twitter: Option<OAuthClientConfig>,
    pub linear: Option<OAuthClientConfig>,
}

const MIN_KEY_BYTES: usize = 32;

impl AppConfig {
    /// Resolves configuration from the environment, per the key table
    /// documented alongside this crate. Fails eagerly so a misconfigured
    /// deployment never gets past startup.
    pub fn from_env() -> Result<Self, TimelineError> {
        let encryption_key = env::var("ENCRYPTION_KEY")
            .map_err(|_| TimelineError::Validation("ENCRYPTION_KEY is required".into()))?;
        if encryption_key.len() < MIN_KEY_BYTES {
            return Err(TimelineError::Validation(format!(
                "ENCRYPTION_KEY must be at least {MIN_KEY_BYTES} bytes"
            )));
        }

        let app_url = env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8787".into());
        let frontend_url = env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:4321".into());
        let database_url = env::var("DATABASE_URL").ok();

        let tick_interval = Duration::from_secs(parse_u64_env("TICK_INTERVAL_SECONDS", 300)?);
        let tick_budget = Duration::from_secs(parse_u64_env("TICK_BUDGET_SECONDS", 240)?);
        let max_concurrent_fetches = parse_u64_env("MAX_CONCURRENT_FETCHES", 16)? as usize;

        Ok(Self {
            encryption_key,
            app_url,
            frontend_url,
            database_url,
            tick_interval,
            tick_budget,
            max_concurrent_fetches,
            github: oauth_client_from_env("GITHUB"),
            bluesky: oauth_client_from_env("BLUESKY"),
            youtube: oauth_client_from_env("YOUTUBE"),
            reddit: oauth_client_from_env("REDDIT"),
            twitter: oauth_client_from_env("TWITTER"),
            linear: oauth_client_from_env("LINEAR"),
        })
    }
}

fn parse_u64_env(key: &str, default: u64) -> Result<u64, TimelineError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| TimelineError::Validation(format!("{key} must be a non-negative integer"))),
        Err(_) => Ok(default),
    }
}

fn oauth_client_from_env(prefix: &str) -> Option<OAuthClientConfig> {
    let client_id = env::var(format!("{prefix}_CLIENT_ID")).ok()?;
    let client_secret = env::var(format!("{prefix}_CLIENT_SECRET")).ok()?;
    Some(OAuthClientConfig { client_id, client_secret })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "ENCRYPTION_KEY",
            "APP_URL",
            "FRONTEND_URL",
            "DATABASE_URL",
            "TICK_INTERVAL_SECONDS",
            "TICK_BUDGET_SECONDS",
            "MAX_CONCURRENT_FETCHES",
            "GITHUB_CLIENT_ID",
            "GITHUB_CLIENT_SECRET",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn missing_encryption_key_is_a_startup_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        assert!(AppConfig::from_env().is_err());
    }

    #[test]
    fn short_encryption_key_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("ENCRYPTION_KEY", "tooshort");
        assert!(AppConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    fn defaults_apply_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("ENCRYPTION_KEY", "a".repeat(32));
        let cfg = AppConfig::from_env().unwrap();
        assert_eq!(cfg.tick_interval, Duration::from_secs(300));
        assert_eq!(cfg.max_concurrent_fetches, 16);
        assert!(cfg.github.is_none());
        clear_env();
    }

    #[test]
    fn oauth_client_requires_both_keys() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("ENCRYPTION_KEY", "a".repeat(32));
        env::set_var("GITHUB_CLIENT_ID", "id");
        let cfg = AppConfig::from_env().unwrap();
        assert!(cfg.github.is_none());
        env::set_var("GITHUB_CLIENT_SECRET", "secret");
        let cfg = AppConfig::from_env().unwrap();
        assert!(cfg.github.is_some());
        clear_env();
    }
}

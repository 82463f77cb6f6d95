//! lunes-keepalive
//!
//! Automated login keep-alive for the Lunes hosting dashboard. Logs in with
//! one or more accounts sequentially, waits out the Cloudflare Turnstile
//! widget on the login form, classifies each attempt, and sends one
//! aggregate Telegram report per run.

pub mod accounts;
pub mod batch;
pub mod browser;
pub mod challenge;
pub mod login;
pub mod notify;

use std::path::PathBuf;
use std::time::Duration;

use notify::TelegramConfig;

/// Default login page
pub const DEFAULT_LOGIN_URL: &str = "https://betadash.lunes.host/";

/// Application configuration
///
/// Constructed once at process entry and passed into the core by reference;
/// nothing below `main` reads the environment.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Login page URL
    pub login_url: String,
    /// Run Chrome headless
    pub headless: bool,
    /// Navigation timeout in seconds
    pub nav_timeout_secs: u64,
    /// Settle delay after navigation, in milliseconds
    pub settle_delay_ms: u64,
    /// Delay after each field fill, in milliseconds
    pub fill_delay_ms: u64,
    /// Turnstile resolution bound in seconds
    pub challenge_timeout_secs: u64,
    /// Submit-control wait bound in seconds
    pub submit_timeout_secs: u64,
    /// Post-submit terminal-state bound in seconds
    pub terminal_timeout_secs: u64,
    /// Delay between consecutive account attempts, in seconds
    pub pacing_delay_secs: u64,
    /// Where challenge-failure screenshots are written
    pub screenshot_dir: PathBuf,
    /// Telegram delivery settings
    pub telegram: TelegramConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            headless: true,
            nav_timeout_secs: 30,
            settle_delay_ms: 3000,
            fill_delay_ms: 1000,
            challenge_timeout_secs: 45,
            submit_timeout_secs: 15,
            terminal_timeout_secs: 30,
            pacing_delay_secs: 3,
            screenshot_dir: PathBuf::from("."),
            telegram: TelegramConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build the config from the environment. The only place env vars are
    /// read: `BOT_TOKEN`, `CHAT_ID`, plus optional `LUNES_URL` and
    /// `HEADLESS` overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("LUNES_URL") {
            if !url.is_empty() {
                config.login_url = url;
            }
        }
        if let Ok(headless) = std::env::var("HEADLESS") {
            config.headless = headless != "0" && !headless.eq_ignore_ascii_case("false");
        }

        config.telegram = TelegramConfig {
            token: std::env::var("BOT_TOKEN").ok().filter(|t| !t.is_empty()),
            chat_id: std::env::var("CHAT_ID").ok().filter(|c| !c.is_empty()),
        };

        config
    }

    pub fn nav_timeout(&self) -> Duration {
        Duration::from_secs(self.nav_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn fill_delay(&self) -> Duration {
        Duration::from_millis(self.fill_delay_ms)
    }

    pub fn challenge_timeout(&self) -> Duration {
        Duration::from_secs(self.challenge_timeout_secs)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn terminal_timeout(&self) -> Duration {
        Duration::from_secs(self.terminal_timeout_secs)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_secs(self.pacing_delay_secs)
    }
}

/// Get log directory path
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("lunes-keepalive").join("logs"))
}

/// Initialize tracing: console layer always, daily-rolling file layer when a
/// log directory is available. Keep the returned guard alive for the program
/// lifetime so buffered log lines flush.
pub fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    if let Some(log_dir) = log_dir() {
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "lunes-keepalive.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        None
    }
}

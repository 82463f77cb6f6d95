//! lunes-keepalive entry point
//!
//! Environment variables:
//! - `ACCOUNTS`   - credential list, `email1:password1,email2:password2`
//!                  (comma or semicolon separated) — required
//! - `BOT_TOKEN`  - Telegram bot token (notification skipped if unset)
//! - `CHAT_ID`    - Telegram chat id (notification skipped if unset)
//! - `LUNES_URL`  - login page override
//! - `HEADLESS`   - set to `0` or `false` to run Chrome with a window

use anyhow::bail;
use tracing::{error, info};

use lunes_keepalive::accounts::parse_accounts;
use lunes_keepalive::{batch, notify, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = lunes_keepalive::init_logging();

    info!("Starting lunes-keepalive");
    if let Some(dir) = lunes_keepalive::log_dir() {
        info!("Log files saved to: {}", dir.display());
    }

    let config = AppConfig::from_env();

    let raw_accounts = std::env::var("ACCOUNTS").unwrap_or_default();
    let accounts = parse_accounts(&raw_accounts);
    if accounts.is_empty() {
        error!("No valid accounts configured (expected ACCOUNTS=email1:password1,email2:password2)");
        bail!("no valid accounts configured");
    }

    info!("Found {} account(s) to log in", accounts.len());

    let report = batch::run_batch(&config, &accounts).await;
    let rendered = report.render();
    info!("\n{}", rendered);

    notify::send_report(&config.telegram, &rendered).await;

    info!("All accounts processed");
    Ok(())
}

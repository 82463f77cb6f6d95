//! Telegram notification delivery
//!
//! One aggregate message per run. Delivery is best-effort: missing
//! credentials skip it silently, transport failures are logged and swallowed
//! so the batch result is never affected.

use std::time::Duration;

use chrono::{FixedOffset, Utc};
use tracing::{info, warn};

/// Telegram delivery settings
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub chat_id: Option<String>,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        matches!((&self.token, &self.chat_id), (Some(t), Some(c)) if !t.is_empty() && !c.is_empty())
    }
}

/// Send the rendered batch report, wrapped in the notification header.
pub async fn send_report(config: &TelegramConfig, report: &str) {
    if !config.is_configured() {
        info!("Telegram not configured, skipping notification");
        return;
    }
    let (Some(token), Some(chat_id)) = (&config.token, &config.chat_id) else {
        return;
    };

    let text = format_message(report, hk_timestamp());

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!("Telegram client build failed: {}", e);
            return;
        }
    };

    let url = format!("https://api.telegram.org/bot{}/sendMessage", token);
    let body = serde_json::json!({
        "chat_id": chat_id,
        "text": text,
    });

    match client.post(&url).json(&body).send().await {
        Ok(response) if response.status().is_success() => {
            info!("Telegram notification sent");
        }
        Ok(response) => {
            warn!("Telegram notification rejected: HTTP {}", response.status());
        }
        Err(e) => {
            warn!("Telegram notification failed: {}", e);
        }
    }
}

/// Report timestamps are rendered in Hong Kong time (UTC+8)
fn hk_timestamp() -> String {
    let hk = FixedOffset::east_opt(8 * 3600).expect("static UTC+8 offset");
    Utc::now()
        .with_timezone(&hk)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn format_message(report: &str, timestamp: String) -> String {
    format!(
        "🎉 Lunes host login notification\n\nLogin time: {} HKT\n\n{}",
        timestamp, report
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_requires_both_token_and_chat_id() {
        assert!(!TelegramConfig::default().is_configured());
        assert!(!TelegramConfig {
            token: Some("t".into()),
            chat_id: None,
        }
        .is_configured());
        assert!(!TelegramConfig {
            token: Some(String::new()),
            chat_id: Some("c".into()),
        }
        .is_configured());
        assert!(TelegramConfig {
            token: Some("t".into()),
            chat_id: Some("c".into()),
        }
        .is_configured());
    }

    #[test]
    fn message_wraps_report_with_header_and_timestamp() {
        let message = format_message("📊 Login summary: 1/1 accounts succeeded", "2026-08-28 12:00:00".into());
        assert!(message.starts_with("🎉 Lunes host login notification\n\n"));
        assert!(message.contains("Login time: 2026-08-28 12:00:00 HKT"));
        assert!(message.ends_with("📊 Login summary: 1/1 accounts succeeded"));
    }

    #[test]
    fn timestamp_has_expected_shape() {
        let ts = hk_timestamp();
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[13..14], ":");
    }
}

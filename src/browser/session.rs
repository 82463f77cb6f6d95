//! Browser session management
//!
//! Handles launching and controlling one Chrome instance with one page.
//! Every session is exclusively owned by a single login attempt and torn
//! down (page first, then browser) before the next attempt starts.

use std::path::Path;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::BrowserError;
use crate::AppConfig;

/// Find a Chrome/Chromium executable on the system
fn find_chrome() -> Option<std::path::PathBuf> {
    let candidates: Vec<std::path::PathBuf> = if cfg!(target_os = "windows") {
        let mut paths = vec![
            std::path::PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            std::path::PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ];
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            paths.push(std::path::PathBuf::from(format!(
                r"{}\Google\Chrome\Application\chrome.exe",
                local
            )));
        }
        paths
    } else if cfg!(target_os = "macos") {
        vec![std::path::PathBuf::from(
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        )]
    } else {
        vec![
            std::path::PathBuf::from("/usr/bin/chromium"),
            std::path::PathBuf::from("/usr/bin/chromium-browser"),
            std::path::PathBuf::from("/usr/bin/google-chrome"),
            std::path::PathBuf::from("/usr/bin/google-chrome-stable"),
        ]
    };

    candidates.into_iter().find(|p| p.exists())
}

/// A browser session for one login attempt
pub struct BrowserSession {
    /// Display id (the account email)
    pub id: String,
    browser: Browser,
    page: Page,
    handler_task: tokio::task::JoinHandle<()>,
}

impl BrowserSession {
    /// Launch Chrome and open a blank page.
    pub async fn launch(config: &AppConfig, id: &str) -> Result<Self, BrowserError> {
        info!("Launching browser session {} (headless: {})", id, config.headless);

        // Fresh profile dir per attempt so no state leaks between accounts
        let user_data_dir = std::env::temp_dir()
            .join("lunes-keepalive")
            .join("browser_data")
            .join(id.replace(['/', '\\'], "_"));
        std::fs::create_dir_all(&user_data_dir)?;

        let mut builder = BrowserConfig::builder()
            // Required when running as root (e.g., in Docker or on a VPS)
            .no_sandbox()
            .user_data_dir(&user_data_dir)
            .window_size(1280, 800);

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(chrome_path) = find_chrome() {
            debug!("Auto-detected Chrome at: {}", chrome_path.display());
            builder = builder.chrome_executable(chrome_path);
        }

        let browser_config = builder.build().map_err(BrowserError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        // Drive CDP events in the background — when the stream ends, Chrome
        // has disconnected
        let id_owned = id.to_string();
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
            debug!("Session {} Chrome event handler ended", id_owned);
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        Ok(Self {
            id: id.to_string(),
            browser,
            page,
            handler_task,
        })
    }

    /// Navigate to a URL and wait for the navigation to settle, bounded.
    pub async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        debug!("Session {} navigating to: {}", self.id, url);

        tokio::time::timeout(timeout, self.page.goto(url))
            .await
            .map_err(|_| {
                BrowserError::Timeout(format!(
                    "navigation to {} timed out after {}s",
                    url,
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        tokio::time::timeout(timeout, self.page.wait_for_navigation())
            .await
            .map_err(|_| {
                BrowserError::Timeout(format!(
                    "navigation settle timed out after {}s",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        Ok(())
    }

    /// Execute JavaScript on the page with a bounded timeout.
    /// Returns `Value::Null` when the script produces no value.
    pub async fn evaluate(
        &self,
        script: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, BrowserError> {
        let result = tokio::time::timeout(timeout, self.page.evaluate(script))
            .await
            .map_err(|_| {
                BrowserError::Timeout(format!(
                    "script evaluation timed out after {}s",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| BrowserError::JavaScriptError(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    /// Capture a full-page PNG screenshot to `path`.
    pub async fn screenshot(&self, path: &Path) -> Result<(), BrowserError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        self.page
            .save_screenshot(params, path)
            .await
            .map_err(|e| BrowserError::ScreenshotFailed(e.to_string()))?;

        info!("Session {} screenshot saved to {}", self.id, path.display());
        Ok(())
    }

    /// Tear the session down: page first, then the browser process.
    /// Best-effort on every step so teardown never masks the attempt result.
    pub async fn close(mut self) {
        if let Err(e) = self.page.clone().close().await {
            debug!("Session {} page close failed: {}", self.id, e);
        }

        // Graceful close first, brief grace period for Chrome child processes,
        // then force kill so no zombie Chrome outlives the attempt
        if let Err(e) = self.browser.close().await {
            warn!("Session {} browser close failed: {}", self.id, e);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        let _ = self.browser.kill().await;

        self.handler_task.abort();
        debug!("Session {} closed", self.id);
    }
}

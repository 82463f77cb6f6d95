//! Per-account login driver and result classification
//!
//! `attempt` runs the whole login state machine for one account: navigate,
//! fill, wait for Turnstile, submit, classify. It never returns an error —
//! every failure is folded into a failed [`LoginOutcome`] so one bad account
//! can not abort the batch.

use std::time::Duration;

use tracing::{info, warn};

use crate::accounts::Account;
use crate::browser::{BrowserError, BrowserSession};
use crate::challenge;
use crate::AppConfig;

/// Fixed message for a Turnstile that never resolved
pub const VERIFICATION_FAILED_MESSAGE: &str = "Cloudflare verification failed or timed out.";

/// Fallback when the error element yields no text
const UNKNOWN_ERROR: &str = "unknown error";

/// Interval between terminal-state polls
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long each individual page probe may take
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of one login attempt
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LoginOutcome {
    pub email: String,
    pub success: bool,
    pub message: String,
}

impl LoginOutcome {
    pub fn success(email: &str) -> Self {
        Self {
            email: email.to_string(),
            success: true,
            message: format!("✅ {} login successful", email),
        }
    }

    pub fn failure(email: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            email: email.to_string(),
            success: false,
            message: format!("❌ {} login failed: {}", email, reason),
        }
    }
}

/// What the post-submit page shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageVerdict {
    /// `Manage Account` heading present
    pub success_heading: bool,
    /// Trimmed text of the first error/alert-styled element, if any
    pub error_text: Option<String>,
}

/// Map a probed verdict to the final outcome. The success heading is checked
/// first and wins even if an error-styled element happens to be present too.
pub fn classify(verdict: &PageVerdict, email: &str) -> LoginOutcome {
    if verdict.success_heading {
        return LoginOutcome::success(email);
    }

    let reason = verdict
        .error_text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNKNOWN_ERROR);
    LoginOutcome::failure(email, reason)
}

/// Run one complete login attempt. Never fails: browser, navigation,
/// challenge, and classification errors all fold into a failed outcome.
pub async fn attempt(config: &AppConfig, account: &Account) -> LoginOutcome {
    info!("Starting login attempt for {}", account.email);

    let session = match BrowserSession::launch(config, &account.email).await {
        Ok(session) => session,
        Err(e) => {
            warn!("{} browser launch failed: {}", account.email, e);
            return LoginOutcome::failure(&account.email, e);
        }
    };

    let outcome = match run_login(config, &session, account).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("{} login attempt errored: {}", account.email, e);
            LoginOutcome::failure(&account.email, e)
        }
    };

    // Teardown happens on every exit path before the next attempt starts
    session.close().await;
    outcome
}

async fn run_login(
    config: &AppConfig,
    session: &BrowserSession,
    account: &Account,
) -> Result<LoginOutcome, BrowserError> {
    info!("{} visiting {}", account.email, config.login_url);
    session.goto(&config.login_url, config.nav_timeout()).await?;
    // Extra settle delay for client-side rendering after network idle
    tokio::time::sleep(config.settle_delay()).await;

    info!("{} filling email", account.email);
    fill_field(
        session,
        r#"input[name="Email"], input[type="text"]"#,
        &account.email,
    )
    .await?;
    tokio::time::sleep(config.fill_delay()).await;

    info!("{} filling password", account.email);
    fill_field(
        session,
        r#"input[name="Password"], input[type="password"]"#,
        &account.password,
    )
    .await?;
    tokio::time::sleep(config.fill_delay()).await;

    info!("{} waiting for Cloudflare verification", account.email);
    match challenge::wait_for_challenge(session, config.challenge_timeout()).await {
        Ok(()) => info!("{} Cloudflare verification passed", account.email),
        Err(e) => {
            warn!("{} Cloudflare verification failed: {}", account.email, e);
            let path = config
                .screenshot_dir
                .join(format!("cloudflare_error_{}.png", account.email));
            if let Err(shot_err) = session.screenshot(&path).await {
                warn!("{} evidence screenshot failed: {}", account.email, shot_err);
            }
            return Ok(LoginOutcome::failure(
                &account.email,
                VERIFICATION_FAILED_MESSAGE,
            ));
        }
    }

    info!("{} submitting login form", account.email);
    click_submit(session, config.submit_timeout()).await?;

    // Race both terminal markers with one bounded polling predicate so only
    // a single wait can fire
    wait_for_terminal(session, config.terminal_timeout()).await?;

    let verdict = read_verdict(session).await?;
    let outcome = classify(&verdict, &account.email);
    if outcome.success {
        info!("{} login successful", account.email);
    } else {
        warn!("{} login failed: {}", account.email, outcome.message);
    }
    Ok(outcome)
}

/// Fill an input via in-page JS, dispatching input/change events so
/// client-side validation stays in sync.
async fn fill_field(
    session: &BrowserSession,
    selector: &str,
    value: &str,
) -> Result<(), BrowserError> {
    let script = format!(
        r#"
        (function() {{
            const el = document.querySelector('{selector}');
            if (!el) return false;
            el.focus();
            el.value = "{}";
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
        }})()
        "#,
        escape_js(value),
    );

    let filled = session.evaluate(&script, PROBE_TIMEOUT).await?;
    if filled.as_bool() != Some(true) {
        return Err(BrowserError::ElementNotFound(selector.to_string()));
    }
    Ok(())
}

/// Find and click the submit control, polling until it appears.
async fn click_submit(session: &BrowserSession, bound: Duration) -> Result<(), BrowserError> {
    let script = r#"
        (function() {
            const byText = Array.from(document.querySelectorAll('button'))
                .find(b => b.textContent.trim() === 'Submit');
            const el = byText || document.querySelector('input[type="submit"]');
            if (!el) return false;
            el.click();
            return true;
        })()
    "#;

    poll_until(session, script, bound, "submit control").await
}

/// Wait for either terminal marker: the success heading or an
/// error/alert-styled element.
async fn wait_for_terminal(session: &BrowserSession, bound: Duration) -> Result<(), BrowserError> {
    let script = r#"
        (function() {
            const success = Array.from(document.querySelectorAll('h1'))
                .some(h => h.textContent.includes('Manage Account'));
            const error = !!document.querySelector('[class*="error"], [class*="alert"]');
            return success || error;
        })()
    "#;

    poll_until(session, script, bound, "post-submit success or error marker").await
}

/// Re-query the terminal page state for classification.
async fn read_verdict(session: &BrowserSession) -> Result<PageVerdict, BrowserError> {
    let script = r#"
        (function() {
            const success = Array.from(document.querySelectorAll('h1'))
                .some(h => h.textContent.includes('Manage Account'));
            const el = document.querySelector('[class*="error"], [class*="alert"]');
            return { success: success, error: el ? el.textContent.trim() : null };
        })()
    "#;

    let result = session.evaluate(script, PROBE_TIMEOUT).await?;
    Ok(PageVerdict {
        success_heading: result
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        error_text: result
            .get("error")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}

/// Poll a boolean predicate script until it returns true or `bound` elapses.
async fn poll_until(
    session: &BrowserSession,
    script: &str,
    bound: Duration,
    what: &str,
) -> Result<(), BrowserError> {
    let deadline = tokio::time::Instant::now() + bound;

    loop {
        if session.evaluate(script, PROBE_TIMEOUT).await?.as_bool() == Some(true) {
            return Ok(());
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(BrowserError::Timeout(format!(
                "{} not found within {}s",
                what,
                bound.as_secs()
            )));
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn escape_js(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

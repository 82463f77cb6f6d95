//! Cloudflare Turnstile detection
//!
//! The login form embeds a Turnstile widget in an iframe served from
//! `challenges.cloudflare.com`. The widget resolves asynchronously (or never,
//! under automated traffic), so resolution is detected by polling.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::browser::{BrowserError, BrowserSession};

/// Substring that identifies the challenge iframe's source
pub const CHALLENGE_FRAME_PATTERN: &str = "challenges.cloudflare.com";

/// Interval between widget polls
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long each individual probe evaluation may take
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// What a single poll of the widget observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    /// Widget passed, or no widget was rendered at all
    Resolved,
    /// Widget present but not yet passed (or its document is unreachable)
    Pending,
}

/// Wait until the Turnstile widget on the page resolves, bounded by
/// `config.challenge_timeout`.
pub async fn wait_for_challenge(
    session: &BrowserSession,
    bound: Duration,
) -> Result<(), BrowserError> {
    wait_for_challenge_with(|| probe_turnstile(session), bound).await
}

/// Poll `probe` until it reports [`ChallengeState::Resolved`] or `bound`
/// elapses. Generic over the probe so the loop is exercised without a
/// browser in tests.
pub async fn wait_for_challenge_with<F, Fut>(
    mut probe: F,
    bound: Duration,
) -> Result<(), BrowserError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ChallengeState, BrowserError>>,
{
    let deadline = tokio::time::Instant::now() + bound;

    loop {
        if probe().await? == ChallengeState::Resolved {
            return Ok(());
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(BrowserError::Timeout(format!(
                "challenge unresolved after {}s",
                bound.as_secs()
            )));
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// One poll of the page's Turnstile state.
///
/// No iframe at all counts as resolved: absence of the widget is not
/// distinguishable from "already passed". This is permissive on purpose —
/// it matches the dashboard's observed behavior, at the cost of masking a
/// late-rendering widget as a pass.
async fn probe_turnstile(session: &BrowserSession) -> Result<ChallengeState, BrowserError> {
    let script = format!(
        r#"
        (function() {{
            const iframe = document.querySelector('iframe[src*="{CHALLENGE_FRAME_PATTERN}"]');
            if (!iframe) {{
                return {{ resolved: true, frame: false }};
            }}
            let doc = null;
            try {{
                doc = iframe.contentDocument || (iframe.contentWindow && iframe.contentWindow.document);
            }} catch (e) {{
                // Cross-origin isolation: frame document not inspectable yet
            }}
            if (!doc) {{
                return {{ resolved: false, frame: true, reachable: false }};
            }}
            const passed = !!(doc.querySelector('#success-i') && doc.querySelector('#success-text'));
            return {{ resolved: passed, frame: true, reachable: true }};
        }})()
        "#
    );

    let result = session.evaluate(&script, PROBE_TIMEOUT).await?;

    let resolved = result
        .get("resolved")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let frame = result
        .get("frame")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    if resolved && !frame {
        debug!("Session {} no Turnstile iframe found, treating as passed", session.id);
    } else if resolved {
        debug!("Session {} Turnstile success markers present", session.id);
    }

    Ok(if resolved {
        ChallengeState::Resolved
    } else {
        ChallengeState::Pending
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn resolved_probe_returns_without_waiting() {
        let start = tokio::time::Instant::now();
        wait_for_challenge_with(
            || async { Ok(ChallengeState::Resolved) },
            Duration::from_secs(45),
        )
        .await
        .unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn unresolved_probe_times_out_at_bound() {
        let start = tokio::time::Instant::now();
        let err = wait_for_challenge_with(
            || async { Ok(ChallengeState::Pending) },
            Duration::from_secs(45),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BrowserError::Timeout(_)));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(45));
        assert!(elapsed < Duration::from_secs(46));
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_once_probe_flips() {
        let polls = AtomicUsize::new(0);
        let start = tokio::time::Instant::now();

        wait_for_challenge_with(
            || {
                let n = polls.fetch_add(1, Ordering::SeqCst);
                async move {
                    Ok(if n >= 3 {
                        ChallengeState::Resolved
                    } else {
                        ChallengeState::Pending
                    })
                }
            },
            Duration::from_secs(45),
        )
        .await
        .unwrap();

        assert_eq!(polls.load(Ordering::SeqCst), 4);
        assert!(start.elapsed() < Duration::from_secs(45));
    }

    #[tokio::test(start_paused = true)]
    async fn probe_error_propagates() {
        let err = wait_for_challenge_with(
            || async { Err::<ChallengeState, _>(BrowserError::ConnectionLost("gone".into())) },
            Duration::from_secs(45),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BrowserError::ConnectionLost(_)));
    }
}

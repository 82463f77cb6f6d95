//! Batch orchestration
//!
//! Runs login attempts strictly sequentially — the dashboard sits behind
//! Cloudflare and rate-limits bursts, so parallel attempts are
//! counter-productive. One outcome is accumulated per account, in input
//! order, and a single report is built after the final attempt.

use std::future::Future;
use std::time::Duration;

use tracing::info;

use crate::accounts::Account;
use crate::login::{self, LoginOutcome};
use crate::AppConfig;

/// Aggregate result of one run
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcomes: Vec<LoginOutcome>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    /// Render the report: a summary line, then one line per outcome in
    /// input order.
    pub fn render(&self) -> String {
        let mut out = format!(
            "📊 Login summary: {}/{} accounts succeeded\n",
            self.success_count(),
            self.outcomes.len()
        );
        for outcome in &self.outcomes {
            out.push('\n');
            out.push_str(&outcome.message);
        }
        out
    }
}

/// Run the full batch with the real login driver.
pub async fn run_batch(config: &AppConfig, accounts: &[Account]) -> BatchReport {
    run_batch_with(config.pacing_delay(), accounts, |account| {
        login::attempt(config, account)
    })
    .await
}

/// Sequential attempt loop, generic over the attempt function so the
/// ordering and pacing behavior is testable without a browser.
///
/// A pacing delay runs between consecutive attempts, not after the last.
/// A failed attempt never aborts the remaining accounts.
pub async fn run_batch_with<'a, F, Fut>(
    pacing: Duration,
    accounts: &'a [Account],
    mut attempt: F,
) -> BatchReport
where
    F: FnMut(&'a Account) -> Fut,
    Fut: Future<Output = LoginOutcome>,
{
    let mut outcomes = Vec::with_capacity(accounts.len());

    for (index, account) in accounts.iter().enumerate() {
        info!(
            "Processing account {}/{}: {}",
            index + 1,
            accounts.len(),
            account.email
        );

        outcomes.push(attempt(account).await);

        if index + 1 < accounts.len() {
            info!("Waiting {}s before next account", pacing.as_secs());
            tokio::time::sleep(pacing).await;
        }
    }

    BatchReport { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts(n: usize) -> Vec<Account> {
        (0..n)
            .map(|i| Account {
                email: format!("user{}@x.com", i),
                password: format!("p{}", i),
            })
            .collect()
    }

    #[tokio::test]
    async fn one_outcome_per_account_in_input_order() {
        let accounts = accounts(3);
        let report = run_batch_with(Duration::ZERO, &accounts, |account| async move {
            LoginOutcome::success(&account.email)
        })
        .await;

        assert_eq!(report.outcomes.len(), 3);
        for (outcome, account) in report.outcomes.iter().zip(&accounts) {
            assert_eq!(outcome.email, account.email);
        }
    }

    #[tokio::test]
    async fn failure_does_not_abort_remaining_accounts() {
        let accounts = accounts(2);
        let report = run_batch_with(Duration::ZERO, &accounts, |account| async move {
            if account.email == "user0@x.com" {
                LoginOutcome::failure(&account.email, "bad password")
            } else {
                LoginOutcome::success(&account.email)
            }
        })
        .await;

        assert_eq!(report.outcomes.len(), 2);
        assert!(!report.outcomes[0].success);
        assert!(report.outcomes[1].success);
        assert_eq!(report.success_count(), 1);
        assert!(report.render().contains("1/2"));
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_runs_between_but_not_after_attempts() {
        let pacing = Duration::from_secs(3);

        let two = accounts(2);
        let start = tokio::time::Instant::now();
        run_batch_with(pacing, &two, |account| async move {
            LoginOutcome::success(&account.email)
        })
        .await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));

        let one = accounts(1);
        let start = tokio::time::Instant::now();
        run_batch_with(pacing, &one, |account| async move {
            LoginOutcome::success(&account.email)
        })
        .await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn report_renders_summary_then_per_account_lines() {
        let accounts = accounts(2);
        let report = run_batch_with(Duration::ZERO, &accounts, |account| async move {
            LoginOutcome::success(&account.email)
        })
        .await;

        let rendered = report.render();
        let mut lines = rendered.lines();
        let summary = lines.next().unwrap();
        assert!(summary.starts_with("📊"));
        assert!(summary.contains("2/2"));
        // blank separator, then one line per account
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("✅ user0@x.com login successful"));
        assert_eq!(lines.next(), Some("✅ user1@x.com login successful"));
        assert_eq!(lines.next(), None);
    }

    #[tokio::test]
    async fn parsed_account_string_flows_through_to_the_report() {
        let accounts = crate::accounts::parse_accounts("a@x.com:p1;b@x.com:p2");
        assert_eq!(accounts.len(), 2);

        let report = run_batch_with(Duration::ZERO, &accounts, |account| async move {
            LoginOutcome::success(&account.email)
        })
        .await;

        let rendered = report.render();
        assert!(rendered.lines().next().unwrap().contains("2/2"));
        assert!(rendered.contains("✅ a@x.com login successful"));
        assert!(rendered.contains("✅ b@x.com login successful"));
    }

    #[tokio::test]
    async fn empty_account_list_yields_empty_report() {
        let report =
            run_batch_with(Duration::ZERO, &[], |account: &Account| async move {
                LoginOutcome::success(&account.email)
            })
            .await;
        assert!(report.outcomes.is_empty());
        assert!(report.render().contains("0/0"));
    }
}

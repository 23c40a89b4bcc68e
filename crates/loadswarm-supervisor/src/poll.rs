//! Bounded polling shared by the start and completion waits.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::trace;

/// How a [`poll_until`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The probe returned true.
    Satisfied { elapsed: Duration, attempts: u32 },
    /// The deadline passed with the probe still false.
    TimedOut { elapsed: Duration, attempts: u32 },
}

impl PollOutcome {
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Satisfied { elapsed, .. } | Self::TimedOut { elapsed, .. } => *elapsed,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Satisfied { attempts, .. } | Self::TimedOut { attempts, .. } => *attempts,
        }
    }
}

/// Evaluate `probe` now and then every `interval` until it returns true or
/// `timeout` has elapsed.
///
/// The last sleep is clipped so the final probe runs at the deadline, which
/// makes a timed-out elapsed always at least `timeout`. A probe error ends the
/// poll immediately. Time is read from `tokio::time`, so a paused test clock
/// drives it.
pub async fn poll_until<F, Fut, E>(
    mut probe: F,
    interval: Duration,
    timeout: Duration,
) -> Result<PollOutcome, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    // A zero cadence would never yield to the clock.
    let interval = interval.max(Duration::from_millis(1));
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if probe().await? {
            let elapsed = started.elapsed();
            trace!(attempts, elapsed_ms = elapsed.as_millis() as u64, "Poll satisfied");
            return Ok(PollOutcome::Satisfied { elapsed, attempts });
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            trace!(attempts, elapsed_ms = elapsed.as_millis() as u64, "Poll timed out");
            return Ok(PollOutcome::TimedOut { elapsed, attempts });
        }
        sleep(interval.min(timeout - elapsed)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// The paused clock lands on timer ticks, which are millisecond grained.
    fn assert_near(actual: Duration, expected: Duration) {
        let slack = Duration::from_millis(5);
        assert!(
            actual + slack >= expected && actual <= expected + slack,
            "{:?} not within {:?} of {:?}",
            actual,
            slack,
            expected
        );
    }

    fn scripted(answers: &[bool]) -> impl FnMut() -> std::future::Ready<Result<bool, ()>> {
        let mut answers: VecDeque<bool> = answers.iter().copied().collect();
        move || std::future::ready(Ok(answers.pop_front().unwrap_or(false)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_satisfied_on_third_check() {
        let outcome = poll_until(
            scripted(&[false, false, true]),
            Duration::from_secs(1),
            Duration::from_secs(600),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, PollOutcome::Satisfied { attempts: 3, .. }));
        assert_near(outcome.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_does_not_sleep() {
        let outcome = poll_until(scripted(&[true]), Duration::from_secs(5), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(outcome.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_lands_on_deadline() {
        let outcome = poll_until(scripted(&[]), Duration::from_secs(4), Duration::from_secs(10))
            .await
            .unwrap();
        // Probes at 0s, 4s, 8s and the clipped one at 10s.
        assert!(matches!(outcome, PollOutcome::TimedOut { attempts: 4, .. }));
        assert!(outcome.elapsed() >= Duration::from_secs(10));
        assert_near(outcome.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_probes_once() {
        let outcome = poll_until(scripted(&[]), Duration::from_secs(1), Duration::ZERO)
            .await
            .unwrap();
        assert!(matches!(outcome, PollOutcome::TimedOut { attempts: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_stops_polling() {
        let mut calls = 0;
        let result: Result<PollOutcome, &str> = poll_until(
            || {
                calls += 1;
                std::future::ready(if calls < 2 { Ok(false) } else { Err("probe failed") })
            },
            Duration::from_secs(1),
            Duration::from_secs(60),
        )
        .await;
        assert_eq!(result.unwrap_err(), "probe failed");
        assert_eq!(calls, 2);
    }
}

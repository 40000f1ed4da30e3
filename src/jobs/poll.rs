use std::time::Duration;

use crate::{
    api::RouteAPI,
    config::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_MAX_ATTEMPTS},
    entities::{RouteResult, RouteStatus},
    error::{timeout_error, Error},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before every fetch.
    pub interval: Duration,
    /// Upper bound on fetches for one job.
    pub max_attempts: u32,
    /// Consecutive failed fetches tolerated before the loop gives up. Each
    /// failed fetch still consumes an attempt. Zero makes the first failure fatal.
    pub transport_retries: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
            transport_retries: 0,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            transport_retries: 0,
        }
    }

    pub fn with_transport_retries(mut self, retries: u32) -> Self {
        self.transport_retries = retries;
        self
    }
}

/// Fetches `route_id` until the backend reports a terminal status.
///
/// Returns `Ok(None)` when `is_active` turns false between fetches, so a
/// cancelled job stops issuing requests. One fetch is in flight at a time.
#[tracing::instrument(skip(api, is_active))]
pub async fn poll_until_terminal<A, F>(
    api: &A,
    route_id: &str,
    policy: &PollPolicy,
    is_active: F,
) -> Result<Option<RouteResult>, Error>
where
    A: RouteAPI + Send + Sync + ?Sized,
    F: Fn() -> bool,
{
    let mut last_status = RouteStatus::Pending;
    let mut consecutive_failures = 0;

    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval).await;

        if !is_active() {
            tracing::debug!("job abandoned before attempt {}", attempt);
            return Ok(None);
        }

        let result = match api.find_route(route_id).await {
            Ok(result) => {
                consecutive_failures = 0;
                result
            }
            Err(err) => {
                let err = err.into_poll_transport_error();
                consecutive_failures += 1;

                if consecutive_failures > policy.transport_retries
                    || attempt == policy.max_attempts
                {
                    tracing::warn!("poll attempt {} failed: {}", attempt, err);
                    return Err(err);
                }

                tracing::warn!("poll attempt {} failed, retrying: {}", attempt, err);
                continue;
            }
        };

        if !last_status.can_advance_to(result.status) {
            tracing::warn!(
                "ignoring status regression {} -> {}",
                last_status.name(),
                result.status.name()
            );
            continue;
        }
        last_status = result.status;

        if result.status.is_terminal() {
            result.check_invariant()?;
            tracing::info!(
                "route {} reached {} after {} polls",
                route_id,
                result.status.name(),
                attempt
            );
            return result.into_outcome().map(Some);
        }

        tracing::debug!("route {} still {}", route_id, result.status.name());
    }

    Err(timeout_error(policy.max_attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::scripted::{completed_route, processing, ScriptedBackend};
    use crate::error::poll_transport_error;

    fn fast(max_attempts: u32) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(1), max_attempts)
    }

    #[tokio::test]
    async fn always_processing_times_out_after_exactly_max_attempts() {
        let backend = ScriptedBackend::new("r1").repeating(processing("r1"));

        let err = poll_until_terminal(&backend, "r1", &fast(7), || true)
            .await
            .unwrap_err();

        assert!(err.is_timeout_error());
        assert_eq!(backend.fetches(), 7);
    }

    #[tokio::test]
    async fn resolves_on_completed() {
        let backend = ScriptedBackend::new("r1")
            .then(Ok(processing("r1")))
            .then(Ok(processing("r1")))
            .then(Ok(completed_route("r1", 5, 2)));

        let result = poll_until_terminal(&backend, "r1", &fast(10), || true)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.status, RouteStatus::Completed);
        assert_eq!(backend.fetches(), 3);
    }

    #[tokio::test]
    async fn failed_job_is_terminal() {
        let backend = ScriptedBackend::new("r1")
            .then(Ok(processing("r1")))
            .then(Ok(RouteResult::failed("r1", "no route found")));

        let err = poll_until_terminal(&backend, "r1", &fast(10), || true)
            .await
            .unwrap_err();

        assert!(err.is_job_failed_error());
        assert_eq!(err.message, "no route found");
        assert_eq!(backend.fetches(), 2);
    }

    #[tokio::test]
    async fn transport_failure_is_fatal_by_default() {
        let backend = ScriptedBackend::new("r1")
            .then(Ok(processing("r1")))
            .then(Err(poll_transport_error("connection reset")))
            .then(Ok(completed_route("r1", 3, 1)));

        let err = poll_until_terminal(&backend, "r1", &fast(10), || true)
            .await
            .unwrap_err();

        assert!(err.is_poll_transport_error());
        assert_eq!(backend.fetches(), 2);
    }

    #[tokio::test]
    async fn bounded_retries_share_the_attempt_budget() {
        let backend = ScriptedBackend::new("r1")
            .then(Err(poll_transport_error("blip")))
            .then(Ok(completed_route("r1", 3, 1)));

        let policy = fast(10).with_transport_retries(1);
        let result = poll_until_terminal(&backend, "r1", &policy, || true)
            .await
            .unwrap();

        assert!(result.is_some());
        assert_eq!(backend.fetches(), 2);
    }

    #[tokio::test]
    async fn stops_fetching_once_inactive() {
        let backend = ScriptedBackend::new("r1").repeating(processing("r1"));

        let outcome = poll_until_terminal(&backend, "r1", &fast(10), || backend.fetches() < 2)
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert_eq!(backend.fetches(), 2);
    }

    #[tokio::test]
    async fn status_regression_is_ignored_but_costs_an_attempt() {
        let backend = ScriptedBackend::new("r1")
            .then(Ok(processing("r1")))
            .then(Ok(RouteResult::pending("r1")))
            .then(Ok(processing("r1")));

        let err = poll_until_terminal(&backend, "r1", &fast(3), || true)
            .await
            .unwrap_err();
        assert!(err.is_timeout_error());
        assert_eq!(backend.fetches(), 3);

        let recovering = ScriptedBackend::new("r2")
            .then(Ok(processing("r2")))
            .then(Ok(RouteResult::pending("r2")))
            .then(Ok(completed_route("r2", 3, 1)));

        let result = poll_until_terminal(&recovering, "r2", &fast(3), || true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.status, RouteStatus::Completed);
    }

    #[tokio::test]
    async fn completed_without_summary_is_a_transport_error() {
        let mut incomplete = completed_route("r1", 3, 1);
        incomplete.summary = None;
        let backend = ScriptedBackend::new("r1")
            .then(Ok(processing("r1")))
            .then(Ok(incomplete))
            .then(Ok(completed_route("r1", 3, 1)));

        let err = poll_until_terminal(&backend, "r1", &fast(10), || true)
            .await
            .unwrap_err();

        assert!(err.is_poll_transport_error());
        assert_eq!(backend.fetches(), 2);
    }
}

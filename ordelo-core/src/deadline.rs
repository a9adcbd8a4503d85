//! Caller-supplied deadlines.
//!
//! Every repository call takes a `Deadline`. Each store or cache round-trip
//! made on the caller's behalf is bounded by the same absolute instant, so a
//! multi-step operation cannot outlive it.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Absolute point in time after which in-flight work is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

/// Returned by [`Deadline::bound`] when the deadline passed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded;

impl Deadline {
    /// No deadline: work runs to completion.
    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Some(Instant::now() + timeout),
        }
    }

    pub fn at(instant: Instant) -> Self {
        Self { at: Some(instant) }
    }

    pub fn instant(&self) -> Option<Instant> {
        self.at
    }

    /// Time left, `None` when unbounded. Saturates at zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Run `work` until it finishes or the deadline passes.
    pub async fn bound<F>(self, work: F) -> Result<F::Output, DeadlineExceeded>
    where
        F: Future,
    {
        match self.at {
            Some(at) => tokio::time::timeout_at(at, work)
                .await
                .map_err(|_| DeadlineExceeded),
            None => Ok(work.await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unbounded_runs_to_completion() {
        let result = Deadline::none()
            .bound(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                7
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(Deadline::none().remaining(), None);
    }

    #[tokio::test]
    async fn test_expired_deadline_abandons_work() {
        let deadline = Deadline::after(Duration::from_millis(10));
        let result = deadline
            .bound(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(result, Err(DeadlineExceeded));
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_fast_work_beats_deadline() {
        let deadline = Deadline::after(Duration::from_secs(5));
        assert_eq!(deadline.bound(async { "done" }).await, Ok("done"));
        assert!(!deadline.is_expired());
    }
}

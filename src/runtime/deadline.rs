// ABOUTME: Deadlines for adapter calls.
// ABOUTME: An elapsed deadline becomes the error type's Timeout variant, never a daemon error.

use super::traits::Classify;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// A fixed point in time by which an adapter call (and any retry of it) must finish.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Run `fut` until the deadline.
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Classify,
    {
        match tokio::time::timeout_at(self.at, fut).await {
            Ok(result) => result,
            Err(_) => Err(E::timed_out(self.budget)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::traits::{ContainerError, ErrorKind};

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_reports_timeout() {
        let deadline = Deadline::after(Duration::from_millis(50));
        let result: Result<(), ContainerError> = deadline
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn daemon_errors_pass_through() {
        let deadline = Deadline::after(Duration::from_secs(1));
        let result: Result<(), ContainerError> = deadline
            .run(async { Err(ContainerError::NotFound("abc".to_string())) })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    }
}

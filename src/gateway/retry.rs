// ABOUTME: Single-retry policy for read-only daemon calls.
// ABOUTME: Retries once on DaemonUnreachable, inside the caller's deadline.

use crate::runtime::{Classify, Deadline, ErrorKind};
use std::future::Future;
use std::time::Duration;

/// Backoff before the one retry of a read-only call.
pub const READ_RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Run a read-only call under `deadline`, retrying once after `backoff` if the
/// daemon was unreachable. The retry never extends the deadline.
pub async fn read_with_retry<T, E, F, Fut>(
    deadline: &Deadline,
    backoff: Duration,
    operation: &'static str,
    mut call: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify,
{
    deadline
        .run(async {
            match call().await {
                Err(e) if e.kind() == ErrorKind::DaemonUnreachable => {
                    tracing::debug!(operation, error = %e, "Daemon unreachable, retrying once");
                    tokio::time::sleep(backoff).await;
                    call().await
                }
                other => other,
            }
        })
        .await
}

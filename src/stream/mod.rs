// ABOUTME: Streaming session manager for log and event subscriptions.
// ABOUTME: One pump task per session bridges a daemon stream into a bounded frame channel.

mod channel;
mod frame;
mod session;

pub use frame::{CONTENT_TYPE, CloseReason, Frame, FrameError};
pub use session::{CloseCause, SessionBody, SessionInfo, SessionKind, SessionState};

use crate::config::{Config, OverflowPolicy};
use crate::runtime::{Classify, ErrorKind};
use channel::{FrameSender, ReceiverClosed, channel};
use chrono::Utc;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;
use uuid::Uuid;

/// Message carried by the terminal frame of sessions cut by shutdown.
pub const SHUTDOWN_MESSAGE: &str = "server shutting down";

#[derive(Debug, Clone, Copy)]
pub struct StreamSettings {
    pub buffer_limit: usize,
    pub overflow: OverflowPolicy,
    pub shutdown_grace: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for StreamSettings {
    fn from(config: &Config) -> Self {
        Self {
            buffer_limit: config.streams.buffer_limit,
            overflow: config.streams.overflow,
            shutdown_grace: config.streams.shutdown_grace,
        }
    }
}

struct Entry {
    info: SessionInfo,
    abort: Option<AbortHandle>,
}

struct Inner {
    sessions: Mutex<HashMap<Uuid, Entry>>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    settings: StreamSettings,
}

impl Inner {
    fn set_state(&self, id: Uuid, state: SessionState) {
        if let Some(entry) = self.sessions.lock().get_mut(&id) {
            entry.info.state = state;
        }
    }

    fn deregister(&self, id: Uuid, state: SessionState) {
        self.sessions.lock().remove(&id);
        tracing::debug!(state = ?state, "Session closed");
    }
}

/// Owns every live streaming session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(settings: StreamSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
                tracker: TaskTracker::new(),
                settings,
            }),
        }
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.inner.settings
    }

    /// Start pumping `source` into a new session.
    ///
    /// The returned body is the only consumer; dropping it ends the session.
    pub fn open<S, T, E>(&self, kind: SessionKind, source: S) -> SessionBody
    where
        S: Stream<Item = Result<T, E>> + Send + Unpin + 'static,
        T: Into<Frame> + Send + 'static,
        E: Classify,
    {
        let id = Uuid::new_v4();
        let settings = self.inner.settings;
        let (tx, rx) = channel(settings.buffer_limit, settings.overflow);
        let token = self.inner.shutdown.child_token();
        let span = tracing::info_span!("session", session_id = %id, kind = %kind);

        let info = SessionInfo {
            id,
            kind,
            created_at: Utc::now(),
            state: SessionState::Opening,
        };

        // Register under the lock so the task cannot deregister first
        let mut sessions = self.inner.sessions.lock();
        if self.inner.shutdown.is_cancelled() {
            drop(sessions);
            let _ = tx.finish(Frame::error_with_message(
                ErrorKind::Internal,
                SHUTDOWN_MESSAGE,
            ));
            return SessionBody::new(id, rx, token.drop_guard());
        }

        let handle = self.inner.tracker.spawn(
            pump(id, source, tx, token.clone(), self.inner.clone()).instrument(span),
        );
        sessions.insert(
            id,
            Entry {
                info,
                abort: Some(handle.abort_handle()),
            },
        );
        drop(sessions);

        tracing::debug!(session_id = %id, "Session opened");
        SessionBody::new(id, rx, token.drop_guard())
    }

    /// Number of sessions whose pump task is still running.
    pub fn active_sessions(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .inner
            .sessions
            .lock()
            .values()
            .map(|entry| entry.info.clone())
            .collect();
        infos.sort_by_key(|info| info.created_at);
        infos
    }

    /// Cancel every session and wait up to `grace` for them to finish, then
    /// abort the rest. New sessions opened afterwards close immediately.
    pub async fn shutdown(&self, grace: Duration) {
        let active = self.active_sessions();
        if active > 0 {
            tracing::info!("Closing {} streaming session(s)", active);
        }

        self.inner.shutdown.cancel();
        self.inner.tracker.close();

        if tokio::time::timeout(grace, self.inner.tracker.wait())
            .await
            .is_err()
        {
            let survivors: Vec<AbortHandle> = self
                .inner
                .sessions
                .lock()
                .drain()
                .filter_map(|(_, entry)| entry.abort)
                .collect();
            tracing::warn!(
                "Aborting {} session(s) still running after {:?}",
                survivors.len(),
                grace
            );
            for handle in survivors {
                handle.abort();
            }
        }
    }
}

/// Move items from `source` into `tx` until the daemon stream ends, fails, or
/// the session is cancelled.
async fn pump<S, T, E>(
    id: Uuid,
    mut source: S,
    tx: FrameSender,
    token: CancellationToken,
    inner: Arc<Inner>,
) where
    S: Stream<Item = Result<T, E>> + Send + Unpin + 'static,
    T: Into<Frame> + Send + 'static,
    E: Classify,
{
    let mut streaming = false;

    let state = loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => break cancelled(&inner, tx),
            item = source.next() => item,
        };

        match next {
            Some(Ok(item)) => {
                if !streaming {
                    streaming = true;
                    inner.set_state(id, SessionState::Streaming);
                }
                let sent = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    sent = tx.send(item.into()) => Some(sent),
                };
                match sent {
                    Some(Ok(())) => {}
                    Some(Err(ReceiverClosed)) => break SessionState::Closed(CloseCause::Client),
                    None => break cancelled(&inner, tx),
                }
            }
            Some(Err(e)) => {
                let kind = e.kind();
                tracing::warn!(kind = %kind, error = %e, "Daemon stream failed");
                let _ = tx.finish(Frame::error(kind));
                break SessionState::Closed(CloseCause::Error);
            }
            None => {
                let _ = tx.finish(Frame::daemon_eof());
                break SessionState::Closed(CloseCause::DaemonEof);
            }
        }
    };

    // Releases the daemon request
    drop(source);
    inner.deregister(id, state);
}

fn cancelled(inner: &Inner, tx: FrameSender) -> SessionState {
    if inner.shutdown.is_cancelled() && !tx.is_closed() {
        let _ = tx.finish(Frame::error_with_message(
            ErrorKind::Internal,
            SHUTDOWN_MESSAGE,
        ));
        SessionState::Closed(CloseCause::Error)
    } else {
        SessionState::Closed(CloseCause::Client)
    }
}

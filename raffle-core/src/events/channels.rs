//! Per-requester progress fan-out and the global winner broadcast.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, mpsc};

use super::types::{DrawEvent, WinnerAnnouncement};
use crate::guard::RequesterId;

/// Default per-session buffer for progress events.
///
/// One draw emits fewer than a dozen events, so this absorbs a whole draw
/// plus the next one's `Started`.
pub const DEFAULT_PROGRESS_BUFFER: usize = 32;

/// Default buffer for winner announcements.
pub const DEFAULT_ANNOUNCEMENT_BUFFER: usize = 256;

/// Receiver handle for winner announcements.
pub type WinnerAnnouncementReceiver = broadcast::Receiver<WinnerAnnouncement>;

type Sessions = HashMap<RequesterId, Vec<(u64, mpsc::Sender<DrawEvent>)>>;

struct ChannelInner {
    sessions: Mutex<Sessions>,
    next_session: AtomicU64,
    progress_buffer: usize,
    winners: broadcast::Sender<WinnerAnnouncement>,
}

/// Routes draw events to connected sessions.
///
/// Cheap to clone; all clones share the same session table.
#[derive(Clone)]
pub struct ProgressChannel {
    inner: Arc<ChannelInner>,
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_BUFFER, DEFAULT_ANNOUNCEMENT_BUFFER)
    }
}

impl ProgressChannel {
    pub fn new(progress_buffer: usize, announcement_buffer: usize) -> Self {
        let (winners, _) = broadcast::channel(announcement_buffer.max(1));
        Self {
            inner: Arc::new(ChannelInner {
                sessions: Mutex::new(HashMap::new()),
                next_session: AtomicU64::new(0),
                progress_buffer: progress_buffer.max(1),
                winners,
            }),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, Sessions> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a session to `requester`. The session stops receiving events
    /// when the returned subscription is dropped.
    pub fn register(&self, requester: RequesterId) -> ProgressSubscription {
        let id = self.inner.next_session.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.progress_buffer);
        self.sessions()
            .entry(requester.clone())
            .or_default()
            .push((id, tx));
        ProgressSubscription {
            requester,
            id,
            rx,
            channel: self.clone(),
        }
    }

    fn detach(&self, requester: &RequesterId, id: u64) {
        let mut sessions = self.sessions();
        if let Some(list) = sessions.get_mut(requester) {
            list.retain(|(session, _)| *session != id);
            if list.is_empty() {
                sessions.remove(requester);
            }
        }
    }

    /// Deliver `event` to every session of `requester`.
    ///
    /// Returns the number of sessions that accepted it.
    pub fn emit(&self, requester: &RequesterId, event: DrawEvent) -> usize {
        let sessions = self.sessions();
        let Some(list) = sessions.get(requester) else {
            return 0;
        };
        let mut delivered = 0;
        for (session, tx) in list {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(requester = %requester, session, "progress buffer full, event dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    /// Push a freshly recorded winner to every connected session.
    ///
    /// Returns the number of receivers, `0` when nobody is listening.
    pub fn broadcast_winner(&self, announcement: WinnerAnnouncement) -> usize {
        self.inner.winners.send(announcement).unwrap_or(0)
    }

    pub fn subscribe_winners(&self) -> WinnerAnnouncementReceiver {
        self.inner.winners.subscribe()
    }

    /// Number of sessions attached to `requester`.
    pub fn session_count(&self, requester: &RequesterId) -> usize {
        self.sessions().get(requester).map_or(0, Vec::len)
    }
}

/// One session's view of its requester's draw events.
pub struct ProgressSubscription {
    requester: RequesterId,
    id: u64,
    rx: mpsc::Receiver<DrawEvent>,
    channel: ProgressChannel,
}

impl ProgressSubscription {
    pub fn requester(&self) -> &RequesterId {
        &self.requester
    }

    /// Wait for the next event. Cancel-safe.
    pub async fn recv(&mut self) -> Option<DrawEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<DrawEvent, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        self.channel.detach(&self.requester, self.id);
    }
}

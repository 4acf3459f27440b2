//! Connection bus (C6): tracks attached sessions, fans out snapshots, and
//! prunes dead sessions. Grounded in the teacher's `Casino` (`hosting/
//! casino.rs`), which guards a `RwLock<HashMap<RoomId, RoomHandle>>` behind
//! an atomic id counter — generalized here from one room per id to one
//! mailbox per attached client within a single race.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::bus::session::Mailbox;
use crate::protocol::ServerMessage;
use crate::race::RaceSnapshot;

pub type SessionId = u64;

struct Session {
    mailbox: Arc<Mailbox>,
    healthy: AtomicBool,
}

/// Snapshot of the race clock published by the orchestrator, independent
/// of any one session, used to answer late-joiner sync requests.
#[derive(Clone)]
struct RaceMeta {
    track_length: f64,
    physics_hz: u32,
    broadcast_hz: u32,
    current_tick: u64,
    snapshot: Option<Arc<RaceSnapshot>>,
}

pub struct Bus {
    sessions: RwLock<HashMap<SessionId, Session>>,
    next_id: AtomicU64,
    meta: RwLock<Option<RaceMeta>>,
    queue_size: usize,
}

impl Bus {
    pub fn new(queue_size: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            meta: RwLock::new(None),
            queue_size,
        }
    }

    /// Adds a session and immediately returns the sync message it should
    /// receive (spec section 4.6). Attach and sweep are serialized by the
    /// write lock on `sessions`.
    pub async fn attach(&self) -> (SessionId, Arc<Mailbox>, ServerMessage) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mailbox = Arc::new(Mailbox::new(self.queue_size));
        self.sessions.write().await.insert(
            id,
            Session {
                mailbox: mailbox.clone(),
                healthy: AtomicBool::new(true),
            },
        );
        let sync = match self.meta.read().await.clone() {
            Some(meta) => ServerMessage::Sync {
                track_length: meta.track_length,
                physics_hz: meta.physics_hz,
                broadcast_hz: meta.broadcast_hz,
                current_tick: meta.current_tick,
                snapshot: meta.snapshot.as_deref().cloned(),
            },
            None => ServerMessage::Sync {
                track_length: 0.0,
                physics_hz: 0,
                broadcast_hz: 0,
                current_tick: 0,
                snapshot: None,
            },
        };
        log::info!("session {id} attached");
        (id, mailbox, sync)
    }

    /// Updates the published race clock. Called by the orchestrator on
    /// start, on every broadcast tick, and on stop (with `snapshot: None`).
    pub async fn publish_meta(
        &self,
        track_length: f64,
        physics_hz: u32,
        broadcast_hz: u32,
        current_tick: u64,
        snapshot: Option<Arc<RaceSnapshot>>,
    ) {
        *self.meta.write().await = Some(RaceMeta {
            track_length,
            physics_hz,
            broadcast_hz,
            current_tick,
            snapshot,
        });
    }

    pub async fn clear_meta(&self) {
        *self.meta.write().await = None;
    }

    /// Fans a snapshot out to every healthy session. Non-blocking per
    /// session: a slow client's full mailbox just drops its oldest entry.
    pub async fn broadcast(&self, snapshot: RaceSnapshot) {
        let snapshot = Arc::new(snapshot);
        let mailboxes: Vec<(SessionId, Arc<Mailbox>)> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, s)| s.healthy.load(Ordering::Relaxed))
            .map(|(id, s)| (*id, s.mailbox.clone()))
            .collect();
        for (_, mailbox) in mailboxes {
            mailbox.push_snapshot(snapshot.clone()).await;
        }
    }

    /// A session's writer marks itself unhealthy on send failure or write
    /// timeout; it is not removed from the map until the next sweep.
    pub async fn mark_unhealthy(&self, id: SessionId) {
        if let Some(session) = self.sessions.read().await.get(&id) {
            session.healthy.store(false, Ordering::Relaxed);
        }
    }

    /// A fatal invariant violation (spec section 7): every attached
    /// session — healthy or not — gets the notice ahead of anything
    /// queued, and the registry is cleared so the aborted race leaves no
    /// sessions behind for a future `attach` to find.
    pub async fn abort(&self, message: String) {
        let mailboxes: Vec<Arc<Mailbox>> = self
            .sessions
            .read()
            .await
            .values()
            .map(|s| s.mailbox.clone())
            .collect();
        let notified = mailboxes.len();
        for mailbox in mailboxes {
            mailbox.push_fatal(message.clone()).await;
        }
        self.sessions.write().await.clear();
        log::error!("race aborted, {notified} session(s) notified: {message}");
    }

    /// Removes unhealthy sessions. Serialized against `attach`.
    pub async fn sweep(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.healthy.load(Ordering::Relaxed));
        let removed = before - sessions.len();
        if removed > 0 {
            log::info!("swept {removed} dead session(s)");
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

//! Per-session conversation memory.
//!
//! Each session sits behind its own async mutex: concurrent requests on one
//! session run one at a time, requests on different sessions never contend
//! beyond the brief map lookup.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::llm::client::{Role, Turn};

/// Smallest bound that still holds one exchange
const MIN_TURNS: usize = 2;

#[derive(Debug, Clone)]
pub struct ConversationSession {
    id: String,
    turns: VecDeque<Turn>,
    max_turns: usize,
}

impl ConversationSession {
    pub fn new(id: impl Into<String>, max_turns: usize) -> Self {
        Self {
            id: id.into(),
            turns: VecDeque::new(),
            max_turns: max_turns.max(MIN_TURNS),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Prior turns, oldest first
    pub fn history(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    /// Record one completed exchange, dropping the oldest turns past the bound.
    ///
    /// History never starts with a model turn after trimming.
    pub fn record_exchange(&mut self, user: impl Into<String>, reply: impl Into<String>) {
        self.turns.push_back(Turn::user(user));
        self.turns.push_back(Turn::model(reply));

        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
        while matches!(self.turns.front(), Some(turn) if turn.role == Role::Model) {
            self.turns.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

pub type SharedSession = Arc<Mutex<ConversationSession>>;

struct Entry {
    session: SharedSession,
    last_used: u64,
}

#[derive(Default)]
struct Slots {
    entries: HashMap<String, Entry>,
    /// Bumped on every lookup or commit; orders entries by recency
    clock: u64,
}

impl Slots {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// All live sessions, keyed by id, holding at most `max_sessions` entries.
///
/// A session only enters the store through [`SessionStore::commit`], after its
/// first exchange succeeded. Past the bound the least recently used session is
/// evicted.
pub struct SessionStore {
    slots: Mutex<Slots>,
    max_turns: usize,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(max_turns: usize, max_sessions: usize) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            max_turns,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Look up `id`. An unknown id gets a detached session that is not stored
    /// until committed. A missing or blank id gets a fresh server-issued one.
    pub async fn checkout(&self, id: Option<&str>) -> (String, SharedSession) {
        let id = match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };

        let mut slots = self.slots.lock().await;
        let now = slots.tick();
        if let Some(entry) = slots.entries.get_mut(&id) {
            entry.last_used = now;
            return (id, entry.session.clone());
        }
        let session = Arc::new(Mutex::new(ConversationSession::new(
            id.clone(),
            self.max_turns,
        )));
        (id, session)
    }

    /// Store `session` under `id` after a successful exchange, evicting the
    /// least recently used sessions past the bound.
    ///
    /// If another request committed the same id first, that session is kept.
    pub async fn commit(&self, id: &str, session: SharedSession) {
        let mut slots = self.slots.lock().await;
        let now = slots.tick();
        match slots.entries.get_mut(id) {
            Some(entry) => entry.last_used = now,
            None => {
                debug!("Opening session {}", id);
                slots.entries.insert(
                    id.to_string(),
                    Entry {
                        session,
                        last_used: now,
                    },
                );
            }
        }

        while slots.entries.len() > self.max_sessions {
            let oldest = slots
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    slots.entries.remove(&key);
                    debug!("Evicted idle session {}", key);
                }
                None => break,
            }
        }
    }

    pub async fn get(&self, id: &str) -> Option<SharedSession> {
        self.slots
            .lock()
            .await
            .entries
            .get(id)
            .map(|entry| entry.session.clone())
    }

    /// Forget a session; returns whether it existed
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.slots.lock().await.entries.remove(id).is_some();
        if removed {
            debug!("Closed session {}", id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.entries.is_empty()
    }
}

// src/session/registry.rs

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use super::ExamSession;

/// Shared handle to one session. The lock is held for the whole transition,
/// including the store write of a submit.
pub type SessionHandle = Arc<tokio::sync::Mutex<ExamSession>>;

/// Live sessions by id. Finished sessions are removed.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: ExamSession) -> SessionHandle {
        let id = session.id();
        let handle: SessionHandle = Arc::new(tokio::sync::Mutex::new(session));
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, handle.clone());
        handle
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
    }

    pub fn remove(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! In-process registry of live sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// What the relay knows about one running session.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub control_port: u16,
    pub started_at: DateTime<Utc>,
}

/// Cloneable handle over the shared session table.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, SessionInfo>>>,
}

impl SessionRegistry {
    pub fn register(&self, control_port: u16) -> Uuid {
        let session_id = Uuid::new_v4();
        let info = SessionInfo {
            session_id,
            control_port,
            started_at: Utc::now(),
        };
        self.inner
            .lock()
            .expect("session table lock poisoned")
            .insert(session_id, info);
        session_id
    }

    pub fn deregister(&self, session_id: &Uuid) {
        self.inner
            .lock()
            .expect("session table lock poisoned")
            .remove(session_id);
    }

    pub fn active_count(&self) -> usize {
        self.inner
            .lock()
            .expect("session table lock poisoned")
            .len()
    }

    pub fn snapshot(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> = self
            .inner
            .lock()
            .expect("session table lock poisoned")
            .values()
            .cloned()
            .collect();
        sessions.sort_by_key(|info| info.started_at);
        sessions
    }
}

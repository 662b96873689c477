//! Short-lived upload hand-off sessions.
//!
//! A desktop client opens a session, a second device completes it with an
//! image URL. State lives in process memory only and is lost on restart.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_TTL_SECS: u64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Waiting,
    Uploaded,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSession {
    pub id: String,
    pub user_id: String,
    pub tenant_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// TTL-expiring map of upload sessions.
///
/// There is no background timer: `create` and `get` sweep expired entries
/// before doing anything else. One coarse lock guards the whole map.
#[derive(Debug)]
pub struct UploadSessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, UploadSession>>,
}

impl Default for UploadSessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}

impl UploadSessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs as i64),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self, id: &str, user_id: &str, tenant_id: Option<Uuid>) -> UploadSession {
        self.create_at(id, user_id, tenant_id, Utc::now())
    }

    /// Opening an id that already exists starts it over.
    pub fn create_at(&self, id: &str, user_id: &str, tenant_id: Option<Uuid>, now: DateTime<Utc>) -> UploadSession {
        let mut sessions = self.sessions.lock();
        sweep(&mut sessions, self.ttl, now);

        let session = UploadSession {
            id: id.to_string(),
            user_id: user_id.to_string(),
            tenant_id,
            created_at: now,
            status: UploadStatus::Waiting,
            image_url: None,
        };
        sessions.insert(id.to_string(), session.clone());
        session
    }

    pub fn get(&self, id: &str) -> Option<UploadSession> {
        self.get_at(id, Utc::now())
    }

    pub fn get_at(&self, id: &str, now: DateTime<Utc>) -> Option<UploadSession> {
        let mut sessions = self.sessions.lock();
        sweep(&mut sessions, self.ttl, now);
        sessions.get(id).cloned()
    }

    /// Record the uploaded image. A session completes once; returns `false`
    /// for unknown, expired or already uploaded ids.
    pub fn set_uploaded(&self, id: &str, image_url: &str) -> bool {
        self.set_uploaded_at(id, image_url, Utc::now())
    }

    pub fn set_uploaded_at(&self, id: &str, image_url: &str, now: DateTime<Utc>) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(id) {
            Some(session) if session.status == UploadStatus::Waiting && !is_expired(session, self.ttl, now) => {
                session.status = UploadStatus::Uploaded;
                session.image_url = Some(image_url.to_string());
                true
            }
            _ => false,
        }
    }

    /// Drop every session older than the TTL and return them marked expired.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<UploadSession> {
        sweep(&mut self.sessions.lock(), self.ttl, now)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_expired(session: &UploadSession, ttl: Duration, now: DateTime<Utc>) -> bool {
    now - session.created_at > ttl
}

fn sweep(sessions: &mut HashMap<String, UploadSession>, ttl: Duration, now: DateTime<Utc>) -> Vec<UploadSession> {
    let expired: Vec<String> = sessions
        .values()
        .filter(|s| is_expired(s, ttl, now))
        .map(|s| s.id.clone())
        .collect();

    let swept: Vec<UploadSession> = expired
        .iter()
        .filter_map(|id| sessions.remove(id))
        .map(|mut s| {
            s.status = UploadStatus::Expired;
            s
        })
        .collect();
    if !swept.is_empty() {
        debug!("Swept {} expired upload session(s)", swept.len());
    }
    swept
}

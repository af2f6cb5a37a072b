// Moka-backed stores for pending logins and live sessions

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::token::TokenHash;

/// Upper bound on entries per store
const MAX_ENTRIES: u64 = 100_000;

/// A login that has been accepted but not yet authorized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    pub user_id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Established session
#[derive(Debug)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub established_at: DateTime<Utc>,
    terminating: AtomicBool,
}

impl Session {
    pub fn new(user_id: Uuid, email: String) -> Self {
        Self {
            user_id,
            email,
            established_at: Utc::now(),
            terminating: AtomicBool::new(false),
        }
    }

    /// Logout has begun; deauthorization has not yet removed the session
    pub fn is_terminating(&self) -> bool {
        self.terminating.load(Ordering::Acquire)
    }

    fn mark_terminating(&self) {
        self.terminating.store(true, Ordering::Release);
    }
}

/// Snapshot returned by session lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub terminating: bool,
}

impl SessionStatus {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            email: None,
            terminating: false,
        }
    }

    fn of(session: &Session) -> Self {
        Self {
            valid: true,
            email: Some(session.email.clone()),
            terminating: session.is_terminating(),
        }
    }
}

/// Pending and session stores keyed by token hash
///
/// Both caches expire entries by TTL; pending entries are additionally checked
/// against their creation time when consumed.
pub struct AuthStore {
    pending: Cache<TokenHash, PendingAuthorization>,
    sessions: Cache<TokenHash, Arc<Session>>,
    pending_ttl: Duration,
    session_ttl: Duration,
}

impl AuthStore {
    pub fn new(pending_ttl: Duration, session_ttl: Duration) -> Self {
        let pending = Cache::builder()
            .time_to_live(pending_ttl)
            .max_capacity(MAX_ENTRIES)
            .build();
        let sessions = Cache::builder()
            .time_to_live(session_ttl)
            .max_capacity(MAX_ENTRIES)
            .build();

        Self {
            pending,
            sessions,
            pending_ttl,
            session_ttl,
        }
    }

    pub fn pending_ttl(&self) -> Duration {
        self.pending_ttl
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub async fn insert_pending(&self, hash: TokenHash, pending: PendingAuthorization) {
        self.pending.insert(hash, pending).await;
    }

    /// Remove and return the pending login; at most one caller ever gets it
    pub async fn take_pending(&self, hash: &TokenHash) -> Option<PendingAuthorization> {
        let pending = self.pending.remove(hash).await?;
        let age = Utc::now().signed_duration_since(pending.created_at);
        let fresh = chrono::Duration::from_std(self.pending_ttl)
            .map(|ttl| age <= ttl)
            .unwrap_or(true);
        fresh.then_some(pending)
    }

    pub async fn discard_pending(&self, hash: &TokenHash) {
        self.pending.invalidate(hash).await;
    }

    pub async fn insert_session(&self, hash: TokenHash, session: Session) {
        self.sessions.insert(hash, Arc::new(session)).await;
    }

    pub async fn session_status(&self, hash: &TokenHash) -> SessionStatus {
        match self.sessions.get(hash).await {
            Some(session) => SessionStatus::of(&session),
            None => SessionStatus::invalid(),
        }
    }

    /// Flag the session as terminating; returns the session if it was live
    ///
    /// The entry is mutated in place, so a concurrent removal is never undone.
    pub async fn mark_terminating(&self, hash: &TokenHash) -> Option<Arc<Session>> {
        let session = self.sessions.get(hash).await?;
        session.mark_terminating();
        Some(session)
    }

    pub async fn remove_session(&self, hash: &TokenHash) -> Option<Arc<Session>> {
        self.sessions.remove(hash).await
    }
}

//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `SessionStore` and `AuthService`
//! ports. Selected with `STORE_BACKEND=memory` for local development, and
//! the backend the integration tests run against. Data does not survive a
//! restart.

use async_stream::stream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use study_tracker_core::domain::{NewStudySession, ReviewToggle, Rule, StudySession};
use study_tracker_core::ports::{PortError, PortResult, ScopeId, SessionFeed, SessionStore};
use study_tracker_core::rules::default_rules;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::{AuthService, UserAccount, UserCredentials};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
struct ScopeData {
    rules: Option<Vec<Rule>>,
    sessions: Vec<StudySession>,
}

#[derive(Default)]
struct AuthData {
    // Keyed by email.
    users: HashMap<String, UserCredentials>,
    // Cookie session id -> (user, expiry).
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
}

/// An in-memory adapter with the same snapshot-notification contract as the
/// database adapter.
#[derive(Clone)]
pub struct MemoryStore {
    scopes: Arc<RwLock<HashMap<ScopeId, ScopeData>>>,
    auth: Arc<RwLock<AuthData>>,
    changes: broadcast::Sender<ScopeId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            scopes: Arc::new(RwLock::new(HashMap::new())),
            auth: Arc::new(RwLock::new(AuthData::default())),
            changes,
        }
    }

    fn notify(&self, scope: &ScopeId) {
        let _ = self.changes.send(scope.clone());
    }

    /// Full collection for the scope, newest-created first.
    fn snapshot(&self, scope: &ScopeId) -> Vec<StudySession> {
        let scopes = self.scopes.read().expect("scope lock poisoned");
        let mut sessions = scopes
            .get(scope)
            .map(|data| data.sessions.clone())
            .unwrap_or_default();
        sessions.sort_by_key(|s| Reverse(s.created_at));
        sessions
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load_rules(&self, scope: &ScopeId) -> PortResult<Vec<Rule>> {
        let scopes = self.scopes.read().expect("scope lock poisoned");
        Ok(scopes
            .get(scope)
            .and_then(|data| data.rules.clone())
            .unwrap_or_else(default_rules))
    }

    async fn replace_rules(&self, scope: &ScopeId, rules: Vec<Rule>) -> PortResult<()> {
        let mut scopes = self.scopes.write().expect("scope lock poisoned");
        scopes.entry(scope.clone()).or_default().rules = Some(rules);
        Ok(())
    }

    async fn append_session(
        &self,
        scope: &ScopeId,
        session: NewStudySession,
    ) -> PortResult<StudySession> {
        let record = StudySession::from_new(session, Uuid::new_v4(), Utc::now());
        {
            let mut scopes = self.scopes.write().expect("scope lock poisoned");
            scopes
                .entry(scope.clone())
                .or_default()
                .sessions
                .push(record.clone());
        }
        self.notify(scope);
        Ok(record)
    }

    async fn get_session(&self, scope: &ScopeId, session_id: Uuid) -> PortResult<StudySession> {
        let scopes = self.scopes.read().expect("scope lock poisoned");
        scopes
            .get(scope)
            .and_then(|data| data.sessions.iter().find(|s| s.id == session_id))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn set_reviewed(
        &self,
        scope: &ScopeId,
        session_id: Uuid,
        change: ReviewToggle,
    ) -> PortResult<StudySession> {
        let updated = {
            let mut scopes = self.scopes.write().expect("scope lock poisoned");
            let session = scopes
                .get_mut(scope)
                .and_then(|data| data.sessions.iter_mut().find(|s| s.id == session_id))
                .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))?;
            session.reviewed = change.reviewed;
            session.reviewed_on = change.reviewed_on;
            session.clone()
        };
        self.notify(scope);
        Ok(updated)
    }

    async fn list_sessions(&self, scope: &ScopeId) -> PortResult<Vec<StudySession>> {
        Ok(self.snapshot(scope))
    }

    async fn subscribe(&self, scope: &ScopeId) -> PortResult<SessionFeed> {
        let mut rx = self.changes.subscribe();
        let token = CancellationToken::new();
        let child = token.clone();
        let store = self.clone();
        let scope = scope.clone();

        let snapshots = Box::pin(stream! {
            yield store.snapshot(&scope);
            loop {
                tokio::select! {
                    biased;
                    _ = child.cancelled() => break,
                    changed = rx.recv() => match changed {
                        Ok(touched) if touched == scope => yield store.snapshot(&scope),
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(_)) => yield store.snapshot(&scope),
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        Ok(SessionFeed::new(snapshots, token))
    }
}

#[async_trait]
impl AuthService for MemoryStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<UserAccount> {
        let mut auth = self.auth.write().expect("auth lock poisoned");
        if auth.users.contains_key(email) {
            return Err(PortError::Store(format!("Email {} already registered", email)));
        }
        let user = UserCredentials {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        };
        auth.users.insert(email.to_string(), user.clone());
        Ok(UserAccount {
            user_id: user.user_id,
            email: user.email,
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let auth = self.auth.read().expect("auth lock poisoned");
        auth.users
            .get(email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut auth = self.auth.write().expect("auth lock poisoned");
        auth.sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let auth = self.auth.read().expect("auth lock poisoned");
        match auth.sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        let mut auth = self.auth.write().expect("auth lock poisoned");
        auth.sessions.remove(session_id);
        Ok(())
    }
}

//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `SessionStore` port from the `core` crate (and of the service-level
//! `AuthService` port). It handles all interactions with the PostgreSQL
//! database using `sqlx`.
//!
//! Change notification: every session write publishes its scope on an
//! internal broadcast channel; subscriptions re-read the scope's full
//! snapshot whenever their scope is touched, which keeps delivery
//! snapshot-consistent even if the channel lags.

use async_stream::stream;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use study_tracker_core::domain::{NewStudySession, ReviewToggle, Rule, StudySession};
use study_tracker_core::ports::{PortError, PortResult, ScopeId, SessionFeed, SessionStore};
use study_tracker_core::rules::default_rules;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::auth::{AuthService, UserAccount, UserCredentials};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A PostgreSQL adapter that implements the `SessionStore` and `AuthService` ports.
#[derive(Clone)]
pub struct DbStore {
    pool: PgPool,
    changes: broadcast::Sender<ScopeId>,
}

impl DbStore {
    /// Creates a new `DbStore`.
    pub fn new(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    fn notify(&self, scope: &ScopeId) {
        // Send only fails when no subscription is listening, which is fine.
        let _ = self.changes.send(scope.clone());
    }

    async fn snapshot(&self, scope: &ScopeId) -> PortResult<Vec<StudySession>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT id, topic, studied_on, questions_total, questions_correct, accuracy, \
             interval_days, next_review_on, reviewed, reviewed_on, created_at \
             FROM study_sessions WHERE scope = $1 ORDER BY created_at DESC",
        )
        .bind(scope.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Store(e.to_string()))?;

        Ok(rows.into_iter().map(|r| r.to_domain()).collect())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SessionRow {
    id: Uuid,
    topic: String,
    studied_on: NaiveDate,
    questions_total: i32,
    questions_correct: i32,
    accuracy: i32,
    interval_days: i32,
    next_review_on: NaiveDate,
    reviewed: bool,
    reviewed_on: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl SessionRow {
    fn to_domain(self) -> StudySession {
        StudySession {
            id: self.id,
            topic: self.topic,
            studied_on: self.studied_on,
            questions_total: self.questions_total as u32,
            questions_correct: self.questions_correct as u32,
            accuracy: self.accuracy as u8,
            interval_days: self.interval_days as u32,
            next_review_on: self.next_review_on,
            reviewed: self.reviewed,
            reviewed_on: self.reviewed_on,
            created_at: self.created_at,
        }
    }
}

/// Rule sets persist as a JSON document per scope, replaced wholesale.
#[derive(Serialize, Deserialize)]
struct RuleDoc {
    min: u8,
    max: u8,
    days: u32,
}

impl RuleDoc {
    fn to_domain(&self) -> Rule {
        Rule {
            min: self.min,
            max: self.max,
            days: self.days,
        }
    }

    fn from_domain(rule: &Rule) -> Self {
        Self {
            min: rule.min,
            max: rule.max,
            days: rule.days,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for DbStore {
    async fn load_rules(&self, scope: &ScopeId) -> PortResult<Vec<Rule>> {
        let doc = sqlx::query_scalar::<_, String>("SELECT rules FROM rule_sets WHERE scope = $1")
            .bind(scope.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Store(e.to_string()))?;

        match doc {
            Some(json) => {
                let docs: Vec<RuleDoc> = serde_json::from_str(&json)
                    .map_err(|e| PortError::Store(format!("Corrupt rule document: {}", e)))?;
                Ok(docs.iter().map(RuleDoc::to_domain).collect())
            }
            None => Ok(default_rules()),
        }
    }

    async fn replace_rules(&self, scope: &ScopeId, rules: Vec<Rule>) -> PortResult<()> {
        let docs: Vec<RuleDoc> = rules.iter().map(RuleDoc::from_domain).collect();
        let json =
            serde_json::to_string(&docs).map_err(|e| PortError::Store(e.to_string()))?;

        sqlx::query(
            "INSERT INTO rule_sets (scope, rules, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (scope) DO UPDATE SET rules = EXCLUDED.rules, updated_at = NOW()",
        )
        .bind(scope.as_str())
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Store(e.to_string()))?;
        Ok(())
    }

    async fn append_session(
        &self,
        scope: &ScopeId,
        session: NewStudySession,
    ) -> PortResult<StudySession> {
        let record = StudySession::from_new(session, Uuid::new_v4(), Utc::now());

        sqlx::query(
            "INSERT INTO study_sessions \
             (id, scope, topic, studied_on, questions_total, questions_correct, accuracy, \
              interval_days, next_review_on, reviewed, reviewed_on, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(record.id)
        .bind(scope.as_str())
        .bind(&record.topic)
        .bind(record.studied_on)
        .bind(record.questions_total as i32)
        .bind(record.questions_correct as i32)
        .bind(record.accuracy as i32)
        .bind(record.interval_days as i32)
        .bind(record.next_review_on)
        .bind(record.reviewed)
        .bind(record.reviewed_on)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Store(e.to_string()))?;

        self.notify(scope);
        Ok(record)
    }

    async fn get_session(&self, scope: &ScopeId, session_id: Uuid) -> PortResult<StudySession> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, topic, studied_on, questions_total, questions_correct, accuracy, \
             interval_days, next_review_on, reviewed, reviewed_on, created_at \
             FROM study_sessions WHERE scope = $1 AND id = $2",
        )
        .bind(scope.as_str())
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Store(e.to_string()))?
        .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))?;

        Ok(row.to_domain())
    }

    async fn set_reviewed(
        &self,
        scope: &ScopeId,
        session_id: Uuid,
        change: ReviewToggle,
    ) -> PortResult<StudySession> {
        let row = sqlx::query_as::<_, SessionRow>(
            "UPDATE study_sessions SET reviewed = $3, reviewed_on = $4 \
             WHERE scope = $1 AND id = $2 \
             RETURNING id, topic, studied_on, questions_total, questions_correct, accuracy, \
             interval_days, next_review_on, reviewed, reviewed_on, created_at",
        )
        .bind(scope.as_str())
        .bind(session_id)
        .bind(change.reviewed)
        .bind(change.reviewed_on)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Store(e.to_string()))?
        .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))?;

        self.notify(scope);
        Ok(row.to_domain())
    }

    async fn list_sessions(&self, scope: &ScopeId) -> PortResult<Vec<StudySession>> {
        self.snapshot(scope).await
    }

    async fn subscribe(&self, scope: &ScopeId) -> PortResult<SessionFeed> {
        // The receiver is created before the first snapshot read so a write
        // landing in between still triggers a re-read.
        let mut rx = self.changes.subscribe();
        let token = CancellationToken::new();
        let child = token.clone();
        let store = self.clone();
        let scope = scope.clone();

        let snapshots = Box::pin(stream! {
            match store.snapshot(&scope).await {
                Ok(sessions) => yield sessions,
                Err(e) => {
                    warn!("Initial snapshot for {} failed: {}", scope, e);
                    return;
                }
            }
            loop {
                tokio::select! {
                    biased;
                    _ = child.cancelled() => break,
                    changed = rx.recv() => match changed {
                        Ok(touched) if touched == scope => {
                            match store.snapshot(&scope).await {
                                Ok(sessions) => yield sessions,
                                Err(e) => warn!("Snapshot refresh for {} failed: {}", scope, e),
                            }
                        }
                        Ok(_) => {}
                        // A lagged receiver only means missed change markers;
                        // the next snapshot read is complete regardless.
                        Err(broadcast::error::RecvError::Lagged(_)) => {
                            match store.snapshot(&scope).await {
                                Ok(sessions) => yield sessions,
                                Err(e) => warn!("Snapshot refresh for {} failed: {}", scope, e),
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        Ok(SessionFeed::new(snapshots, token))
    }
}

//=========================================================================================
// `AuthService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthService for DbStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<UserAccount> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING user_id, email, hashed_password",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Store(e.to_string()))?;

        Ok(UserAccount {
            user_id: row.user_id,
            email: row.email,
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Store(e.to_string()))?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;

        Ok(UserCredentials {
            user_id: row.user_id,
            email: row.email,
            hashed_password: row.hashed_password,
        })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Store(e.to_string()))?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Store(e.to_string()))?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Store(e.to_string()))?;
        Ok(())
    }
}

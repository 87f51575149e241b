//! services/api/src/web/protocol.rs
//!
//! Render-ready view models shared by the REST handlers and the WebSocket
//! push channel, plus the WebSocket message protocol itself. Views are
//! computed fresh from domain records and "today" on every render; nothing
//! here is ever persisted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use study_tracker_core::domain::{Rule, RuleDraft, StudySession, Summary};
use study_tracker_core::schedule::{classify, status_label};
use utoipa::ToSchema;
use uuid::Uuid;

/// The calendar date all classifications are computed against.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

//=========================================================================================
// View Models
//=========================================================================================

/// One session as the UI renders it: the persisted record plus its derived
/// status and human label.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct SessionView {
    pub id: Uuid,
    pub topic: String,
    pub studied_on: NaiveDate,
    pub questions_total: u32,
    pub questions_correct: u32,
    pub accuracy: u8,
    pub interval_days: u32,
    pub next_review_on: NaiveDate,
    pub reviewed: bool,
    pub reviewed_on: Option<NaiveDate>,
    pub status: String,
    pub status_label: String,
    pub created_at: DateTime<Utc>,
}

impl SessionView {
    pub fn from_session(session: &StudySession, today: NaiveDate) -> Self {
        let status = classify(session, today);
        Self {
            id: session.id,
            topic: session.topic.clone(),
            studied_on: session.studied_on,
            questions_total: session.questions_total,
            questions_correct: session.questions_correct,
            accuracy: session.accuracy,
            interval_days: session.interval_days,
            next_review_on: session.next_review_on,
            reviewed: session.reviewed,
            reviewed_on: session.reviewed_on,
            status: status.as_str().to_string(),
            status_label: status_label(status, session, today),
            created_at: session.created_at,
        }
    }
}

/// The dashboard KPI tiles.
#[derive(Serialize, Debug, Clone, Copy, ToSchema)]
pub struct SummaryView {
    pub overdue: usize,
    pub due_soon: usize,
    /// `None` when there are no sessions yet; the UI shows a dash.
    pub average_accuracy: Option<u8>,
}

impl From<Summary> for SummaryView {
    fn from(summary: Summary) -> Self {
        Self {
            overdue: summary.overdue,
            due_soon: summary.due_soon,
            average_accuracy: summary.average_accuracy,
        }
    }
}

/// A persisted scheduling rule, as exposed to clients.
#[derive(Serialize, Debug, Clone, Copy, ToSchema)]
pub struct RulePayload {
    pub min: u8,
    pub max: u8,
    pub days: u32,
}

impl From<Rule> for RulePayload {
    fn from(rule: Rule) -> Self {
        Self {
            min: rule.min,
            max: rule.max,
            days: rule.days,
        }
    }
}

/// A rule as submitted by a client, before validation.
#[derive(Deserialize, Debug, Clone, Copy, ToSchema)]
pub struct RuleDraftPayload {
    pub min: i64,
    pub max: i64,
    pub days: i64,
}

impl RuleDraftPayload {
    pub fn to_draft(self) -> RuleDraft {
        RuleDraft {
            min: self.min,
            max: self.max,
            days: self.days,
        }
    }
}

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Narrows the pushed session list. `status` is one of
    /// all/done/overdue/due_soon/open; `text` is a topic substring.
    /// Omitted fields reset their dimension.
    SetFilter {
        status: Option<String>,
        text: Option<String>,
    },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A complete, render-ready view of the scope: pushed once on connect
    /// and again after every store change. Never a delta.
    Snapshot {
        summary: SummaryView,
        sessions: Vec<SessionView>,
    },

    /// Reports an error to the client, which should display a message.
    Error { message: String },
}

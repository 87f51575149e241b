//! services/api/src/web/ws_handler.rs
//!
//! The live dashboard channel. One WebSocket connection holds exactly one
//! store subscription for its scope; every change to the scope's sessions
//! pushes a complete, render-ready snapshot. Closing the connection (or
//! switching accounts, which closes it) cancels the subscription before a
//! new one can be established, so stale-scope updates never leak.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::str::FromStr;
use std::sync::Arc;
use study_tracker_core::domain::{SessionFilter, StatusFilter, StudySession};
use study_tracker_core::schedule::{aggregate, filter_sessions};
use tracing::{info, warn};

use crate::web::protocol::{today, ClientMessage, ServerMessage, SessionView};
use crate::web::state::{AppState, CurrentScope};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentScope(scope)): Extension<CurrentScope>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, scope))
}

async fn handle_socket(
    socket: WebSocket,
    app_state: Arc<AppState>,
    scope: study_tracker_core::ports::ScopeId,
) {
    info!("New WebSocket connection established for scope {}", scope);

    let (mut sender, mut receiver) = socket.split();

    let mut feed = match app_state.store.subscribe(&scope).await {
        Ok(feed) => feed,
        Err(e) => {
            warn!("Failed to subscribe to {}: {}", scope, e);
            let err_msg = ServerMessage::Error {
                message: "Failed to subscribe to session updates.".to_string(),
            };
            let err_json = serde_json::to_string(&err_msg).unwrap();
            let _ = sender.send(Message::Text(err_json.into())).await;
            return;
        }
    };

    // The server-side filter narrows what gets pushed; the snapshot itself
    // always stays complete so the summary covers everything.
    let mut filter = SessionFilter::default();
    let mut latest: Vec<StudySession> = Vec::new();

    loop {
        tokio::select! {
            snapshot = feed.next_snapshot() => match snapshot {
                Some(sessions) => {
                    latest = sessions;
                    if push_snapshot(&mut sender, &latest, &filter).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::SetFilter { status, text }) => {
                            match parse_ws_filter(status, text) {
                                Ok(parsed) => {
                                    filter = parsed;
                                    if push_snapshot(&mut sender, &latest, &filter).await.is_err() {
                                        break;
                                    }
                                }
                                Err(message) => {
                                    let err_msg = ServerMessage::Error { message };
                                    let err_json = serde_json::to_string(&err_msg).unwrap();
                                    if sender.send(Message::Text(err_json.into())).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            warn!("Failed to deserialize client message: {}", e);
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client disconnected.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    }

    feed.cancel();
    info!("WebSocket connection closed for scope {}", scope);
}

fn parse_ws_filter(status: Option<String>, text: Option<String>) -> Result<SessionFilter, String> {
    let status = match status.as_deref() {
        None | Some("") => StatusFilter::All,
        Some(raw) => StatusFilter::from_str(raw).map_err(|e| e.to_string())?,
    };
    Ok(SessionFilter {
        status,
        text: text.unwrap_or_default(),
    })
}

/// Recomputes the view models against "today" and pushes one snapshot
/// message. The summary is aggregated over the full collection; only the
/// session list respects the client's filter.
async fn push_snapshot(
    sender: &mut SplitSink<WebSocket, Message>,
    sessions: &[StudySession],
    filter: &SessionFilter,
) -> Result<(), axum::Error> {
    let now = today();
    let summary = aggregate(sessions, now);
    let views: Vec<SessionView> = filter_sessions(sessions, filter, now)
        .into_iter()
        .map(|s| SessionView::from_session(s, now))
        .collect();

    let msg = ServerMessage::Snapshot {
        summary: summary.into(),
        sessions: views,
    };
    let json = serde_json::to_string(&msg).unwrap();
    sender.send(Message::Text(json.into())).await
}

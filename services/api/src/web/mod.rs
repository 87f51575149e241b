pub mod auth;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the main WebSocket handler to make it easily accessible
// to the binary that will build the web server router.
pub use middleware::resolve_scope;
pub use rest::{
    create_session_handler, get_rules_handler, list_sessions_handler, preview_rules_handler,
    preview_session_handler, save_rules_handler, summary_handler, toggle_review_handler,
};
pub use ws_handler::ws_handler;

//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbStore, MemoryStore},
    auth::AuthService,
    config::{Config, ScopeModeSetting, StoreBackend},
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, signup_handler},
        create_session_handler, get_rules_handler, list_sessions_handler, preview_rules_handler,
        preview_session_handler, resolve_scope, rest::ApiDoc, save_rules_handler,
        state::{AppState, ScopeMode},
        summary_handler, toggle_review_handler, ws_handler,
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use study_tracker_core::ports::{ScopeId, SessionStore};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize the Store Adapter ---
    let store: Arc<dyn SessionStore>;
    let auth: Arc<dyn AuthService>;
    match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_ref()
                .ok_or_else(|| ApiError::Internal("DATABASE_URL is required".to_string()))?;
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_store = Arc::new(DbStore::new(db_pool));
            info!("Running database migrations...");
            db_store.run_migrations().await?;
            info!("Database migrations complete.");
            store = db_store.clone();
            auth = db_store;
        }
        StoreBackend::Memory => {
            info!("Using the in-memory store; data will not survive a restart.");
            let memory_store = Arc::new(MemoryStore::new());
            store = memory_store.clone();
            auth = memory_store;
        }
    }

    // --- 3. Choose the Scope-Resolution Strategy ---
    let scope_mode = match config.scope_mode {
        ScopeModeSetting::Shared => {
            info!("Scope mode: shared ('{}'), no accounts.", config.shared_scope);
            ScopeMode::Shared(ScopeId::shared(&config.shared_scope))
        }
        ScopeModeSetting::User => {
            info!("Scope mode: per-user, cookie auth required.");
            ScopeMode::PerUser
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        store,
        auth,
        config: config.clone(),
        scope_mode,
    });

    let cors_origin = config
        .frontend_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid FRONTEND_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Auth routes resolve no scope (they mint the credentials the scope
    // middleware later consumes).
    let auth_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Everything else runs behind the scope middleware.
    let scoped_routes = Router::new()
        .route("/sessions", post(create_session_handler).get(list_sessions_handler))
        .route("/sessions/preview", get(preview_session_handler))
        .route("/sessions/{id}/review", post(toggle_review_handler))
        .route("/summary", get(summary_handler))
        .route("/rules", get(get_rules_handler).put(save_rules_handler))
        .route("/rules/preview", post(preview_rules_handler))
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            resolve_scope,
        ));

    let api_router = Router::new()
        .merge(auth_routes)
        .merge(scoped_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/:session_id", delete(handlers::delete_session))
        .route(
            "/sessions/:session_id/messages",
            get(handlers::get_messages),
        )
        // Chat
        .route("/sessions/:session_id/chat", post(handlers::send_chat))
        .route(
            "/sessions/:session_id/prompts/:message_id",
            post(handlers::select_prompt),
        )
        // Recording control
        .route(
            "/sessions/:session_id/record/start",
            post(handlers::start_recording),
        )
        .route(
            "/sessions/:session_id/record/frame",
            post(handlers::push_frame),
        )
        .route(
            "/sessions/:session_id/record/stop",
            post(handlers::stop_recording),
        )
        // Visit recording upload
        .route(
            "/sessions/:session_id/notes/upload",
            post(handlers::upload_notes),
        )
        // Auth and profile
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route(
            "/auth/profile",
            get(handlers::get_profile).patch(handlers::update_profile),
        )
        .route(
            "/auth/profile/diagnoses",
            post(handlers::add_diagnoses),
        )
        // The frontend runs on a different origin, mirror its CORS setup
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

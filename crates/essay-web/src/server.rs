//! Router assembly and the serve loop.

use std::io;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::session_gate;
use crate::handlers;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::landing))
        .route("/healthz", get(handlers::healthz))
        .route(
            "/login",
            get(handlers::login_page).post(handlers::login_submit),
        )
        .route("/logout", post(handlers::logout))
        .route("/signup", get(handlers::signup))
        .route("/dashboard", get(handlers::dashboard))
        .route(
            "/grade/new",
            get(handlers::grade_new_page).post(handlers::grade_new_submit),
        )
        .route("/grade/result/{id}", get(handlers::grade_result))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), session_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until ctrl-c or until `state.shutdown` is cancelled.
pub async fn serve(listener: TcpListener, state: AppState) -> io::Result<()> {
    let shutdown = state.shutdown.clone();
    let addr = listener.local_addr()?;
    info!(%addr, "essay grader listening");

    let app = router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    shutdown.cancel();
                }
            }
        })
        .await
}

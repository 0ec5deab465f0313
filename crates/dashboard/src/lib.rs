//! The dashboard HTTP surface: log ring, on-demand stats, and a trigger
//! hook into the patrol engine, all behind optional HTTP Basic auth.

pub mod auth;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;

pub use state::{AppState, Hook};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/logs", get(handlers::logs))
        .route("/api/stats", get(handlers::stats_endpoint))
        .route("/api/trigger", get(handlers::trigger))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_basic_auth))
        .with_state(state)
}

/// Binds to `PORT` (or the fixed default) and serves until the process is
/// terminated. Listener failures are fatal, per the supervisor's contract.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "dashboard: listening");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures::future::BoxFuture;
    use hostwatch_logring::LogRing;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn noop_hook() -> Hook {
        Arc::new(|| -> BoxFuture<'static, ()> { Box::pin(async {}) })
    }

    fn state() -> AppState {
        let dir = tempfile::tempdir().unwrap();
        AppState {
            ring: Arc::new(LogRing::new(dir.into_path(), "test.log")),
            basic_auth: None,
            on_patrol: noop_hook(),
            on_status_report: noop_hook(),
        }
    }

    #[tokio::test]
    async fn logs_endpoint_returns_ring_snapshot() {
        let state = state();
        state.ring.append("hello");
        let router = build_router(state);

        let response = router
            .oneshot(Request::builder().uri("/api/logs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn trigger_returns_immediately_and_invokes_hooks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let hook: Hook = Arc::new(move || -> BoxFuture<'static, ()> {
            let counter = counter_clone.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });

        let mut app_state = state();
        app_state.on_patrol = hook;
        let router = build_router(app_state);

        let response = router
            .oneshot(Request::builder().uri("/api/trigger").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn basic_auth_rejects_missing_credentials() {
        let mut app_state = state();
        app_state.basic_auth = Some(("admin".to_string(), "hunter2".to_string()));
        let router = build_router(app_state);

        let response = router
            .oneshot(Request::builder().uri("/api/logs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

//! Route table for the webhook server.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use mikrodns_core::reconciler::Reconciler;

use crate::handlers;

/// Build the application router around a reconciler
pub fn router(reconciler: Reconciler) -> Router {
    Router::new()
        .route("/dns", get(handlers::reconcile).post(handlers::reconcile))
        .route("/readiness", get(handlers::readiness))
        .route("/liveness", get(handlers::liveness))
        .layer(TraceLayer::new_for_http())
        .with_state(reconciler)
}

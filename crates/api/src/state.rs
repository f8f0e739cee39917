use std::sync::Arc;

use mailroom_events::EventReconciler;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable: inner data is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: mailroom_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The event reconciliation engine fed by the webhook route.
    pub reconciler: Arc<EventReconciler>,
}

use std::sync::Arc;

use photoshare_core::gateway::AccessGateway;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Facade over signing, engagement storage and trending.
    pub gateway: Arc<AccessGateway>,
}

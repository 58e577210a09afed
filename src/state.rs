use std::sync::Arc;

use crate::decision::DecisionEngine;

/// Shared application state passed to all handlers via axum State extractor.
/// Everything behind the engine is read-only after startup except the TTL
/// caches, which are internally synchronized.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DecisionEngine>,
}

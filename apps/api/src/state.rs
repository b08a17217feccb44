use std::sync::Arc;

use crate::pipeline::{PipelineRunner, StateStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Immutable stage chain plus the injected completion client.
    pub runner: Arc<PipelineRunner>,
    /// Pluggable session store. Default: InMemoryStateStore.
    pub store: Arc<dyn StateStore>,
}

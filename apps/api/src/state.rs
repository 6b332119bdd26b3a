use std::sync::Arc;

use crate::config::Config;
use crate::document::Compositor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Stateless apart from its template path and defaults; each request
    /// loads its own working copy of the template.
    pub compositor: Arc<Compositor>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let compositor = Compositor::new(config.template_path.clone(), config.template_defaults());
        AppState {
            config,
            compositor: Arc::new(compositor),
        }
    }
}

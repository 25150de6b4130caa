//! Application state for the API server

use crate::{Config, Downloader};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; both fields are behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The job orchestrator
    pub downloader: Arc<Downloader>,

    /// Configuration the server was started with
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<Downloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}

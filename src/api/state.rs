use std::sync::Arc;

use crate::{
    config::Config,
    db::{MemoryStore, MovieStore},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MovieStore>,
    /// Recommendation count used when a request does not give one
    pub recommendation_count: usize,
    /// Size of the latest-movies fallback shown when nothing can be recommended
    pub popular_count: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn MovieStore>, config: &Config) -> Self {
        Self {
            store,
            recommendation_count: config.recommendation_count,
            popular_count: config.popular_count,
        }
    }

    /// State over an empty in-memory store with default settings
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), &Config::default())
    }
}

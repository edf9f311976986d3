//! Application state shared across handlers

use std::sync::Arc;

use crate::engine::IdentityEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<IdentityEngine>,
}

impl AppState {
    pub fn new(engine: IdentityEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

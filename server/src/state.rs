//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! carries the relay hub and nothing else: the relay holds no canvas state.

use crate::hub::Hub;

/// Shared application state. Clone is required by Axum; the hub is
/// reference-counted, so clones share sessions.
#[derive(Clone)]
pub struct AppState {
    pub hub: Hub,
}

impl AppState {
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self { hub: Hub::new(queue_capacity) }
    }
}

//! Shared application state threaded through every handler: just the
//! `SnapshotManager`, a thin `AppState` wrapping one
//! storage handle behind an `Arc`.

use std::sync::Arc;

use kbr_snapshot::SnapshotManager;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SnapshotManager>,
}

impl AppState {
    pub fn new(manager: Arc<SnapshotManager>) -> Self {
        Self { manager }
    }
}

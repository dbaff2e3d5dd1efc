// Events that flow from background tasks into the TUI event loop
//
// The catalog load and every generation call run as spawned tasks; their
// results re-enter the single-owner event loop through an mpsc channel as
// AppEvents. Pattern matching on an enum keeps the task boundary type-safe.

use crate::catalog::{Catalog, LoadError};
use crate::generation::GenerationError;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Main event type that flows through the application
#[derive(Debug)]
pub enum AppEvent {
    /// The startup catalog fetch finished
    CatalogLoaded {
        timestamp: DateTime<Utc>,
        catalog: Catalog,
    },

    /// The startup catalog fetch failed; the session continues degraded
    CatalogFailed {
        timestamp: DateTime<Utc>,
        error: LoadError,
    },

    /// A generation call resolved or rejected
    GenerationFinished {
        /// Correlates the completion with the request the store dispatched
        request_id: u64,
        timestamp: DateTime<Utc>,
        duration: Duration,
        outcome: Result<String, GenerationError>,
    },
}

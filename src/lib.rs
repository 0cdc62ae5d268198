// Replica Sync Library
// One-way, periodic synchronization of a replica directory tree with its source

// Core infrastructure - events, compiled defaults, run loop
pub mod core;

// Operations - comparison, reconciliation, pruning, full passes
pub mod operations;

// Utilities - path mapping and permission helpers
pub mod utilities;

// Error taxonomy
pub mod error;

// Log subscriber setup
pub mod logging;

// Re-export commonly used items for convenience
pub use crate::core::{AppConfig, EventSink, MemorySink, SyncEvent, SyncScheduler, TracingSink};
pub use error::SyncError;
pub use operations::{ContentComparator, SyncEngine, SyncOptions, SyncResult};

// Core infrastructure module
// Provides foundational systems that other modules depend on

pub mod app_config;
pub mod events;
pub mod scheduler;

pub use app_config::{AppConfig, LoggingSettings, SyncSettings};
pub use events::{EventSink, MemorySink, Operation, PassCounts, SyncEvent, TracingSink};
pub use scheduler::SyncScheduler;

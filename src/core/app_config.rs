// Application Configuration
// Defaults compiled from config.yaml at build time
// Modify config.yaml and rebuild to change these values

// Include the auto-generated config from build.rs
pub mod compiled {
    include!(concat!(env!("OUT_DIR"), "/compiled_config.rs"));
}

/// Built-in configuration for replica-sync
/// Values are compiled in from config.yaml at build time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Engine settings
    pub sync: SyncSettings,

    /// Log output settings
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Bytes read per digest update when comparing files
    pub hash_chunk_size: usize,

    /// Report decisions without touching the replica
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Filter directive: trace, debug, info, warn, error
    pub level: String,

    /// Output format: "text" or "json"
    pub format: String,
}

impl LoggingSettings {
    pub const FORMATS: [&'static str; 2] = ["text", "json"];
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            hash_chunk_size: compiled::HASH_CHUNK_SIZE,
            dry_run: compiled::DRY_RUN,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: compiled::LOG_LEVEL.to_string(),
            format: compiled::LOG_FORMAT.to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sync: SyncSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

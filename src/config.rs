// Configuration loading module
// Command line arguments, optional YAML overrides and compiled defaults resolved into one run configuration

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use replica_sync::core::{AppConfig, LoggingSettings};
use replica_sync::SyncOptions;

/// Command line interface
#[derive(Debug, Parser)]
#[command(
    name = "replica-sync",
    version,
    about = "Keep a replica directory identical to a source directory"
)]
pub struct Cli {
    /// Source directory, never modified
    pub source: PathBuf,

    /// Replica directory, created if missing
    pub replica: PathBuf,

    /// Log file, appended to
    pub log_file: PathBuf,

    /// Seconds to wait between passes
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// YAML file overriding the compiled defaults
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run a single pass and exit
    #[arg(long)]
    pub once: bool,

    /// Log every decision without touching the replica
    #[arg(long)]
    pub dry_run: bool,

    /// Log filter directive (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log output format (text or json)
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<String>,
}

/// Overrides read from a `--config` YAML file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub hash_chunk_size: Option<usize>,
    pub dry_run: Option<bool>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

impl FileConfig {
    /// Load overrides from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        // An empty document deserializes as null
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Fully resolved settings for one process run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub log_file: PathBuf,
    pub interval: Duration,
    pub once: bool,
    pub sync: SyncOptions,
    pub logging: LoggingSettings,
}

impl RunConfig {
    /// Resolve the run configuration, loading the `--config` file if one was given
    pub fn resolve(cli: Cli, defaults: AppConfig) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::merge(cli, file, defaults))
    }

    /// Precedence: command line, then config file, then compiled defaults
    pub fn merge(cli: Cli, file: FileConfig, defaults: AppConfig) -> Self {
        let sync = SyncOptions {
            hash_chunk_size: file
                .hash_chunk_size
                .unwrap_or(defaults.sync.hash_chunk_size),
            // The flag can only switch dry run on
            dry_run: cli.dry_run || file.dry_run.unwrap_or(defaults.sync.dry_run),
        };
        let logging = LoggingSettings {
            level: cli
                .log_level
                .or(file.log_level)
                .unwrap_or(defaults.logging.level),
            format: cli
                .log_format
                .or(file.log_format)
                .unwrap_or(defaults.logging.format),
        };

        Self {
            source: cli.source,
            replica: cli.replica,
            log_file: cli.log_file,
            interval: Duration::from_secs(cli.interval),
            once: cli.once,
            sync,
            logging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse_cli(args: &[&str]) -> Cli {
        let mut argv = vec!["replica-sync"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn defaults() -> AppConfig {
        AppConfig {
            sync: replica_sync::core::SyncSettings {
                hash_chunk_size: 4096,
                dry_run: false,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                format: "text".to_string(),
            },
        }
    }

    #[test]
    fn test_cli_positional_arguments() {
        let cli = parse_cli(&["src", "dst", "sync.log", "30"]);
        assert_eq!(cli.source, PathBuf::from("src"));
        assert_eq!(cli.replica, PathBuf::from("dst"));
        assert_eq!(cli.log_file, PathBuf::from("sync.log"));
        assert_eq!(cli.interval, 30);
        assert!(!cli.once);
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_cli_rejects_wrong_argument_count() {
        assert!(Cli::try_parse_from(["replica-sync", "src", "dst", "sync.log"]).is_err());
        assert!(Cli::try_parse_from(["replica-sync", "a", "b", "c", "1", "extra"]).is_err());
    }

    #[test]
    fn test_cli_rejects_bad_interval() {
        assert!(Cli::try_parse_from(["replica-sync", "a", "b", "c", "0"]).is_err());
        assert!(Cli::try_parse_from(["replica-sync", "a", "b", "c", "-5"]).is_err());
        assert!(Cli::try_parse_from(["replica-sync", "a", "b", "c", "soon"]).is_err());
    }

    #[test]
    fn test_merge_uses_defaults_without_overrides() {
        let cli = parse_cli(&["src", "dst", "sync.log", "5"]);
        let config = RunConfig::merge(cli, FileConfig::default(), defaults());

        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.sync.hash_chunk_size, 4096);
        assert!(!config.sync.dry_run);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_merge_precedence() {
        let cli = parse_cli(&["src", "dst", "sync.log", "5", "--log-level", "debug"]);
        let file = FileConfig {
            hash_chunk_size: Some(65536),
            dry_run: Some(true),
            log_level: Some("warn".to_string()),
            log_format: Some("json".to_string()),
        };
        let config = RunConfig::merge(cli, file, defaults());

        assert_eq!(config.sync.hash_chunk_size, 65536);
        assert!(config.sync.dry_run);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_dry_run_flag_overrides_file() {
        let cli = parse_cli(&["src", "dst", "sync.log", "5", "--dry-run"]);
        let file = FileConfig {
            dry_run: Some(false),
            ..FileConfig::default()
        };
        assert!(RunConfig::merge(cli, file, defaults()).sync.dry_run);
    }

    #[test]
    fn test_load_file_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("replica-sync.yaml");
        fs::write(&path, "hash_chunk_size: 8192\nlog_format: json\n").unwrap();

        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.hash_chunk_size, Some(8192));
        assert_eq!(file.log_format.as_deref(), Some("json"));
        assert_eq!(file.dry_run, None);
    }

    #[test]
    fn test_load_empty_file_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.yaml");
        fs::write(&path, "\n").unwrap();

        assert_eq!(FileConfig::load(&path).unwrap(), FileConfig::default());
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("typo.yaml");
        fs::write(&path, "hash_chunk: 8192\n").unwrap();

        assert!(FileConfig::load(&path).is_err());
    }

    #[test]
    fn test_resolve_reports_missing_config_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.yaml");
        let cli = parse_cli(&[
            "src",
            "dst",
            "sync.log",
            "5",
            "--config",
            missing.to_str().unwrap(),
        ]);

        let err = RunConfig::resolve(cli, defaults()).unwrap_err();
        assert!(err.to_string().contains("absent.yaml"));
    }
}

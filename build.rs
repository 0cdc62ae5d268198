// Build script - reads config.yaml at compile time and generates defaults
// This allows changing defaults during development without editing source code

use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Tell Cargo to rerun if config.yaml changes
    println!("cargo:rerun-if-changed=src/config.yaml");

    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("compiled_config.rs");

    // Try to read config.yaml from src/, fall back to hardcoded defaults if not found
    let config = if Path::new("src/config.yaml").exists() {
        let content = fs::read_to_string("src/config.yaml")
            .expect("Failed to read src/config.yaml");
        parse_config(&content)
    } else {
        CompiledConfig::default()
    };

    let generated = format!(
        r#"// Auto-generated from config.yaml at compile time
// Do not edit - modify config.yaml and rebuild instead

pub const HASH_CHUNK_SIZE: usize = {hash_chunk_size};
pub const DRY_RUN: bool = {dry_run};

pub const LOG_LEVEL: &str = "{log_level}";
pub const LOG_FORMAT: &str = "{log_format}";
"#,
        hash_chunk_size = config.hash_chunk_size,
        dry_run = config.dry_run,
        log_level = config.log_level,
        log_format = config.log_format,
    );

    fs::write(&dest_path, generated).expect("Failed to write compiled config");
}

struct CompiledConfig {
    hash_chunk_size: usize,
    dry_run: bool,
    log_level: String,
    log_format: String,
}

impl Default for CompiledConfig {
    fn default() -> Self {
        Self {
            hash_chunk_size: 4096,
            dry_run: false,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

fn parse_config(content: &str) -> CompiledConfig {
    let mut config = CompiledConfig::default();

    // Simple YAML parsing (avoiding external dependencies in build script)
    let mut in_sync = false;
    let mut in_logging = false;

    for line in content.lines() {
        let trimmed = line.trim();

        // Track which section we're in
        if trimmed.starts_with("sync:") {
            in_sync = true;
            in_logging = false;
            continue;
        } else if trimmed.starts_with("logging:") {
            in_sync = false;
            in_logging = true;
            continue;
        }

        let Some((key, value)) = parse_kv(trimmed) else {
            continue;
        };

        if in_sync {
            match key {
                "hash_chunk_size" => {
                    config.hash_chunk_size = value.parse().ok().filter(|v| *v > 0).unwrap_or(4096)
                }
                "dry_run" => config.dry_run = parse_bool(value),
                _ => {}
            }
        } else if in_logging {
            match key {
                "level" => config.log_level = unquote(value).to_string(),
                "format" => config.log_format = unquote(value).to_string(),
                _ => {}
            }
        }
    }

    config
}

fn parse_kv(line: &str) -> Option<(&str, &str)> {
    // Skip comments and empty lines
    if line.starts_with('#') || line.is_empty() {
        return None;
    }

    let colon_pos = line.find(':')?;
    let key = line[..colon_pos].trim();
    let mut value = line[colon_pos + 1..].trim();

    // Remove inline comments
    if let Some(comment_pos) = value.find(" #") {
        value = value[..comment_pos].trim();
    }

    // Skip if value is empty (section header)
    if value.is_empty() {
        return None;
    }

    Some((key, value))
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "yes" | "1")
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('"').trim_matches('\'')
}

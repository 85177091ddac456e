// Settings Model
// Server-wide configuration

use serde::{Deserialize, Serialize};

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8010
}

fn default_themes_dir() -> String {
    "themes".to_string()
}

fn default_install_command() -> Vec<String> {
    vec![
        "npm".to_string(),
        "install".to_string(),
        "--no-audit".to_string(),
        "--no-fund".to_string(),
    ]
}

fn default_archive_output_dir() -> String {
    "dist".to_string()
}

fn default_log_retention_days() -> u32 {
    30
}

fn default_export_timeout_secs() -> u64 {
    300
}

fn default_rate_limit_per_minute() -> u32 {
    120
}

/// Server settings, read from `settings.json` in the data directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    // Local host server (HTTP/WS)
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub remote_enabled: bool,
    #[serde(default)]
    pub api_token: String,

    // Theme sources
    #[serde(default = "default_themes_dir")]
    pub themes_dir: String,
    /// Working copies root; empty means `<data dir>/workspaces`
    #[serde(default)]
    pub workspaces_dir: String,

    // Packaging
    /// Dependency installation command run inside the working copy; empty disables it
    #[serde(default = "default_install_command")]
    pub install_command: Vec<String>,
    /// External archiver command; empty uses the built-in zip archiver
    #[serde(default)]
    pub archive_command: Vec<String>,
    #[serde(default = "default_archive_output_dir")]
    pub archive_output_dir: String,
    #[serde(default = "default_export_timeout_secs")]
    pub export_timeout_secs: u64,

    // Log retention
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u32,

    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            remote_enabled: false,
            api_token: String::new(),
            themes_dir: default_themes_dir(),
            workspaces_dir: String::new(),
            install_command: default_install_command(),
            archive_command: Vec::new(),
            archive_output_dir: default_archive_output_dir(),
            export_timeout_secs: default_export_timeout_secs(),
            log_retention_days: default_log_retention_days(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
        }
    }
}

//! Command-line arguments for the vocalis binary.
//!
//! Priority resolution: CLI args > env vars > command file > defaults.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use vocalis_listen::SupervisorConfig;

/// Vocalis: run commands by voice from a verb/noun grammar.
#[derive(Parser, Debug)]
#[command(name = "vocalis", version, about)]
pub struct CliArgs {
    /// Path to the command file (JSON, or TOML by extension).
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Seconds between listening watchdog ticks.
    #[arg(long = "watchdog-interval-secs")]
    pub watchdog_interval_secs: Option<u64>,

    /// Restart the recognizer every N watchdog ticks (0 disables).
    #[arg(long = "restart-every-ticks")]
    pub restart_every_ticks: Option<u32>,

    /// Seconds a confirmation prompt waits before counting as "no".
    #[arg(long = "confirmation-timeout-secs")]
    pub confirmation_timeout_secs: Option<u64>,

    /// Start with listening paused.
    #[arg(long = "paused")]
    pub paused: bool,
}

impl CliArgs {
    /// Resolve the command file path.
    ///
    /// Priority: --config flag > VOCALIS_CONFIG env var > ~/.vocalis/settings.json.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("VOCALIS_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Log filter directive when `RUST_LOG` is not set.
    pub fn resolve_log_level(&self) -> String {
        self.log_level.clone().unwrap_or_else(|| "info".to_string())
    }

    pub fn resolve_supervisor_config(&self) -> SupervisorConfig {
        let defaults = SupervisorConfig::default();
        SupervisorConfig {
            tick: self
                .watchdog_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.tick),
            restart_every: self.restart_every_ticks.unwrap_or(defaults.restart_every),
        }
    }

    pub fn resolve_confirmation_timeout(&self, default: Duration) -> Duration {
        self.confirmation_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(default)
    }
}

/// Default command file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".vocalis").join("settings.json");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".vocalis").join("settings.json");
    }
    PathBuf::from("settings.json")
}

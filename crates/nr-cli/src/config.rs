//! Configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use nr_core::{Markers, Projection};
use nr_tail::{PipelineConfig, TailOptions};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log file to watch when none is given on the command line.
    pub log_path: Option<PathBuf>,
    /// Where finished session summaries are written.
    pub save_dir: PathBuf,
    /// Reward the displayed rate is computed from.
    pub rate_field: String,
    /// Unit shown after the rate.
    pub rate_label: String,
    pub poll_interval_ms: u64,
    /// Ignore existing log content when a watch starts.
    pub start_at_end: bool,
    pub session_start_marker: String,
    pub session_stop_marker: String,
    /// Play hours per day used by the report projection.
    pub per_day: f64,
    pub days_per_week: f64,
    pub weeks_per_month: f64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let markers = Markers::default();
        let projection = Projection::default();
        Self {
            log_path: None,
            save_dir: data_dir.join("sessions"),
            rate_field: "Dilithium Ore".to_string(),
            rate_label: "DPS".to_string(),
            poll_interval_ms: 100,
            start_at_end: false,
            session_start_marker: markers.start,
            session_stop_marker: markers.stop,
            per_day: projection.per_day,
            days_per_week: projection.days_per_week,
            weeks_per_month: projection.weeks_per_month,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // NR_RATE_FIELD, NR_SAVE_DIR, ...
        figment = figment.merge(Env::prefixed("NR_"));

        figment.extract()
    }

    pub fn markers(&self) -> Markers {
        Markers {
            start: self.session_start_marker.clone(),
            stop: self.session_stop_marker.clone(),
        }
    }

    pub const fn projection(&self) -> Projection {
        Projection {
            per_day: self.per_day,
            days_per_week: self.days_per_week,
            weeks_per_month: self.weeks_per_month,
        }
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            tail: TailOptions {
                poll_interval: Duration::from_millis(self.poll_interval_ms),
                start_at_end: self.start_at_end,
            },
            markers: self.markers(),
        }
    }
}

/// Returns the platform-specific config directory for nr.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("nr"))
}

/// Returns the platform-specific data directory for nr.
///
/// On Linux: `~/.local/share/nr`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("nr"))
}

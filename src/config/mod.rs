use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub filters: FilterConfig,
    pub display: DisplayConfig,
}

/// Where the dashboard artefacts live.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Static-hosting base URL; unset means read from `data_dir`.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Filter policy knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterConfig {
    /// Whether a cap-band filter admits tickers with no resolvable market cap.
    #[serde(default)]
    pub include_unknown_market_cap: bool,
}

/// Table rendering defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Main table shows at most this many rows.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Full-history pagination size.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Where the view-mode preference is persisted.
    #[serde(default = "default_view_state_path")]
    pub view_state_path: PathBuf,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_rows() -> usize {
    100
}
fn default_page_size() -> usize {
    50
}
fn default_view_state_path() -> PathBuf {
    PathBuf::from(".crashdash_view")
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("CRASHDASH").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|_| AppConfig::default());
        Ok(app_cfg)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                base_url: None,
                data_dir: default_data_dir(),
                timeout_secs: default_timeout_secs(),
            },
            filters: FilterConfig {
                include_unknown_market_cap: false,
            },
            display: DisplayConfig {
                max_rows: default_max_rows(),
                page_size: default_page_size(),
                view_state_path: default_view_state_path(),
            },
        }
    }
}

// ── View-mode preference ──────────────────────────────────────────────────────

/// The only state this tool persists: the table rendering mode, kept in a
/// small state file between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ViewMode {
    #[default]
    Full,
    Compact,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Full => "full",
            ViewMode::Compact => "compact",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "full" => Some(ViewMode::Full),
            "compact" => Some(ViewMode::Compact),
            _ => None,
        }
    }

    /// Missing or unreadable state falls back to the default mode.
    pub fn load(path: &Path) -> ViewMode {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| ViewMode::parse(&s))
            .unwrap_or_default()
    }

    pub fn save(self, path: &Path) {
        if let Err(e) = std::fs::write(path, self.as_str()) {
            warn!("Could not persist view mode to {:?}: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_mode_round_trips_through_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view");

        assert_eq!(ViewMode::load(&path), ViewMode::Full); // nothing persisted yet

        ViewMode::Compact.save(&path);
        assert_eq!(ViewMode::load(&path), ViewMode::Compact);

        std::fs::write(&path, "garbage").unwrap();
        assert_eq!(ViewMode::load(&path), ViewMode::Full);
    }

    #[test]
    fn default_config_is_local_data_dir() {
        let cfg = AppConfig::default();
        assert!(cfg.source.base_url.is_none());
        assert_eq!(cfg.source.data_dir, PathBuf::from("data"));
        assert!(!cfg.filters.include_unknown_market_cap);
        assert_eq!(cfg.display.page_size, 50);
    }
}

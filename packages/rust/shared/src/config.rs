//! Application configuration for calmerge.
//!
//! User config lives at `~/.calmerge/calmerge.toml`.
//! Environment variables and CLI flags override config file values, which
//! override defaults. The resolved [`MergeConfig`] is built once at startup
//! and passed down explicitly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CalMergeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "calmerge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".calmerge";

/// Output value meaning "write to stdout".
const STDOUT_MARKER: &str = "-";

// ---------------------------------------------------------------------------
// Config structs (matching calmerge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the feed links are discovered.
    #[serde(default)]
    pub source: SourceConfig,

    /// Where the merged document goes.
    #[serde(default)]
    pub output: OutputConfig,

    /// Calendar header properties.
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Page scanned for calendar-feed links.
    #[serde(default = "default_page_url")]
    pub page_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            page_url: default_page_url(),
        }
    }
}

fn default_page_url() -> String {
    "https://www.berlin-recycling-volleys.de/news/events".into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output file path, or `-` for stdout.
    #[serde(default = "default_output_path")]
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> String {
    "br_volleys_merged.ics".into()
}

/// `[calendar]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Display name written as `X-WR-CALNAME`.
    #[serde(default = "default_calendar_name")]
    pub name: String,

    /// Timezone name written as `X-WR-TIMEZONE`.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Product identifier written as `PRODID`.
    #[serde(default = "default_product_id")]
    pub product_id: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            name: default_calendar_name(),
            timezone: default_timezone(),
            product_id: default_product_id(),
        }
    }
}

fn default_calendar_name() -> String {
    "BR Volleys (merged)".into()
}
fn default_timezone() -> String {
    "Europe/Berlin".into()
}
fn default_product_id() -> String {
    "-//calmerge//Merged ICS//EN".into()
}

/// `[fetch]` section. Also used as-is at runtime by the fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of feeds downloaded at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum number of redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_concurrency() -> u32 {
    4
}
fn default_user_agent() -> String {
    concat!("Mozilla/5.0 (compatible; calmerge/", env!("CARGO_PKG_VERSION"), ")").into()
}
fn default_max_redirects() -> usize {
    5
}

// ---------------------------------------------------------------------------
// Runtime config (merged from config file + env/CLI overrides)
// ---------------------------------------------------------------------------

/// Values supplied by environment variables or CLI flags.
///
/// `None` means "not given"; the config file (or default) value is used.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub page_url: Option<String>,
    pub output: Option<String>,
    pub calendar_name: Option<String>,
    pub timezone: Option<String>,
    pub timeout_secs: Option<u64>,
    pub concurrency: Option<u32>,
}

/// Header properties written into the merged calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarProperties {
    /// `X-WR-CALNAME`.
    pub name: String,
    /// `X-WR-TIMEZONE`.
    pub timezone: String,
    /// `PRODID`.
    pub product_id: String,
}

impl Default for CalendarProperties {
    fn default() -> Self {
        CalendarConfig::default().into()
    }
}

impl From<CalendarConfig> for CalendarProperties {
    fn from(config: CalendarConfig) -> Self {
        Self {
            name: config.name,
            timezone: config.timezone,
            product_id: config.product_id,
        }
    }
}

/// Where the merged document is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write to a file (parent directories are created).
    File(PathBuf),
    /// Write to standard output.
    Stdout,
}

impl OutputTarget {
    fn parse(value: &str) -> Self {
        if value == STDOUT_MARKER {
            Self::Stdout
        } else {
            Self::File(PathBuf::from(value))
        }
    }
}

impl std::fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Stdout => f.write_str("<stdout>"),
        }
    }
}

/// Runtime merge configuration, resolved once at process start.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Page scanned for feed links.
    pub page_url: Url,
    /// Output destination.
    pub output: OutputTarget,
    /// Calendar header properties.
    pub calendar: CalendarProperties,
    /// HTTP client settings.
    pub fetch: FetchConfig,
}

impl MergeConfig {
    /// Apply `overrides` on top of the file config and validate the result.
    pub fn resolve(config: &AppConfig, overrides: &ConfigOverrides) -> Result<Self> {
        let page_url = overrides
            .page_url
            .as_deref()
            .unwrap_or(&config.source.page_url);
        let page_url = Url::parse(page_url)
            .map_err(|e| CalMergeError::config(format!("invalid page URL '{page_url}': {e}")))?;

        let output = overrides.output.as_deref().unwrap_or(&config.output.path);
        if output.trim().is_empty() {
            return Err(CalMergeError::config("output path must not be empty"));
        }

        let mut calendar = config.calendar.clone();
        if let Some(name) = &overrides.calendar_name {
            calendar.name = name.clone();
        }
        if let Some(tz) = &overrides.timezone {
            calendar.timezone = tz.clone();
        }

        let mut fetch = config.fetch.clone();
        if let Some(secs) = overrides.timeout_secs {
            fetch.timeout_secs = secs;
        }
        if let Some(n) = overrides.concurrency {
            fetch.concurrency = n;
        }
        if fetch.concurrency == 0 {
            return Err(CalMergeError::config("fetch.concurrency must be at least 1"));
        }

        Ok(Self {
            page_url,
            output: OutputTarget::parse(output),
            calendar: calendar.into(),
            fetch,
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.calmerge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CalMergeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.calmerge/calmerge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CalMergeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CalMergeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CalMergeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CalMergeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CalMergeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("page_url"));
        assert!(toml_str.contains("Europe/Berlin"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let toml_str = r#"
[calendar]
name = "Club Games"

[fetch]
concurrency = 8
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.calendar.name, "Club Games");
        assert_eq!(config.calendar.timezone, "Europe/Berlin");
        assert_eq!(config.fetch.concurrency, 8);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.output.path, "br_volleys_merged.ics");
    }

    #[test]
    fn resolve_uses_file_values_without_overrides() {
        let config = AppConfig::default();
        let merged = MergeConfig::resolve(&config, &ConfigOverrides::default()).unwrap();
        assert_eq!(
            merged.page_url.as_str(),
            "https://www.berlin-recycling-volleys.de/news/events"
        );
        assert_eq!(
            merged.output,
            OutputTarget::File(PathBuf::from("br_volleys_merged.ics"))
        );
        assert_eq!(merged.calendar.name, "BR Volleys (merged)");
        assert_eq!(merged.fetch.concurrency, 4);
    }

    #[test]
    fn overrides_win_over_file() {
        let mut config = AppConfig::default();
        config.calendar.timezone = "UTC".into();

        let overrides = ConfigOverrides {
            page_url: Some("https://club.example/termine".into()),
            output: Some("-".into()),
            timezone: Some("America/New_York".into()),
            concurrency: Some(1),
            ..Default::default()
        };
        let merged = MergeConfig::resolve(&config, &overrides).unwrap();

        assert_eq!(merged.page_url.as_str(), "https://club.example/termine");
        assert_eq!(merged.output, OutputTarget::Stdout);
        assert_eq!(merged.calendar.timezone, "America/New_York");
        assert_eq!(merged.calendar.name, "BR Volleys (merged)");
        assert_eq!(merged.fetch.concurrency, 1);
    }

    #[test]
    fn invalid_page_url_is_config_error() {
        let overrides = ConfigOverrides {
            page_url: Some("not a url".into()),
            ..Default::default()
        };
        let err = MergeConfig::resolve(&AppConfig::default(), &overrides).unwrap_err();
        assert!(matches!(err, CalMergeError::Config { .. }));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let overrides = ConfigOverrides {
            concurrency: Some(0),
            ..Default::default()
        };
        assert!(MergeConfig::resolve(&AppConfig::default(), &overrides).is_err());
    }
}

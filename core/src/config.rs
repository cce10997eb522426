use crate::error::TrackerResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime settings for the tracker. All fields have working defaults, so a
/// config file only needs to name the ones it wants to override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// SQLite database file holding the member table.
    pub db_path: String,
    /// Base URL of the remote user endpoint. Must end with a slash.
    pub api_base_url: String,
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Pause between consecutive API calls in milliseconds. The remote
    /// service rate-limits aggressively; 700ms keeps a full-roster pass
    /// under its ceiling.
    pub rate_limit_delay_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_path: "faction_data.db".into(),
            api_base_url: "https://api.torn.com/user/".into(),
            user_agent: concat!(
                "crime-tracker/",
                env!("CARGO_PKG_VERSION"),
                " (FactionOfficerTool)"
            )
            .into(),
            request_timeout_secs: 15,
            rate_limit_delay_ms: 700,
        }
    }
}

impl TrackerConfig {
    /// Load overrides from a JSON file. Fields the file omits keep their
    /// defaults.
    pub fn load(path: &str) -> TrackerResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A partial config file only overrides the fields it names.
    #[test]
    fn partial_file_keeps_defaults_for_omitted_fields() {
        let config: TrackerConfig =
            serde_json::from_str(r#"{"db_path": "scratch.db"}"#).unwrap();
        assert_eq!(config.db_path, "scratch.db");
        assert_eq!(config.api_base_url, "https://api.torn.com/user/");
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.rate_limit_delay_ms, 700);
    }

    #[test]
    fn duration_accessors_match_raw_fields() {
        let config = TrackerConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.rate_limit_delay(), Duration::from_millis(700));
    }
}

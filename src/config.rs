use std::path::Path;

use crate::error::{AppError, Result};
use crate::types::{ContestConfig, TimeWindow};

/// Simulated stake placed on every winning pick (USD).
pub const STAKE: f64 = 100.0;

/// Channel capacity for fetch results routed back to the TUI loop.
pub const CHANNEL_CAPACITY: usize = 64;

/// How often each contest feed is re-fetched (seconds).
pub const FEED_REFRESH_INTERVAL_SECS: u64 = 300;

/// Per-request timeout for feed retrieval (seconds).
pub const FEED_TIMEOUT_SECS: u64 = 30;

/// Contest id used when a single contest is configured from env vars.
pub const DEFAULT_CONTEST_ID: &str = "main";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    /// Seconds between background feed refreshes (FEED_REFRESH_INTERVAL_SECS)
    pub feed_refresh_interval_secs: u64,
    /// HTTP timeout for a single feed fetch (FEED_TIMEOUT_SECS)
    pub feed_timeout_secs: u64,
    /// Window applied when a caller does not select one (DEFAULT_WINDOW)
    pub default_window: TimeWindow,
    /// Contests served. Loaded from CONTESTS_PATH, or a single contest built
    /// from the CONTEST_* / FEED_URL variables.
    pub contests: Vec<ContestConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let default_window = std::env::var("DEFAULT_WINDOW")
            .unwrap_or_else(|_| "all".to_string())
            .parse::<TimeWindow>()
            .map_err(|e| AppError::Config(format!("DEFAULT_WINDOW: {e}")))?;

        let contests = match std::env::var("CONTESTS_PATH") {
            Ok(path) => load_contests(Path::new(&path))?,
            Err(_) => vec![contest_from_env()?],
        };
        validate_contests(&contests)?;

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            feed_refresh_interval_secs: std::env::var("FEED_REFRESH_INTERVAL_SECS")
                .unwrap_or_else(|_| FEED_REFRESH_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(FEED_REFRESH_INTERVAL_SECS)
                .max(1),
            feed_timeout_secs: std::env::var("FEED_TIMEOUT_SECS")
                .unwrap_or_else(|_| FEED_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(FEED_TIMEOUT_SECS),
            default_window,
            contests,
        })
    }
}

/// Read a JSON array of contest configs from disk.
pub fn load_contests(path: &Path) -> Result<Vec<ContestConfig>> {
    let raw = std::fs::read_to_string(path)?;
    let contests: Vec<ContestConfig> = serde_json::from_str(&raw)?;
    Ok(contests)
}

fn contest_from_env() -> Result<ContestConfig> {
    let spreadsheet_url = std::env::var("FEED_URL").map_err(|_| {
        AppError::Config("FEED_URL must be set when CONTESTS_PATH is not".to_string())
    })?;

    Ok(ContestConfig {
        id: std::env::var("CONTEST_ID").unwrap_or_else(|_| DEFAULT_CONTEST_ID.to_string()),
        contest_name: std::env::var("CONTEST_NAME").unwrap_or_else(|_| "Pick'em Contest".to_string()),
        primary_image_url: std::env::var("CONTEST_IMAGE_URL").ok(),
        price: std::env::var("CONTEST_PRICE").ok(),
        spreadsheet_url,
        sponsored: std::env::var("CONTEST_SPONSORED")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false),
        contest_end_date: std::env::var("CONTEST_END_DATE").ok(),
    })
}

/// Contest ids are used as URL path segments and map keys.
pub fn validate_contests(contests: &[ContestConfig]) -> Result<()> {
    if contests.is_empty() {
        return Err(AppError::Config("at least one contest must be configured".to_string()));
    }
    let mut seen = std::collections::HashSet::new();
    for c in contests {
        let slug_ok = !c.id.is_empty()
            && c.id.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !slug_ok {
            return Err(AppError::Config(format!("contest id {:?} is not a URL-safe slug", c.id)));
        }
        if c.spreadsheet_url.trim().is_empty() {
            return Err(AppError::Config(format!("contest {} has an empty spreadsheet_url", c.id)));
        }
        if !seen.insert(c.id.as_str()) {
            return Err(AppError::Config(format!("duplicate contest id {}", c.id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contest(id: &str, url: &str) -> ContestConfig {
        ContestConfig {
            id: id.to_string(),
            contest_name: "Test".to_string(),
            primary_image_url: None,
            price: None,
            spreadsheet_url: url.to_string(),
            sponsored: false,
            contest_end_date: None,
        }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let contests = vec![contest("nfl", "http://a"), contest("nfl", "http://b")];
        assert!(matches!(validate_contests(&contests), Err(AppError::Config(_))));
    }

    #[test]
    fn rejects_non_slug_ids() {
        let contests = vec![contest("nfl week 1", "http://a")];
        assert!(validate_contests(&contests).is_err());
    }

    #[test]
    fn rejects_empty_contest_list() {
        assert!(validate_contests(&[]).is_err());
    }

    #[test]
    fn loads_contests_from_json_file() {
        let path = std::env::temp_dir().join(format!("contests-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"id":"nba","contestName":"NBA Monthly","spreadsheetUrl":"http://feed","sponsored":true}]"#,
        )
        .unwrap();

        let contests = load_contests(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(contests.len(), 1);
        assert_eq!(contests[0].id, "nba");
        assert!(contests[0].sponsored);
        assert!(contests[0].price.is_none());
        assert!(validate_contests(&contests).is_ok());
    }
}

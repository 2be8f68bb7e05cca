use std::env;
use std::path::PathBuf;

/// Runtime configuration, built once in main and handed to each pass.
/// Every value has a default; `LUXO_*` environment variables override.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    /// Base URL of the listing site, used for search and profile URLs.
    pub site_base: String,
    /// Region suffix appended to neighborhood searches.
    pub region: String,
    /// Minimum nightly price filter for discovery searches.
    pub min_price: u32,
    /// Stay length used for discovery date windows and price normalization.
    pub nights: u32,
    /// Days from today to the discovery check-in date.
    pub checkin_days_ahead: i64,
    pub fetch_timeout_secs: u64,
    pub watch_interval_secs: u64,
    /// Optional completion endpoint for model-generated pitches.
    pub pitch_api_url: Option<String>,
    pub pitch_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from("data/leads.sqlite"),
            site_base: "https://www.airbnb.com.br".to_string(),
            region: "Rio de Janeiro".to_string(),
            min_price: 1000,
            nights: 3,
            checkin_days_ahead: 14,
            fetch_timeout_secs: 30,
            watch_interval_secs: 5,
            pitch_api_url: None,
            pitch_api_key: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut cfg = Config::default();
        if let Ok(p) = env::var("LUXO_DB_PATH") {
            cfg.db_path = PathBuf::from(p);
        }
        if let Ok(b) = env::var("LUXO_SITE_BASE") {
            cfg.site_base = b.trim_end_matches('/').to_string();
        }
        if let Ok(r) = env::var("LUXO_REGION") {
            cfg.region = r;
        }
        if let Ok(v) = env::var("LUXO_MIN_PRICE") {
            if let Ok(n) = v.parse() {
                cfg.min_price = n;
            }
        }
        if let Ok(v) = env::var("LUXO_NIGHTS") {
            if let Ok(n) = v.parse() {
                cfg.nights = n;
            }
        }
        if let Ok(v) = env::var("LUXO_FETCH_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                cfg.fetch_timeout_secs = n;
            }
        }
        if let Ok(v) = env::var("LUXO_WATCH_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                cfg.watch_interval_secs = n;
            }
        }
        cfg.pitch_api_url = env::var("LUXO_PITCH_API_URL").ok();
        cfg.pitch_api_key = env::var("LUXO_PITCH_API_KEY").ok();
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.nights, 3);
        assert_eq!(cfg.fetch_timeout_secs, 30);
        assert!(cfg.site_base.starts_with("https://"));
        assert!(cfg.pitch_api_url.is_none());
    }
}

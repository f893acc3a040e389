use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Public base URL, used to build embed links
    pub base_url: String,
    pub is_dev: bool,
    /// Catalog snapshot file. `None` keeps the demo catalog in memory.
    pub catalog_path: Option<PathBuf>,
    /// Idle time before a player session is reaped (default: 300)
    pub session_ttl_secs: u64,
    /// Ad countdown tick period in milliseconds (default: 1000)
    pub ad_tick_millis: u64,
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, provides sensible defaults. In PROD mode, PORT and BASE_URL are required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        // Port: required in prod, defaults to 3000 in dev
        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        // Base URL: required in prod, defaults to localhost in dev
        let base_url = if is_dev {
            env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
        } else {
            env::var("BASE_URL").map_err(|_| "BASE_URL is required in production")?
        };
        let base_url = base_url.trim_end_matches('/').to_string();

        let catalog_path = env::var("CATALOG_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let session_ttl_secs: u64 = env::var("SESSION_TTL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);

        let ad_tick_millis: u64 = env::var("AD_TICK_MILLIS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .ok()
            .filter(|ms| *ms > 0)
            .unwrap_or(1000);

        Ok(Config {
            port,
            base_url,
            is_dev,
            catalog_path,
            session_ttl_secs,
            ad_tick_millis,
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn ad_tick_period(&self) -> Duration {
        Duration::from_millis(self.ad_tick_millis.max(1))
    }
}

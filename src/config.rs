use crate::components::calendar::ParseMode;
use crate::components::query::PastEventPolicy;
use crate::error::{config_error, env_error, AppResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

/// Default location of the optional overrides file
pub const DEFAULT_CONFIG_FILE: &str = "config/calfeed.toml";

/// Keyword identifying youth training sessions in the feed
pub const DEFAULT_YOUTH_KEYWORD: &str = "Jugenduebung";

/// Default timezone for "now" and floating feed times
pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";

/// Default Redis key holding the post feed
pub const DEFAULT_POSTS_KEY: &str = "calfeed:posts";

/// Main configuration structure for the service
#[derive(Debug, Clone)]
pub struct Config {
    /// Public iCalendar feed to serve events from
    pub calendar_url: String,
    /// Timezone used for "now" and for floating feed times
    pub timezone: Tz,
    /// How "next event" queries treat events that already started
    pub past_event_policy: PastEventPolicy,
    /// Whether malformed feed entries fail the feed or get skipped
    pub parse_mode: ParseMode,
    /// Summary substring for the youth training route
    pub youth_keyword: String,
    /// Static API key; `None` disables the check
    pub api_key: Option<String>,
    /// Address the HTTP server binds to
    pub bind_address: IpAddr,
    /// Port the HTTP server binds to
    pub port: u16,
    /// Upper bound for one upstream request
    pub fetch_timeout: Duration,
    /// Extra attempts after a transient fetch failure (0 or 1)
    pub fetch_retries: u8,
    /// How long fetched feed bytes are served without refetching
    pub cache_ttl: Duration,
    /// How long stale feed bytes may cover for a failing upstream
    pub stale_grace: Duration,
    /// Redis connection string for the post feed
    pub redis_url: Option<String>,
    /// Redis sorted set holding the posts
    pub posts_key: String,
}

/// Values accepted in the overrides file; environment variables win
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileOverrides {
    calendar_url: Option<String>,
    timezone: Option<String>,
    past_event_policy: Option<String>,
    parse_mode: Option<String>,
    youth_keyword: Option<String>,
    api_key: Option<String>,
    bind_address: Option<String>,
    port: Option<u16>,
    fetch_timeout_secs: Option<u64>,
    fetch_retries: Option<u8>,
    cache_ttl_secs: Option<u64>,
    stale_grace_secs: Option<u64>,
    redis_url: Option<String>,
    posts_key: Option<String>,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let path = env::var("CALFEED_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let overrides = load_overrides(Path::new(&path))?;

        Self::from_sources(|name| env::var(name).ok(), overrides)
    }

    /// Build a config from a variable lookup and file overrides
    fn from_sources<F>(lookup: F, file: FileOverrides) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |name: &str, file_value: Option<String>| {
            lookup(name).filter(|v| !v.trim().is_empty()).or(file_value)
        };
        let pick_num = |name: &str, file_value: Option<u64>| -> AppResult<Option<u64>> {
            match lookup(name).filter(|v| !v.trim().is_empty()) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| config_error(&format!("Invalid {} value: {}", name, raw))),
                None => Ok(file_value),
            }
        };

        let calendar_url = pick("CALENDAR_URL", file.calendar_url)
            .ok_or_else(|| env_error("CALENDAR_URL"))?;
        url::Url::parse(&calendar_url)
            .map_err(|e| config_error(&format!("Invalid CALENDAR_URL: {}", e)))?;

        let timezone_name =
            pick("TIMEZONE", file.timezone).unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = timezone_name
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Unknown timezone: {}", timezone_name)))?;

        let past_event_policy = match pick("PAST_EVENT_POLICY", file.past_event_policy) {
            Some(raw) => raw.parse()?,
            None => PastEventPolicy::default(),
        };

        let parse_mode = match pick("PARSE_MODE", file.parse_mode) {
            Some(raw) => raw.parse()?,
            None => ParseMode::default(),
        };

        let youth_keyword = pick("YOUTH_KEYWORD", file.youth_keyword)
            .unwrap_or_else(|| DEFAULT_YOUTH_KEYWORD.to_string());

        let api_key = pick("API_KEY", file.api_key);

        let bind_address = match pick("BIND_ADDRESS", file.bind_address) {
            Some(raw) => raw
                .parse::<IpAddr>()
                .map_err(|_| config_error(&format!("Invalid BIND_ADDRESS: {}", raw)))?,
            None => IpAddr::from([127, 0, 0, 1]),
        };

        let port = pick_num("PORT", file.port.map(u64::from))?.unwrap_or(3000);
        let port = u16::try_from(port)
            .map_err(|_| config_error(&format!("Invalid PORT value: {}", port)))?;

        let fetch_timeout_secs = pick_num("FETCH_TIMEOUT_SECS", file.fetch_timeout_secs)?.unwrap_or(5);
        if fetch_timeout_secs == 0 {
            return Err(config_error("FETCH_TIMEOUT_SECS must be at least 1"));
        }

        let fetch_retries = pick_num("FETCH_RETRIES", file.fetch_retries.map(u64::from))?.unwrap_or(1);
        if fetch_retries > 1 {
            return Err(config_error("FETCH_RETRIES must be 0 or 1"));
        }

        let cache_ttl_secs = pick_num("CACHE_TTL_SECS", file.cache_ttl_secs)?.unwrap_or(300);
        let stale_grace_secs = pick_num("STALE_GRACE_SECS", file.stale_grace_secs)?.unwrap_or(3600);

        let redis_url = pick("REDIS_URL", file.redis_url);
        let posts_key =
            pick("POSTS_KEY", file.posts_key).unwrap_or_else(|| DEFAULT_POSTS_KEY.to_string());

        Ok(Config {
            calendar_url,
            timezone,
            past_event_policy,
            parse_mode,
            youth_keyword,
            api_key,
            bind_address,
            port,
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            fetch_retries: fetch_retries as u8,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            stale_grace: Duration::from_secs(stale_grace_secs),
            redis_url,
            posts_key,
        })
    }

    /// Config with defaults for everything except the feed URL
    pub fn with_calendar_url(calendar_url: &str) -> Self {
        Config {
            calendar_url: calendar_url.to_string(),
            timezone: chrono_tz::Europe::Berlin,
            past_event_policy: PastEventPolicy::default(),
            parse_mode: ParseMode::default(),
            youth_keyword: DEFAULT_YOUTH_KEYWORD.to_string(),
            api_key: None,
            bind_address: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            fetch_timeout: Duration::from_secs(5),
            fetch_retries: 1,
            cache_ttl: Duration::from_secs(300),
            stale_grace: Duration::from_secs(3600),
            redis_url: None,
            posts_key: DEFAULT_POSTS_KEY.to_string(),
        }
    }
}

/// Read the overrides file; a missing file means no overrides
fn load_overrides(path: &Path) -> AppResult<FileOverrides> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str::<FileOverrides>(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileOverrides::default()),
        Err(e) => Err(e.into()),
    }
}

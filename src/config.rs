use std::env;
use std::path::PathBuf;

use chrono::NaiveDate;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 20;
const CACHE_DIR: &str = "xg_terminal";
const LOG_FILE: &str = "xg_terminal.log";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    pub timeout_secs: u64,
    pub start_date: Option<NaiveDate>,
    pub export_dir: PathBuf,
    pub cache_enabled: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            start_date: None,
            export_dir: PathBuf::from("."),
            cache_enabled: true,
            log_file: cache_dir().map(|dir| dir.join(LOG_FILE)),
        }
    }
}

impl ClientConfig {
    /// Loads `.env.local` then `.env` (first value wins) and reads the `XG_*` variables.
    pub fn load() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_base = env::var("XG_API_BASE")
            .ok()
            .map(|v| normalize_base(&v))
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.api_base);
        let start_date = env::var("XG_DATE")
            .ok()
            .and_then(|v| parse_date(&v));
        let export_dir = env::var("XG_EXPORT_DIR")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.export_dir);
        let log_file = env::var("XG_LOG_FILE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or(defaults.log_file);

        Self {
            api_base,
            timeout_secs: http_timeout_secs(),
            start_date,
            export_dir,
            cache_enabled: env_bool("XG_CACHE_ENABLED", true),
            log_file,
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }
}

fn http_timeout_secs() -> u64 {
    timeout_from(env::var("XG_HTTP_TIMEOUT_SECS").ok().as_deref())
}

fn timeout_from(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
        .clamp(2, 120)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub fn cache_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn normalize_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::cache_dir;
use crate::model::Fixture;

const CACHE_FILE: &str = "fixtures.json";
const CACHE_VERSION: u32 = 1;
const MAX_DATES: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheFile {
    version: u32,
    #[serde(default)]
    dates: HashMap<String, DateEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DateEntry {
    fixtures: Vec<Fixture>,
    fetched_at: u64,
}

/// Last fixture list seen per date, shown while a fresh list is loading.
#[derive(Debug, Clone)]
pub struct FixtureCache {
    path: PathBuf,
}

impl FixtureCache {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open_default() -> Option<Self> {
        cache_dir().map(|dir| Self::at(dir.join(CACHE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self, date: NaiveDate) -> Option<(Vec<Fixture>, SystemTime)> {
        let cache = load_cache_file(&self.path)?;
        let entry = cache.dates.get(&date_key(date))?;
        let fetched_at = system_time_from_secs(entry.fetched_at)?;
        Some((entry.fixtures.clone(), fetched_at))
    }

    pub fn save(&self, date: NaiveDate, fixtures: &[Fixture]) -> Result<()> {
        let mut cache = load_cache_file(&self.path).unwrap_or_default();
        cache.version = CACHE_VERSION;
        cache.dates.insert(
            date_key(date),
            DateEntry {
                fixtures: fixtures.to_vec(),
                fetched_at: system_time_to_secs(SystemTime::now()).unwrap_or_default(),
            },
        );
        prune(&mut cache);

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).ok();
        }
        let json = serde_json::to_string(&cache).context("serialize fixtures cache")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).context("write fixtures cache")?;
        fs::rename(&tmp, &self.path).context("swap fixtures cache")?;
        Ok(())
    }
}

fn prune(cache: &mut CacheFile) {
    if cache.dates.len() <= MAX_DATES {
        return;
    }
    let mut keys = cache
        .dates
        .iter()
        .map(|(k, v)| (v.fetched_at, k.clone()))
        .collect::<Vec<_>>();
    keys.sort();
    let excess = cache.dates.len() - MAX_DATES;
    for (_, key) in keys.into_iter().take(excess) {
        cache.dates.remove(&key);
    }
}

fn load_cache_file(path: &Path) -> Option<CacheFile> {
    let raw = fs::read_to_string(path).ok()?;
    let cache = serde_json::from_str::<CacheFile>(&raw).ok()?;
    if cache.version != CACHE_VERSION {
        return None;
    }
    Some(cache)
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn system_time_to_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

fn system_time_from_secs(secs: u64) -> Option<SystemTime> {
    UNIX_EPOCH.checked_add(std::time::Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;

    use super::{CacheFile, DateEntry, FixtureCache, MAX_DATES, prune};
    use crate::model::Fixture;

    fn temp_cache(name: &str) -> FixtureCache {
        let dir = std::env::temp_dir().join(format!("xg_terminal_test_{}_{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        FixtureCache::at(dir.join("fixtures.json"))
    }

    #[test]
    fn saved_lists_load_back_per_date() {
        let cache = temp_cache("per_date");
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).expect("date");
        let other = NaiveDate::from_ymd_opt(2026, 10, 20).expect("date");
        let fixtures = vec![Fixture {
            id: Some("9".to_string()),
            home_team: "Ajax".to_string(),
            away_team: "PSV Eindhoven".to_string(),
            league: "Eredivisie".to_string(),
            ..Fixture::default()
        }];

        cache.save(day, &fixtures).expect("save");
        let (loaded, _) = cache.load(day).expect("cached");
        assert_eq!(loaded, fixtures);
        assert!(cache.load(other).is_none());

        if let Some(dir) = cache.path().parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn prune_drops_oldest_dates() {
        let mut cache = CacheFile::default();
        for i in 0..(MAX_DATES + 3) {
            cache.dates.insert(
                format!("d{i:02}"),
                DateEntry {
                    fixtures: Vec::new(),
                    fetched_at: i as u64,
                },
            );
        }
        prune(&mut cache);
        assert_eq!(cache.dates.len(), MAX_DATES);
        assert!(!cache.dates.contains_key("d00"));
        assert!(!cache.dates.contains_key("d02"));
        assert!(cache.dates.contains_key("d03"));
    }
}

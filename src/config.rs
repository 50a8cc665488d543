//! Client configuration
//!
//! Read from `HAZARD_*` environment variables (a `.env` file is honoured).
//! Anything malformed falls back to the default with a warning.

use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

use crate::model::Location;

/// Alagoinha, PE.
pub const DEFAULT_CENTER: Location = Location { lat: -7.8375, lng: -35.5781 };
pub const DEFAULT_ZOOM: u8 = 13;

#[derive(Debug, Clone, PartialEq)]
pub struct HazardConfig {
    /// SQLite file backing the report store
    pub db_path: PathBuf,
    /// Where a remembered session token is kept
    pub session_file: PathBuf,
    pub map_center: Location,
    pub map_zoom: u8,
    pub max_photo_bytes: usize,
    pub session_ttl_secs: i64,
    /// `id:secret:role:Display Name;...` for the in-process identity service
    pub seed_accounts: String,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("hazard_map.db"),
            session_file: PathBuf::from("session.json"),
            map_center: DEFAULT_CENTER,
            map_zoom: DEFAULT_ZOOM,
            max_photo_bytes: 5 * 1024 * 1024,
            session_ttl_secs: 8 * 60 * 60,
            seed_accounts: String::new(),
        }
    }
}

impl HazardConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("HAZARD_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("HAZARD_SESSION_FILE") {
            config.session_file = PathBuf::from(path);
        }
        if let Some(raw) = lookup("HAZARD_MAP_CENTER") {
            match parse_center(&raw) {
                Some(center) => config.map_center = center,
                None => warn!("Ignoring HAZARD_MAP_CENTER='{}', expected 'lat,lng'", raw),
            }
        }
        parse_into(&lookup, "HAZARD_MAP_ZOOM", &mut config.map_zoom);
        parse_into(&lookup, "HAZARD_MAX_PHOTO_BYTES", &mut config.max_photo_bytes);
        parse_into(&lookup, "HAZARD_SESSION_TTL_SECS", &mut config.session_ttl_secs);
        if let Some(seed) = lookup("HAZARD_SEED_ACCOUNTS") {
            config.seed_accounts = seed;
        }

        config
    }
}

fn parse_into<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => warn!("Ignoring malformed {}='{}'", key, raw),
        }
    }
}

fn parse_center(raw: &str) -> Option<Location> {
    let (lat, lng) = raw.split_once(',')?;
    let center = Location::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?);
    center.is_valid().then_some(center)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = HazardConfig::from_lookup(|_| None);
        assert_eq!(config, HazardConfig::default());
        assert_eq!(config.map_center, DEFAULT_CENTER);
        assert_eq!(config.map_zoom, 13);
    }

    #[test]
    fn test_overrides() {
        let config = HazardConfig::from_lookup(lookup(&[
            ("HAZARD_DB_PATH", "/tmp/r.db"),
            ("HAZARD_MAP_CENTER", "-8.05, -34.9"),
            ("HAZARD_MAX_PHOTO_BYTES", "1000"),
        ]));
        assert_eq!(config.db_path, PathBuf::from("/tmp/r.db"));
        assert_eq!(config.map_center, Location::new(-8.05, -34.9));
        assert_eq!(config.max_photo_bytes, 1000);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let config = HazardConfig::from_lookup(lookup(&[
            ("HAZARD_MAP_CENTER", "north"),
            ("HAZARD_MAP_ZOOM", "very"),
            ("HAZARD_SESSION_TTL_SECS", "-"),
        ]));
        assert_eq!(config.map_center, DEFAULT_CENTER);
        assert_eq!(config.map_zoom, DEFAULT_ZOOM);
        assert_eq!(config.session_ttl_secs, HazardConfig::default().session_ttl_secs);
    }
}

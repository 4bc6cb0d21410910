//! # Configuration
//!
//! snapgram keeps configuration in a flat string key/value store, the same
//! shape whether values come from code, the environment, or a secrets
//! manager wired in by the host application.
//!
//! ```rust
//! use snap_core::config::{Settings, SnapConfig};
//!
//! let mut config = SnapConfig::new();
//! config.set("storage.bucket", "avatars");
//! config.set("feed.page_size", "12");
//!
//! let settings = Settings::from_config(&config).unwrap();
//! assert_eq!(settings.bucket, "avatars");
//! assert_eq!(settings.feed_page_size, 12);
//! ```
//!
//! ## Environment overrides
//!
//! [`SnapConfig::load_env`] maps `SNAPGRAM__FEED__PAGE_SIZE=25` to the key
//! `feed.page_size`.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use snap_blob::{Gravity, PreviewSpec, PreviewUrlBuilder};

/// Environment prefix read by [`SnapConfig::from_env`]
pub const ENV_PREFIX: &str = "SNAPGRAM__";

#[derive(Debug, Default, Clone)]
pub struct SnapConfig {
    values: HashMap<String, String>,
}

impl SnapConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Config populated from `SNAPGRAM__*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.load_env(ENV_PREFIX, std::env::vars());
        config
    }

    /// Load every `(key, value)` pair whose key starts with `prefix`.
    ///
    /// `PREFIX` + `PREVIEW__QUALITY` becomes `preview.quality`.
    pub fn load_env<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// All entries, sorted by key
    pub fn snapshot(&self) -> Vec<(String, String)> {
        let mut entries: Vec<_> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort();
        entries
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow!("config key {key}={raw:?}: {e}")),
        }
    }
}

/// Typed view over [`SnapConfig`] with defaults for every key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub project: String,
    pub bucket: String,
    pub users_collection: String,
    pub posts_collection: String,
    pub saves_collection: String,
    pub preview: PreviewSpec,
    pub feed_page_size: usize,
    pub recent_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost/v1".to_string(),
            project: "snapgram".to_string(),
            bucket: "media".to_string(),
            users_collection: "users".to_string(),
            posts_collection: "posts".to_string(),
            saves_collection: "saves".to_string(),
            preview: PreviewSpec::default(),
            feed_page_size: 9,
            recent_limit: 20,
        }
    }
}

impl Settings {
    pub fn from_config(config: &SnapConfig) -> Result<Self> {
        let defaults = Settings::default();

        let gravity = match config.get("preview.gravity") {
            Some(raw) => raw
                .parse::<Gravity>()
                .with_context(|| format!("config key preview.gravity={raw:?}"))?,
            None => defaults.preview.gravity,
        };
        let preview = PreviewSpec {
            max_width: config.parse_or("preview.width", defaults.preview.max_width)?,
            max_height: config.parse_or("preview.height", defaults.preview.max_height)?,
            gravity,
            quality: config.parse_or("preview.quality", defaults.preview.quality)?,
        };
        preview.validate().context("preview policy")?;

        let feed_page_size = config.parse_or("feed.page_size", defaults.feed_page_size)?;
        if feed_page_size == 0 {
            return Err(anyhow!("feed.page_size must be at least 1"));
        }

        Ok(Self {
            endpoint: config.string_or("platform.endpoint", &defaults.endpoint),
            project: config.string_or("platform.project", &defaults.project),
            bucket: config.string_or("storage.bucket", &defaults.bucket),
            users_collection: config.string_or("collections.users", &defaults.users_collection),
            posts_collection: config.string_or("collections.posts", &defaults.posts_collection),
            saves_collection: config.string_or("collections.saves", &defaults.saves_collection),
            preview,
            feed_page_size,
            recent_limit: config.parse_or("feed.recent_limit", defaults.recent_limit)?,
        })
    }

    /// Builder for preview and avatar URLs in the configured bucket
    pub fn url_builder(&self) -> Result<PreviewUrlBuilder> {
        PreviewUrlBuilder::new(&self.endpoint, self.project.clone(), self.bucket.clone())
            .context("platform.endpoint")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let settings = Settings::from_config(&SnapConfig::new()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.preview.max_width, 2000);
        assert_eq!(settings.preview.gravity, Gravity::Top);
        assert_eq!(settings.feed_page_size, 9);
        assert_eq!(settings.recent_limit, 20);
    }

    #[test]
    fn env_keys_are_normalized() {
        let mut config = SnapConfig::new();
        config.load_env(
            ENV_PREFIX,
            vec![
                ("SNAPGRAM__FEED__PAGE_SIZE".to_string(), "25".to_string()),
                ("SNAPGRAM__PREVIEW__GRAVITY".to_string(), "center".to_string()),
                ("OTHER__FEED__PAGE_SIZE".to_string(), "1".to_string()),
            ],
        );

        assert_eq!(config.get("feed.page_size"), Some("25"));
        assert!(!config.has("other.feed.page_size"));
        assert_eq!(config.snapshot().len(), 2);

        let settings = Settings::from_config(&config).unwrap();
        assert_eq!(settings.feed_page_size, 25);
        assert_eq!(settings.preview.gravity, Gravity::Center);
    }

    #[test]
    fn bad_values_are_reported_with_their_key() {
        let mut config = SnapConfig::new();
        config.set("preview.quality", "loud");
        let err = Settings::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("preview.quality"));

        let mut config = SnapConfig::new();
        config.set("preview.width", "9000");
        assert!(Settings::from_config(&config).is_err());

        let mut config = SnapConfig::new();
        config.set("feed.page_size", "0");
        assert!(Settings::from_config(&config).is_err());
    }

    #[test]
    fn url_builder_uses_bucket_and_project() {
        let mut config = SnapConfig::new();
        config.set("platform.endpoint", "https://api.example.com/v1");
        config.set("platform.project", "p1");
        config.set("storage.bucket", "b1");
        let builder = Settings::from_config(&config).unwrap().url_builder().unwrap();
        assert_eq!(builder.bucket(), "b1");
        assert_eq!(builder.project(), "p1");
    }
}

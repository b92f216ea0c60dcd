use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use filament_store::CacheOptions;
use serde::{Deserialize, Serialize};

/// Prefix for environment overrides, e.g. `FILAMENT_MAX_ATTEMPTS=5`.
pub const ENV_PREFIX: &str = "FILAMENT_";

/// Tunables for remote acquisition.
///
/// Layered as defaults, then an optional TOML file, then `FILAMENT_*` environment
/// variables.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use filament_fetch::FetchConfig;
///
/// let config = FetchConfig::default()
///     .max_attempts(5)
///     .stall_timeout(Duration::from_secs(10));
/// assert_eq!(config.max_attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Upper bound on simultaneously active HTTP transfers.
    pub max_concurrent_downloads: usize,
    /// Total attempts per URL, including the first.
    pub max_attempts:             u32,
    pub stall_timeout_ms:         u64,
    pub connect_timeout_ms:       u64,
    /// Base for exponential backoff between attempts.
    pub backoff_base_ms:          u64,
    /// Re-hash cached files before trusting a hit.
    pub verify_hits:              bool,
    /// Send `If-None-Match` for cached entries that carry an ETag.
    pub revalidate:               bool,
    pub user_agent:               Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 200,
            max_attempts:             3,
            stall_timeout_ms:         30_000,
            connect_timeout_ms:       30_000,
            backoff_base_ms:          100,
            verify_hits:              false,
            revalidate:               false,
            user_agent:               None,
        }
    }
}

impl FetchConfig {
    /// The layered configuration sources, before extraction.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(FetchConfig::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load(file: Option<&Path>) -> Result<Self, figment::Error> {
        let config: FetchConfig = Self::figment(file).extract()?;
        Ok(config.normalized())
    }

    /// Clamp values that would make the coordinator unusable.
    pub fn normalized(mut self) -> Self {
        self.max_concurrent_downloads = self.max_concurrent_downloads.max(1);
        self.max_attempts = self.max_attempts.max(1);
        self
    }

    pub fn stall_timeout_duration(&self) -> Duration { Duration::from_millis(self.stall_timeout_ms) }

    pub fn connect_timeout_duration(&self) -> Duration { Duration::from_millis(self.connect_timeout_ms) }

    pub fn backoff_base_duration(&self) -> Duration { Duration::from_millis(self.backoff_base_ms) }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            verify_hits: self.verify_hits,
        }
    }

    #[must_use]
    pub fn max_concurrent_downloads(mut self, limit: usize) -> Self {
        self.max_concurrent_downloads = limit;
        self
    }

    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout_ms = duration_ms(timeout);
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = duration_ms(timeout);
        self
    }

    #[must_use]
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base_ms = duration_ms(base);
        self
    }

    #[must_use]
    pub fn verify_hits(mut self, verify: bool) -> Self {
        self.verify_hits = verify;
        self
    }

    #[must_use]
    pub fn revalidate(mut self, revalidate: bool) -> Self {
        self.revalidate = revalidate;
        self
    }
}

fn duration_ms(duration: Duration) -> u64 { u64::try_from(duration.as_millis()).unwrap_or(u64::MAX) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.max_concurrent_downloads, 200);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.stall_timeout_duration(), Duration::from_secs(30));
        assert!(!config.verify_hits);
    }

    #[test]
    fn builder_setters() {
        let config = FetchConfig::default()
            .max_concurrent_downloads(4)
            .connect_timeout(Duration::from_millis(1500))
            .backoff_base(Duration::from_millis(5))
            .revalidate(true);
        assert_eq!(config.max_concurrent_downloads, 4);
        assert_eq!(config.connect_timeout_ms, 1500);
        assert_eq!(config.backoff_base_duration(), Duration::from_millis(5));
        assert!(config.revalidate);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("filament.toml");
        std::fs::write(&file, "max_attempts = 7\nverify_hits = true\n").unwrap();

        let config = FetchConfig::figment(Some(&file)).extract::<FetchConfig>().unwrap();
        assert_eq!(config.max_attempts, 7);
        assert!(config.verify_hits);
        assert_eq!(config.max_concurrent_downloads, 200);
    }

    #[test]
    fn normalized_clamps_zero() {
        let config = FetchConfig::default().max_concurrent_downloads(0).max_attempts(0).normalized();
        assert_eq!(config.max_concurrent_downloads, 1);
        assert_eq!(config.max_attempts, 1);
    }
}

//! On-disk JSON cache with per-category TTLs
//!
//! One JSON file per (category, identifier) pair under a configurable root.
//! File modification time is the sole validity signal. Corrupt or unreadable
//! entries behave exactly like a miss; failed writes are logged and swallowed
//! so a broken cache can never fail the surrounding fetch.
//!
//! Concurrent refreshes racing on the same file are last-writer-wins; there
//! is deliberately no locking (single-operator deployment target).

use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Cache categories and their time-to-live
///
/// The TTLs are heterogeneous on purpose: hardware specs are static for
/// days, billing moves hourly, grid intensity within the hour. Assigning a
/// category the wrong TTL is a correctness bug, not a tuning knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    /// Current grid intensity reading
    CarbonIntensity,
    /// Immutable 24h intensity history
    CarbonIntensity24h,
    /// Hardware power curves
    BoaviztaPower,
    /// On-demand unit prices
    Pricing,
    /// Monthly aggregate billing
    CostData,
    /// Hourly billing series
    CostSeries,
    /// Reconstructed runtime results
    CloudtrailRuntime,
    /// Trailing CPU utilization averages
    CpuUtilization,
    /// Last aligned cost/carbon series
    Timeseries,
    /// Self-collected hourly intensity samples
    HourlyCollection,
}

impl CacheCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheCategory::CarbonIntensity => "carbon_intensity",
            CacheCategory::CarbonIntensity24h => "carbon_intensity_24h",
            CacheCategory::BoaviztaPower => "boavizta_power",
            CacheCategory::Pricing => "pricing",
            CacheCategory::CostData => "cost_data",
            CacheCategory::CostSeries => "cost_series",
            CacheCategory::CloudtrailRuntime => "cloudtrail_runtime",
            CacheCategory::CpuUtilization => "cpu_utilization",
            CacheCategory::Timeseries => "timeseries",
            CacheCategory::HourlyCollection => "hourly_collection",
        }
    }

    pub fn ttl(&self) -> Duration {
        let secs = match self {
            CacheCategory::CarbonIntensity => 30 * MINUTE,
            CacheCategory::CarbonIntensity24h => DAY,
            CacheCategory::BoaviztaPower => 7 * DAY,
            CacheCategory::Pricing => 7 * DAY,
            CacheCategory::CostData => 6 * HOUR,
            CacheCategory::CostSeries => 6 * HOUR,
            CacheCategory::CloudtrailRuntime => DAY,
            CacheCategory::CpuUtilization => 3 * HOUR,
            CacheCategory::Timeseries => DAY,
            CacheCategory::HourlyCollection => DAY,
        };
        Duration::from_secs(secs)
    }
}

/// File-backed cache repository shared by every gateway
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the cache root if missing
    ///
    /// Directory creation is an explicit step; `path` never touches disk.
    pub fn ensure_root(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Compute the file path for a (category, identifier) pair
    ///
    /// Pure: no side effects, no disk access. Identifier characters outside
    /// [A-Za-z0-9._-] are replaced so provider-native ids cannot escape the
    /// cache root.
    pub fn path(&self, category: CacheCategory, identifier: &str) -> PathBuf {
        let sanitized: String = identifier
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root
            .join(format!("{}__{}.json", category.as_str(), sanitized))
    }

    /// True iff the file exists and its mtime age is below the TTL
    pub fn is_valid(&self, path: &Path, ttl: Duration) -> bool {
        let Ok(metadata) = std::fs::metadata(path) else {
            return false;
        };
        let Ok(modified) = metadata.modified() else {
            return false;
        };
        match modified.elapsed() {
            Ok(age) => age < ttl,
            // mtime in the future (clock moved); treat as fresh
            Err(_) => true,
        }
    }

    /// Shorthand: validity check using the category's own TTL
    pub fn is_fresh(&self, category: CacheCategory, identifier: &str) -> bool {
        self.is_valid(&self.path(category, identifier), category.ttl())
    }

    /// Read and deserialize a cache entry
    ///
    /// Missing files, permission errors and malformed JSON all return `None`;
    /// a corrupt entry is indistinguishable from a miss.
    pub fn read<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(_) => return None,
        };
        match serde_json::from_slice(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Discarding corrupt cache entry");
                None
            }
        }
    }

    /// Read an entry only if it is still within the category TTL
    pub fn read_fresh<T: DeserializeOwned>(
        &self,
        category: CacheCategory,
        identifier: &str,
    ) -> Option<T> {
        let path = self.path(category, identifier);
        if !self.is_valid(&path, category.ttl()) {
            return None;
        }
        self.read(&path)
    }

    /// Read an entry regardless of TTL (the tagged stale-fallback path)
    pub fn read_any<T: DeserializeOwned>(
        &self,
        category: CacheCategory,
        identifier: &str,
    ) -> Option<T> {
        self.read(&self.path(category, identifier))
    }

    /// Best-effort write-through
    ///
    /// A failed cache write must never fail the surrounding operation, so
    /// every error path here only logs.
    pub fn write<T: Serialize>(&self, category: CacheCategory, identifier: &str, value: &T) {
        let path = self.path(category, identifier);
        let json = match serde_json::to_vec(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to serialize cache entry");
                return;
            }
        };
        // Write via temp file + rename so readers never observe a torn entry
        let temp_path = path.with_extension("tmp");
        if let Err(e) = std::fs::write(&temp_path, &json) {
            warn!(path = %temp_path.display(), error = %e, "Failed to write cache entry");
            return;
        }
        if let Err(e) = std::fs::rename(&temp_path, &path) {
            warn!(path = %path.display(), error = %e, "Failed to publish cache entry");
            return;
        }
        debug!(path = %path.display(), bytes = json.len(), "Cache entry written");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        value: f64,
        label: String,
    }

    fn test_store() -> (tempfile::TempDir, CacheStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        store.ensure_root().unwrap();
        (dir, store)
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let (_dir, store) = test_store();
        let payload = Payload {
            value: 42.5,
            label: "eu-central-1".to_string(),
        };

        store.write(CacheCategory::Pricing, "t3.micro", &payload);
        let read: Option<Payload> = store.read_fresh(CacheCategory::Pricing, "t3.micro");

        assert_eq!(read, Some(payload));
    }

    #[test]
    fn test_corrupt_entry_reads_as_miss() {
        let (_dir, store) = test_store();
        let path = store.path(CacheCategory::CarbonIntensity, "DE");
        std::fs::write(&path, b"{not json").unwrap();

        let read: Option<Payload> = store.read(&path);
        assert!(read.is_none());
    }

    #[test]
    fn test_missing_entry_reads_as_miss() {
        let (_dir, store) = test_store();
        let read: Option<Payload> = store.read_fresh(CacheCategory::CostData, "monthly");
        assert!(read.is_none());
    }

    #[test]
    fn test_path_is_pure_and_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("never-created"));

        let path = store.path(CacheCategory::CloudtrailRuntime, "i-abc/../etc");
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("cloudtrail_runtime__"));
        assert!(!path.to_string_lossy().contains("/../"));
        // path() must not create anything on disk
        assert!(!store.root().exists());
    }

    #[test]
    fn test_zero_ttl_is_never_valid() {
        let (_dir, store) = test_store();
        store.write(CacheCategory::CarbonIntensity, "DE", &1.0f64);

        let path = store.path(CacheCategory::CarbonIntensity, "DE");
        assert!(store.is_valid(&path, Duration::from_secs(3600)));
        assert!(!store.is_valid(&path, Duration::ZERO));
    }

    #[test]
    fn test_read_any_ignores_ttl() {
        let (_dir, store) = test_store();
        store.write(CacheCategory::CarbonIntensity, "DE", &99.0f64);

        // Entry is "expired" for a zero TTL but read_any still returns it
        let path = store.path(CacheCategory::CarbonIntensity, "DE");
        assert!(!store.is_valid(&path, Duration::ZERO));
        let read: Option<f64> = store.read_any(CacheCategory::CarbonIntensity, "DE");
        assert_eq!(read, Some(99.0));
    }

    #[test]
    fn test_category_ttls_are_heterogeneous() {
        assert!(CacheCategory::BoaviztaPower.ttl() > CacheCategory::CostSeries.ttl());
        assert!(CacheCategory::CostSeries.ttl() > CacheCategory::CarbonIntensity.ttl());
        assert_eq!(CacheCategory::Pricing.ttl(), Duration::from_secs(7 * 24 * 3600));
        assert_eq!(CacheCategory::CpuUtilization.ttl(), Duration::from_secs(3 * 3600));
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        // Root never created: the rename target directory does not exist.
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("missing").join("deeper"));

        // Must not panic or return an error
        store.write(CacheCategory::Pricing, "t3.micro", &1.0f64);
    }
}

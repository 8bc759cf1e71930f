//! Driver-specific VF statistics readers.
//!
//! Each PF driver exposes per-VF counters in its own place. A [`StatReader`]
//! knows where one driver puts them; the [`ReaderRegistry`] picks the reader
//! for a PF by the name of the driver bound to it.

use crate::sysfs::Sysfs;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Statistic name to counter value for one VF.
pub type StatSample = BTreeMap<String, f64>;

/// Reads the statistics of one VF of a PF.
pub trait StatReader: Send + Sync {
    /// Read all statistics of VF `vf_index` on the PF interface `pf_name`.
    ///
    /// Never fails: unreadable statistics are left out of the sample.
    fn read_stats(&self, sysfs: &dyn Sysfs, pf_name: &str, vf_index: &str) -> StatSample;
}

/// Reader for PFs bound to the Intel `i40e` driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct I40eReader;

impl I40eReader {
    pub const DRIVER: &'static str = "i40e";

    fn stats_dir(pf_name: &str, vf_index: &str) -> PathBuf {
        PathBuf::from(format!(
            "/sys/class/net/{}/device/sriov/{}/stats",
            pf_name, vf_index
        ))
    }
}

impl StatReader for I40eReader {
    fn read_stats(&self, sysfs: &dyn Sysfs, pf_name: &str, vf_index: &str) -> StatSample {
        read_stat_dir(sysfs, &Self::stats_dir(pf_name, vf_index))
    }
}

/// Read every file of a statistics directory as a floating point counter.
///
/// Files that cannot be read or parsed are skipped individually. A directory
/// that cannot be listed gives an empty sample.
pub fn read_stat_dir(sysfs: &dyn Sysfs, dir: &Path) -> StatSample {
    let mut stats = StatSample::new();

    let files = match sysfs.read_dir(dir) {
        Ok(files) => files,
        Err(e) => {
            debug!("No statistics in {}: {}", dir.display(), e);
            return stats;
        }
    };

    for name in files {
        let Ok(raw) = sysfs.read_to_string(&dir.join(&name)) else {
            continue;
        };
        match raw.trim().parse::<f64>() {
            Ok(value) => {
                stats.insert(name, value);
            }
            Err(_) => debug!("Ignoring non-numeric statistic {} in {}", name, dir.display()),
        }
    }

    stats
}

/// Driver name to [`StatReader`] lookup.
#[derive(Clone, Default)]
pub struct ReaderRegistry {
    readers: HashMap<String, Arc<dyn StatReader>>,
    fallback: Option<String>,
}

impl ReaderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in reader.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(I40eReader::DRIVER, Arc::new(I40eReader));
        registry
    }

    /// Register `reader` for PFs bound to `driver`, replacing any previous one.
    pub fn register(&mut self, driver: impl Into<String>, reader: Arc<dyn StatReader>) {
        self.readers.insert(driver.into(), reader);
    }

    /// Use the reader of `driver` for PFs whose own driver has none.
    pub fn set_fallback(&mut self, driver: Option<String>) {
        self.fallback = driver;
    }

    /// Reader for a PF bound to `driver`.
    pub fn reader_for(&self, driver: &str) -> Option<&dyn StatReader> {
        self.readers
            .get(driver)
            .or_else(|| {
                self.fallback
                    .as_deref()
                    .and_then(|fallback| self.readers.get(fallback))
            })
            .map(|reader| reader.as_ref())
    }

    /// Registered driver names, sorted.
    pub fn drivers(&self) -> Vec<&str> {
        let mut drivers: Vec<&str> = self.readers.keys().map(String::as_str).collect();
        drivers.sort_unstable();
        drivers
    }
}

impl std::fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderRegistry")
            .field("drivers", &self.drivers())
            .field("fallback", &self.fallback)
            .finish()
    }
}

//! The `sriovnet` collector.
//!
//! One collection pass discovers the SR-IOV network PFs, enumerates their
//! VFs and reads the statistics of every VF through the reader registered
//! for the PF's driver. Nothing is cached between passes.

use crate::discovery;
use crate::error::Result;
use crate::reader::ReaderRegistry;
use crate::sysfs::Sysfs;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, GaugeVec, Opts};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Subsystem part of every VF statistic metric name.
pub const SUBSYSTEM: &str = "sriovnet";

/// Value of the `collector` label on the scrape health metrics.
pub const COLLECTOR_NAME: &str = "sriovnet";

const VF_LABELS: [&str; 3] = ["pfName", "vf", "vfAddress"];

/// A single statistic of a single VF.
#[derive(Debug, Clone, PartialEq)]
pub struct VfStatObservation {
    /// Interface name of the PF, empty if it could not be resolved
    pub pf_name: String,
    /// VF index taken from the `virtfn<N>` link name
    pub vf_index: String,
    /// PCI address of the VF
    pub vf_address: String,
    pub stat: String,
    pub value: f64,
}

/// Collector reporting per-VF statistics of SR-IOV network devices.
pub struct SriovNetCollector {
    sysfs: Arc<dyn Sysfs>,
    readers: ReaderRegistry,
    namespace: String,

    scrape_success: GaugeVec,
    scrape_duration_seconds: GaugeVec,
    descs: Vec<Desc>,
}

impl SriovNetCollector {
    /// Create a collector reading from `sysfs` with the given readers.
    ///
    /// Metric names are composed as `<namespace>_sriovnet_<stat>`.
    pub fn new(sysfs: Arc<dyn Sysfs>, readers: ReaderRegistry, namespace: &str) -> Result<Self> {
        let scrape_success = GaugeVec::new(
            Opts::new(
                "scrape_collector_success",
                "Whether the sriovnet collector succeeded (1 = success, 0 = failure)",
            )
            .namespace(namespace),
            &["collector"],
        )?;

        let scrape_duration_seconds = GaugeVec::new(
            Opts::new(
                "scrape_collector_duration_seconds",
                "Duration of the last sriovnet collection pass in seconds",
            )
            .namespace(namespace),
            &["collector"],
        )?;

        let descs = scrape_success
            .desc()
            .into_iter()
            .chain(scrape_duration_seconds.desc())
            .cloned()
            .collect();

        Ok(Self {
            sysfs,
            readers,
            namespace: namespace.to_string(),
            scrape_success,
            scrape_duration_seconds,
            descs,
        })
    }

    /// Run one collection pass, handing every VF statistic to `emit`.
    ///
    /// Fails only when PF discovery fails, in which case nothing has been
    /// emitted. A PF without a reader or whose VFs cannot be enumerated is
    /// skipped; the remaining PFs are still reported.
    pub fn update<F>(&self, mut emit: F) -> Result<()>
    where
        F: FnMut(VfStatObservation),
    {
        let sysfs = self.sysfs.as_ref();
        let pfs = discovery::sriov_pfs(sysfs)?;

        for pf in &pfs {
            let driver = discovery::pf_driver(sysfs, pf);
            let Some(reader) = self.readers.reader_for(&driver) else {
                debug!("No stat reader for PF {} (driver {:?}), skipping", pf, driver);
                continue;
            };

            let vfs = match discovery::vf_list(sysfs, pf) {
                Ok(vfs) => vfs,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };

            let pf_name = discovery::pf_name(sysfs, pf);
            debug!("PF {} ({:?}) has {} VFs", pf, pf_name, vfs.len());

            for (vf_index, vf_address) in &vfs {
                for (stat, value) in reader.read_stats(sysfs, &pf_name, vf_index) {
                    emit(VfStatObservation {
                        pf_name: pf_name.clone(),
                        vf_index: vf_index.clone(),
                        vf_address: vf_address.clone(),
                        stat,
                        value,
                    });
                }
            }
        }

        Ok(())
    }

    /// Run one collection pass and return every observation.
    pub fn observations(&self) -> Result<Vec<VfStatObservation>> {
        let mut observations = Vec::new();
        self.update(|obs| observations.push(obs))?;
        Ok(observations)
    }

    /// Run one collection pass and build a counter family per statistic.
    pub fn collect_families(&self) -> Result<Vec<MetricFamily>> {
        let mut counters: BTreeMap<String, CounterVec> = BTreeMap::new();
        self.update(|obs| self.record(&mut counters, obs))?;
        Ok(counters.values().flat_map(|counter| counter.collect()).collect())
    }

    fn record(&self, counters: &mut BTreeMap<String, CounterVec>, obs: VfStatObservation) {
        // Counters only move forward; this also rejects NaN
        if !(obs.value >= 0.0) {
            debug!("Skipping {} = {} of VF {} on {:?}", obs.stat, obs.value, obs.vf_index, obs.pf_name);
            return;
        }

        let counter = match counters.entry(obs.stat) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let opts = Opts::new(entry.key().as_str(), format!("Statistic {}.", entry.key()))
                    .namespace(self.namespace.as_str())
                    .subsystem(SUBSYSTEM);
                match CounterVec::new(opts, &VF_LABELS) {
                    Ok(counter) => entry.insert(counter),
                    Err(e) => {
                        debug!("Skipping statistic {:?}: {}", entry.key(), e);
                        return;
                    }
                }
            }
        };

        counter
            .with_label_values(&[
                obs.pf_name.as_str(),
                obs.vf_index.as_str(),
                obs.vf_address.as_str(),
            ])
            .inc_by(obs.value);
    }
}

impl Collector for SriovNetCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let start = Instant::now();

        let (mut families, success) = match self.collect_families() {
            Ok(families) => (families, 1.0),
            Err(e) => {
                error!("sriovnet collector failed: {}", e);
                (Vec::new(), 0.0)
            }
        };

        self.scrape_success
            .with_label_values(&[COLLECTOR_NAME])
            .set(success);
        self.scrape_duration_seconds
            .with_label_values(&[COLLECTOR_NAME])
            .set(start.elapsed().as_secs_f64());

        families.extend(self.scrape_success.collect());
        families.extend(self.scrape_duration_seconds.collect());
        families
    }
}

//! Prometheus registry composition and text encoding.
//!
//! [`MetricsExporter::new`] is where collectors get registered. Nothing
//! registers itself into global state.

use crate::collector::SriovNetCollector;
use crate::error::{Result, SriovError};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

/// Registry holding the sriovnet collector, plus the means to scrape it.
pub struct MetricsExporter {
    registry: Registry,
    // Held for the duration of a gather so collection passes never overlap
    pass: Mutex<()>,
}

impl MetricsExporter {
    /// Register `collector` (and the process collector on Linux) into a
    /// fresh registry.
    pub fn new(collector: SriovNetCollector) -> Result<Self> {
        let registry = Registry::new();
        registry.register(Box::new(collector))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        info!("Registered sriovnet collector");

        Ok(Self {
            registry,
            pass: Mutex::new(()),
        })
    }

    /// Run one collection pass over every registered collector.
    pub fn gather(&self) -> Vec<MetricFamily> {
        let _pass = self.pass.lock().unwrap_or_else(PoisonError::into_inner);
        let families = self.registry.gather();
        debug!("Gathered {} metric families", families.len());
        families
    }

    /// Collect and encode metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.gather();

        // Reuse buffer to avoid allocation on every scrape
        thread_local! {
            static BUFFER: std::cell::RefCell<Vec<u8>> = std::cell::RefCell::new(Vec::with_capacity(8192));
        }

        BUFFER.with(|buf| {
            let mut buffer = buf.borrow_mut();
            buffer.clear();

            encoder
                .encode(&metric_families, &mut *buffer)
                .map_err(|e| SriovError::Metrics(e.to_string()))?;

            String::from_utf8(buffer.clone()).map_err(|e| SriovError::Metrics(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ReaderRegistry;
    use crate::sysfs::HostSysfs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_encode_without_devices() {
        let temp_dir = TempDir::new().unwrap();
        let collector = SriovNetCollector::new(
            Arc::new(HostSysfs::new(temp_dir.path())),
            ReaderRegistry::with_defaults(),
            "node",
        )
        .unwrap();
        let exporter = MetricsExporter::new(collector).unwrap();

        let metrics = exporter.encode().unwrap();
        assert!(metrics.contains("# TYPE node_scrape_collector_success gauge"));
        assert!(metrics.contains(r#"node_scrape_collector_success{collector="sriovnet"} 0"#));
        assert!(!metrics.contains("node_sriovnet_"));
    }

    #[test]
    fn test_invalid_namespace_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = SriovNetCollector::new(
            Arc::new(HostSysfs::new(temp_dir.path())),
            ReaderRegistry::with_defaults(),
            "bad-namespace",
        );
        assert!(matches!(result, Err(SriovError::Metrics(_))));
    }
}

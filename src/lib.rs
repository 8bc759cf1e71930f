//! # SR-IOV Net Exporter
//!
//! A Prometheus exporter for per-VF statistics of SR-IOV network devices on
//! Linux.
//!
//! ## Overview
//!
//! Every scrape walks sysfs from scratch:
//!
//! - PCI devices with the network controller class and an `sriov_totalvfs`
//!   attribute are taken as physical functions (PFs)
//! - the `virtfn<N>` links of each PF give its virtual functions (VFs)
//! - a driver-specific reader collects the counters of each VF
//!
//! Each counter becomes a `<namespace>_sriovnet_<stat>` metric labelled with
//! `pfName`, `vf` and `vfAddress`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sriovnet_exporter::{
//!     collector::SriovNetCollector, config::Settings, metrics::MetricsExporter,
//!     reader::ReaderRegistry, server::start_server, sysfs::HostSysfs,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load configuration
//!     let settings = Settings::load(Some("config/default.toml"))?;
//!
//!     let sysfs = Arc::new(HostSysfs::new(&settings.collector.sysfs_root));
//!     let collector = SriovNetCollector::new(
//!         sysfs,
//!         ReaderRegistry::with_defaults(),
//!         &settings.collector.namespace,
//!     )?;
//!
//!     // Start HTTP server
//!     start_server(&settings.exporter.listen_address, MetricsExporter::new(collector)?).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`collector`] - The sriovnet collector and its collection pass
//! - [`config`] - Configuration management
//! - [`discovery`] - PF and VF discovery over sysfs
//! - [`error`] - Error types and handling
//! - [`metrics`] - Registry composition and encoding
//! - [`reader`] - Driver-specific VF statistics readers
//! - [`server`] - HTTP server for exposing metrics
//! - [`sysfs`] - Read-only sysfs access

pub mod collector;
pub mod config;
pub mod discovery;
pub mod error;
pub mod metrics;
pub mod reader;
pub mod server;
pub mod sysfs;

pub use error::{Result, SriovError};

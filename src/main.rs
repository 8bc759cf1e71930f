use anyhow::Result;
use clap::Parser;
use sriovnet_exporter::{
    collector::SriovNetCollector, config::Settings, metrics::MetricsExporter,
    reader::ReaderRegistry, server::start_server, sysfs::HostSysfs,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// SR-IOV Net Exporter - Prometheus exporter for per-VF statistics of SR-IOV NICs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Directory under which sysfs is mounted, overriding the configuration
    #[arg(long, value_name = "DIR", env = "SRIOVNET_EXPORTER_SYSFS_ROOT")]
    sysfs_root: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Load configuration
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(root) = args.sysfs_root {
        settings.collector.sysfs_root = root;
        settings.validate()?;
    }

    // Initialize logging
    init_logging(&settings.exporter.log_level, &settings.exporter.log_format)?;

    info!("Starting SR-IOV Net Exporter");
    info!("Listen address: {}", settings.exporter.listen_address);

    let mut readers = ReaderRegistry::with_defaults();
    readers.set_fallback(settings.collector.fallback_driver.clone());
    info!("Stat readers: {:?}", readers);

    let sysfs = Arc::new(HostSysfs::new(&settings.collector.sysfs_root));
    info!("sysfs root: {}", sysfs.root().display());
    let collector = SriovNetCollector::new(sysfs, readers, &settings.collector.namespace)?;
    let exporter = MetricsExporter::new(collector)?;

    // Start HTTP server
    info!("Starting HTTP server...");
    if let Err(e) = start_server(&settings.exporter.listen_address, exporter).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

/// Initialize structured logging with tracing.
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    Ok(())
}

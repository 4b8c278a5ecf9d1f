use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::analytics::{
    AccessLogSink, AccessLogWriter, AnalyticsQueue, TrafficAggregator, TrafficPeriod, TrafficSink,
};
use crate::config::StaticConfig;
use crate::proxy::{Dispatcher, Forwarder};
use crate::services::{GeoResolver, TargetResolver};
use crate::storage::{SeaOrmStorage, StorageFactory};

/// Everything the server needs, built once and passed down
pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub geo: Arc<GeoResolver>,
    pub aggregator: Arc<TrafficAggregator>,
    pub queue: Arc<AnalyticsQueue>,
    pub dispatcher: Arc<Dispatcher>,
}

/// Install the process-wide rustls provider; repeated calls are harmless.
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

/// Build the server context.
///
/// Order: storage, GeoIP, analytics queue, startup month prune, dispatcher.
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    install_crypto_provider();

    let storage = StorageFactory::create(&config.database)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    let context = build_context(storage, config).await?;

    info!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );
    Ok(context)
}

/// Wire the runtime components on top of an open storage handle.
pub async fn build_context(
    storage: Arc<SeaOrmStorage>,
    config: &StaticConfig,
) -> Result<StartupContext> {
    let geo = Arc::new(GeoResolver::from_config(&config.analytics));

    let access_sink: Arc<dyn AccessLogSink> = storage.clone();
    let traffic_sink: Arc<dyn TrafficSink> = storage.clone();
    let writer = Arc::new(AccessLogWriter::new(access_sink, geo.clone()));
    let aggregator = Arc::new(TrafficAggregator::new(traffic_sink));

    // prune once now, afterwards only when the month changes
    match aggregator.prune_stale_months(TrafficPeriod::current()).await {
        Ok(removed) => debug!("Startup prune removed {} monthly rows", removed),
        Err(e) => warn!("Startup prune of monthly traffic failed (non-fatal): {}", e),
    }

    let queue = AnalyticsQueue::from_config(&config.analytics, writer, aggregator.clone());

    let forwarder = Forwarder::new(&config.proxy).context("Failed to build upstream client")?;
    let dispatcher = Arc::new(Dispatcher::new(
        TargetResolver::new(storage.clone()),
        forwarder,
        queue.clone(),
    ));

    Ok(StartupContext {
        storage,
        geo,
        aggregator,
        queue,
        dispatcher,
    })
}


use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::Histogram;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use crate::Error;
use crate::Result;

lazy_static! {
    pub static ref EVENT_QUEUED_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("dme_events_queued", "Items queued for dispatch"),
        &["kind"]
    )
    .expect("metric can not be created");

    pub static ref EVENT_QUEUE_DEPTH_METRIC: IntGauge =
        IntGauge::new("dme_event_queue_depth", "Items waiting in the dispatch queue")
            .expect("metric can not be created");

    pub static ref HANDLER_OUTCOME_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("dme_handler_outcomes", "Handler invocations by outcome"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref HANDLER_LATENCY_METRIC: HistogramVec = HistogramVec::new(
        HistogramOpts::new("dme_handler_latency_ms", "Handler callback latency in ms")
            .buckets(exponential_buckets(0.5, 2.0, 14).expect("valid buckets")),
        &["kind"]
    )
    .expect("metric can not be created");

    pub static ref COMMIT_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("dme_commits", "Transaction commits by result"),
        &["result"]
    )
    .expect("metric can not be created");

    pub static ref COMMIT_LATENCY_METRIC: Histogram = Histogram::with_opts(
        HistogramOpts::new("dme_commit_latency_us", "Successful commit latency in microseconds")
            .buckets(exponential_buckets(1.0, 2.0, 20).expect("valid buckets"))
    )
    .expect("metric can not be created");

    pub static ref OBJECT_COUNT_METRIC: IntGauge =
        IntGauge::new("dme_objects", "Objects currently in the store")
            .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

pub fn register_custom_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(EVENT_QUEUED_METRIC.clone()))?;
    registry.register(Box::new(EVENT_QUEUE_DEPTH_METRIC.clone()))?;
    registry.register(Box::new(HANDLER_OUTCOME_METRIC.clone()))?;
    registry.register(Box::new(HANDLER_LATENCY_METRIC.clone()))?;
    registry.register(Box::new(COMMIT_METRIC.clone()))?;
    registry.register(Box::new(COMMIT_LATENCY_METRIC.clone()))?;
    registry.register(Box::new(OBJECT_COUNT_METRIC.clone()))?;
    Ok(())
}

/// Serve `/metrics` until `shutdown_signal` fires
pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) -> Result<()> {
    if let Err(e) = register_custom_metrics(&REGISTRY) {
        error!("could not register custom metrics: {}", e);
    }

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    let (addr, server) = warp::serve(metrics_route)
        .try_bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        })
        .map_err(|e| Error::Fatal(format!("metrics server bind failed: {e}")))?;

    info!("Metrics server listening on {}", addr);
    server.await;
    Ok(())
}

async fn metrics_handler() -> std::result::Result<impl Reply, Rejection> {
    Ok(encode_metrics(&REGISTRY))
}

pub(crate) fn encode_metrics(registry: &Registry) -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}

//! # Prometheus Metrics
//!
//! Operational metrics of the development node, scraped at `/metrics` on
//! the metrics port. Everything lives in a dedicated [`prometheus::Registry`]
//! with the `nft_market` prefix.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Metric handles of the node. The handles are reference counted, so
/// clones record into the same series.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// JSON-RPC requests served, by method.
    pub rpc_requests_total: IntCounterVec,
    /// JSON-RPC requests answered with an error object.
    pub rpc_errors_total: IntCounter,
    /// Time spent executing a JSON-RPC request.
    pub rpc_latency_seconds: Histogram,
    /// Raw transactions accepted into the pool.
    pub transactions_received_total: IntCounter,
    /// Blocks mined, by any trigger.
    pub blocks_mined_total: IntCounter,
    /// Current head of the chain.
    pub block_height: IntGauge,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    ///
    /// # Errors
    ///
    /// Fails only on an invalid metric definition or a duplicate name.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("nft_market".into()), None)?;

        let rpc_requests_total = IntCounterVec::new(
            Opts::new("rpc_requests_total", "JSON-RPC requests served"),
            &["method"],
        )?;
        registry.register(Box::new(rpc_requests_total.clone()))?;

        let rpc_errors_total =
            IntCounter::new("rpc_errors_total", "JSON-RPC requests answered with an error")?;
        registry.register(Box::new(rpc_errors_total.clone()))?;

        let rpc_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "rpc_latency_seconds",
                "JSON-RPC request execution time in seconds",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        registry.register(Box::new(rpc_latency_seconds.clone()))?;

        let transactions_received_total = IntCounter::new(
            "transactions_received_total",
            "Raw transactions accepted into the pool",
        )?;
        registry.register(Box::new(transactions_received_total.clone()))?;

        let blocks_mined_total = IntCounter::new("blocks_mined_total", "Blocks mined")?;
        registry.register(Box::new(blocks_mined_total.clone()))?;

        let block_height = IntGauge::new("block_height", "Current head of the chain")?;
        registry.register(Box::new(block_height.clone()))?;

        Ok(Self {
            registry,
            rpc_requests_total,
            rpc_errors_total,
            rpc_latency_seconds,
            transactions_received_total,
            blocks_mined_total,
            block_height,
        })
    }

    /// Moves the head gauge to `head`, counting the blocks in between.
    pub fn observe_head(&self, head: u64) {
        let previous = self.block_height.get().max(0) as u64;
        if head > previous {
            self.blocks_mined_total.inc_by(head - previous);
        }
        self.block_height.set(head as i64);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

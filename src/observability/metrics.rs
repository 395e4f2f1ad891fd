use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub transitions_total: IntCounterVec,
    pub route_builds_total: IntCounterVec,
    pub notifications_enqueued_total: IntCounterVec,
    pub notification_sends_total: IntCounterVec,
    pub notification_send_seconds: HistogramVec,
    pub notify_queue_depth: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transitions_total = IntCounterVec::new(
            Opts::new(
                "transitions_total",
                "Status transitions by entity and outcome",
            ),
            &["entity", "outcome"],
        )
        .expect("valid transitions_total metric");

        let route_builds_total = IntCounterVec::new(
            Opts::new("route_builds_total", "Route builds by planner source"),
            &["source"],
        )
        .expect("valid route_builds_total metric");

        let notifications_enqueued_total = IntCounterVec::new(
            Opts::new(
                "notifications_enqueued_total",
                "Notification jobs enqueued by channel",
            ),
            &["channel"],
        )
        .expect("valid notifications_enqueued_total metric");

        let notification_sends_total = IntCounterVec::new(
            Opts::new(
                "notification_sends_total",
                "Notification send attempts by channel and outcome",
            ),
            &["channel", "outcome"],
        )
        .expect("valid notification_sends_total metric");

        let notification_send_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "notification_send_seconds",
                "Latency of transport sends in seconds",
            ),
            &["channel"],
        )
        .expect("valid notification_send_seconds metric");

        let notify_queue_depth = IntGauge::new(
            "notify_queue_depth",
            "Notification jobs currently waiting in the queue",
        )
        .expect("valid notify_queue_depth metric");

        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(route_builds_total.clone()))
            .expect("register route_builds_total");
        registry
            .register(Box::new(notifications_enqueued_total.clone()))
            .expect("register notifications_enqueued_total");
        registry
            .register(Box::new(notification_sends_total.clone()))
            .expect("register notification_sends_total");
        registry
            .register(Box::new(notification_send_seconds.clone()))
            .expect("register notification_send_seconds");
        registry
            .register(Box::new(notify_queue_depth.clone()))
            .expect("register notify_queue_depth");

        Self {
            registry,
            transitions_total,
            route_builds_total,
            notifications_enqueued_total,
            notification_sends_total,
            notification_send_seconds,
            notify_queue_depth,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

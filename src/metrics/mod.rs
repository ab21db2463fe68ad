
use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::Encoder;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;
use std::sync::Once;

use crate::Result;

lazy_static! {
    pub static ref EVENTS_RECEIVED: IntCounterVec = IntCounterVec::new(
        Opts::new("mpv_events_received", "Decoded engine events by kind"),
        &["kind"]
    )
    .expect("metric can not be created");

    pub static ref MALFORMED_EVENTS: IntCounter =
        IntCounter::new("mpv_malformed_events", "Engine events that failed to decode")
            .expect("metric can not be created");

    pub static ref LATE_REPLIES: IntCounter = IntCounter::new(
        "mpv_late_replies",
        "Replies for unknown, resolved or timed-out tags"
    )
    .expect("metric can not be created");

    pub static ref DROPPED_NOTIFICATIONS: IntCounter = IntCounter::new(
        "mpv_dropped_notifications",
        "Notifications evicted from full subscriber queues"
    )
    .expect("metric can not be created");

    pub static ref OUTSTANDING_REQUESTS: IntGauge =
        IntGauge::new("mpv_outstanding_requests", "Tagged requests awaiting a reply")
            .expect("metric can not be created");

    pub static ref REPLY_LATENCY: HistogramVec = HistogramVec::new(
        HistogramOpts::new("mpv_reply_latency_ms", "Latency from submission to reply in ms")
            .buckets(exponential_buckets(0.5, 2.0, 14).expect("valid buckets")),
        &["operation"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

pub(crate) fn register_custom_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(EVENTS_RECEIVED.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(MALFORMED_EVENTS.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(LATE_REPLIES.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(DROPPED_NOTIFICATIONS.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(OUTSTANDING_REQUESTS.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(REPLY_LATENCY.clone()))
            .expect("collector can be registered");
    });
}

/// Renders every collector in the crate registry in the Prometheus text format.
pub fn gather_text() -> Result<String> {
    register_custom_metrics();

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

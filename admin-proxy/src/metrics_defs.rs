use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with endpoint, status.",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const UPLOAD_BYTES: MetricDef = MetricDef {
    name: "upload.bytes",
    metric_type: MetricType::Histogram,
    description: "Size of customer workbooks accepted for forwarding.",
};

pub const UPLOAD_REJECTED: MetricDef = MetricDef {
    name: "upload.rejected",
    metric_type: MetricType::Counter,
    description: "Uploads refused before reaching the backend. Tagged with reason.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    REQUESTS_INFLIGHT,
    UPLOAD_BYTES,
    UPLOAD_REJECTED,
];

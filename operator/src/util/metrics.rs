use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

use super::Error;

/// Per-controller metrics. Every controller registers the same set,
/// distinguished by the tag in the metric name.
pub struct ControllerMetrics {
    pub reconcile_counter: CounterVec,
    pub action_counter: CounterVec,
    pub error_counter: CounterVec,
    pub read_histogram: HistogramVec,
    pub write_histogram: HistogramVec,
}

/// Registration only fails on a duplicate name, which means two
/// controllers were started with the same tag.
fn registered<T>(result: prometheus::Result<T>, name: &str) -> T {
    result.unwrap_or_else(|err| panic!("failed to register metric {}: {}", name, err))
}

impl ControllerMetrics {
    pub fn new(tag: &str) -> Self {
        let name = |suffix: &str| format!("{}_{}_{}", prefix(), tag, suffix);

        let reconcile = name("reconcile_counter");
        let reconcile_counter = registered(
            register_counter_vec!(
                &reconcile,
                "Reconciliations started, per resource.",
                &["name", "namespace"]
            ),
            &reconcile,
        );
        let action = name("action_counter");
        let action_counter = registered(
            register_counter_vec!(
                &action,
                "Actions chosen by the read phase, per resource.",
                &["name", "namespace", "action"]
            ),
            &action,
        );
        let errors = name("error_counter");
        let error_counter = registered(
            register_counter_vec!(
                &errors,
                "Reconciliation errors by class and whether they are retried.",
                &["name", "namespace", "class", "retryable"]
            ),
            &errors,
        );
        let read = name("read_duration_seconds");
        let read_histogram = registered(
            register_histogram_vec!(
                &read,
                "Read phase latency, including control plane reads.",
                &["name", "namespace", "action"]
            ),
            &read,
        );
        let write = name("write_duration_seconds");
        let write_histogram = registered(
            register_histogram_vec!(
                &write,
                "Write phase latency, including waits on the control plane.",
                &["name", "namespace", "action"]
            ),
            &write,
        );
        ControllerMetrics {
            reconcile_counter,
            action_counter,
            error_counter,
            read_histogram,
            write_histogram,
        }
    }

    /// Counts an error against a resource.
    pub fn observe_error(&self, name: &str, namespace: &str, err: &Error) {
        let class = error_class(err);
        let retryable = if err.is_retryable() { "true" } else { "false" };
        self.error_counter
            .with_label_values(&[name, namespace, &class, retryable])
            .inc();
    }
}

/// Low-cardinality label for an error: the control plane
/// classification when there is one, the error variant otherwise.
pub fn error_class(err: &Error) -> String {
    if let Some(kind) = err.api_kind() {
        return kind.to_string();
    }
    match err {
        Error::KubeError { .. } => "Kubernetes",
        Error::UserInputError(_) => "UserInput",
        Error::ChronoError { .. } | Error::OutOfRangeError { .. } => "Time",
        Error::Json { .. } => "Json",
        Error::DurationError { .. } => "Duration",
        Error::NotFound(_) | Error::EmptyResult(_) => "NotFound",
        Error::Timeout { .. } => "Timeout",
        Error::UnexpectedState { .. } => "UnexpectedState",
        Error::Tainted { source, .. } => return format!("Tainted{}", error_class(source)),
        Error::Immutable(_) => "Immutable",
        Error::ApiError { .. } => "Api",
    }
    .to_owned()
}

/// Returns the metrics prefix, which can be overridden with the
/// METRICS_PREFIX environment variable.
pub fn prefix() -> String {
    std::env::var("METRICS_PREFIX").unwrap_or_else(|_| "agentcore".to_string())
}

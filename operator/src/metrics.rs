//! Prometheus scrape endpoint.

use hyper::{
    header::CONTENT_TYPE,
    service::{make_service_fn, service_fn},
    Body, Method, Request, Response, Server, StatusCode,
};
use lazy_static::lazy_static;
use prometheus::{labels, opts, register_counter_vec, register_gauge, register_histogram_vec};
use prometheus::{CounterVec, Encoder, Gauge, HistogramVec, TextEncoder};
use tracing::info;

use crate::util::metrics::prefix;

/// Path the metrics are served on. Anything else is a 404.
const METRICS_PATH: &str = "/metrics";

lazy_static! {
    static ref SCRAPE_COUNTER: CounterVec = register_counter_vec!(
        &format!("{}_scrape_requests_total", prefix()),
        "Number of requests made to the metrics server, by response code.",
        &["code"]
    )
    .unwrap();
    static ref SCRAPE_BODY_GAUGE: Gauge = register_gauge!(opts!(
        &format!("{}_scrape_response_size_bytes", prefix()),
        "Size of the last metrics response in bytes.",
        labels! {"path" => METRICS_PATH,}
    ))
    .unwrap();
    static ref SCRAPE_HISTOGRAM: HistogramVec = register_histogram_vec!(
        &format!("{}_scrape_duration_seconds", prefix()),
        "Time spent gathering and encoding metrics.",
        &["path"]
    )
    .unwrap();
}

fn not_found() -> Response<Body> {
    SCRAPE_COUNTER.with_label_values(&["404"]).inc();
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::empty())
        .unwrap()
}

/// Encodes every registered metric in the text exposition format.
async fn serve_req(req: Request<Body>) -> Result<Response<Body>, hyper::Error> {
    if req.method() != Method::GET || req.uri().path() != METRICS_PATH {
        return Ok(not_found());
    }
    let timer = SCRAPE_HISTOGRAM
        .with_label_values(&[METRICS_PATH])
        .start_timer();
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    encoder.encode(&prometheus::gather(), &mut buffer).unwrap();
    SCRAPE_BODY_GAUGE.set(buffer.len() as f64);
    SCRAPE_COUNTER.with_label_values(&["200"]).inc();
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, encoder.format_type())
        .body(Body::from(buffer))
        .unwrap();
    timer.observe_duration();
    Ok(response)
}

/// Runs the metrics server on the given port. Never returns; any exit
/// is a panic so the container restarts.
pub async fn run_server(port: u16) {
    let addr = ([0, 0, 0, 0], port).into();
    info!("metrics server listening on http://{}{}", addr, METRICS_PATH);

    let serve_future = Server::bind(&addr).serve(make_service_fn(|_| async {
        Ok::<_, hyper::Error>(service_fn(serve_req))
    }));

    if let Err(err) = serve_future.await {
        panic!("metrics server error: {}", err);
    }

    panic!("metrics server exited");
}

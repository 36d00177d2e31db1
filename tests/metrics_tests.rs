//! Request counters as rendered on `/metrics`.
//!
//! The Prometheus recorder is process-global, so these tests live in their
//! own binary and share a single installed handle.

mod common;

use std::sync::{Arc, OnceLock};

use axum::http::{Method, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;

use cashcard::{
    api::{router, AppState},
    metrics::{install_recorder, REQUESTS_TOTAL},
};
use common::{request, seeded_store, send, send_raw, test_auth, HANK, SARAH};

fn handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE.get_or_init(|| install_recorder().unwrap()).clone()
}

fn counter_line<'a>(rendered: &'a str, operation: &str, outcome: &str) -> Option<&'a str> {
    let operation = format!("operation=\"{}\"", operation);
    let outcome = format!("outcome=\"{}\"", outcome);
    rendered.lines().find(|line| {
        line.starts_with(REQUESTS_TOTAL) && line.contains(&operation) && line.contains(&outcome)
    })
}

#[tokio::test]
async fn test_requests_are_counted_by_operation_and_outcome() {
    let state = AppState::new(seeded_store()).with_metrics(handle());
    let app = router(state, Arc::new(test_auth()));

    let (status, _, _) = send(
        app.clone(),
        request(Method::GET, "/cashcards/99", Some(SARAH), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(
        app.clone(),
        request(Method::GET, "/cashcards/102", Some(SARAH), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        app.clone(),
        request(Method::DELETE, "/cashcards/99", Some(HANK), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, rendered) = send_raw(app, request(Method::GET, "/metrics", None, None)).await;
    assert_eq!(status, StatusCode::OK);

    let ok = counter_line(&rendered, "get", "ok").unwrap();
    assert!(ok.ends_with(" 1"), "{ok}");
    assert!(counter_line(&rendered, "get", "not_found").is_some(), "{rendered}");
    assert!(counter_line(&rendered, "delete", "forbidden").is_some(), "{rendered}");
    assert!(counter_line(&rendered, "create", "ok").is_none(), "{rendered}");
}

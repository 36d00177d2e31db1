use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::error::ApiResult;

pub const REQUESTS_TOTAL: &str = "cashcard_requests_total";

/// Installs the global Prometheus recorder. Call once at startup.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Counts one API operation, labelled by how it ended.
pub fn observe<T>(operation: &'static str, result: &ApiResult<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.outcome(),
    };
    ::metrics::increment_counter!(REQUESTS_TOTAL, "operation" => operation, "outcome" => outcome);
}

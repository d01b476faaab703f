//! Dry-run validation documents and the health probe.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::validation::ValidationReport;

/// `Mon Jan  2 15:04:05 UTC 2006`
pub const PROBE_TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S UTC %Y";

/// `{"validation":"Success"|"Failure","msg":...}` for a finished check.
pub fn validation_document(report: &ValidationReport) -> Value {
    if report.is_valid() {
        json!({ "validation": "Success", "msg": "" })
    } else {
        failure_document(report)
    }
}

/// A failure document carrying `message`, for checks that could not run.
pub fn failure_document(message: impl Display) -> Value {
    json!({ "validation": "Failure", "msg": message.to_string() })
}

pub fn health_probe() -> Value {
    health_probe_at(Utc::now())
}

pub fn health_probe_at(now: DateTime<Utc>) -> Value {
    json!({
        "status": "Success",
        "timestamp": now.format(PROBE_TIMESTAMP_FORMAT).to_string(),
    })
}

//! Structured JSON line logging on stderr, one record per event.

use serde_json::json;

const COMPONENT: &str = "live_relay";

pub fn log_info(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": COMPONENT,
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

pub fn log_error(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": COMPONENT,
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

use serde::Serialize;
use serde_json::Value;

/// Export stage transitions
pub const EXPORT_STAGE_EVENT: &str = "export://stage";

/// Server log lines forwarded to connected clients
pub const LOG_EVENT: &str = "log://line";

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &str, payload: Value);
}

pub fn emit_event<T: Serialize>(sink: &dyn EventSink, event: &str, payload: &T) {
    if let Ok(value) = serde_json::to_value(payload) {
        sink.emit(event, value);
    }
}

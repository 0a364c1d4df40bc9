//! Timestamps, event ids and the JSON response envelope.

use serde_json::Value as JsonValue;
use std::time::{SystemTime, UNIX_EPOCH};
use ulid::Ulid;

pub const ENVELOPE_VERSION: &str = "1.0.0";

/// Unix-epoch seconds with a `Z` suffix, e.g. `1771220592Z`.
pub fn now_epoch_z() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Wrap a command payload: envelope fields first, payload keys merged in.
///
/// Payloads are serialized reports whose keys are not under this module's
/// control (a conflict event has its own `ts` and `event_id`). Callers parse
/// `cmd` and `status` from the envelope, so a colliding payload key is
/// dropped rather than replacing them.
pub fn command_envelope(cmd: &str, status: &str, payload: JsonValue) -> JsonValue {
    let mut base = serde_json::json!({
        "envelope_version": ENVELOPE_VERSION,
        "ts": now_epoch_z(),
        "event_id": new_event_id(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(base_obj), Some(extra)) = (base.as_object_mut(), payload.as_object()) {
        for (k, v) in extra {
            base_obj.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
    base
}

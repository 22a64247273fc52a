use serde_json::Value as JsonValue;
use uuid::Uuid;

pub fn log_audit(user_id: &str, action: &str, resource: Option<&str>, metadata: Option<JsonValue>) {
    let metadata = metadata.unwrap_or(JsonValue::Null);
    tracing::info!(
        target: "audit",
        event_id = %Uuid::new_v4(),
        user_id = %user_id,
        action = %action,
        resource = resource.unwrap_or("-"),
        metadata = %metadata,
        "audit"
    );
}

//! Teams formatter tests over the serialized connector-card JSON.

use agent_relay::models::{
    CompletionMetrics, ErrorDetail, NotificationEvent, NotificationPayload, Priority,
};
use agent_relay::platform::teams;

fn error_payload() -> NotificationPayload {
    NotificationPayload::new(
        NotificationEvent::AgentError,
        Priority::Critical,
        "execution-engine",
        "OOM",
    )
    .with_project("billing")
    .with_error(ErrorDetail {
        kind: "OutOfMemoryError".into(),
        message: "heap exhausted".into(),
        stack: Some("at allocate()".into()),
    })
}

fn to_value(payload: &NotificationPayload) -> serde_json::Value {
    serde_json::to_value(teams::format(payload, "https://example.test/hook")).expect("serialize")
}

#[test]
fn card_identifies_as_message_card() {
    let card = to_value(&error_payload());
    assert_eq!(card["@type"], "MessageCard");
    assert_eq!(card["@context"], "http://schema.org/extensions");
}

#[test]
fn theme_color_follows_priority_table() {
    assert_eq!(to_value(&error_payload())["themeColor"], "D32F2F");

    let normal = NotificationPayload::new(
        NotificationEvent::AgentStart,
        Priority::Normal,
        "execution-engine",
        "starting",
    );
    assert_eq!(to_value(&normal)["themeColor"], "1976D2");

    let low = NotificationPayload::new(
        NotificationEvent::SystemHealth,
        Priority::Low,
        "health-monitor",
        "ok",
    );
    assert_eq!(to_value(&low)["themeColor"], "9E9E9E");
}

#[test]
fn summary_is_plain_text_fallback() {
    let card = to_value(&error_payload());
    assert_eq!(card["summary"], "OOM");
}

#[test]
fn facts_include_context_fields() {
    let card = to_value(&error_payload());
    let facts = card["sections"][0]["facts"]
        .as_array()
        .expect("facts array");
    let names: Vec<&str> = facts
        .iter()
        .filter_map(|f| f["name"].as_str())
        .collect();
    assert!(names.contains(&"Source"));
    assert!(names.contains(&"Project"));
    assert!(!names.contains(&"Ticket"), "absent ticket must not render");
}

#[test]
fn error_renders_in_secondary_section_with_stack_last() {
    let card = to_value(&error_payload());
    let sections = card["sections"].as_array().expect("sections");
    assert!(sections.len() >= 3, "message, error, stack sections");
    let error_text = sections[1]["text"].as_str().expect("error text");
    assert!(error_text.contains("OutOfMemoryError"));
    assert!(error_text.contains("heap exhausted"));
    let stack_text = sections[2]["text"].as_str().expect("stack text");
    assert!(stack_text.contains("allocate()"));
    assert!(stack_text.contains("```"));
}

#[test]
fn completion_metrics_render_as_facts() {
    let payload = NotificationPayload::new(
        NotificationEvent::AgentComplete,
        Priority::Normal,
        "execution-engine",
        "done",
    )
    .with_metrics(CompletionMetrics {
        duration_ms: 4200,
        token_count: 1500,
        success: true,
    });
    let card = to_value(&payload);
    let facts = card["sections"][0]["facts"]
        .as_array()
        .expect("facts array");
    let fact = |name: &str| {
        facts
            .iter()
            .find(|f| f["name"] == name)
            .and_then(|f| f["value"].as_str())
            .map(str::to_owned)
    };
    assert_eq!(fact("Duration").as_deref(), Some("4.2s"));
    assert_eq!(fact("Tokens").as_deref(), Some("1500"));
    assert_eq!(fact("Success").as_deref(), Some("\u{2713}"));
}

#[test]
fn no_null_placeholders_for_absent_fields() {
    let payload = NotificationPayload::new(
        NotificationEvent::AgentStart,
        Priority::High,
        "execution-engine",
        "starting",
    );
    let json = serde_json::to_string(&teams::format(&payload, "ops")).expect("serialize");
    assert!(!json.contains("null"), "no null placeholders: {json}");
}

#[test]
fn formatting_is_deterministic() {
    let payload = error_payload();
    let a = serde_json::to_string(&teams::format(&payload, "ops")).expect("serialize");
    let b = serde_json::to_string(&teams::format(&payload, "ops")).expect("serialize");
    assert_eq!(a, b);
}

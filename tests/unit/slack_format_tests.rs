//! Slack formatter tests: serialize the webhook body and assert on the
//! rendered JSON, the same way the webhook endpoint will see it.

use agent_relay::models::{
    CompletionMetrics, ErrorDetail, NotificationEvent, NotificationPayload, Priority,
};
use agent_relay::platform::slack;

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
        stack: Some("at allocate()\nat run()".into()),
    })
}

fn to_json(payload: &NotificationPayload) -> String {
    serde_json::to_string(&slack::format(payload, "#alerts")).expect("serialize webhook body")
}

#[test]
fn carries_channel_and_plain_text_fallback() {
    let message = slack::format(&error_payload(), "#alerts");
    assert_eq!(message.channel, "#alerts");
    assert_eq!(message.text, "OOM", "fallback text is the payload message");
}

#[test]
fn critical_priority_uses_alert_emoji() {
    let json = to_json(&error_payload());
    assert!(json.contains("\u{1f6a8}"), "critical styling missing: {json}");
}

#[test]
fn error_kind_and_message_render_prominently() {
    let json = to_json(&error_payload());
    assert!(json.contains("OutOfMemoryError"));
    assert!(json.contains("heap exhausted"));
}

#[test]
fn stack_trace_is_not_in_the_primary_section() {
    let message = slack::format(&error_payload(), "#alerts");
    let blocks = serde_json::to_value(&message.blocks).expect("serialize blocks");
    let blocks = blocks.as_array().expect("blocks array");
    let first = blocks[0].to_string();
    assert!(
        !first.contains("allocate()"),
        "stack must not appear in the heading block"
    );
    let last = blocks[blocks.len() - 1].to_string();
    assert!(
        last.contains("allocate()"),
        "stack belongs in the trailing fenced block"
    );
    assert!(last.contains("```"), "stack renders as a code fence");
}

#[test]
fn completion_metrics_render_as_fact_line() {
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
    let json = to_json(&payload);
    assert!(json.contains("Duration: 4.2s"), "missing duration: {json}");
    assert!(json.contains("Tokens: 1500"));
    assert!(json.contains("Success: \u{2713}"));
}

#[test]
fn absent_fields_are_omitted_entirely() {
    let payload = NotificationPayload::new(
        NotificationEvent::AgentStart,
        Priority::Low,
        "execution-engine",
        "starting",
    );
    let json = to_json(&payload);
    assert!(!json.contains("undefined"));
    assert!(!json.contains("Ticket"), "absent ticket must not render");
    assert!(!json.contains("Agent:"), "absent agent must not render");
    assert!(!json.contains("Project"), "absent project must not render");
}

#[test]
fn details_render_sorted_by_key() {
    let payload = NotificationPayload::new(
        NotificationEvent::SystemHealth,
        Priority::Normal,
        "health-monitor",
        "degraded",
    )
    .with_detail("zone", "us-east")
    .with_detail("attempt", 2.0);
    let json = to_json(&payload);
    let attempt = json.find("attempt").expect("attempt rendered");
    let zone = json.find("zone").expect("zone rendered");
    assert!(attempt < zone, "details render in key order");
}

#[test]
fn formatting_is_deterministic() {
    let payload = error_payload();
    assert_eq!(
        to_json(&payload),
        to_json(&payload),
        "format() is a pure function"
    );
}

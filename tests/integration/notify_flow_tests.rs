//! End-to-end notify() flow: route → format → admit → deliver.

use std::sync::Arc;

use agent_relay::config::{ChannelMappingConfig, NotificationConfig, PlatformConfig};
use agent_relay::models::{NotificationEvent, NotificationPayload, Priority};
use agent_relay::notifier::Notifier;
use httpmock::prelude::*;
use tokio_util::sync::CancellationToken;

use super::test_helpers::{billing_error_mapping, fast_delivery, oom_payload, slack_config};

#[tokio::test]
async fn critical_error_routes_formats_and_delivers() {
    let server = MockServer::start();
    let hook = server
        .mock(|when, then| {
            when.method(POST)
                .path("/slack")
                .body_includes("OOM")
                .body_includes("#alerts");
            then.status(200);
        });

    let config = slack_config(
        &server.url("/slack"),
        vec![billing_error_mapping("#alerts")],
    );
    let notifier = Notifier::new(Arc::new(config));

    let results = notifier.notify(&oom_payload()).await;

    assert_eq!(hook.hits(), 1);
    assert_eq!(results.len(), 1);
    assert!(results[0].success);
    assert_eq!(results[0].channel, "#alerts");
}

#[tokio::test]
async fn duplicate_channel_from_two_rules_delivers_once() {
    let server = MockServer::start();
    let hook = server
        .mock(|when, then| {
            when.method(POST).path("/slack");
            then.status(200);
        });

    let mut catch_all = billing_error_mapping("#a");
    catch_all.project_pattern = None;
    let config = slack_config(
        &server.url("/slack"),
        vec![billing_error_mapping("#a"), catch_all],
    );
    let notifier = Notifier::new(Arc::new(config));

    let results = notifier.notify(&oom_payload()).await;

    assert_eq!(hook.hits(), 1, "deduplicated to one delivery");
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn unmatched_payload_attempts_zero_deliveries() {
    let server = MockServer::start();
    let hook = server
        .mock(|when, then| {
            when.method(POST).path("/slack");
            then.status(200);
        });

    let config = slack_config(
        &server.url("/slack"),
        vec![billing_error_mapping("#alerts")],
    );
    let notifier = Notifier::new(Arc::new(config));

    let off_topic = NotificationPayload::new(
        NotificationEvent::AgentStart,
        Priority::Normal,
        "execution-engine",
        "starting",
    );
    let results = notifier.notify(&off_topic).await;

    assert_eq!(hook.hits(), 0);
    assert!(results.is_empty());
}

#[tokio::test]
async fn disabled_event_is_skipped_at_intake() {
    let server = MockServer::start();
    let hook = server
        .mock(|when, then| {
            when.method(POST).path("/slack");
            then.status(200);
        });

    let mut config = slack_config(
        &server.url("/slack"),
        vec![billing_error_mapping("#alerts")],
    );
    config.delivery.enabled_events = vec![NotificationEvent::AgentComplete];
    let notifier = Notifier::new(Arc::new(config));

    let results = notifier.notify(&oom_payload()).await;

    assert_eq!(hook.hits(), 0);
    assert!(results.is_empty());
}

#[tokio::test]
async fn teams_mapping_url_is_used_as_endpoint() {
    let server = MockServer::start();
    let hook = server
        .mock(|when, then| {
            when.method(POST)
                .path("/teams/channel-hook")
                .body_includes("MessageCard");
            then.status(200);
        });

    let config = NotificationConfig {
        teams: PlatformConfig {
            enabled: true,
            webhook_url: String::new(),
            default_channel: None,
            channels: vec![ChannelMappingConfig {
                channel: server.url("/teams/channel-hook"),
                events: vec![NotificationEvent::AgentError],
                project_pattern: None,
                agent_pattern: None,
            }],
            rate_limit_rpm: 600,
        },
        delivery: fast_delivery(),
        ..NotificationConfig::default()
    };
    let notifier = Notifier::new(Arc::new(config));

    let results = notifier.notify(&oom_payload()).await;

    assert_eq!(hook.hits(), 1);
    assert_eq!(results.len(), 1);
    assert!(results[0].success);
}

#[tokio::test]
async fn failed_delivery_surfaces_as_result_value() {
    let server = MockServer::start();
    server
        .mock(|when, then| {
            when.method(POST).path("/slack");
            then.status(404);
        });

    let config = slack_config(
        &server.url("/slack"),
        vec![billing_error_mapping("#alerts")],
    );
    let notifier = Notifier::new(Arc::new(config));

    let results = notifier.notify(&oom_payload()).await;

    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert!(results[0].error.is_some());
    let snapshot = notifier.snapshot();
    assert_eq!(snapshot.failed, 1);
    assert!(snapshot.platforms[0].last_error.is_some());
}

// ── Rate limiting and the overflow queue ─────────────────────────────

#[tokio::test]
async fn exhausted_limiter_queues_noncritical_and_admits_critical() {
    let server = MockServer::start();
    let hook = server
        .mock(|when, then| {
            when.method(POST).path("/slack");
            then.status(200);
        });

    let mut config = slack_config(&server.url("/slack"), Vec::new());
    config.slack.default_channel = Some("#dev-agency".into());
    config.slack.rate_limit_rpm = 1;
    config.delivery.queue_capacity = 1;
    let notifier = Notifier::new(Arc::new(config));

    let normal = || {
        NotificationPayload::new(
            NotificationEvent::AgentStart,
            Priority::Normal,
            "execution-engine",
            "starting",
        )
    };

    // First normal payload consumes the single token.
    let first = notifier.notify(&normal()).await;
    assert_eq!(first.len(), 1);
    assert_eq!(hook.hits(), 1);

    // Second and third are rate-limited; the queue holds one, so the
    // older queued job is evicted by the newer one.
    assert!(notifier.notify(&normal()).await.is_empty());
    assert!(notifier.notify(&normal()).await.is_empty());
    assert_eq!(hook.hits(), 1, "queued jobs made no HTTP calls");

    let snapshot = notifier.snapshot();
    assert_eq!(snapshot.queue_depth, 1);
    assert_eq!(snapshot.dropped, 1);

    // A critical payload still goes straight through.
    let still_limited = notifier
        .notify(&normal().with_detail("ignored", true))
        .await;
    assert!(still_limited.is_empty(), "normal payload is still limited");
    let results = notifier
        .notify(&NotificationPayload::new(
            NotificationEvent::AgentStart,
            Priority::Critical,
            "execution-engine",
            "urgent",
        ))
        .await;
    assert_eq!(results.len(), 1);
    assert!(results[0].success);
}

#[tokio::test]
async fn drain_task_delivers_queued_job_after_refill() {
    let server = MockServer::start();
    let hook = server
        .mock(|when, then| {
            when.method(POST).path("/slack");
            then.status(200);
        });

    // 60 rpm refills one token per second, so the queued job drains
    // within a few poll intervals.
    let mut config = slack_config(&server.url("/slack"), Vec::new());
    config.slack.default_channel = Some("#dev-agency".into());
    config.slack.rate_limit_rpm = 60;
    let notifier = Arc::new(Notifier::new(Arc::new(config)));

    let ct = CancellationToken::new();
    let drain = Arc::clone(&notifier).spawn_drain(ct.clone());

    // Exhaust the bucket, then submit one more payload that must queue.
    let payload = NotificationPayload::new(
        NotificationEvent::AgentStart,
        Priority::Normal,
        "execution-engine",
        "starting",
    );
    let mut immediate = 0usize;
    loop {
        let results = notifier.notify(&payload.clone()).await;
        if results.is_empty() {
            break; // this one landed on the queue
        }
        immediate += results.len();
    }
    assert_eq!(notifier.snapshot().queue_depth, 1);

    // Wait for the drain task to pick it up once a token refills. The
    // queue empties when the job is popped, so poll the mock's hit count
    // rather than the queue depth.
    let total = immediate + 1;
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while hook.hits() < total {
        assert!(
            std::time::Instant::now() < deadline,
            "queued job was not drained in time"
        );
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert_eq!(hook.hits(), total);
    assert_eq!(notifier.snapshot().queue_depth, 0);

    ct.cancel();
    let _ = drain.await;
}

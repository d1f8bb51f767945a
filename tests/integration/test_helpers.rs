//! Shared builders for integration tests.

use agent_relay::config::{
    ChannelMappingConfig, DeliveryConfig, NotificationConfig, PlatformConfig,
};
use agent_relay::models::{NotificationEvent, NotificationPayload, Priority};

/// Delivery settings tuned for fast tests: one retry, short delays.
pub fn fast_delivery() -> DeliveryConfig {
    DeliveryConfig {
        retry_attempts: 1,
        retry_delay_ms: 10,
        timeout_ms: 2_000,
        ..DeliveryConfig::default()
    }
}

/// Config with Slack enabled and pointed at a test webhook URL.
pub fn slack_config(webhook_url: &str, channels: Vec<ChannelMappingConfig>) -> NotificationConfig {
    NotificationConfig {
        slack: PlatformConfig {
            enabled: true,
            webhook_url: webhook_url.to_owned(),
            default_channel: None,
            channels,
            rate_limit_rpm: 600,
        },
        delivery: fast_delivery(),
        ..NotificationConfig::default()
    }
}

/// Routing rule matching `agent_error` events for `bill.*` projects.
pub fn billing_error_mapping(channel: &str) -> ChannelMappingConfig {
    ChannelMappingConfig {
        channel: channel.to_owned(),
        events: vec![NotificationEvent::AgentError],
        project_pattern: Some("bill.*".into()),
        agent_pattern: None,
    }
}

/// A critical `agent_error` payload for the billing project.
pub fn oom_payload() -> NotificationPayload {
    NotificationPayload::new(
        NotificationEvent::AgentError,
        Priority::Critical,
        "execution-engine",
        "OOM",
    )
    .with_project("billing")
}

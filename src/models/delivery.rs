//! Delivery target platform and per-attempt result records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outbound chat platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Slack incoming webhook.
    Slack,
    /// Microsoft Teams incoming webhook.
    Teams,
}

impl Platform {
    /// Stable string form used in logs and command output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Slack => "slack",
            Self::Teams => "teams",
        }
    }

    /// Parse the stable string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "slack" => Some(Self::Slack),
            "teams" => Some(Self::Teams),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome record for one (payload, channel) delivery.
///
/// Errors are data here: a failed delivery is a result value, never an
/// exception into the caller's pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct NotificationResult {
    /// Whether the message was accepted by the platform.
    pub success: bool,
    /// Platform the delivery targeted.
    pub platform: Platform,
    /// Destination channel identifier.
    pub channel: String,
    /// Platform-assigned message ID, when the API returns one.
    pub message_id: Option<String>,
    /// Final error description after retries were exhausted.
    pub error: Option<String>,
    /// When the outcome was recorded.
    pub timestamp: DateTime<Utc>,
}

impl NotificationResult {
    /// Record a successful delivery.
    #[must_use]
    pub fn delivered(platform: Platform, channel: impl Into<String>) -> Self {
        Self {
            success: true,
            platform,
            channel: channel.into(),
            message_id: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Record a failed delivery with its final error.
    #[must_use]
    pub fn failed(
        platform: Platform,
        channel: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            platform,
            channel: channel.into(),
            message_id: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

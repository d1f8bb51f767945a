//! Normalized inbound slash-command request/response pair.
//!
//! Both chat platforms post different wire encodings; the gateway
//! normalizes them into [`SlashCommandRequest`] before dispatch so the
//! handler is platform-agnostic.

use serde::{Deserialize, Serialize};

/// Response visibility on the requesting chat platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Visible only to the requesting user.
    Ephemeral,
    /// Visible to the whole channel.
    InChannel,
}

/// Normalized inbound command request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SlashCommandRequest {
    /// Invoked command, e.g. `/relay`.
    pub command: String,
    /// Channel the command was issued from.
    pub channel_id: String,
    /// Human-readable channel name.
    pub channel_name: String,
    /// Requesting user ID.
    pub user_id: String,
    /// Requesting user display name.
    pub user_name: String,
    /// Raw argument text after the command.
    pub text: String,
    /// Workspace/team identifier, when the platform provides one.
    pub team_id: Option<String>,
    /// Workspace/team domain, when the platform provides one.
    pub team_domain: Option<String>,
}

/// Handler response returned to the chat platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SlashCommandResponse {
    /// Who can see the response.
    pub visibility: Visibility,
    /// Response body (platform-flavored markdown).
    pub text: String,
}

impl SlashCommandResponse {
    /// Build a response visible only to the requester.
    #[must_use]
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            visibility: Visibility::Ephemeral,
            text: text.into(),
        }
    }

    /// Build a response visible to the whole channel.
    #[must_use]
    pub fn in_channel(text: impl Into<String>) -> Self {
        Self {
            visibility: Visibility::InChannel,
            text: text.into(),
        }
    }
}

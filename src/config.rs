//! Configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::models::NotificationEvent;
use crate::{AppError, Result};

/// Keychain service name for webhook credentials.
const KEYCHAIN_SERVICE: &str = "agent-relay";

/// One routing rule associating event/project/agent patterns with a
/// destination channel.
///
/// Patterns are regex source strings compiled once at startup by the
/// channel router; a rule whose pattern fails to compile is disabled with
/// a configuration warning and never matches.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ChannelMappingConfig {
    /// Destination channel ID, channel name, or per-channel webhook URL.
    pub channel: String,
    /// Event tags this rule applies to.
    pub events: Vec<NotificationEvent>,
    /// Optional project-name pattern; absent means match all.
    pub project_pattern: Option<String>,
    /// Optional agent-name pattern; absent means match all.
    pub agent_pattern: Option<String>,
}

/// Per-platform connection and routing configuration.
///
/// Webhook URLs are credentials and load at runtime via OS keychain or
/// environment variables, not from the TOML config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PlatformConfig {
    /// Whether deliveries to this platform are enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Incoming-webhook endpoint (populated at runtime).
    #[serde(skip)]
    pub webhook_url: String,
    /// Fallback channel used when no routing rule matches.
    #[serde(default)]
    pub default_channel: Option<String>,
    /// Routing rules, evaluated in order.
    #[serde(default)]
    pub channels: Vec<ChannelMappingConfig>,
    /// Maximum outbound messages per minute.
    #[serde(default = "default_rate_limit_rpm")]
    pub rate_limit_rpm: u32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: String::new(),
            default_channel: None,
            channels: Vec::new(),
            rate_limit_rpm: default_rate_limit_rpm(),
        }
    }
}

fn default_rate_limit_rpm() -> u32 {
    60
}

/// Global delivery behavior shared by both platforms.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct DeliveryConfig {
    /// Events that are processed at all; others are dropped at intake.
    #[serde(default = "default_enabled_events")]
    pub enabled_events: Vec<NotificationEvent>,
    /// Retries after the initial attempt.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Base delay between attempts; doubles per retry.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Hard per-attempt HTTP timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Bound on the rate-limit overflow queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            enabled_events: default_enabled_events(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_enabled_events() -> Vec<NotificationEvent> {
    NotificationEvent::ALL.to_vec()
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_queue_capacity() -> usize {
    100
}

/// Inbound slash-command gateway configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GatewayConfig {
    /// HTTP port for the command endpoint.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Enabled command verbs.
    #[serde(default = "default_commands")]
    pub commands: Vec<String>,
    /// Team/workspace allow-list; empty means allow all.
    #[serde(default)]
    pub authorized_team_ids: Vec<String>,
    /// Channel allow-list; empty means allow all.
    #[serde(default)]
    pub authorized_channel_ids: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            commands: default_commands(),
            authorized_team_ids: Vec::new(),
            authorized_channel_ids: Vec::new(),
        }
    }
}

fn default_http_port() -> u16 {
    3000
}

fn default_commands() -> Vec<String> {
    vec!["status".into(), "health".into()]
}

/// Root configuration parsed from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct NotificationConfig {
    /// Slack platform settings.
    #[serde(default)]
    pub slack: PlatformConfig,
    /// Microsoft Teams platform settings.
    #[serde(default)]
    pub teams: PlatformConfig,
    /// Global delivery behavior.
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Inbound command gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl NotificationConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load webhook credentials from OS keychain with env-var fallback.
    ///
    /// Tries the `agent-relay` keyring service first, then falls back to
    /// `SLACK_WEBHOOK_URL` / `TEAMS_WEBHOOK_URL` environment variables.
    /// A platform whose credential cannot be found is disabled with a
    /// warning rather than failing startup.
    pub async fn load_credentials(&mut self) {
        if self.slack.enabled {
            match load_credential("slack_webhook_url", "SLACK_WEBHOOK_URL").await {
                Ok(url) => self.slack.webhook_url = url,
                Err(err) => {
                    warn!(%err, "slack credential missing; disabling slack deliveries");
                    self.slack.enabled = false;
                }
            }
        }
        if self.teams.enabled {
            match load_credential("teams_webhook_url", "TEAMS_WEBHOOK_URL").await {
                Ok(url) => self.teams.webhook_url = url,
                Err(err) => {
                    warn!(%err, "teams credential missing; disabling teams deliveries");
                    self.teams.enabled = false;
                }
            }
        }
    }

    /// Whether a command request passes the configured allow-lists.
    #[must_use]
    pub fn is_authorized(&self, team_id: Option<&str>, channel_id: &str) -> bool {
        let teams_ok = self.gateway.authorized_team_ids.is_empty()
            || team_id.is_some_and(|id| {
                self.gateway.authorized_team_ids.iter().any(|t| t == id)
            });
        let channels_ok = self.gateway.authorized_channel_ids.is_empty()
            || self
                .gateway
                .authorized_channel_ids
                .iter()
                .any(|c| c == channel_id);
        teams_ok && channels_ok
    }

    fn validate(&self) -> Result<()> {
        if self.delivery.queue_capacity == 0 {
            return Err(AppError::Config(
                "delivery.queue_capacity must be greater than zero".into(),
            ));
        }

        for (name, platform) in [("slack", &self.slack), ("teams", &self.teams)] {
            if !platform.enabled {
                continue;
            }
            if platform.rate_limit_rpm == 0 {
                return Err(AppError::Config(format!(
                    "{name}.rate_limit_rpm must be greater than zero"
                )));
            }
            if platform.channels.is_empty() && platform.default_channel.is_none() {
                return Err(AppError::Config(format!(
                    "{name} is enabled but has no channel mappings and no default_channel"
                )));
            }
            for mapping in &platform.channels {
                if mapping.channel.trim().is_empty() {
                    return Err(AppError::Config(format!(
                        "{name} channel mapping has an empty channel"
                    )));
                }
                if mapping.events.is_empty() {
                    return Err(AppError::Config(format!(
                        "{name} mapping for '{}' lists no events",
                        mapping.channel
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // Try OS keychain first via spawn_blocking (keyring is synchronous I/O).
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYCHAIN_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    // Fallback to environment variable.
    env::var(env_key).map_err(|_| {
        AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))
    })
}

//! Channel routing: event + context → destination channels.
//!
//! Mapping rules are compiled from configuration once at startup and are
//! read-only for the process lifetime. A rule whose regex fails to
//! compile is disabled (never matches) so one bad pattern cannot block
//! delivery through the remaining rules.

use regex::Regex;
use tracing::{debug, warn};

use crate::config::{ChannelMappingConfig, PlatformConfig};
use crate::models::{NotificationEvent, NotificationPayload, Platform};

/// One compiled routing rule.
#[derive(Debug)]
struct CompiledMapping {
    channel: String,
    events: Vec<NotificationEvent>,
    project: Option<Regex>,
    agent: Option<Regex>,
    /// Set when a pattern failed to compile; the rule never matches.
    disabled: bool,
}

impl CompiledMapping {
    fn compile(platform: Platform, config: &ChannelMappingConfig) -> Self {
        let mut disabled = false;
        let mut compile = |label: &str, source: &Option<String>| -> Option<Regex> {
            let source = source.as_deref()?;
            match Regex::new(source) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!(
                        %platform,
                        channel = %config.channel,
                        pattern = source,
                        %err,
                        "malformed {label} pattern; mapping disabled"
                    );
                    disabled = true;
                    None
                }
            }
        };

        let project = compile("project", &config.project_pattern);
        let agent = compile("agent", &config.agent_pattern);

        Self {
            channel: config.channel.clone(),
            events: config.events.clone(),
            project,
            agent,
            disabled,
        }
    }

    fn matches(&self, payload: &NotificationPayload) -> bool {
        if self.disabled || !self.events.contains(&payload.event) {
            return false;
        }
        pattern_applies(self.project.as_ref(), payload.project_name.as_deref())
            && pattern_applies(self.agent.as_ref(), payload.agent_name.as_deref())
    }
}

/// Absent pattern matches everything; a present pattern requires the
/// payload field to be present and match.
fn pattern_applies(pattern: Option<&Regex>, value: Option<&str>) -> bool {
    match (pattern, value) {
        (None, _) => true,
        (Some(regex), Some(value)) => regex.is_match(value),
        (Some(_), None) => false,
    }
}

/// Compiled routing table for one platform.
#[derive(Debug)]
pub struct ChannelRouter {
    platform: Platform,
    mappings: Vec<CompiledMapping>,
    default_channel: Option<String>,
}

impl ChannelRouter {
    /// Compile the routing table from platform configuration.
    #[must_use]
    pub fn compile(platform: Platform, config: &PlatformConfig) -> Self {
        let mappings = config
            .channels
            .iter()
            .map(|mapping| CompiledMapping::compile(platform, mapping))
            .collect();
        Self {
            platform,
            mappings,
            default_channel: config.default_channel.clone(),
        }
    }

    /// Resolve the ordered, de-duplicated destination channels for a payload.
    ///
    /// Zero matches falls back to the platform default channel when one is
    /// configured; otherwise the payload is silently dropped for this
    /// platform — a signal, not an error.
    #[must_use]
    pub fn route(&self, payload: &NotificationPayload) -> Vec<String> {
        let mut channels: Vec<String> = Vec::new();
        for mapping in &self.mappings {
            if mapping.matches(payload) && !channels.iter().any(|c| c == &mapping.channel) {
                channels.push(mapping.channel.clone());
            }
        }

        if channels.is_empty() {
            if let Some(fallback) = &self.default_channel {
                channels.push(fallback.clone());
            } else {
                debug!(
                    platform = %self.platform,
                    event = ?payload.event,
                    payload_id = %payload.id,
                    "no routing rule matched; payload dropped for platform"
                );
            }
        }

        channels
    }
}

//! Inbound slash-command parsing and execution.
//!
//! Commands are read-only status queries — the handler performs no
//! mutating action on the notification pipeline, by design. Every
//! request produces a valid response; malformed input yields usage help,
//! never an error back to the chat platform.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::NotificationConfig;
use crate::models::{Platform, SlashCommandRequest, SlashCommandResponse};
use crate::notifier::Notifier;

/// Usage text returned for `help`, unknown verbs, and malformed arguments.
const USAGE: &str = "Available commands:\n\
    \u{2022} `status [platform=slack|teams]` \u{2014} delivery counters and queue depth\n\
    \u{2022} `health` \u{2014} per-platform health and rate-limit headroom\n\
    \u{2022} `help` \u{2014} this message";

/// Parsed command line: verb plus `key=value` arguments.
#[derive(Debug, PartialEq, Eq)]
struct CommandLine {
    verb: String,
    args: Vec<(String, String)>,
}

/// Tokenize `verb [key=value]…`.
///
/// Returns `None` for malformed argument tokens: a dangling `key=`, a
/// bare `=value`, or a positional token after the verb.
fn parse_command_line(text: &str) -> Option<CommandLine> {
    let mut tokens = text.split_whitespace();
    let verb = tokens.next().unwrap_or("help").to_lowercase();

    let mut args = Vec::new();
    for token in tokens {
        let (key, value) = token.split_once('=')?;
        if key.is_empty() || value.is_empty() {
            return None;
        }
        args.push((key.to_lowercase(), value.to_lowercase()));
    }
    Some(CommandLine { verb, args })
}

/// Stateless slash-command handler.
///
/// Holds only shared read handles; no session state is retained between
/// requests.
pub struct CommandHandler {
    config: Arc<NotificationConfig>,
    notifier: Arc<Notifier>,
}

impl CommandHandler {
    /// Build a handler over the shared pipeline.
    #[must_use]
    pub fn new(config: Arc<NotificationConfig>, notifier: Arc<Notifier>) -> Self {
        Self { config, notifier }
    }

    /// Execute one inbound command request.
    ///
    /// Authorization runs before any query: a request from outside the
    /// configured team/channel allow-lists is rejected without touching
    /// the pipeline. All responses are ephemeral.
    #[must_use]
    pub fn handle(&self, request: &SlashCommandRequest) -> SlashCommandResponse {
        if !self
            .config
            .is_authorized(request.team_id.as_deref(), &request.channel_id)
        {
            warn!(
                user_id = %request.user_id,
                team_id = ?request.team_id,
                channel_id = %request.channel_id,
                "unauthorized slash command rejected"
            );
            return SlashCommandResponse::ephemeral("Not authorized.");
        }

        let Some(line) = parse_command_line(&request.text) else {
            return SlashCommandResponse::ephemeral(format!(
                "Could not parse arguments.\n{USAGE}"
            ));
        };

        if line.verb == "help" {
            return SlashCommandResponse::ephemeral(USAGE);
        }

        if !self.config.gateway.commands.iter().any(|c| c == &line.verb) {
            return SlashCommandResponse::ephemeral(format!(
                "Unknown command `{}`.\n{USAGE}",
                line.verb
            ));
        }

        info!(
            verb = %line.verb,
            user_id = %request.user_id,
            channel_id = %request.channel_id,
            "slash command accepted"
        );

        match line.verb.as_str() {
            "status" => self.status(&line.args),
            "health" => self.health(&line.args),
            _ => SlashCommandResponse::ephemeral(USAGE),
        }
    }

    fn status(&self, args: &[(String, String)]) -> SlashCommandResponse {
        let mut filter: Option<Platform> = None;
        for (key, value) in args {
            if key != "platform" {
                return SlashCommandResponse::ephemeral(format!(
                    "Unknown argument `{key}`.\n{USAGE}"
                ));
            }
            match Platform::parse(value) {
                Some(platform) => filter = Some(platform),
                None => {
                    return SlashCommandResponse::ephemeral(format!(
                        "Unknown platform `{value}`; expected `slack` or `teams`."
                    ));
                }
            }
        }

        let snapshot = self.notifier.snapshot();
        let mut lines = vec![format!(
            "Deliveries: {} ok, {} failed, {} dropped \u{b7} queue depth {}",
            snapshot.delivered, snapshot.failed, snapshot.dropped, snapshot.queue_depth,
        )];
        for health in snapshot
            .platforms
            .iter()
            .filter(|h| filter.is_none_or(|p| p == h.platform))
        {
            lines.push(format!(
                "{}: {}",
                health.platform,
                if health.enabled { "enabled" } else { "disabled" },
            ));
        }
        SlashCommandResponse::ephemeral(lines.join("\n"))
    }

    fn health(&self, args: &[(String, String)]) -> SlashCommandResponse {
        if !args.is_empty() {
            return SlashCommandResponse::ephemeral(format!(
                "`health` takes no arguments.\n{USAGE}"
            ));
        }

        let snapshot = self.notifier.snapshot();
        let mut lines = vec![format!("Uptime: {}s", snapshot.uptime_secs)];
        for health in &snapshot.platforms {
            let state = if health.enabled { "enabled" } else { "disabled" };
            let mut line = format!(
                "{}: {state} \u{b7} {} tokens available",
                health.platform, health.tokens_available,
            );
            if let Some(err) = &health.last_error {
                line.push_str(&format!(" \u{b7} last error: {err}"));
            }
            lines.push(line);
        }
        SlashCommandResponse::ephemeral(lines.join("\n"))
    }
}

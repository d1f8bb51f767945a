//! Slack Block Kit webhook message builder.
//!
//! Transforms a payload into the JSON body posted to a Slack incoming
//! webhook. Pure and deterministic; missing optional payload fields are
//! omitted from the output entirely.

use serde::Serialize;
use slack_morphism::prelude::{SlackBlock, SlackBlockText, SlackSectionBlock};

use crate::models::NotificationPayload;

use super::{metrics_line, severity_style};

/// JSON body for a Slack incoming-webhook POST.
#[derive(Debug, Clone, Serialize)]
pub struct SlackWebhookMessage {
    /// Destination channel override.
    pub channel: String,
    /// Plain-text fallback for clients that cannot render blocks.
    pub text: String,
    /// Block Kit layout.
    pub blocks: Vec<SlackBlock>,
}

/// Build a markdown section block.
fn section(text: impl Into<String>) -> SlackBlock {
    let text: String = text.into();
    SlackBlock::Section(SlackSectionBlock::new().with_text(SlackBlockText::MarkDown(text.into())))
}

/// Format a payload into a webhook message for the given channel.
#[must_use]
pub fn format(payload: &NotificationPayload, channel: &str) -> SlackWebhookMessage {
    let style = severity_style(payload.priority);
    let mut blocks = vec![section(format!(
        "{} *{}* \u{2014} {}",
        style.emoji,
        payload.event.title(),
        payload.message,
    ))];

    let mut context: Vec<String> = vec![format!("Source: `{}`", payload.source)];
    if let Some(agent) = &payload.agent_name {
        context.push(format!("Agent: `{agent}`"));
    }
    if let Some(project) = &payload.project_name {
        context.push(format!("Project: `{project}`"));
    }
    if let Some(ticket) = &payload.ticket_id {
        context.push(format!("Ticket: `{ticket}`"));
    }
    blocks.push(section(context.join(" \u{b7} ")));

    if let Some(error) = &payload.error {
        blocks.push(section(format!("*{}*: {}", error.kind, error.message)));
        // Stack traces are noise in the primary view; render them only as
        // a trailing fenced block.
        if let Some(stack) = &error.stack {
            blocks.push(section(format!("```\n{stack}\n```")));
        }
    }

    if let Some(metrics) = &payload.metrics {
        blocks.push(section(metrics_line(metrics)));
    }

    if !payload.details.is_empty() {
        let lines: Vec<String> = payload
            .details
            .iter()
            .map(|(key, value)| format!("\u{2022} {key}: {}", value.display()))
            .collect();
        blocks.push(section(lines.join("\n")));
    }

    SlackWebhookMessage {
        channel: channel.to_owned(),
        text: payload.message.clone(),
        blocks,
    }
}

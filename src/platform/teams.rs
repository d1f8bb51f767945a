//! Microsoft Teams connector-card builder.
//!
//! Produces the legacy `MessageCard` JSON shape accepted by Teams
//! incoming webhooks. Pure and deterministic; absent payload fields are
//! omitted rather than rendered as placeholders.

use serde::Serialize;

use crate::models::NotificationPayload;

use super::{format_duration, severity_style};

/// One `name`/`value` row in a card facts table.
#[derive(Debug, Clone, Serialize)]
pub struct TeamsFact {
    /// Fact label.
    pub name: String,
    /// Fact value.
    pub value: String,
}

/// One card section.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamsSection {
    /// Section heading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_title: Option<String>,
    /// Section body text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Fact table rows.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facts: Vec<TeamsFact>,
    /// Whether `text` is rendered as markdown.
    pub markdown: bool,
}

impl TeamsSection {
    fn text_only(text: impl Into<String>) -> Self {
        Self {
            activity_title: None,
            text: Some(text.into()),
            facts: Vec::new(),
            markdown: true,
        }
    }
}

/// JSON body for a Teams incoming-webhook POST.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamsCard {
    /// Constant `MessageCard`.
    #[serde(rename = "@type")]
    pub card_type: &'static str,
    /// Constant schema context.
    #[serde(rename = "@context")]
    pub context: &'static str,
    /// Accent color derived from payload priority.
    pub theme_color: String,
    /// Plain-text fallback summary.
    pub summary: String,
    /// Card heading.
    pub title: String,
    /// Card body sections.
    pub sections: Vec<TeamsSection>,
}

/// Format a payload into a connector card.
///
/// Teams webhooks are channel-scoped, so the channel does not appear in
/// the card body; it only selects the delivery endpoint.
#[must_use]
pub fn format(payload: &NotificationPayload, _channel: &str) -> TeamsCard {
    let style = severity_style(payload.priority);

    let mut facts = vec![TeamsFact {
        name: "Source".into(),
        value: payload.source.clone(),
    }];
    if let Some(agent) = &payload.agent_name {
        facts.push(TeamsFact {
            name: "Agent".into(),
            value: agent.clone(),
        });
    }
    if let Some(project) = &payload.project_name {
        facts.push(TeamsFact {
            name: "Project".into(),
            value: project.clone(),
        });
    }
    if let Some(ticket) = &payload.ticket_id {
        facts.push(TeamsFact {
            name: "Ticket".into(),
            value: ticket.clone(),
        });
    }
    if let Some(metrics) = &payload.metrics {
        facts.push(TeamsFact {
            name: "Duration".into(),
            value: format_duration(metrics.duration_ms),
        });
        facts.push(TeamsFact {
            name: "Tokens".into(),
            value: metrics.token_count.to_string(),
        });
        facts.push(TeamsFact {
            name: "Success".into(),
            value: if metrics.success { "\u{2713}" } else { "\u{2717}" }.into(),
        });
    }
    for (key, value) in &payload.details {
        facts.push(TeamsFact {
            name: key.clone(),
            value: value.display(),
        });
    }

    let mut sections = vec![TeamsSection {
        activity_title: None,
        text: Some(payload.message.clone()),
        facts,
        markdown: true,
    }];

    if let Some(error) = &payload.error {
        sections.push(TeamsSection::text_only(format!(
            "**{}**: {}",
            error.kind, error.message
        )));
        if let Some(stack) = &error.stack {
            sections.push(TeamsSection::text_only(format!("```\n{stack}\n```")));
        }
    }

    TeamsCard {
        card_type: "MessageCard",
        context: "http://schema.org/extensions",
        theme_color: style.color.to_owned(),
        summary: payload.message.clone(),
        title: format!("{} {}", style.emoji, payload.event.title()),
        sections,
    }
}

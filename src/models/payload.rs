//! Notification payload model.
//!
//! A payload is immutable once constructed: downstream components read it
//! and produce new platform-message values, never mutate it in place.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::{NotificationEvent, Priority};

/// Structured value allowed in the payload `details` map.
///
/// A closed set of primitive and nested-map shapes so the formatters can
/// render entries without runtime type surprises. Nested maps are ordered
/// (`BTreeMap`) to keep formatting deterministic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DetailValue {
    /// Boolean flag.
    Flag(bool),
    /// Numeric value.
    Number(f64),
    /// Free text.
    Text(String),
    /// Nested key-value group.
    Map(BTreeMap<String, DetailValue>),
}

impl DetailValue {
    /// Render the value as a single display line.
    ///
    /// Nested maps render as `key: value` pairs joined with `, `.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Flag(v) => v.to_string(),
            Self::Number(v) => {
                if v.fract().abs() < f64::EPSILON && v.abs() < 1e15 {
                    format!("{v:.0}")
                } else {
                    v.to_string()
                }
            }
            Self::Text(v) => v.clone(),
            Self::Map(entries) => entries
                .iter()
                .map(|(k, v)| format!("{k}: {}", v.display()))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl From<&str> for DetailValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for DetailValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for DetailValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for DetailValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// Error context carried by failure-type events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ErrorDetail {
    /// Error classification, e.g. `OutOfMemoryError`.
    pub kind: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional stack trace; rendered only in secondary sections.
    pub stack: Option<String>,
}

/// Execution metrics carried by completion events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CompletionMetrics {
    /// Wall-clock task duration in milliseconds.
    pub duration_ms: u64,
    /// Tokens consumed by the agent invocation.
    pub token_count: u64,
    /// Whether the task succeeded.
    pub success: bool,
}

/// The immutable unit of work flowing through the dispatch pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct NotificationPayload {
    /// Unique payload identifier, used for log correlation.
    pub id: Uuid,
    /// Lifecycle event tag.
    pub event: NotificationEvent,
    /// Delivery priority.
    pub priority: Priority,
    /// Creation timestamp, set once at construction.
    pub timestamp: DateTime<Utc>,
    /// Emitting component, e.g. `execution-engine`.
    pub source: String,
    /// Agent identifier, when the event concerns a specific agent.
    pub agent_name: Option<String>,
    /// Ticket identifier associated with the work item.
    pub ticket_id: Option<String>,
    /// Project the event belongs to; router pattern-match context.
    pub project_name: Option<String>,
    /// Required human-readable summary.
    pub message: String,
    /// Additional structured context.
    #[serde(default)]
    pub details: BTreeMap<String, DetailValue>,
    /// Error context; present only for error-type events.
    pub error: Option<ErrorDetail>,
    /// Execution metrics; present for completion events.
    pub metrics: Option<CompletionMetrics>,
}

impl NotificationPayload {
    /// Construct a payload with a generated ID and the current timestamp.
    #[must_use]
    pub fn new(
        event: NotificationEvent,
        priority: Priority,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            priority,
            timestamp: Utc::now(),
            source: source.into(),
            agent_name: None,
            ticket_id: None,
            project_name: None,
            message: message.into(),
            details: BTreeMap::new(),
            error: None,
            metrics: None,
        }
    }

    /// Attach an agent name.
    #[must_use]
    pub fn with_agent(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = Some(agent_name.into());
        self
    }

    /// Attach a ticket identifier.
    #[must_use]
    pub fn with_ticket(mut self, ticket_id: impl Into<String>) -> Self {
        self.ticket_id = Some(ticket_id.into());
        self
    }

    /// Attach a project name.
    #[must_use]
    pub fn with_project(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = Some(project_name.into());
        self
    }

    /// Attach one structured detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<DetailValue>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Attach error context.
    #[must_use]
    pub fn with_error(mut self, error: ErrorDetail) -> Self {
        self.error = Some(error);
        self
    }

    /// Attach completion metrics.
    #[must_use]
    pub fn with_metrics(mut self, metrics: CompletionMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

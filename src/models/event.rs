//! Lifecycle event and priority enumerations.

use serde::{Deserialize, Serialize};

/// Lifecycle event tag emitted by the agent execution pipeline.
///
/// The tag decides which routing rules apply and how the formatters
/// lay out the message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    /// Agent began executing a task.
    AgentStart,
    /// Agent finished a task; `metrics` is expected on the payload.
    AgentComplete,
    /// Agent failed; `error` is expected on the payload.
    AgentError,
    /// Agent exceeded its execution deadline.
    AgentTimeout,
    /// Periodic system health report.
    SystemHealth,
    /// Circuit breaker tripped for an upstream dependency.
    CircuitBreakerOpen,
    /// Circuit breaker recovered.
    CircuitBreakerClose,
    /// System entered degraded operation.
    DegradationStart,
    /// System left degraded operation.
    DegradationEnd,
}

impl NotificationEvent {
    /// All event tags, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::AgentStart,
        Self::AgentComplete,
        Self::AgentError,
        Self::AgentTimeout,
        Self::SystemHealth,
        Self::CircuitBreakerOpen,
        Self::CircuitBreakerClose,
        Self::DegradationStart,
        Self::DegradationEnd,
    ];

    /// Whether this tag represents a failure condition.
    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Self::AgentError | Self::AgentTimeout)
    }

    /// Whether this tag represents a completed task.
    #[must_use]
    pub fn is_completion(self) -> bool {
        matches!(self, Self::AgentComplete)
    }

    /// Human-readable heading used by the platform formatters.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::AgentStart => "Agent started",
            Self::AgentComplete => "Agent completed",
            Self::AgentError => "Agent error",
            Self::AgentTimeout => "Agent timeout",
            Self::SystemHealth => "System health",
            Self::CircuitBreakerOpen => "Circuit breaker open",
            Self::CircuitBreakerClose => "Circuit breaker closed",
            Self::DegradationStart => "Degraded mode entered",
            Self::DegradationEnd => "Degraded mode ended",
        }
    }
}

/// Delivery priority attached to a payload.
///
/// `Critical` selects alert styling and bypasses the outbound rate
/// limiter entirely.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Informational, muted styling.
    Low,
    /// Default priority.
    Normal,
    /// Elevated attention.
    High,
    /// Reliability signal; never rate limited.
    Critical,
}

impl Priority {
    /// Whether this priority is exempt from rate limiting.
    #[must_use]
    pub fn bypasses_rate_limit(self) -> bool {
        matches!(self, Self::Critical)
    }
}

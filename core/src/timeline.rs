use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which user request produced a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Next,
    Prev,
    Goto,
}

/// Represents a discrete event in a wizard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TimelineEvent {
    /// The engine committed a transition.
    Transition {
        kind: TransitionKind,
        from: Option<String>,
        to: Option<String>,
        outcome: String,
        at: DateTime<Utc>,
    },
    /// A transition was refused; state unchanged.
    Rejected {
        kind: TransitionKind,
        route: Option<String>,
        reason: String,
        at: DateTime<Utc>,
    },
}

impl TimelineEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            TimelineEvent::Transition { at, .. } | TimelineEvent::Rejected { at, .. } => *at,
        }
    }
}

/// A sequential record of a wizard session.
///
/// With a limit set, the oldest events are dropped once it is exceeded.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Timeline {
    pub events: Vec<TimelineEvent>,
    #[serde(skip)]
    limit: Option<usize>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: Vec::new(),
            limit: Some(limit),
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn push(&mut self, event: TimelineEvent) {
        self.events.push(event);
        if let Some(limit) = self.limit {
            let excess = self.events.len().saturating_sub(limit);
            if excess > 0 {
                self.events.drain(..excess);
            }
        }
    }

    /// Take every recorded event, leaving the timeline empty.
    pub fn drain(&mut self) -> Vec<TimelineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Committed transitions only.
    pub fn transitions(&self) -> impl Iterator<Item = &TimelineEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, TimelineEvent::Transition { .. }))
    }
}

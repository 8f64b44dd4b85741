use serde::{Deserialize, Serialize};

use crate::model::narrative_event::NarrativeEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventApplyOutcome {
    Applied,
    /// The event matched but changed nothing (e.g. a known ally joining again).
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventApplication {
    pub event: NarrativeEvent,
    pub outcome: EventApplyOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeApplyReport {
    pub applications: Vec<EventApplication>,
}

impl NarrativeApplyReport {
    pub fn applied_count(&self) -> usize {
        self.applications
            .iter()
            .filter(|a| a.outcome == EventApplyOutcome::Applied)
            .count()
    }

    /// Kinds of the events that changed the world, in application order.
    pub fn applied_kinds(&self) -> Vec<&'static str> {
        self.applications
            .iter()
            .filter(|a| a.outcome == EventApplyOutcome::Applied)
            .map(|a| a.event.short_name())
            .collect()
    }
}


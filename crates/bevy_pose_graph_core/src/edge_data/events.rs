use bevy::reflect::{Reflect, std_traits::ReflectDefault};
use serde::{Deserialize, Serialize};

/// Notification produced while the graph is evaluated or driven.
#[derive(Clone, Debug, Reflect, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GraphEvent {
    /// A transition node switched its active input
    Transitioned {
        node: String,
        from: usize,
        to: usize,
    },
    /// A non-looping clip or a one-shot reached its end
    PlaybackFinished { node: String },
}

/// Sequence of events, oldest first
#[derive(Clone, Debug, Reflect, Serialize, Deserialize, Default, PartialEq)]
#[reflect(Default)]
pub struct EventQueue {
    pub events: Vec<GraphEvent>,
}

impl EventQueue {
    pub fn with_events(events: impl Into<Vec<GraphEvent>>) -> Self {
        Self {
            events: events.into(),
        }
    }

    pub fn push(&mut self, event: GraphEvent) {
        self.events.push(event);
    }

    pub fn concat(mut self, other: EventQueue) -> Self {
        self.events.extend(other.events);
        self
    }

    pub fn drain(&mut self) -> impl Iterator<Item = GraphEvent> + '_ {
        self.events.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

use std::ops::Range;

use bevy::reflect::{Reflect, std_traits::ReflectDefault};
use serde::{Deserialize, Serialize};

/// Event data
#[derive(Clone, Debug, Reflect, Serialize, Deserialize, PartialEq, Hash)]
#[reflect(Default)]
pub enum AnimationEvent {
    /// Fires at a single point in time
    StringId(String),
    /// Spans a time range, the sampled percentage tracks progress through it
    Durable(String),
}

impl Default for AnimationEvent {
    fn default() -> Self {
        Self::StringId("".to_string())
    }
}

/// Structure containing a sampled event and relevant metadata
#[derive(Clone, Debug, Reflect, Serialize, Deserialize, PartialEq)]
#[reflect(Default)]
pub struct SampledEvent {
    /// Index of the graph node that sampled the event
    pub source_node: i16,
    /// Event that was sampled
    pub event: AnimationEvent,
    /// Weight of event (is reduced by blending, for example), 0.0 to 1.0
    pub weight: f32,
    /// Percentage of total event duration at sampling time, 0.0 to 1.0
    pub percentage_through: f32,
    /// Cleared when the sampling branch is being blended out
    pub is_from_active_branch: bool,
}

impl Default for SampledEvent {
    fn default() -> Self {
        Self {
            source_node: -1,
            event: AnimationEvent::default(),
            weight: 1.,
            percentage_through: 1.,
            is_from_active_branch: true,
        }
    }
}

/// Events sampled during one update, in sampling order.
///
/// Blend nodes address the events produced by each of their inputs as the index range those
/// inputs appended.
#[derive(Clone, Debug, Default, Reflect)]
pub struct SampledEventsBuffer {
    events: Vec<SampledEvent>,
}

impl SampledEventsBuffer {
    /// Appends a fully weighted event from the active branch and returns it for tweaking.
    pub fn emplace(
        &mut self,
        source_node: i16,
        event: AnimationEvent,
        percentage_through: f32,
    ) -> &mut SampledEvent {
        self.events.push(SampledEvent {
            source_node,
            event,
            percentage_through,
            ..Default::default()
        });
        let last = self.events.len() - 1;
        &mut self.events[last]
    }

    pub fn append(&mut self, other: &SampledEventsBuffer) {
        self.events.extend_from_slice(&other.events);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[SampledEvent] {
        &self.events
    }

    /// Scales the weight of every event in `range`.
    pub fn update_weights(&mut self, range: Range<usize>, weight: f32) {
        for event in &mut self.events[range] {
            event.weight *= weight;
        }
    }

    pub fn set_inactive_branch(&mut self, range: Range<usize>) {
        for event in &mut self.events[range] {
            event.is_from_active_branch = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blending_scales_event_ranges() {
        let mut events = SampledEventsBuffer::default();
        events.emplace(0, AnimationEvent::StringId("step".into()), 0.2);
        events.emplace(0, AnimationEvent::Durable("swing".into()), 0.5);
        let from_second_input = events.len();
        events
            .emplace(1, AnimationEvent::StringId("land".into()), 0.9)
            .weight = 0.5;

        events.update_weights(0..from_second_input, 0.25);
        events.update_weights(from_second_input..events.len(), 0.75);
        events.set_inactive_branch(0..from_second_input);

        let weights: Vec<f32> = events.events().iter().map(|e| e.weight).collect();
        assert_eq!(weights, vec![0.25, 0.25, 0.375]);
        assert!(!events.events()[1].is_from_active_branch);
        assert!(events.events()[2].is_from_active_branch);
        assert_eq!(events.events()[2].source_node, 1);
    }

    #[test]
    fn append_and_clear() {
        let mut child = SampledEventsBuffer::default();
        child.emplace(3, AnimationEvent::default(), 1.);

        let mut events = SampledEventsBuffer::default();
        events.append(&child);
        events.append(&child);
        assert_eq!(events.len(), 2);
        assert_eq!(events.events()[1], child.events()[0]);

        events.clear();
        assert!(events.is_empty());
    }
}

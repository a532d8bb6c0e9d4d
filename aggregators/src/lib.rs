//! Match policies that watch a configured set of messages and decide when a
//! tutorial step has succeeded or failed.

mod counter;
mod error;
mod one_of;
mod sequence;
mod set;
mod slot;

pub use counter::*;
pub use error::*;
pub use one_of::*;
pub use sequence::*;
pub use set::*;
pub use slot::*;

use tutorial_components::{EventMessage, EventMessageState, MatchResult};

pub trait EventAggregator {
    /// Adds one configured message to the policy's state table.
    fn register(&mut self, message: &EventMessage);

    /// Consumes an event. Returns `true` when the event was accepted and
    /// changed the policy's state.
    fn on_event(&mut self, message: &EventMessage) -> bool;

    fn match_result(&self) -> MatchResult;

    /// Returns to `Waiting` with no progress. Configured messages stay.
    fn reset(&mut self);

    /// Appends one state entry per tracked message, in the policy's order.
    fn list_events(&self, enabled: bool, buffer: &mut Vec<EventMessageState>);
}

/// The closed set of match policies.
#[derive(Debug, Clone)]
pub enum Aggregator {
    Sequence(SequenceAggregator),
    Set(SetAggregator),
    Counter(CounterAggregator),
    OneOf(OneOfAggregator),
}

impl Aggregator {
    pub fn kind(&self) -> &'static str {
        match self {
            Aggregator::Sequence(_) => "sequence",
            Aggregator::Set(_) => "set",
            Aggregator::Counter(_) => "counter",
            Aggregator::OneOf(_) => "one_of",
        }
    }
}

impl EventAggregator for Aggregator {
    fn register(&mut self, message: &EventMessage) {
        match self {
            Aggregator::Sequence(a) => a.register(message),
            Aggregator::Set(a) => a.register(message),
            Aggregator::Counter(a) => a.register(message),
            Aggregator::OneOf(a) => a.register(message),
        }
    }

    fn on_event(&mut self, message: &EventMessage) -> bool {
        match self {
            Aggregator::Sequence(a) => a.on_event(message),
            Aggregator::Set(a) => a.on_event(message),
            Aggregator::Counter(a) => a.on_event(message),
            Aggregator::OneOf(a) => a.on_event(message),
        }
    }

    fn match_result(&self) -> MatchResult {
        match self {
            Aggregator::Sequence(a) => a.match_result(),
            Aggregator::Set(a) => a.match_result(),
            Aggregator::Counter(a) => a.match_result(),
            Aggregator::OneOf(a) => a.match_result(),
        }
    }

    fn reset(&mut self) {
        match self {
            Aggregator::Sequence(a) => a.reset(),
            Aggregator::Set(a) => a.reset(),
            Aggregator::Counter(a) => a.reset(),
            Aggregator::OneOf(a) => a.reset(),
        }
    }

    fn list_events(&self, enabled: bool, buffer: &mut Vec<EventMessageState>) {
        match self {
            Aggregator::Sequence(a) => a.list_events(enabled, buffer),
            Aggregator::Set(a) => a.list_events(enabled, buffer),
            Aggregator::Counter(a) => a.list_events(enabled, buffer),
            Aggregator::OneOf(a) => a.list_events(enabled, buffer),
        }
    }
}

impl From<SequenceAggregator> for Aggregator {
    fn from(value: SequenceAggregator) -> Self {
        Aggregator::Sequence(value)
    }
}

impl From<SetAggregator> for Aggregator {
    fn from(value: SetAggregator) -> Self {
        Aggregator::Set(value)
    }
}

impl From<CounterAggregator> for Aggregator {
    fn from(value: CounterAggregator) -> Self {
        Aggregator::Counter(value)
    }
}

impl From<OneOfAggregator> for Aggregator {
    fn from(value: OneOfAggregator) -> Self {
        Aggregator::OneOf(value)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use tutorial_components::{EventMessage, MessageId, StreamId};

    pub fn msg(id: u32) -> EventMessage {
        EventMessage::new(MessageId(id), Some(StreamId(0)), format!("m{id}"), false)
    }

    pub fn loose(id: u32) -> EventMessage {
        EventMessage::new(MessageId(id), Some(StreamId(0)), format!("m{id}"), true)
    }
}

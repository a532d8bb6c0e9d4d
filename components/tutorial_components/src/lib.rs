//! Identity and value types shared by every tutorial crate.
//!
//! Nothing here knows about Bevy. Streams, aggregators and the hub exchange
//! these values by copy or cheap clone.

use {
    serde::{Deserialize, Serialize},
    std::{
        fmt,
        hash::{Hash, Hasher},
        sync::Arc,
    },
};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Position of the owning record inside its arena.
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Handle of a declared event stream.
    StreamId,
    "stream"
);
arena_id!(
    /// Handle of a message allocated by the message catalog.
    MessageId,
    "message"
);
arena_id!(
    /// Handle of an aggregator registered with the hub.
    AggregatorId,
    "aggregator"
);

/// A named tutorial event.
///
/// Two messages are equal when they share the same [`MessageId`]; the name is
/// only used for logs and display. A message without a stream is "unbound":
/// it can be configured on an aggregator but nothing will ever publish it.
#[derive(Clone)]
pub struct EventMessage {
    id: MessageId,
    stream: Option<StreamId>,
    allow_out_of_order: bool,
    name: Arc<str>,
}

impl EventMessage {
    pub fn new(
        id: MessageId,
        stream: Option<StreamId>,
        name: impl Into<Arc<str>>,
        allow_out_of_order: bool,
    ) -> Self {
        Self {
            id,
            stream,
            allow_out_of_order,
            name: name.into(),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    /// The stream that publishes this message, if any.
    pub fn stream(&self) -> Option<StreamId> {
        self.stream
    }

    pub fn is_bound(&self) -> bool {
        self.stream.is_some()
    }

    /// Whether a sequence in out-of-order mode may accept this message early.
    pub fn allow_out_of_order(&self) -> bool {
        self.allow_out_of_order
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for EventMessage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventMessage {}

impl Hash for EventMessage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventMessage")
            .field("id", &self.id.0)
            .field("name", &self.name)
            .field("stream", &self.stream.map(|s| s.0))
            .finish()
    }
}

impl fmt::Display for EventMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Outcome of an aggregator's match.
///
/// Once a match leaves `Waiting` it stays put until an explicit reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    #[default]
    Waiting,
    Success,
    Failure,
}

impl MatchResult {
    pub fn is_waiting(self) -> bool {
        self == MatchResult::Waiting
    }

    pub fn is_terminal(self) -> bool {
        !self.is_waiting()
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchResult::Waiting => "waiting",
            MatchResult::Success => "success",
            MatchResult::Failure => "failure",
        };
        f.write_str(label)
    }
}

/// Snapshot of one configured message as seen by an aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMessageState {
    pub message: EventMessage,
    pub completed: bool,
    /// Advisory: receiving `message` right now would advance the match.
    pub expected_next: bool,
}

impl EventMessageState {
    pub fn new(message: EventMessage, completed: bool, expected_next: bool) -> Self {
        Self {
            message,
            completed,
            expected_next,
        }
    }
}

/// How a recoverable inconsistency is handled.
///
/// `Degrade` logs and keeps going. `FailFast` surfaces the problem as an error
/// to the caller of the operation that detected it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticPolicy {
    #[default]
    Degrade,
    FailFast,
}

impl DiagnosticPolicy {
    pub fn is_fail_fast(self) -> bool {
        self == DiagnosticPolicy::FailFast
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::collections::HashSet};

    fn message(id: u32, name: &str) -> EventMessage {
        EventMessage::new(MessageId(id), Some(StreamId(0)), name, false)
    }

    #[test]
    fn test_message_equality_uses_identity_only() {
        let a = message(1, "open");
        let renamed = message(1, "something else");
        let other = message(2, "open");

        assert_eq!(a, renamed);
        assert_ne!(a, other);

        let set: HashSet<_> = [a, renamed, other].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_unbound_message() {
        let unbound = EventMessage::new(MessageId(7), None, "ghost", false);
        assert!(!unbound.is_bound());
        assert_eq!(unbound.to_string(), "ghost");
    }

    #[test]
    fn test_match_result_terminal_states() {
        assert!(MatchResult::default().is_waiting());
        assert!(MatchResult::Success.is_terminal());
        assert!(MatchResult::Failure.is_terminal());
    }

    #[test]
    fn test_policy_deserialize() {
        let policy: DiagnosticPolicy = ron::from_str("FailFast").unwrap();
        assert!(policy.is_fail_fast());
        assert_eq!(DiagnosticPolicy::default(), DiagnosticPolicy::Degrade);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(StreamId(3).to_string(), "stream#3");
        assert_eq!(AggregatorId::from_index(4).index(), 4);
    }
}

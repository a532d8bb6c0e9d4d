use {
    crate::{Aggregator, AggregatorError, EventAggregator},
    bevy::log::{debug, error},
    tutorial_components::{AggregatorId, EventMessage, EventMessageState, MatchResult, StreamId},
};

/// Result of offering an event to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reception {
    /// The slot already finished its match or does not track the message.
    Ignored,
    /// The policy looked at the event and left its state unchanged.
    Rejected,
    /// The event advanced the match; carries the result after the event.
    Accepted(MatchResult),
}

/// A match policy plus the bookkeeping every aggregator shares: its
/// configured messages, the streams it listens on, whether it is enabled and
/// the message it publishes on success.
#[derive(Debug, Clone)]
pub struct AggregatorSlot {
    id: AggregatorId,
    name: String,
    policy: Aggregator,
    messages: Vec<EventMessage>,
    streams: Vec<StreamId>,
    success_message: Option<EventMessage>,
    enabled: bool,
    debug: bool,
}

impl AggregatorSlot {
    /// Registers `messages` with `policy`.
    ///
    /// Messages without a stream stay configured but are logged, because no
    /// stream will ever deliver them.
    pub fn new(
        id: AggregatorId,
        name: impl Into<String>,
        mut policy: Aggregator,
        messages: Vec<EventMessage>,
        success_message: Option<EventMessage>,
        debug: bool,
    ) -> Result<Self, AggregatorError> {
        let name = name.into();
        if name.is_empty() {
            return Err(AggregatorError::EmptyName);
        }
        if messages.is_empty() {
            return Err(AggregatorError::NoMessages { aggregator: name });
        }

        let mut streams = Vec::new();
        for message in &messages {
            policy.register(message);
            match message.stream() {
                Some(stream) if !streams.contains(&stream) => streams.push(stream),
                Some(_) => {}
                None => error!(
                    aggregator = %name,
                    message = %message,
                    "unable to process message that has no publishing stream"
                ),
            }
        }

        Ok(Self {
            id,
            name,
            policy,
            messages,
            streams,
            success_message,
            enabled: false,
            debug,
        })
    }

    pub fn id(&self) -> AggregatorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &Aggregator {
        &self.policy
    }

    /// Configured messages as given, duplicates and unbound messages included.
    pub fn messages(&self) -> &[EventMessage] {
        &self.messages
    }

    /// Distinct streams of the bound configured messages.
    pub fn streams(&self) -> &[StreamId] {
        &self.streams
    }

    pub fn success_message(&self) -> Option<&EventMessage> {
        self.success_message.as_ref()
    }

    pub fn expects(&self, message: &EventMessage) -> bool {
        self.messages.contains(message)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn match_result(&self) -> MatchResult {
        self.policy.match_result()
    }

    pub fn receive(&mut self, message: &EventMessage) -> Reception {
        if self.policy.match_result().is_terminal() {
            if self.debug {
                debug!(aggregator = %self.name, message = %message, "match finished, ignoring event");
            }
            return Reception::Ignored;
        }
        if !self.expects(message) {
            return Reception::Ignored;
        }

        if !self.policy.on_event(message) {
            if self.debug {
                debug!(aggregator = %self.name, message = %message, "event rejected");
            }
            return Reception::Rejected;
        }

        let result = self.policy.match_result();
        if self.debug {
            debug!(aggregator = %self.name, message = %message, %result, "event accepted");
        }
        Reception::Accepted(result)
    }

    pub fn reset(&mut self) {
        self.policy.reset();
    }

    /// Fills `buffer` with the current per-message state and returns it.
    pub fn list_events<'b>(&self, buffer: &'b mut Vec<EventMessageState>) -> &'b [EventMessageState] {
        buffer.clear();
        buffer.reserve(self.messages.len());
        self.policy.list_events(self.enabled, buffer);
        buffer
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{OneOfAggregator, SequenceAggregator, SequenceMode, test_support::msg},
        tutorial_components::MessageId,
    };

    fn slot(policy: Aggregator, messages: Vec<EventMessage>) -> AggregatorSlot {
        AggregatorSlot::new(AggregatorId(0), "slot", policy, messages, None, false).unwrap()
    }

    #[test]
    fn test_empty_configuration_is_rejected() {
        let err = AggregatorSlot::new(
            AggregatorId(0),
            "empty",
            OneOfAggregator::new().into(),
            Vec::new(),
            None,
            false,
        )
        .unwrap_err();
        assert_eq!(
            err,
            AggregatorError::NoMessages {
                aggregator: "empty".into()
            }
        );
    }

    #[test]
    fn test_unbound_messages_have_no_stream() {
        let ghost = EventMessage::new(MessageId(9), None, "ghost", false);
        let slot = slot(OneOfAggregator::new().into(), vec![msg(0), ghost.clone()]);

        assert_eq!(slot.streams(), &[StreamId(0)]);
        assert!(slot.expects(&ghost));
    }

    #[test]
    fn test_finished_slot_ignores_events() {
        let mut slot = slot(
            SequenceAggregator::new(SequenceMode::Lenient).into(),
            vec![msg(0)],
        );

        assert_eq!(slot.receive(&msg(0)), Reception::Accepted(MatchResult::Success));
        assert_eq!(slot.receive(&msg(0)), Reception::Ignored);

        slot.reset();
        assert_eq!(slot.match_result(), MatchResult::Waiting);
    }

    #[test]
    fn test_untracked_and_rejected_events() {
        let mut slot = slot(
            SequenceAggregator::new(SequenceMode::Lenient).into(),
            vec![msg(0), msg(1)],
        );

        assert_eq!(slot.receive(&msg(5)), Reception::Ignored);
        assert_eq!(slot.receive(&msg(1)), Reception::Rejected);
        assert_eq!(slot.receive(&msg(0)), Reception::Accepted(MatchResult::Waiting));
    }

    #[test]
    fn test_list_events_uses_enabled_flag() {
        let mut slot = slot(
            SequenceAggregator::new(SequenceMode::Lenient).into(),
            vec![msg(0), msg(1)],
        );
        let mut buffer = vec![EventMessageState::new(msg(7), true, true)];

        let states = slot.list_events(&mut buffer);
        assert_eq!(states.len(), 2);
        assert!(states.iter().all(|s| !s.expected_next));

        slot.set_enabled(true);
        assert!(slot.list_events(&mut buffer)[0].expected_next);
    }
}

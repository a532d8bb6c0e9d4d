use {
    crate::{AggregatorError, EventAggregator},
    std::collections::HashSet,
    tutorial_components::{EventMessage, EventMessageState, MatchResult, MessageId},
};

/// Counts any message from a pool and succeeds at the target count.
#[derive(Debug, Clone)]
pub struct CounterAggregator {
    target: u32,
    count: u32,
    messages: Vec<EventMessage>,
    pool: HashSet<MessageId>,
    result: MatchResult,
}

impl CounterAggregator {
    pub fn new(target: u32) -> Result<Self, AggregatorError> {
        if target == 0 {
            return Err(AggregatorError::InvalidTarget { target });
        }
        Ok(Self {
            target,
            count: 0,
            messages: Vec::new(),
            pool: HashSet::new(),
            result: MatchResult::Waiting,
        })
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl EventAggregator for CounterAggregator {
    fn register(&mut self, message: &EventMessage) {
        self.messages.push(message.clone());
        self.pool.insert(message.id());
    }

    fn on_event(&mut self, message: &EventMessage) -> bool {
        if !self.pool.contains(&message.id()) {
            return false;
        }
        self.count += 1;
        if self.count == self.target {
            self.result = MatchResult::Success;
        }
        true
    }

    fn match_result(&self) -> MatchResult {
        self.result
    }

    fn reset(&mut self) {
        self.count = 0;
        self.result = MatchResult::Waiting;
    }

    /// Lists the configured messages as given, duplicates included.
    fn list_events(&self, enabled: bool, buffer: &mut Vec<EventMessageState>) {
        let completed = self.result == MatchResult::Success;
        let expected = enabled && self.result.is_waiting();
        buffer.extend(
            self.messages
                .iter()
                .map(|message| EventMessageState::new(message.clone(), completed, expected)),
        );
    }
}

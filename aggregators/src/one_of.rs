use {
    crate::EventAggregator,
    tutorial_components::{EventMessage, EventMessageState, MatchResult},
};

/// Succeeds on the first configured message it receives.
#[derive(Debug, Clone, Default)]
pub struct OneOfAggregator {
    messages: Vec<EventMessage>,
    matched: u32,
    result: MatchResult,
}

impl OneOfAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventAggregator for OneOfAggregator {
    fn register(&mut self, message: &EventMessage) {
        if !self.messages.contains(message) {
            self.messages.push(message.clone());
        }
    }

    fn on_event(&mut self, message: &EventMessage) -> bool {
        if self.matched > 0 || !self.messages.contains(message) {
            return false;
        }
        self.matched += 1;
        self.result = MatchResult::Success;
        true
    }

    fn match_result(&self) -> MatchResult {
        self.result
    }

    fn reset(&mut self) {
        self.matched = 0;
        self.result = MatchResult::Waiting;
    }

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

#[cfg(test)]
mod tests {
    use {super::*, crate::test_support::msg};

    #[test]
    fn test_first_pooled_message_wins() {
        let mut one_of = OneOfAggregator::new();
        for m in [msg(0), msg(1), msg(1)] {
            one_of.register(&m);
        }

        assert!(!one_of.on_event(&msg(7)));
        assert!(one_of.on_event(&msg(1)));
        assert_eq!(one_of.match_result(), MatchResult::Success);
        assert!(!one_of.on_event(&msg(0)));

        let mut buffer = Vec::new();
        one_of.list_events(true, &mut buffer);
        assert_eq!(buffer.len(), 2);
        assert!(buffer.iter().all(|s| s.completed && !s.expected_next));
    }

    #[test]
    fn test_reset_allows_another_match() {
        let mut one_of = OneOfAggregator::new();
        one_of.register(&msg(0));
        one_of.on_event(&msg(0));

        one_of.reset();
        assert!(one_of.on_event(&msg(0)));
    }
}

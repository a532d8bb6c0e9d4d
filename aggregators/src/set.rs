use {
    crate::EventAggregator,
    serde::{Deserialize, Serialize},
    tutorial_components::{EventMessage, EventMessageState, MatchResult},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetMode {
    /// Repeats of an already-seen message are ignored.
    #[default]
    Lenient,
    /// A repeated message fails the match.
    Strict,
}

/// Succeeds once every distinct configured message has been seen, in any order.
#[derive(Debug, Clone, Default)]
pub struct SetAggregator {
    mode: SetMode,
    messages: Vec<EventMessage>,
    seen: Vec<bool>,
    seen_count: usize,
    result: MatchResult,
}

impl SetAggregator {
    pub fn new(mode: SetMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> SetMode {
        self.mode
    }

    pub fn seen_count(&self) -> usize {
        self.seen_count
    }
}

impl EventAggregator for SetAggregator {
    fn register(&mut self, message: &EventMessage) {
        // duplicates collapse into one entry
        if self.messages.contains(message) {
            return;
        }
        self.messages.push(message.clone());
        self.seen.push(false);
    }

    fn on_event(&mut self, message: &EventMessage) -> bool {
        if self.seen_count == self.messages.len() {
            return false;
        }
        let Some(idx) = self.messages.iter().position(|m| m == message) else {
            return false;
        };

        if self.seen[idx] {
            return match self.mode {
                SetMode::Strict => {
                    self.result = MatchResult::Failure;
                    true
                }
                SetMode::Lenient => false,
            };
        }

        self.seen[idx] = true;
        self.seen_count += 1;
        if self.seen_count == self.messages.len() {
            self.result = MatchResult::Success;
        }
        true
    }

    fn match_result(&self) -> MatchResult {
        self.result
    }

    fn reset(&mut self) {
        self.seen.fill(false);
        self.seen_count = 0;
        self.result = MatchResult::Waiting;
    }

    fn list_events(&self, enabled: bool, buffer: &mut Vec<EventMessageState>) {
        let waiting = self.result.is_waiting();
        buffer.extend(self.messages.iter().zip(&self.seen).map(|(message, &seen)| {
            EventMessageState::new(message.clone(), seen, enabled && waiting && !seen)
        }));
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::test_support::msg};

    fn set(mode: SetMode, messages: &[EventMessage]) -> SetAggregator {
        let mut aggregator = SetAggregator::new(mode);
        for message in messages {
            aggregator.register(message);
        }
        aggregator
    }

    #[test]
    fn test_any_order_succeeds() {
        let mut set = set(SetMode::Lenient, &[msg(0), msg(1), msg(2)]);

        assert!(set.on_event(&msg(2)));
        assert!(set.on_event(&msg(0)));
        assert_eq!(set.match_result(), MatchResult::Waiting);
        assert!(set.on_event(&msg(1)));
        assert_eq!(set.match_result(), MatchResult::Success);
        assert!(!set.on_event(&msg(1)));
    }

    #[test]
    fn test_duplicate_configuration_collapses() {
        let mut set = set(SetMode::Lenient, &[msg(0), msg(0), msg(1)]);

        let mut buffer = Vec::new();
        set.list_events(true, &mut buffer);
        assert_eq!(buffer.len(), 2);

        set.on_event(&msg(0));
        set.on_event(&msg(1));
        assert_eq!(set.match_result(), MatchResult::Success);
    }

    #[test]
    fn test_lenient_repeat_is_ignored() {
        let mut set = set(SetMode::Lenient, &[msg(0), msg(1)]);

        assert!(set.on_event(&msg(0)));
        assert!(!set.on_event(&msg(0)));
        assert_eq!(set.match_result(), MatchResult::Waiting);
    }

    #[test]
    fn test_strict_repeat_fails() {
        let mut set = set(SetMode::Strict, &[msg(0), msg(1)]);

        set.on_event(&msg(0));
        assert!(set.on_event(&msg(0)));
        assert_eq!(set.match_result(), MatchResult::Failure);
    }

    #[test]
    fn test_unknown_message_is_rejected() {
        let mut set = set(SetMode::Strict, &[msg(0)]);
        assert!(!set.on_event(&msg(9)));
        assert_eq!(set.match_result(), MatchResult::Waiting);
    }

    #[test]
    fn test_expected_lists_unseen_messages() {
        let mut set = set(SetMode::Lenient, &[msg(0), msg(1)]);
        set.on_event(&msg(1));

        let mut buffer = Vec::new();
        set.list_events(true, &mut buffer);
        let flags: Vec<_> = buffer
            .iter()
            .map(|s| (s.completed, s.expected_next))
            .collect();
        assert_eq!(flags, vec![(false, true), (true, false)]);
    }
}

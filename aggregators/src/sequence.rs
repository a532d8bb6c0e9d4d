use {
    crate::EventAggregator,
    serde::{Deserialize, Serialize},
    tutorial_components::{EventMessage, EventMessageState, MatchResult},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceMode {
    /// Unexpected events are ignored.
    #[default]
    Lenient,
    /// Messages flagged `allow_out_of_order` that follow the expected one may
    /// be matched early.
    AllowOutOfOrder,
    /// Any unexpected configured event fails the match.
    Strict,
}

/// Matches configured messages in order.
#[derive(Debug, Clone, Default)]
pub struct SequenceAggregator {
    mode: SequenceMode,
    messages: Vec<EventMessage>,
    seen: Vec<bool>,
    next: usize,
    result: MatchResult,
}

impl SequenceAggregator {
    pub fn new(mode: SequenceMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> SequenceMode {
        self.mode
    }

    /// Index of the message the sequence is waiting for.
    pub fn next_index(&self) -> usize {
        self.next
    }

    fn find_next_open(&self) -> usize {
        (self.next + 1..self.messages.len())
            .find(|&idx| !self.seen[idx])
            .unwrap_or(self.messages.len())
    }

    fn accept_out_of_order(&mut self, message: &EventMessage) -> bool {
        for idx in self.next + 1..self.messages.len() {
            let candidate = &self.messages[idx];
            if !candidate.allow_out_of_order() {
                break;
            }
            if candidate == message && !self.seen[idx] {
                self.seen[idx] = true;
                return true;
            }
        }
        false
    }
}

impl EventAggregator for SequenceAggregator {
    fn register(&mut self, message: &EventMessage) {
        self.messages.push(message.clone());
        self.seen.push(false);
    }

    fn on_event(&mut self, message: &EventMessage) -> bool {
        if self.next >= self.messages.len() {
            return false;
        }

        if *message == self.messages[self.next] {
            self.seen[self.next] = true;
            self.next = self.find_next_open();
            if self.next == self.messages.len() {
                self.result = MatchResult::Success;
            }
            return true;
        }

        match self.mode {
            SequenceMode::AllowOutOfOrder => self.accept_out_of_order(message),
            SequenceMode::Strict => {
                self.result = MatchResult::Failure;
                true
            }
            SequenceMode::Lenient => false,
        }
    }

    fn match_result(&self) -> MatchResult {
        self.result
    }

    fn reset(&mut self) {
        self.seen.fill(false);
        self.next = 0;
        self.result = MatchResult::Waiting;
    }

    fn list_events(&self, enabled: bool, buffer: &mut Vec<EventMessageState>) {
        let waiting = self.result.is_waiting();
        buffer.extend(self.messages.iter().enumerate().map(|(idx, message)| {
            EventMessageState::new(
                message.clone(),
                self.seen[idx],
                enabled && waiting && idx == self.next,
            )
        }));
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::{loose, msg},
    };

    fn sequence(mode: SequenceMode, messages: &[EventMessage]) -> SequenceAggregator {
        let mut aggregator = SequenceAggregator::new(mode);
        for message in messages {
            aggregator.register(message);
        }
        aggregator
    }

    fn expected(aggregator: &SequenceAggregator) -> Vec<bool> {
        let mut buffer = Vec::new();
        aggregator.list_events(true, &mut buffer);
        buffer.iter().map(|s| s.expected_next).collect()
    }

    #[test]
    fn test_in_order_sequence_succeeds() {
        let mut seq = sequence(SequenceMode::Lenient, &[msg(0), msg(1), msg(2)]);

        assert!(seq.on_event(&msg(0)));
        assert!(seq.on_event(&msg(1)));
        assert_eq!(seq.match_result(), MatchResult::Waiting);
        assert!(seq.on_event(&msg(2)));
        assert_eq!(seq.match_result(), MatchResult::Success);
        assert!(!seq.on_event(&msg(0)));
    }

    #[test]
    fn test_lenient_ignores_unexpected() {
        let mut seq = sequence(SequenceMode::Lenient, &[msg(0), msg(1)]);

        assert!(!seq.on_event(&msg(1)));
        assert_eq!(seq.next_index(), 0);
        assert_eq!(seq.match_result(), MatchResult::Waiting);
    }

    #[test]
    fn test_strict_fails_on_unexpected() {
        let mut seq = sequence(SequenceMode::Strict, &[msg(0), msg(1)]);

        assert!(seq.on_event(&msg(1)));
        assert_eq!(seq.match_result(), MatchResult::Failure);
        assert_eq!(expected(&seq), vec![false, false]);
    }

    #[test]
    fn test_out_of_order_accepts_flagged_messages() {
        let mut seq = sequence(
            SequenceMode::AllowOutOfOrder,
            &[msg(0), loose(1), loose(2), msg(3)],
        );

        assert!(seq.on_event(&loose(2)));
        assert_eq!(seq.next_index(), 0);

        assert!(seq.on_event(&msg(0)));
        assert_eq!(seq.next_index(), 1);

        assert!(seq.on_event(&loose(1)));
        assert_eq!(seq.next_index(), 3, "already-seen entries are skipped");

        assert!(seq.on_event(&msg(3)));
        assert_eq!(seq.match_result(), MatchResult::Success);
    }

    #[test]
    fn test_out_of_order_scan_stops_at_strict_message() {
        let mut seq = sequence(
            SequenceMode::AllowOutOfOrder,
            &[msg(0), msg(1), loose(2)],
        );

        assert!(!seq.on_event(&loose(2)));
        assert!(!seq.on_event(&loose(2)));
        assert_eq!(seq.match_result(), MatchResult::Waiting);
    }

    #[test]
    fn test_out_of_order_duplicate_is_rejected() {
        let mut seq = sequence(SequenceMode::AllowOutOfOrder, &[msg(0), loose(1)]);

        assert!(seq.on_event(&loose(1)));
        assert!(!seq.on_event(&loose(1)));
    }

    #[test]
    fn test_expected_tracks_next_index() {
        let mut seq = sequence(SequenceMode::Lenient, &[msg(0), msg(1)]);
        assert_eq!(expected(&seq), vec![true, false]);

        seq.on_event(&msg(0));
        assert_eq!(expected(&seq), vec![false, true]);

        let mut disabled = Vec::new();
        seq.list_events(false, &mut disabled);
        assert!(disabled.iter().all(|s| !s.expected_next));
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut seq = sequence(SequenceMode::Lenient, &[msg(0)]);
        seq.on_event(&msg(0));
        assert_eq!(seq.match_result(), MatchResult::Success);

        seq.reset();
        assert_eq!(seq.match_result(), MatchResult::Waiting);
        assert_eq!(seq.next_index(), 0);
        assert!(seq.on_event(&msg(0)));
    }

    #[test]
    fn test_mode_from_ron() {
        let mode: SequenceMode = ron::from_str("AllowOutOfOrder").unwrap();
        assert_eq!(mode, SequenceMode::AllowOutOfOrder);
    }
}

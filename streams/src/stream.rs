use {
    crate::{MessageCatalog, StreamError},
    bevy::log::{debug, error},
    std::{collections::VecDeque, fmt},
    tutorial_components::{AggregatorId, DiagnosticPolicy, EventMessage, StreamId},
};

/// Handle of a plain listener attached directly to a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamListenerId(pub u32);

impl fmt::Display for StreamListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-listener#{}", self.0)
    }
}

/// Something that receives every message a stream delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subscriber {
    Aggregator(AggregatorId),
    Listener(StreamListenerId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSpec {
    pub name: String,
    pub allow_out_of_order: bool,
}

impl MessageSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allow_out_of_order: false,
        }
    }

    pub fn out_of_order(mut self) -> Self {
        self.allow_out_of_order = true;
        self
    }
}

/// Declaration of a stream and the messages it publishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSpec {
    pub name: String,
    pub messages: Vec<MessageSpec>,
    /// Messages of this stream never light up next-event indicators.
    pub ignore_for_next_event_hint: bool,
    pub debug: bool,
}

impl StreamSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: MessageSpec) -> Self {
        self.messages.push(message);
        self
    }

    /// Adds plain in-order messages by name.
    pub fn with_messages<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.messages.extend(names.into_iter().map(MessageSpec::new));
        self
    }

    pub fn ignored_for_hints(mut self) -> Self {
        self.ignore_for_next_event_hint = true;
        self
    }

    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Checks names without touching any catalog.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.name.is_empty() {
            return Err(StreamError::EmptyStreamName);
        }
        for (index, message) in self.messages.iter().enumerate() {
            if message.name.is_empty() {
                return Err(StreamError::EmptyMessageName {
                    stream: self.name.clone(),
                });
            }
            if self.messages[..index].iter().any(|m| m.name == message.name) {
                return Err(StreamError::DuplicateMessage {
                    stream: self.name.clone(),
                    message: message.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// What a stream decided to do with a published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The message does not belong to this stream.
    Ignored,
    /// A cascade is running; the message waits in the queue.
    Queued,
    /// A cascade is running and its limit is reached.
    Dropped,
    /// No cascade is running; the caller must deliver the message, drain the
    /// queue with [`EventStream::next_queued`] and then call
    /// [`EventStream::finish`].
    Dispatch,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    pub delivered: usize,
    pub dropped: usize,
}

/// A named channel of messages with a re-entrancy guard.
///
/// While a message is being delivered, further publishes on the same stream
/// are queued and delivered in FIFO order once the current delivery returns.
/// One cascade delivers at most `cascade_limit` messages.
#[derive(Debug)]
pub struct EventStream {
    id: StreamId,
    name: String,
    messages: Vec<EventMessage>,
    ignore_for_next_event_hint: bool,
    debug: bool,
    subscribers: Vec<Subscriber>,
    queue: VecDeque<EventMessage>,
    processing: bool,
    cascade_limit: usize,
    overflow_policy: DiagnosticPolicy,
    delivered: usize,
    dropped: usize,
}

impl EventStream {
    /// Validates `spec` and allocates one catalog entry per declared message.
    pub fn declare(
        id: StreamId,
        spec: &StreamSpec,
        catalog: &mut MessageCatalog,
        cascade_limit: usize,
        overflow_policy: DiagnosticPolicy,
    ) -> Result<Self, StreamError> {
        spec.validate()?;
        if cascade_limit == 0 {
            return Err(StreamError::InvalidCascadeLimit);
        }

        let messages = spec
            .messages
            .iter()
            .map(|m| catalog.allocate(id, &m.name, m.allow_out_of_order))
            .collect();

        Ok(Self {
            id,
            name: spec.name.clone(),
            messages,
            ignore_for_next_event_hint: spec.ignore_for_next_event_hint,
            debug: spec.debug,
            subscribers: Vec::new(),
            queue: VecDeque::new(),
            processing: false,
            cascade_limit,
            overflow_policy,
            delivered: 0,
            dropped: 0,
        })
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared messages in declaration order.
    pub fn messages(&self) -> &[EventMessage] {
        &self.messages
    }

    pub fn message(&self, name: &str) -> Option<&EventMessage> {
        self.messages.iter().find(|m| m.name() == name)
    }

    pub fn is_valid_message(&self, message: &EventMessage) -> bool {
        message.stream() == Some(self.id) && self.messages.contains(message)
    }

    pub fn ignore_for_next_event_hint(&self) -> bool {
        self.ignore_for_next_event_hint
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn cascade_limit(&self) -> usize {
        self.cascade_limit
    }

    pub fn subscribers(&self) -> &[Subscriber] {
        &self.subscribers
    }

    /// Returns `false` if `subscriber` was already present.
    pub fn subscribe(&mut self, subscriber: Subscriber) -> bool {
        if self.subscribers.contains(&subscriber) {
            return false;
        }
        self.subscribers.push(subscriber);
        true
    }

    pub fn unsubscribe(&mut self, subscriber: Subscriber) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| *s != subscriber);
        before != self.subscribers.len()
    }

    /// Entry point of a publish.
    pub fn admit(&mut self, message: &EventMessage) -> Admission {
        if message.stream() != Some(self.id) {
            return Admission::Ignored;
        }

        if self.processing {
            if self.delivered + self.queue.len() >= self.cascade_limit {
                self.dropped += 1;
                error!(
                    stream = %self.name,
                    message = %message,
                    limit = self.cascade_limit,
                    "cascade limit reached, dropping message"
                );
                return Admission::Dropped;
            }
            if self.debug {
                debug!(stream = %self.name, message = %message, "queue message");
            }
            self.queue.push_back(message.clone());
            return Admission::Queued;
        }

        if self.debug {
            debug!(stream = %self.name, message = %message, "begin cascade");
        }
        self.processing = true;
        self.delivered = 1;
        self.dropped = 0;
        Admission::Dispatch
    }

    /// Pops the next queued message of the running cascade.
    pub fn next_queued(&mut self) -> Option<EventMessage> {
        if !self.processing || self.delivered >= self.cascade_limit {
            return None;
        }
        let message = self.queue.pop_front()?;
        self.delivered += 1;
        Some(message)
    }

    /// Ends the running cascade. Anything still queued is discarded.
    pub fn finish(&mut self) -> CascadeSummary {
        if !self.queue.is_empty() {
            error!(
                stream = %self.name,
                remaining = self.queue.len(),
                "discarding queued messages at end of cascade"
            );
            self.dropped += self.queue.len();
            self.queue.clear();
        }
        self.processing = false;

        let summary = CascadeSummary {
            delivered: self.delivered,
            dropped: self.dropped,
        };
        if self.debug {
            debug!(
                stream = %self.name,
                delivered = summary.delivered,
                dropped = summary.dropped,
                "end cascade"
            );
        }
        summary
    }

    /// Applies the overflow policy to a finished cascade.
    pub fn check_cascade(&self, summary: &CascadeSummary) -> Result<(), StreamError> {
        if summary.dropped > 0 && self.overflow_policy.is_fail_fast() {
            return Err(StreamError::CascadeOverflow {
                stream: self.name.clone(),
                limit: self.cascade_limit,
                dropped: summary.dropped,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(limit: usize, policy: DiagnosticPolicy) -> (EventStream, MessageCatalog) {
        let mut catalog = MessageCatalog::new();
        let spec = StreamSpec::new("player").with_messages(["open", "close"]);
        let stream = EventStream::declare(StreamId(0), &spec, &mut catalog, limit, policy).unwrap();
        (stream, catalog)
    }

    /// Runs one cascade where every delivery asks for `echo` more publishes.
    fn run_cascade(stream: &mut EventStream, echo: usize) -> (CascadeSummary, usize) {
        let open = stream.message("open").unwrap().clone();
        assert_eq!(stream.admit(&open), Admission::Dispatch);

        let mut deliveries = 1;
        for _ in 0..echo {
            stream.admit(&open);
        }
        while stream.next_queued().is_some() {
            deliveries += 1;
            for _ in 0..echo {
                stream.admit(&open);
            }
        }
        (stream.finish(), deliveries)
    }

    #[test]
    fn test_declare_rejects_duplicates() {
        let mut catalog = MessageCatalog::new();
        let spec = StreamSpec::new("player").with_messages(["open", "open"]);
        let err = EventStream::declare(
            StreamId(0),
            &spec,
            &mut catalog,
            10,
            DiagnosticPolicy::Degrade,
        )
        .unwrap_err();

        assert_eq!(
            err,
            StreamError::DuplicateMessage {
                stream: "player".into(),
                message: "open".into()
            }
        );
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_validate_names() {
        assert_eq!(
            StreamSpec::new("").validate(),
            Err(StreamError::EmptyStreamName)
        );
        assert_eq!(
            StreamSpec::new("player").with_messages([""]).validate(),
            Err(StreamError::EmptyMessageName {
                stream: "player".into()
            })
        );
        assert!(StreamSpec::new("player").with_messages(["open", "close"]).validate().is_ok());
    }

    #[test]
    fn test_foreign_message_is_ignored() {
        let (mut stream, mut catalog) = stream(10, DiagnosticPolicy::Degrade);
        let foreign = catalog.allocate(StreamId(9), "open", false);

        assert_eq!(stream.admit(&foreign), Admission::Ignored);
        assert!(!stream.is_processing());
        assert!(!stream.is_valid_message(&foreign));
    }

    #[test]
    fn test_reentrant_publish_is_queued_in_order() {
        let (mut stream, _) = stream(10, DiagnosticPolicy::Degrade);
        let open = stream.message("open").unwrap().clone();
        let close = stream.message("close").unwrap().clone();

        assert_eq!(stream.admit(&open), Admission::Dispatch);
        assert_eq!(stream.admit(&close), Admission::Queued);
        assert_eq!(stream.admit(&open), Admission::Queued);

        assert_eq!(stream.next_queued(), Some(close));
        assert_eq!(stream.next_queued(), Some(open));
        assert_eq!(stream.next_queued(), None);
        assert_eq!(
            stream.finish(),
            CascadeSummary {
                delivered: 3,
                dropped: 0
            }
        );
        assert!(!stream.is_processing());
    }

    #[test]
    fn test_cascade_delivers_exactly_the_limit() {
        let (mut stream, _) = stream(250, DiagnosticPolicy::Degrade);

        let (summary, deliveries) = run_cascade(&mut stream, 1);

        assert_eq!(deliveries, 250);
        assert_eq!(summary.delivered, 250);
        assert_eq!(summary.dropped, 1);
        assert!(stream.check_cascade(&summary).is_ok());
    }

    #[test]
    fn test_fail_fast_reports_overflow() {
        let (mut stream, _) = stream(5, DiagnosticPolicy::FailFast);

        let (summary, _) = run_cascade(&mut stream, 2);

        assert!(matches!(
            stream.check_cascade(&summary),
            Err(StreamError::CascadeOverflow { limit: 5, .. })
        ));
    }

    #[test]
    fn test_counters_reset_between_cascades() {
        let (mut stream, _) = stream(3, DiagnosticPolicy::Degrade);
        run_cascade(&mut stream, 1);

        let (summary, deliveries) = run_cascade(&mut stream, 0);
        assert_eq!(deliveries, 1);
        assert_eq!(summary.dropped, 0);
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let (mut stream, _) = stream(10, DiagnosticPolicy::Degrade);
        let sub = Subscriber::Aggregator(AggregatorId(0));

        assert!(stream.subscribe(sub));
        assert!(!stream.subscribe(sub));
        assert_eq!(stream.subscribers().len(), 1);
        assert!(stream.unsubscribe(sub));
        assert!(!stream.unsubscribe(sub));
    }
}

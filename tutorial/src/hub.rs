use {
    crate::{
        AggregatorListener, HubCommand, HubCommands, HubNotification, ListenerContext, ListenerId,
        ListenerScope, StreamContext, StreamListener,
    },
    aggregators::{Aggregator, AggregatorError, AggregatorSlot, Reception},
    bevy::{
        log::{debug, error, info, warn},
        prelude::Resource,
    },
    serde::{Deserialize, Serialize},
    std::collections::{HashMap, VecDeque},
    streams::{
        Admission, DEFAULT_CASCADE_LIMIT, EventStream, MessageCatalog, StreamError,
        StreamListenerId, StreamSpec, Subscriber,
    },
    thiserror::Error,
    tutorial_components::{
        AggregatorId, DiagnosticPolicy, EventMessage, EventMessageState, MatchResult, StreamId,
    },
};

pub const DEFAULT_JOURNAL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HubConfig {
    /// Messages one cascade may deliver per stream, the initial one included.
    pub cascade_limit: usize,
    pub overflow_policy: DiagnosticPolicy,
    /// Notifications kept until drained. Zero disables the journal.
    pub journal_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            cascade_limit: DEFAULT_CASCADE_LIMIT,
            overflow_policy: DiagnosticPolicy::Degrade,
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
        }
    }
}

impl HubConfig {
    pub fn from_ron_str(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
    #[error("stream '{0}' is already declared")]
    DuplicateStream(String),
    #[error("aggregator '{0}' is already declared")]
    DuplicateAggregator(String),
    #[error("unknown {0}")]
    UnknownStream(StreamId),
    #[error("unknown stream '{0}'")]
    UnknownStreamName(String),
    #[error("stream '{stream}' does not declare message '{message}'")]
    UnknownMessage { stream: String, message: String },
    #[error("unknown {0}")]
    UnknownAggregator(AggregatorId),
    #[error("unknown aggregator '{0}'")]
    UnknownAggregatorName(String),
    #[error("unknown listener {0:?}")]
    UnknownListener(ListenerId),
    #[error("unknown {0}")]
    UnknownStreamListener(StreamListenerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The message has no stream or belongs to another stream.
    Ignored,
    /// Delivered later by the cascade already running on the stream.
    Queued,
    /// The running cascade already delivered its limit.
    Dropped,
    /// A new cascade ran to completion.
    Dispatched { delivered: usize, dropped: usize },
}

/// Declaration of an aggregator for [`TutorialHub::add_aggregator`].
#[derive(Debug, Clone)]
pub struct AggregatorSpec {
    pub name: String,
    pub policy: Aggregator,
    pub messages: Vec<EventMessage>,
    pub success_message: Option<EventMessage>,
    pub enabled: bool,
    pub debug: bool,
}

impl AggregatorSpec {
    pub fn new(
        name: impl Into<String>,
        policy: impl Into<Aggregator>,
        messages: impl IntoIterator<Item = EventMessage>,
    ) -> Self {
        Self {
            name: name.into(),
            policy: policy.into(),
            messages: messages.into_iter().collect(),
            success_message: None,
            enabled: true,
            debug: false,
        }
    }

    pub fn with_success(mut self, message: EventMessage) -> Self {
        self.success_message = Some(message);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }
}

struct ListenerEntry {
    scope: ListenerScope,
    /// `None` once removed, and while the listener runs.
    listener: Option<Box<dyn AggregatorListener>>,
}

struct StreamListenerEntry {
    stream: StreamId,
    listener: Option<Box<dyn StreamListener>>,
}

/// Owns every stream, aggregator and listener of the tutorial system and
/// routes published messages between them.
#[derive(Resource)]
pub struct TutorialHub {
    config: HubConfig,
    catalog: MessageCatalog,
    streams: Vec<EventStream>,
    stream_names: HashMap<String, StreamId>,
    aggregators: Vec<AggregatorSlot>,
    aggregator_names: HashMap<String, AggregatorId>,
    listeners: Vec<ListenerEntry>,
    stream_listeners: Vec<StreamListenerEntry>,
    journal: VecDeque<HubNotification>,
    journal_overflowed: bool,
    publish_depth: usize,
    deferred_error: Option<StreamError>,
}

impl Default for TutorialHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

impl TutorialHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            catalog: MessageCatalog::new(),
            streams: Vec::new(),
            stream_names: HashMap::new(),
            aggregators: Vec::new(),
            aggregator_names: HashMap::new(),
            listeners: Vec::new(),
            stream_listeners: Vec::new(),
            journal: VecDeque::new(),
            journal_overflowed: false,
            publish_depth: 0,
            deferred_error: None,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    // --- declaration ---

    pub fn add_stream(&mut self, spec: StreamSpec) -> Result<StreamId, HubError> {
        if self.stream_names.contains_key(&spec.name) {
            return Err(HubError::DuplicateStream(spec.name));
        }
        let id = StreamId::from_index(self.streams.len());
        let stream = EventStream::declare(
            id,
            &spec,
            &mut self.catalog,
            self.config.cascade_limit,
            self.config.overflow_policy,
        )?;
        debug!(stream = %spec.name, messages = spec.messages.len(), "declared stream");
        self.stream_names.insert(spec.name, id);
        self.streams.push(stream);
        Ok(id)
    }

    /// Allocates a message that no stream publishes.
    pub fn declare_unbound_message(&mut self, name: &str) -> EventMessage {
        self.catalog.allocate_unbound(name)
    }

    /// Registers an aggregator and enables it unless `spec` says otherwise.
    pub fn add_aggregator(&mut self, spec: AggregatorSpec) -> Result<AggregatorId, HubError> {
        let AggregatorSpec {
            name,
            policy,
            messages,
            success_message,
            enabled,
            debug,
        } = spec;
        if self.aggregator_names.contains_key(&name) {
            return Err(HubError::DuplicateAggregator(name));
        }

        let id = AggregatorId::from_index(self.aggregators.len());
        let slot = AggregatorSlot::new(id, name.clone(), policy, messages, success_message, debug)?;
        debug!(aggregator = %name, kind = slot.policy().kind(), "registered aggregator");
        self.aggregators.push(slot);
        self.aggregator_names.insert(name, id);

        if enabled {
            self.enable(id)?;
        }
        Ok(id)
    }

    // --- lookup ---

    pub fn catalog(&self) -> &MessageCatalog {
        &self.catalog
    }

    pub fn streams(&self) -> &[EventStream] {
        &self.streams
    }

    pub fn stream(&self, id: StreamId) -> Option<&EventStream> {
        self.streams.get(id.index())
    }

    pub fn stream_by_name(&self, name: &str) -> Option<&EventStream> {
        self.stream_names.get(name).and_then(|id| self.stream(*id))
    }

    /// Looks up a declared message by stream and message name.
    pub fn message(&self, stream: &str, message: &str) -> Option<&EventMessage> {
        self.stream_by_name(stream)?.message(message)
    }

    /// Whether `message` comes from a stream excluded from next-event hints.
    pub fn is_hint_ignored(&self, message: &EventMessage) -> bool {
        message
            .stream()
            .and_then(|id| self.stream(id))
            .is_some_and(EventStream::ignore_for_next_event_hint)
    }

    pub fn aggregators(&self) -> &[AggregatorSlot] {
        &self.aggregators
    }

    pub fn aggregator(&self, id: AggregatorId) -> Option<&AggregatorSlot> {
        self.aggregators.get(id.index())
    }

    pub fn aggregator_id(&self, name: &str) -> Option<AggregatorId> {
        self.aggregator_names.get(name).copied()
    }

    pub fn aggregator_by_name(&self, name: &str) -> Option<&AggregatorSlot> {
        self.aggregator_id(name).and_then(|id| self.aggregator(id))
    }

    pub fn match_result(&self, id: AggregatorId) -> Result<MatchResult, HubError> {
        Ok(self.slot(id)?.match_result())
    }

    pub fn list_events<'b>(
        &self,
        id: AggregatorId,
        buffer: &'b mut Vec<EventMessageState>,
    ) -> Result<&'b [EventMessageState], HubError> {
        Ok(self.slot(id)?.list_events(buffer))
    }

    fn slot(&self, id: AggregatorId) -> Result<&AggregatorSlot, HubError> {
        self.aggregators
            .get(id.index())
            .ok_or(HubError::UnknownAggregator(id))
    }

    fn slot_mut(&mut self, id: AggregatorId) -> Result<&mut AggregatorSlot, HubError> {
        self.aggregators
            .get_mut(id.index())
            .ok_or(HubError::UnknownAggregator(id))
    }

    // --- lifecycle ---

    /// Subscribes the aggregator to its streams and starts its match.
    pub fn enable(&mut self, id: AggregatorId) -> Result<(), HubError> {
        let slot = self.slot_mut(id)?;
        if slot.is_enabled() {
            return Ok(());
        }
        slot.set_enabled(true);
        debug!(aggregator = %slot.name(), "enabled");

        let streams = slot.streams().to_vec();
        for stream in streams {
            self.streams[stream.index()].subscribe(Subscriber::Aggregator(id));
        }
        self.notify(HubNotification::MatchStarting { aggregator: id });
        Ok(())
    }

    /// Stops delivery to the aggregator. Its match state is kept.
    pub fn disable(&mut self, id: AggregatorId) -> Result<(), HubError> {
        let slot = self.slot_mut(id)?;
        if !slot.is_enabled() {
            return Ok(());
        }
        slot.set_enabled(false);
        debug!(aggregator = %slot.name(), "disabled");

        let streams = slot.streams().to_vec();
        for stream in streams {
            self.streams[stream.index()].unsubscribe(Subscriber::Aggregator(id));
        }
        Ok(())
    }

    pub fn reset_match(&mut self, id: AggregatorId) -> Result<(), HubError> {
        let slot = self.slot_mut(id)?;
        slot.reset();
        debug!(aggregator = %slot.name(), "match reset");
        self.notify(HubNotification::MatchReset { aggregator: id });
        Ok(())
    }

    // --- publishing ---

    /// Publishes `message` on the stream that owns it.
    pub fn publish(&mut self, message: &EventMessage) -> Result<PublishOutcome, HubError> {
        let Some(stream) = message.stream() else {
            warn!(message = %message, "message has no publishing stream, ignoring");
            return Ok(PublishOutcome::Ignored);
        };
        self.publish_on(stream, message)
    }

    pub fn publish_named(
        &mut self,
        stream: &str,
        message: &str,
    ) -> Result<PublishOutcome, HubError> {
        let found = self
            .stream_by_name(stream)
            .ok_or_else(|| HubError::UnknownStreamName(stream.to_string()))?;
        let resolved = found
            .message(message)
            .cloned()
            .ok_or_else(|| HubError::UnknownMessage {
                stream: stream.to_string(),
                message: message.to_string(),
            })?;
        let id = found.id();
        self.publish_on(id, &resolved)
    }

    /// Publishes `message` on `stream`.
    ///
    /// With [`DiagnosticPolicy::FailFast`], a cascade overflow anywhere inside
    /// this call is returned from the outermost publish.
    pub fn publish_on(
        &mut self,
        stream: StreamId,
        message: &EventMessage,
    ) -> Result<PublishOutcome, HubError> {
        let index = stream.index();
        let Some(target) = self.streams.get_mut(index) else {
            return Err(HubError::UnknownStream(stream));
        };

        match target.admit(message) {
            Admission::Ignored => Ok(PublishOutcome::Ignored),
            Admission::Queued => Ok(PublishOutcome::Queued),
            Admission::Dropped => Ok(PublishOutcome::Dropped),
            Admission::Dispatch => {
                self.publish_depth += 1;
                self.dispatch(stream, message);
                while let Some(next) = self.streams[index].next_queued() {
                    self.dispatch(stream, &next);
                }
                let summary = self.streams[index].finish();
                self.publish_depth -= 1;

                if let Err(err) = self.streams[index].check_cascade(&summary) {
                    self.deferred_error.get_or_insert(err);
                }
                if self.publish_depth == 0 {
                    if let Some(err) = self.deferred_error.take() {
                        return Err(err.into());
                    }
                }
                Ok(PublishOutcome::Dispatched {
                    delivered: summary.delivered,
                    dropped: summary.dropped,
                })
            }
        }
    }

    fn dispatch(&mut self, stream: StreamId, message: &EventMessage) {
        let source = &self.streams[stream.index()];
        if source.is_debug() {
            debug!(stream = %source.name(), message = %message, "dispatch");
        }
        let subscribers = source.subscribers().to_vec();
        for subscriber in subscribers {
            match subscriber {
                Subscriber::Aggregator(id) => self.deliver_to_aggregator(id, message),
                Subscriber::Listener(id) => self.deliver_to_stream_listener(id, stream, message),
            }
        }
    }

    /// Progress listeners run before completion is announced. If one of them
    /// resets or otherwise changes the match, the completion or failure seen
    /// by `receive` is stale and neither `MatchComplete`/`MatchFailed` nor the
    /// success message is emitted.
    fn deliver_to_aggregator(&mut self, id: AggregatorId, message: &EventMessage) {
        let Some(slot) = self.aggregators.get_mut(id.index()) else {
            return;
        };
        // a listener earlier in this dispatch may have disabled it
        if !slot.is_enabled() {
            return;
        }
        let Reception::Accepted(result) = slot.receive(message) else {
            return;
        };

        self.notify(HubNotification::MatchProgress {
            aggregator: id,
            message: message.clone(),
        });
        if self.aggregators[id.index()].match_result() != result {
            return;
        }
        match result {
            MatchResult::Success => self.complete_match(id),
            MatchResult::Failure => {
                warn!(aggregator = %self.aggregators[id.index()].name(), "tutorial match failed");
                self.notify(HubNotification::MatchFailed { aggregator: id });
            }
            MatchResult::Waiting => {}
        }
    }

    fn complete_match(&mut self, id: AggregatorId) {
        let slot = &self.aggregators[id.index()];
        let name = slot.name().to_string();
        let success = slot.success_message().cloned();
        info!(aggregator = %name, "tutorial match complete");

        self.notify(HubNotification::MatchComplete { aggregator: id });

        if let Some(success) = success {
            debug!(aggregator = %name, message = %success, "publishing success message");
            if let Err(err) = self.publish(&success) {
                error!(aggregator = %name, %err, "failed to publish success message");
            }
        }
    }

    fn deliver_to_stream_listener(
        &mut self,
        id: StreamListenerId,
        stream: StreamId,
        message: &EventMessage,
    ) {
        let index = id.0 as usize;
        let Some(mut listener) = self
            .stream_listeners
            .get_mut(index)
            .and_then(|entry| entry.listener.take())
        else {
            return;
        };

        let mut commands = HubCommands::default();
        listener.on_message(
            &mut StreamContext {
                hub: self,
                stream,
                commands: &mut commands,
            },
            message,
        );
        self.stream_listeners[index].listener = Some(listener);
        self.apply(commands);
    }

    // --- listeners ---

    pub fn add_listener(
        &mut self,
        scope: ListenerScope,
        mut listener: Box<dyn AggregatorListener>,
    ) -> ListenerId {
        let id = ListenerId(self.listeners.len() as u32);
        let mut commands = HubCommands::default();
        listener.on_attached(self, &mut commands);
        self.listeners.push(ListenerEntry {
            scope,
            listener: Some(listener),
        });
        self.apply(commands);
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> Result<(), HubError> {
        self.listeners
            .get_mut(id.0 as usize)
            .and_then(|entry| entry.listener.take())
            .map(|_| ())
            .ok_or(HubError::UnknownListener(id))
    }

    /// Attaches `listener` to every message `stream` delivers, after the
    /// subscribers already present.
    pub fn add_stream_listener(
        &mut self,
        stream: StreamId,
        listener: Box<dyn StreamListener>,
    ) -> Result<StreamListenerId, HubError> {
        let target = self
            .streams
            .get_mut(stream.index())
            .ok_or(HubError::UnknownStream(stream))?;
        let id = StreamListenerId(self.stream_listeners.len() as u32);
        target.subscribe(Subscriber::Listener(id));
        self.stream_listeners.push(StreamListenerEntry {
            stream,
            listener: Some(listener),
        });
        Ok(id)
    }

    pub fn remove_stream_listener(&mut self, id: StreamListenerId) -> Result<(), HubError> {
        let entry = self
            .stream_listeners
            .get_mut(id.0 as usize)
            .filter(|entry| entry.listener.is_some())
            .ok_or(HubError::UnknownStreamListener(id))?;
        entry.listener = None;
        let stream = entry.stream;
        self.streams[stream.index()].unsubscribe(Subscriber::Listener(id));
        Ok(())
    }

    // --- notifications ---

    /// Takes every notification recorded since the last drain, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<HubNotification> {
        self.journal_overflowed = false;
        self.journal.drain(..).collect()
    }

    fn record(&mut self, notification: HubNotification) {
        let capacity = self.config.journal_capacity;
        if capacity == 0 {
            return;
        }
        if self.journal.len() >= capacity {
            self.journal.pop_front();
            if !self.journal_overflowed {
                warn!(capacity, "notification journal full, dropping oldest entries");
                self.journal_overflowed = true;
            }
        }
        self.journal.push_back(notification);
    }

    fn notify(&mut self, notification: HubNotification) {
        self.record(notification.clone());
        let Some(source) = notification.aggregator() else {
            return;
        };

        for index in 0..self.listeners.len() {
            let entry = &mut self.listeners[index];
            if !entry.scope.accepts(source) {
                continue;
            }
            let Some(mut listener) = entry.listener.take() else {
                continue;
            };

            let mut commands = HubCommands::default();
            let mut ctx = ListenerContext {
                hub: self,
                source,
                commands: &mut commands,
            };
            match &notification {
                HubNotification::MatchStarting { .. } => listener.on_match_starting(&mut ctx),
                HubNotification::MatchProgress { message, .. } => {
                    listener.on_match_progress(&mut ctx, message)
                }
                HubNotification::MatchComplete { .. } => listener.on_match_complete(&mut ctx),
                HubNotification::MatchFailed { .. } => listener.on_match_failed(&mut ctx),
                HubNotification::MatchReset { .. } => listener.on_match_reset(&mut ctx),
                HubNotification::IndicatorChanged { .. } => {}
            }

            self.listeners[index].listener = Some(listener);
            self.apply(commands);
        }
    }

    fn apply(&mut self, commands: HubCommands) {
        for command in commands.into_inner() {
            let applied = match command {
                HubCommand::Publish(message) => self.publish(&message).map(|_| ()),
                HubCommand::Enable(id) => self.enable(id),
                HubCommand::Disable(id) => self.disable(id),
                HubCommand::Reset(id) => self.reset_match(id),
                HubCommand::SetIndicator { indicator, active } => {
                    debug!(%indicator, active, "indicator changed");
                    self.notify(HubNotification::IndicatorChanged { indicator, active });
                    Ok(())
                }
            };
            if let Err(err) = applied {
                error!(%err, "listener command failed");
            }
        }
    }
}

//! Callback surface of the hub.
//!
//! Listeners never touch the hub mutably. They read it through a context and
//! queue changes on [`HubCommands`]; the hub applies the queue as soon as the
//! callback returns.

use {
    crate::TutorialHub,
    tutorial_components::{AggregatorId, EventMessage, StreamId},
};

/// Handle of an aggregator listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u32);

/// Something observable that happened inside the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubNotification {
    MatchStarting {
        aggregator: AggregatorId,
    },
    MatchProgress {
        aggregator: AggregatorId,
        message: EventMessage,
    },
    MatchComplete {
        aggregator: AggregatorId,
    },
    MatchFailed {
        aggregator: AggregatorId,
    },
    MatchReset {
        aggregator: AggregatorId,
    },
    IndicatorChanged {
        indicator: String,
        active: bool,
    },
}

impl HubNotification {
    pub fn aggregator(&self) -> Option<AggregatorId> {
        match self {
            HubNotification::MatchStarting { aggregator }
            | HubNotification::MatchProgress { aggregator, .. }
            | HubNotification::MatchComplete { aggregator }
            | HubNotification::MatchFailed { aggregator }
            | HubNotification::MatchReset { aggregator } => Some(*aggregator),
            HubNotification::IndicatorChanged { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubCommand {
    Publish(EventMessage),
    Enable(AggregatorId),
    Disable(AggregatorId),
    Reset(AggregatorId),
    SetIndicator { indicator: String, active: bool },
}

/// Changes requested by a listener, applied in order after it returns.
#[derive(Debug, Default)]
pub struct HubCommands {
    queue: Vec<HubCommand>,
}

impl HubCommands {
    pub fn publish(&mut self, message: EventMessage) {
        self.queue.push(HubCommand::Publish(message));
    }

    pub fn enable(&mut self, aggregator: AggregatorId) {
        self.queue.push(HubCommand::Enable(aggregator));
    }

    pub fn disable(&mut self, aggregator: AggregatorId) {
        self.queue.push(HubCommand::Disable(aggregator));
    }

    pub fn reset(&mut self, aggregator: AggregatorId) {
        self.queue.push(HubCommand::Reset(aggregator));
    }

    pub fn set_indicator(&mut self, indicator: impl Into<String>, active: bool) {
        self.queue.push(HubCommand::SetIndicator {
            indicator: indicator.into(),
            active,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn into_inner(self) -> Vec<HubCommand> {
        self.queue
    }
}

/// Which aggregators a listener hears about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerScope {
    All,
    Aggregators(Vec<AggregatorId>),
}

impl ListenerScope {
    pub fn accepts(&self, aggregator: AggregatorId) -> bool {
        match self {
            ListenerScope::All => true,
            ListenerScope::Aggregators(ids) => ids.contains(&aggregator),
        }
    }
}

pub struct ListenerContext<'a> {
    pub hub: &'a TutorialHub,
    /// The aggregator the notification is about.
    pub source: AggregatorId,
    pub commands: &'a mut HubCommands,
}

/// Receives lifecycle callbacks of the aggregators in its scope.
///
/// Every method defaults to a no-op.
pub trait AggregatorListener: Send + Sync + 'static {
    /// Called once when the listener is added to the hub.
    fn on_attached(&mut self, _hub: &TutorialHub, _commands: &mut HubCommands) {}

    fn on_match_starting(&mut self, _ctx: &mut ListenerContext<'_>) {}

    fn on_match_progress(&mut self, _ctx: &mut ListenerContext<'_>, _message: &EventMessage) {}

    fn on_match_complete(&mut self, _ctx: &mut ListenerContext<'_>) {}

    fn on_match_failed(&mut self, _ctx: &mut ListenerContext<'_>) {}

    fn on_match_reset(&mut self, _ctx: &mut ListenerContext<'_>) {}
}

pub struct StreamContext<'a> {
    pub hub: &'a TutorialHub,
    pub stream: StreamId,
    pub commands: &'a mut HubCommands,
}

/// Receives every message a stream delivers, in subscription order with the
/// stream's aggregators.
pub trait StreamListener: Send + Sync + 'static {
    fn on_message(&mut self, ctx: &mut StreamContext<'_>, message: &EventMessage);
}

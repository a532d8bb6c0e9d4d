use {bevy::prelude::*, tutorial_components::AggregatorId};

/// Request to publish `message` on the stream named `stream`.
#[derive(Event, Debug, Clone)]
pub struct PublishTutorialMessage {
    pub stream: String,
    pub message: String,
}

impl PublishTutorialMessage {
    pub fn new(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            message: message.into(),
        }
    }
}

/// Request to reset the named aggregator back to waiting.
#[derive(Event, Debug, Clone)]
pub struct ResetTutorialAggregator {
    pub aggregator: String,
}

/// Fired when an aggregator is enabled and starts a match.
#[derive(Event, Debug, Clone)]
pub struct TutorialMatchStarted {
    pub aggregator: AggregatorId,
    pub name: String,
}

/// Fired for every event an aggregator accepted.
#[derive(Event, Debug, Clone)]
pub struct TutorialMatchProgressed {
    pub aggregator: AggregatorId,
    pub name: String,
    pub message: String,
}

#[derive(Event, Debug, Clone)]
pub struct TutorialMatchCompleted {
    pub aggregator: AggregatorId,
    pub name: String,
}

#[derive(Event, Debug, Clone)]
pub struct TutorialMatchFailed {
    pub aggregator: AggregatorId,
    pub name: String,
}

#[derive(Event, Debug, Clone)]
pub struct TutorialMatchReset {
    pub aggregator: AggregatorId,
    pub name: String,
}

/// A next-event indicator switched on or off.
#[derive(Event, Debug, Clone)]
pub struct TutorialIndicatorChanged {
    pub indicator: String,
    pub active: bool,
}

/// Coarse signal that an aggregator's state snapshot may have changed.
/// Fired alongside every per-aggregator event above.
#[derive(Event, Debug, Clone, Copy)]
pub struct TutorialAggregatorChanged {
    pub aggregator: AggregatorId,
}

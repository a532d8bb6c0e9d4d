//! Next-event selectors: listeners that watch a set of aggregators and
//! switch something on while one of them expects a message the selector
//! knows how to produce.

use {
    crate::{
        AggregatorListener, HubCommands, ListenerContext, ListenerId, ListenerScope, TutorialHub,
    },
    bevy::log::{debug, trace},
    std::collections::HashSet,
    tutorial_components::{AggregatorId, EventMessage, EventMessageState, MessageId},
};

/// What a selector toggles when its prediction changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorAction {
    /// Raises [`crate::HubNotification::IndicatorChanged`] with this name.
    Indicator(String),
    /// Enables the aggregator while active and disables it otherwise.
    Activate(AggregatorId),
}

/// Watches source aggregators and is active while any enabled source lists a
/// generated message as expected next.
#[derive(Debug, Clone)]
pub struct NextEventSelector {
    action: SelectorAction,
    generates: HashSet<MessageId>,
    sources: Vec<AggregatorId>,
    active: Option<bool>,
    buffer: Vec<EventMessageState>,
}

impl NextEventSelector {
    /// A selector that drives a named indicator.
    pub fn indicator(
        name: impl Into<String>,
        generates: impl IntoIterator<Item = EventMessage>,
    ) -> Self {
        Self::new(SelectorAction::Indicator(name.into()), generates)
    }

    /// A selector that keeps `target` disabled until one of its sources
    /// expects `target`'s success message.
    pub fn activator(target: AggregatorId, success_message: EventMessage) -> Self {
        Self::new(SelectorAction::Activate(target), [success_message])
    }

    fn new(action: SelectorAction, generates: impl IntoIterator<Item = EventMessage>) -> Self {
        Self {
            action,
            generates: generates.into_iter().map(|m| m.id()).collect(),
            sources: Vec::new(),
            active: None,
            buffer: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = AggregatorId>) -> Self {
        self.sources = sources.into_iter().collect();
        self
    }

    pub fn action(&self) -> &SelectorAction {
        &self.action
    }

    pub fn sources(&self) -> &[AggregatorId] {
        &self.sources
    }

    pub fn will_generate(&self, message: &EventMessage) -> bool {
        self.generates.contains(&message.id())
    }

    /// Fills the source list with every aggregator that configures one of the
    /// generated messages from a stream that takes part in hints.
    pub fn populate_sources(&mut self, hub: &TutorialHub) {
        let target = match self.action {
            SelectorAction::Activate(target) => Some(target),
            SelectorAction::Indicator(_) => None,
        };
        self.sources = hub
            .aggregators()
            .iter()
            .filter(|slot| Some(slot.id()) != target)
            .filter(|slot| {
                slot.messages()
                    .iter()
                    .any(|m| !hub.is_hint_ignored(m) && self.will_generate(m))
            })
            .map(|slot| slot.id())
            .collect();
    }

    /// Registers the selector with `hub`, auto-populating its sources when
    /// none were given.
    pub fn attach(mut self, hub: &mut TutorialHub) -> ListenerId {
        if self.sources.is_empty() {
            self.populate_sources(hub);
        }
        debug!(
            action = ?self.action,
            sources = self.sources.len(),
            "attaching next event selector"
        );
        let scope = ListenerScope::Aggregators(self.sources.clone());
        hub.add_listener(scope, Box::new(self))
    }

    /// Whether any enabled source expects a generated message next.
    pub fn evaluate(&mut self, hub: &TutorialHub) -> bool {
        for &source in &self.sources {
            let Some(slot) = hub.aggregator(source) else {
                continue;
            };
            if !slot.is_enabled() {
                continue;
            }
            for state in slot.list_events(&mut self.buffer) {
                if state.expected_next
                    && !hub.is_hint_ignored(&state.message)
                    && self.generates.contains(&state.message.id())
                {
                    return true;
                }
            }
        }
        false
    }

    fn update(&mut self, hub: &TutorialHub, commands: &mut HubCommands) {
        let active = self.evaluate(hub);
        if self.active == Some(active) {
            return;
        }
        self.active = Some(active);
        trace!(action = ?self.action, active, "next event prediction changed");

        match &self.action {
            SelectorAction::Indicator(name) => commands.set_indicator(name.clone(), active),
            SelectorAction::Activate(target) if active => commands.enable(*target),
            SelectorAction::Activate(target) => commands.disable(*target),
        }
    }
}

// Re-evaluates every source on each hook: a progress event on one source can
// change what another source expects through success-message cascades.
impl AggregatorListener for NextEventSelector {
    fn on_attached(&mut self, hub: &TutorialHub, commands: &mut HubCommands) {
        self.update(hub, commands);
    }

    fn on_match_starting(&mut self, ctx: &mut ListenerContext<'_>) {
        self.update(ctx.hub, ctx.commands);
    }

    fn on_match_progress(&mut self, ctx: &mut ListenerContext<'_>, _message: &EventMessage) {
        self.update(ctx.hub, ctx.commands);
    }

    fn on_match_complete(&mut self, ctx: &mut ListenerContext<'_>) {
        self.update(ctx.hub, ctx.commands);
    }

    fn on_match_reset(&mut self, ctx: &mut ListenerContext<'_>) {
        self.update(ctx.hub, ctx.commands);
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{AggregatorSpec, HubNotification},
        aggregators::{CounterAggregator, SequenceAggregator, SequenceMode},
        streams::StreamSpec,
    };

    fn indicators(hub: &mut TutorialHub) -> Vec<(String, bool)> {
        hub.drain_notifications()
            .into_iter()
            .filter_map(|n| match n {
                HubNotification::IndicatorChanged { indicator, active } => Some((indicator, active)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_indicator_follows_expected_message() {
        let mut hub = TutorialHub::default();
        hub.add_stream(StreamSpec::new("player").with_messages(["open", "close"]))
            .unwrap();
        let open = hub.message("player", "open").unwrap().clone();
        let close = hub.message("player", "close").unwrap().clone();
        hub.add_aggregator(AggregatorSpec::new(
            "steps",
            SequenceAggregator::new(SequenceMode::Lenient),
            [open.clone(), close.clone()],
        ))
        .unwrap();
        hub.drain_notifications();

        let selector = NextEventSelector::indicator("close_button", [close.clone()]);
        selector.attach(&mut hub);
        assert_eq!(indicators(&mut hub), vec![("close_button".into(), false)]);

        hub.publish(&open).unwrap();
        assert_eq!(indicators(&mut hub), vec![("close_button".into(), true)]);

        hub.publish(&close).unwrap();
        assert_eq!(indicators(&mut hub), vec![("close_button".into(), false)]);
    }

    #[test]
    fn test_hint_ignored_stream_never_predicts() {
        let mut hub = TutorialHub::default();
        hub.add_stream(
            StreamSpec::new("ambient")
                .with_messages(["tick"])
                .ignored_for_hints(),
        )
        .unwrap();
        let tick = hub.message("ambient", "tick").unwrap().clone();
        hub.add_aggregator(AggregatorSpec::new(
            "ticks",
            CounterAggregator::new(2).unwrap(),
            [tick.clone()],
        ))
        .unwrap();

        let mut selector = NextEventSelector::indicator("tick", [tick.clone()]);
        selector.populate_sources(&hub);
        assert!(selector.sources().is_empty());

        let mut explicit = selector.with_sources([AggregatorId(0)]);
        assert!(!explicit.evaluate(&hub));
    }

    #[test]
    fn test_activator_enables_target_when_expected() {
        let mut hub = TutorialHub::default();
        hub.add_stream(StreamSpec::new("player").with_messages(["open", "poke"]))
            .unwrap();
        hub.add_stream(StreamSpec::new("tutorial").with_messages(["poked"]))
            .unwrap();
        let open = hub.message("player", "open").unwrap().clone();
        let poke = hub.message("player", "poke").unwrap().clone();
        let poked = hub.message("tutorial", "poked").unwrap().clone();

        let parent = hub
            .add_aggregator(AggregatorSpec::new(
                "parent",
                SequenceAggregator::new(SequenceMode::Lenient),
                [open.clone(), poked.clone()],
            ))
            .unwrap();
        let target = hub
            .add_aggregator(
                AggregatorSpec::new("pokes", CounterAggregator::new(2).unwrap(), [poke.clone()])
                    .with_success(poked.clone())
                    .disabled(),
            )
            .unwrap();
        let selector = NextEventSelector::activator(target, poked);
        selector.attach(&mut hub);

        hub.publish(&poke).unwrap();
        assert!(!hub.aggregator(target).unwrap().is_enabled());

        hub.publish(&open).unwrap();
        assert!(hub.aggregator(target).unwrap().is_enabled());

        hub.publish(&poke).unwrap();
        hub.publish(&poke).unwrap();
        assert_eq!(
            hub.match_result(parent).unwrap(),
            tutorial_components::MatchResult::Success
        );
        assert!(
            !hub.aggregator(target).unwrap().is_enabled(),
            "target is switched off once nothing expects it"
        );
    }
}

//! Compiles `TutorialDefinition` assets into hub streams, aggregators and
//! next-event selectors.

use {
    crate::{AggregatorSpec, HubError, ListenerId, NextEventSelector, StreamLogger, TutorialHub},
    aggregators::{
        Aggregator, AggregatorError, CounterAggregator, OneOfAggregator, SequenceAggregator,
        SetAggregator,
    },
    bevy::log::{error, info, warn},
    std::collections::HashSet,
    streams::{MessageSpec, StreamSpec},
    thiserror::Error,
    tutorial_assets::{
        Activation, AggregatorKind, DefinitionError, MessageRef, StreamDefinition,
        TutorialDefinition,
    },
    tutorial_components::{AggregatorId, EventMessage, StreamId},
};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Hub(#[from] HubError),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
}

/// What a compiled definition added to the hub.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub definition: String,
    pub streams: Vec<StreamId>,
    pub aggregators: Vec<AggregatorId>,
    /// Aggregators shown in the progress tree.
    pub tracked: Vec<AggregatorId>,
    pub selectors: Vec<ListenerId>,
    /// References that named no declared message; they were kept unbound.
    pub unresolved: Vec<String>,
}

/// Declares everything `definition` describes on `hub`.
///
/// The definition is validated up front, so a hard error leaves the hub
/// untouched. Unknown message references are soft: they become unbound
/// messages, are logged, and are listed in the report.
pub fn compile_definition(
    hub: &mut TutorialHub,
    definition: &TutorialDefinition,
) -> Result<CompileReport, CompileError> {
    validate(hub, definition)?;

    let mut report = CompileReport {
        definition: definition.id.clone(),
        ..Default::default()
    };

    for stream in &definition.streams {
        let id = hub.add_stream(stream_spec(stream))?;
        if stream.log {
            let label = format!("{}/{}", definition.id, stream.name);
            hub.add_stream_listener(id, Box::new(StreamLogger::new(label)))?;
        }
        report.streams.push(id);
    }

    let mut activators = Vec::new();
    for aggregator in &definition.aggregators {
        let messages = aggregator
            .messages
            .iter()
            .map(|reference| resolve(hub, reference, &mut report))
            .collect::<Result<Vec<_>, _>>()?;
        let success = aggregator
            .success
            .as_deref()
            .map(|reference| resolve(hub, reference, &mut report))
            .transpose()?;

        let policy: Aggregator = match aggregator.kind {
            AggregatorKind::Sequence(mode) => SequenceAggregator::new(mode).into(),
            AggregatorKind::Set(mode) => SetAggregator::new(mode).into(),
            AggregatorKind::Counter(target) => CounterAggregator::new(target)?.into(),
            AggregatorKind::OneOf => OneOfAggregator::new().into(),
        };
        let mut spec = AggregatorSpec::new(&aggregator.name, policy, messages);
        spec.success_message = success.clone();
        spec.enabled = aggregator.activation == Activation::Always;
        spec.debug = aggregator.debug;

        let id = hub.add_aggregator(spec)?;
        if aggregator.activation == Activation::WhenExpected {
            activators.push((id, aggregator.name.as_str(), success));
        }
        report.aggregators.push(id);
    }

    for (target, name, success) in activators {
        match success.filter(EventMessage::is_bound) {
            Some(success) => {
                let selector = NextEventSelector::activator(target, success);
                report.selectors.push(selector.attach(hub));
            }
            None => {
                warn!(
                    aggregator = %name,
                    "activation on demand needs a published success message, enabling now"
                );
                hub.enable(target)?;
            }
        }
    }

    for indicator in &definition.indicators {
        let generates = indicator
            .messages
            .iter()
            .map(|reference| resolve(hub, reference, &mut report))
            .collect::<Result<Vec<_>, _>>()?;
        let sources = indicator
            .sources
            .iter()
            .map(|name| {
                hub.aggregator_id(name)
                    .ok_or_else(|| HubError::UnknownAggregatorName(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let selector = NextEventSelector::indicator(&indicator.name, generates).with_sources(sources);
        report.selectors.push(selector.attach(hub));
    }

    report.tracked = if definition.tracked.is_empty() {
        report.aggregators.clone()
    } else {
        definition
            .tracked
            .iter()
            .map(|name| {
                hub.aggregator_id(name)
                    .ok_or_else(|| HubError::UnknownAggregatorName(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    info!(
        tutorial = %definition.id,
        streams = report.streams.len(),
        aggregators = report.aggregators.len(),
        unresolved = report.unresolved.len(),
        "compiled tutorial definition"
    );
    Ok(report)
}

fn stream_spec(stream: &StreamDefinition) -> StreamSpec {
    StreamSpec {
        name: stream.name.clone(),
        messages: stream
            .messages
            .iter()
            .map(|m| MessageSpec {
                name: m.name.clone(),
                allow_out_of_order: m.allow_out_of_order,
            })
            .collect(),
        ignore_for_next_event_hint: stream.ignore_for_next_event_hint,
        debug: stream.debug,
    }
}

fn resolve(
    hub: &mut TutorialHub,
    reference: &str,
    report: &mut CompileReport,
) -> Result<EventMessage, CompileError> {
    let parsed = MessageRef::parse(reference)?;
    if let Some(message) = hub.message(parsed.stream, parsed.message) {
        return Ok(message.clone());
    }
    error!(reference, "unknown message reference, keeping it unbound");
    report.unresolved.push(reference.to_string());
    Ok(hub.declare_unbound_message(reference))
}

/// Rejects everything that would fail halfway through compilation.
fn validate(hub: &TutorialHub, definition: &TutorialDefinition) -> Result<(), CompileError> {
    let mut streams = HashSet::new();
    for stream in &definition.streams {
        if hub.stream_by_name(&stream.name).is_some() || !streams.insert(stream.name.as_str()) {
            return Err(HubError::DuplicateStream(stream.name.clone()).into());
        }
        stream_spec(stream).validate().map_err(HubError::from)?;
    }

    let mut aggregators = HashSet::new();
    for aggregator in &definition.aggregators {
        if hub.aggregator_id(&aggregator.name).is_some()
            || !aggregators.insert(aggregator.name.as_str())
        {
            return Err(HubError::DuplicateAggregator(aggregator.name.clone()).into());
        }
        if aggregator.name.is_empty() {
            return Err(AggregatorError::EmptyName.into());
        }
        if aggregator.messages.is_empty() {
            return Err(AggregatorError::NoMessages {
                aggregator: aggregator.name.clone(),
            }
            .into());
        }
        if let AggregatorKind::Counter(0) = aggregator.kind {
            return Err(AggregatorError::InvalidTarget { target: 0 }.into());
        }
        for reference in aggregator.messages.iter().chain(&aggregator.success) {
            MessageRef::parse(reference)?;
        }
    }

    for indicator in &definition.indicators {
        for reference in &indicator.messages {
            MessageRef::parse(reference)?;
        }
        for name in &indicator.sources {
            if hub.aggregator_id(name).is_none() && !aggregators.contains(name.as_str()) {
                return Err(HubError::UnknownAggregatorName(name.clone()).into());
            }
        }
    }
    for name in &definition.tracked {
        if hub.aggregator_id(name).is_none() && !aggregators.contains(name.as_str()) {
            return Err(HubError::UnknownAggregatorName(name.clone()).into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use {super::*, streams::StreamError, tutorial_components::MatchResult};

    const INTRO: &str = r#"(
        id: "intro",
        streams: [
            (name: "player", messages: [(name: "open"), (name: "progress"), (name: "done")]),
            (name: "tutorial", messages: [(name: "basics"), (name: "finished")]),
        ],
        aggregators: [
            (
                name: "basics",
                kind: Sequence(Lenient),
                messages: ["player/open", "player/progress"],
                success: Some("tutorial/basics"),
            ),
            (
                name: "course",
                kind: Sequence(Lenient),
                messages: ["tutorial/basics", "player/done"],
                success: Some("tutorial/finished"),
            ),
        ],
        indicators: [
            (name: "done_button", messages: ["player/done"]),
        ],
    )"#;

    fn definition(source: &str) -> TutorialDefinition {
        TutorialDefinition::from_ron_str(source).unwrap()
    }

    #[test]
    fn test_compiled_definition_runs() {
        let mut hub = TutorialHub::default();
        let report = compile_definition(&mut hub, &definition(INTRO)).unwrap();

        assert_eq!(report.streams.len(), 2);
        assert_eq!(report.aggregators.len(), 2);
        assert_eq!(report.tracked, report.aggregators);
        assert_eq!(report.selectors.len(), 1);
        assert!(report.unresolved.is_empty());

        for message in ["open", "progress", "done"] {
            hub.publish_named("player", message).unwrap();
        }
        let course = hub.aggregator_id("course").unwrap();
        assert_eq!(hub.match_result(course).unwrap(), MatchResult::Success);
    }

    #[test]
    fn test_unknown_reference_becomes_unbound() {
        let source = r#"(
            id: "ghosts",
            streams: [(name: "player", messages: [(name: "open")])],
            aggregators: [
                (name: "haunted", kind: OneOf, messages: ["player/open", "attic/ghost"]),
            ],
        )"#;
        let mut hub = TutorialHub::default();
        let report = compile_definition(&mut hub, &definition(source)).unwrap();

        assert_eq!(report.unresolved, vec!["attic/ghost".to_string()]);
        let slot = hub.aggregator_by_name("haunted").unwrap();
        assert_eq!(slot.messages().len(), 2);
        assert_eq!(slot.streams().len(), 1);
    }

    #[test]
    fn test_hard_errors_leave_hub_untouched() {
        let source = r#"(
            id: "broken",
            streams: [(name: "player", messages: [(name: "open")])],
            aggregators: [
                (name: "zero", kind: Counter(0), messages: ["player/open"]),
            ],
        )"#;
        let mut hub = TutorialHub::default();
        let err = compile_definition(&mut hub, &definition(source)).unwrap_err();

        assert!(matches!(
            err,
            CompileError::Aggregator(AggregatorError::InvalidTarget { target: 0 })
        ));
        assert!(hub.streams().is_empty());

        let source = r#"(
            id: "twice",
            streams: [
                (name: "a", messages: [(name: "x")]),
                (name: "b", messages: [(name: "y"), (name: "y")]),
            ],
        )"#;
        let err = compile_definition(&mut hub, &definition(source)).unwrap_err();

        assert!(matches!(
            err,
            CompileError::Hub(HubError::Stream(StreamError::DuplicateMessage { .. }))
        ));
        assert!(hub.streams().is_empty());
        assert!(hub.catalog().is_empty());
    }

    #[test]
    fn test_malformed_reference_is_rejected() {
        let source = r#"(
            id: "typo",
            aggregators: [(name: "a", kind: OneOf, messages: ["player-open"])],
        )"#;
        let err = compile_definition(&mut TutorialHub::default(), &definition(source)).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Definition(DefinitionError::MalformedReference(_))
        ));
    }

    #[test]
    fn test_duplicate_definitions_are_rejected() {
        let mut hub = TutorialHub::default();
        compile_definition(&mut hub, &definition(INTRO)).unwrap();

        let err = compile_definition(&mut hub, &definition(INTRO)).unwrap_err();
        assert!(matches!(err, CompileError::Hub(HubError::DuplicateStream(_))));
    }

    #[test]
    fn test_when_expected_activation_creates_activator() {
        let source = r#"(
            id: "practice",
            streams: [
                (name: "player", messages: [(name: "open"), (name: "poke")]),
                (name: "tutorial", messages: [(name: "poked")]),
            ],
            aggregators: [
                (name: "main", kind: Sequence(Lenient), messages: ["player/open", "tutorial/poked"]),
                (
                    name: "pokes",
                    kind: Counter(2),
                    messages: ["player/poke"],
                    success: Some("tutorial/poked"),
                    activation: WhenExpected,
                ),
            ],
        )"#;
        let mut hub = TutorialHub::default();
        compile_definition(&mut hub, &definition(source)).unwrap();
        let pokes = hub.aggregator_id("pokes").unwrap();

        assert!(!hub.aggregator(pokes).unwrap().is_enabled());
        hub.publish_named("player", "open").unwrap();
        assert!(hub.aggregator(pokes).unwrap().is_enabled());
    }
}

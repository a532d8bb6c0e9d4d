use {
    crate::{CompileError, CompileReport, HubNotification, TutorialHub, compile_definition},
    bevy::prelude::*,
    tutorial_assets::TutorialDefinition,
    tutorial_components::AggregatorId,
    tutorial_events::*,
};

/// Definitions that have been compiled into the hub, successfully or not.
#[derive(Resource, Default, Debug)]
pub struct CompiledTutorials {
    pub reports: Vec<CompileReport>,
    pub failed: Vec<String>,
}

impl CompiledTutorials {
    pub fn contains(&self, id: &str) -> bool {
        self.reports.iter().any(|r| r.definition == id) || self.failed.iter().any(|f| f == id)
    }

    /// Tracked aggregators of every compiled definition, in compile order.
    pub fn tracked(&self) -> Vec<AggregatorId> {
        self.reports
            .iter()
            .flat_map(|r| r.tracked.iter().copied())
            .collect()
    }
}

/// Compiles every loaded `TutorialDefinition` asset not seen before.
pub fn compile_pending_tutorials(
    definitions: Res<Assets<TutorialDefinition>>,
    mut hub: ResMut<TutorialHub>,
    mut compiled: ResMut<CompiledTutorials>,
) {
    for (_, definition) in definitions.iter() {
        if compiled.contains(&definition.id) {
            continue;
        }
        match compile_definition(&mut hub, definition) {
            Ok(report) => compiled.reports.push(report),
            Err(err) => {
                error!(tutorial = %definition.id, %err, "failed to compile tutorial definition");
                compiled.failed.push(definition.id.clone());
            }
        }
    }
}

/// Compiles `definition` straight into the world's hub, bypassing the asset
/// server.
pub fn load_tutorial_definition(
    world: &mut World,
    definition: &TutorialDefinition,
) -> Result<CompileReport, CompileError> {
    world.init_resource::<TutorialHub>();
    world.init_resource::<CompiledTutorials>();
    world.resource_scope(|world, mut hub: Mut<TutorialHub>| {
        let report = compile_definition(&mut hub, definition)?;
        world
            .resource_mut::<CompiledTutorials>()
            .reports
            .push(report.clone());
        Ok(report)
    })
}

pub fn forward_tutorial_notifications(mut hub: ResMut<TutorialHub>, mut commands: Commands) {
    forward_notifications(&mut hub, &mut commands);
}

pub fn on_publish_request(
    trigger: On<PublishTutorialMessage>,
    mut hub: ResMut<TutorialHub>,
    mut commands: Commands,
) {
    let request = trigger.event();
    match hub.publish_named(&request.stream, &request.message) {
        Ok(outcome) => {
            trace!(stream = %request.stream, message = %request.message, ?outcome, "published tutorial message");
        }
        Err(err) => {
            error!(stream = %request.stream, message = %request.message, %err, "failed to publish tutorial message");
        }
    }
    forward_notifications(&mut hub, &mut commands);
}

pub fn on_reset_request(
    trigger: On<ResetTutorialAggregator>,
    mut hub: ResMut<TutorialHub>,
    mut commands: Commands,
) {
    let name = &trigger.event().aggregator;
    let Some(id) = hub.aggregator_id(name) else {
        warn!(aggregator = %name, "reset requested for unknown aggregator");
        return;
    };
    if let Err(err) = hub.reset_match(id) {
        error!(aggregator = %name, %err, "failed to reset aggregator");
    }
    forward_notifications(&mut hub, &mut commands);
}

/// Re-triggers drained hub notifications as Bevy events.
fn forward_notifications(hub: &mut TutorialHub, commands: &mut Commands) {
    for notification in hub.drain_notifications() {
        let Some(aggregator) = notification.aggregator() else {
            if let HubNotification::IndicatorChanged { indicator, active } = notification {
                commands.trigger(TutorialIndicatorChanged { indicator, active });
            }
            continue;
        };
        let name = hub
            .aggregator(aggregator)
            .map(|slot| slot.name().to_string())
            .unwrap_or_default();

        match notification {
            HubNotification::MatchStarting { .. } => {
                commands.trigger(TutorialMatchStarted { aggregator, name });
            }
            HubNotification::MatchProgress { message, .. } => {
                commands.trigger(TutorialMatchProgressed {
                    aggregator,
                    name,
                    message: message.name().to_string(),
                });
            }
            HubNotification::MatchComplete { .. } => {
                commands.trigger(TutorialMatchCompleted { aggregator, name });
            }
            HubNotification::MatchFailed { .. } => {
                commands.trigger(TutorialMatchFailed { aggregator, name });
            }
            HubNotification::MatchReset { .. } => {
                commands.trigger(TutorialMatchReset { aggregator, name });
            }
            HubNotification::IndicatorChanged { .. } => {}
        }
        commands.trigger(TutorialAggregatorChanged { aggregator });
    }
}

//! Tutorial progress tracking: a hub that routes published messages through
//! event streams to match aggregators, plus the Bevy glue around it.

mod compiler;
mod hub;
mod listeners;
mod logger;
mod predictors;
mod systems;

pub use compiler::*;
pub use hub::*;
pub use listeners::*;
pub use logger::*;
pub use predictors::*;
pub use systems::*;

use {bevy::prelude::*, tutorial_assets::TutorialAssetsPlugin};

/// Installs the [`TutorialHub`] resource and the observers that feed it.
#[derive(Default)]
pub struct TutorialPlugin {
    pub config: HubConfig,
}

impl Plugin for TutorialPlugin {
    fn build(&self, app: &mut App) {
        app
            // Resources
            .insert_resource(TutorialHub::new(self.config.clone()))
            .init_resource::<CompiledTutorials>()
            // Hub notifications out as Bevy events
            .add_systems(Update, forward_tutorial_notifications)
            // Requests in
            .add_observer(on_publish_request)
            .add_observer(on_reset_request);
    }
}

/// Loads `*.tutorial.ron` assets and compiles them into the hub.
pub struct TutorialDefinitionsPlugin;

impl Plugin for TutorialDefinitionsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(TutorialAssetsPlugin).add_systems(
            Update,
            compile_pending_tutorials.before(forward_tutorial_notifications),
        );
    }
}

//! Progress tree over tutorial aggregators, for views that show which steps
//! are done and which one comes next.

mod builder;
mod tree;

pub use builder::*;
pub use tree::*;

use {
    bevy::prelude::*,
    tutorial::{CompiledTutorials, TutorialHub, forward_tutorial_notifications},
    tutorial_components::DiagnosticPolicy,
    tutorial_events::TutorialAggregatorChanged,
};

pub struct TutorialTreePlugin;

impl Plugin for TutorialTreePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TutorialTree>()
            .add_systems(
                Update,
                build_tutorial_tree.after(forward_tutorial_notifications),
            )
            .add_observer(refresh_tutorial_tree);
    }
}

/// The progress tree of every compiled tutorial.
#[derive(Resource, Default)]
pub struct TutorialTree {
    tree: Option<DependencyTree>,
    built_from: usize,
    pub policy: DiagnosticPolicy,
}

impl TutorialTree {
    pub fn get(&self) -> Option<&DependencyTree> {
        self.tree.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut DependencyTree> {
        self.tree.as_mut()
    }
}

/// Rebuilds the tree whenever another tutorial definition was compiled.
pub fn build_tutorial_tree(
    hub: Res<TutorialHub>,
    compiled: Res<CompiledTutorials>,
    mut tree: ResMut<TutorialTree>,
) {
    if compiled.reports.len() == tree.built_from {
        return;
    }
    tree.built_from = compiled.reports.len();

    let builder = DependencyTreeBuilder::new(compiled.tracked()).with_policy(tree.policy);
    match builder.build(&hub) {
        Ok((mut built, report)) => {
            for rejected in &report.rejected {
                warn!(parent = %rejected.parent, child = %rejected.child, "tutorial tree dropped a circular dependency");
            }
            if let Some(previous) = tree.tree.as_mut() {
                if let Err(err) = built.adopt_observers(previous) {
                    error!(%err, "failed to notify tutorial tree observers");
                }
            }
            info!(nodes = built.len(), "built tutorial tree");
            tree.tree = Some(built);
        }
        Err(err) => error!(%err, "failed to build tutorial tree"),
    }
}

pub fn refresh_tutorial_tree(
    trigger: On<TutorialAggregatorChanged>,
    hub: Res<TutorialHub>,
    mut tree: ResMut<TutorialTree>,
) {
    let Some(built) = tree.get_mut() else {
        return;
    };
    let aggregator = trigger.event().aggregator;
    if let Err(err) = built.refresh(&hub, aggregator) {
        error!(%aggregator, %err, "failed to refresh tutorial tree");
    }
}

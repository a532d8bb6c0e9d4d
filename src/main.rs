use {
    bevy::{log::LogPlugin, prelude::*},
    tutorial::{TutorialPlugin, load_tutorial_definition},
    tutorial_assets::TutorialDefinition,
    tutorial_events::PublishTutorialMessage,
    tutorial_tree::{TutorialTree, TutorialTreePlugin},
};

const INTRO: &str = include_str!("../assets/tutorials/intro.tutorial.ron");

/// A short play session driving the intro tutorial.
const SESSION: &[(&str, &str)] = &[
    ("camera", "look_around"),
    ("player", "open_inventory"),
    ("player", "equip_shield"),
    ("player", "equip_sword"),
    ("player", "swing"),
    ("player", "swing"),
    ("player", "swing"),
    ("player", "talk_to_trainer"),
];

fn main() {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(LogPlugin {
            filter: "error,streams=info,\
                aggregators=info,\
                tutorial=debug,\
                tutorial_tree=debug,\
                tutorial_system=info"
                .into(),
            level: bevy::log::Level::DEBUG,
            ..Default::default()
        })
        .add_plugins((TutorialPlugin::default(), TutorialTreePlugin));

    let definition = match TutorialDefinition::from_ron_str(INTRO) {
        Ok(definition) => definition,
        Err(err) => {
            error!(%err, "failed to parse intro tutorial");
            return;
        }
    };
    if let Err(err) = load_tutorial_definition(app.world_mut(), &definition) {
        error!(%err, "failed to compile intro tutorial");
        return;
    }
    app.update();

    for (stream, message) in SESSION {
        app.world_mut()
            .trigger(PublishTutorialMessage::new(*stream, *message));
        app.update();
    }

    if let Some(tree) = app.world().resource::<TutorialTree>().get() {
        info!("tutorial progress:\n{}", tree.as_text_tree());
    }
}

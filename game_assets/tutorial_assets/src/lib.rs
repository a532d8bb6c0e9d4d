use {
    aggregators::{SequenceMode, SetMode},
    bevy::prelude::*,
    bevy_common_assets::ron::RonAssetPlugin,
    serde::{Deserialize, Serialize},
    thiserror::Error,
};

pub struct TutorialAssetsPlugin;

impl Plugin for TutorialAssetsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(RonAssetPlugin::<TutorialDefinition>::new(&["tutorial.ron"]));
    }
}

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to parse tutorial definition: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("message reference '{0}' must have the form \"stream/message\"")]
    MalformedReference(String),
}

/// One tutorial: the streams it declares, the aggregators that watch them
/// and the indicators that hint at what to do next.
#[derive(Asset, TypePath, Debug, Clone, Deserialize, Serialize)]
pub struct TutorialDefinition {
    /// Unique key for this tutorial (e.g., "intro").
    pub id: String,
    #[serde(default)]
    pub streams: Vec<StreamDefinition>,
    #[serde(default)]
    pub aggregators: Vec<AggregatorDefinition>,
    #[serde(default)]
    pub indicators: Vec<IndicatorDefinition>,
    /// Aggregator names shown in the progress tree. Empty means all of them.
    #[serde(default)]
    pub tracked: Vec<String>,
}

impl TutorialDefinition {
    pub fn from_ron_str(source: &str) -> Result<Self, DefinitionError> {
        Ok(ron::from_str(source)?)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamDefinition {
    pub name: String,
    pub messages: Vec<MessageDefinition>,
    /// Messages of this stream never light up next-event indicators.
    #[serde(default)]
    pub ignore_for_next_event_hint: bool,
    #[serde(default)]
    pub debug: bool,
    /// Attach a logger that prints every message this stream delivers.
    #[serde(default)]
    pub log: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageDefinition {
    pub name: String,
    #[serde(default)]
    pub allow_out_of_order: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregatorDefinition {
    pub name: String,
    pub kind: AggregatorKind,
    /// References of the form "stream/message".
    pub messages: Vec<String>,
    /// Published when the match succeeds.
    #[serde(default)]
    pub success: Option<String>,
    #[serde(default)]
    pub activation: Activation,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum AggregatorKind {
    Sequence(SequenceMode),
    Set(SetMode),
    Counter(u32),
    OneOf,
}

/// When an aggregator starts listening.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Activation {
    /// Enabled as soon as it is compiled.
    #[default]
    Always,
    /// Stays disabled until enabled from code.
    Manual,
    /// Enabled while another aggregator expects its success message next.
    WhenExpected,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndicatorDefinition {
    pub name: String,
    /// Messages the indicated action generates, as "stream/message".
    pub messages: Vec<String>,
    /// Aggregator names to watch. Empty means every aggregator that
    /// configures one of `messages`.
    #[serde(default)]
    pub sources: Vec<String>,
}

/// A parsed "stream/message" reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef<'a> {
    pub stream: &'a str,
    pub message: &'a str,
}

impl<'a> MessageRef<'a> {
    pub fn parse(reference: &'a str) -> Result<Self, DefinitionError> {
        match reference.split_once('/') {
            Some((stream, message))
                if !stream.is_empty() && !message.is_empty() && !message.contains('/') =>
            {
                Ok(Self { stream, message })
            }
            _ => Err(DefinitionError::MalformedReference(reference.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTRO: &str = r#"(
        id: "intro",
        streams: [
            (
                name: "player",
                messages: [(name: "open"), (name: "look", allow_out_of_order: true), (name: "close")],
                log: true,
            ),
        ],
        aggregators: [
            (
                name: "basics",
                kind: Sequence(AllowOutOfOrder),
                messages: ["player/open", "player/look", "player/close"],
                success: Some("tutorial/basics_done"),
            ),
            (
                name: "practice",
                kind: Counter(3),
                messages: ["player/open"],
                activation: WhenExpected,
            ),
        ],
    )"#;

    #[test]
    fn test_parse_definition() {
        let definition = TutorialDefinition::from_ron_str(INTRO).unwrap();

        assert_eq!(definition.id, "intro");
        assert!(definition.streams[0].log);
        assert!(definition.streams[0].messages[1].allow_out_of_order);
        assert_eq!(
            definition.aggregators[0].kind,
            AggregatorKind::Sequence(SequenceMode::AllowOutOfOrder)
        );
        assert_eq!(definition.aggregators[0].activation, Activation::Always);
        assert_eq!(definition.aggregators[1].kind, AggregatorKind::Counter(3));
        assert_eq!(definition.aggregators[1].activation, Activation::WhenExpected);
        assert!(definition.indicators.is_empty());
    }

    #[test]
    fn test_invalid_ron_is_an_error() {
        let err = TutorialDefinition::from_ron_str("(id: 3)").unwrap_err();
        assert!(matches!(err, DefinitionError::Parse(_)));
    }

    #[test]
    fn test_message_ref_parse() {
        assert_eq!(
            MessageRef::parse("player/open").unwrap(),
            MessageRef {
                stream: "player",
                message: "open"
            }
        );
        for bad in ["player", "/open", "player/", "a/b/c"] {
            assert!(
                matches!(MessageRef::parse(bad), Err(DefinitionError::MalformedReference(_))),
                "{bad} should be rejected"
            );
        }
    }
}

use {
    crate::{StreamContext, StreamListener},
    bevy::log::info,
    tutorial_components::EventMessage,
};

/// Logs every message a stream delivers.
#[derive(Debug, Clone)]
pub struct StreamLogger {
    label: String,
}

impl StreamLogger {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl StreamListener for StreamLogger {
    fn on_message(&mut self, ctx: &mut StreamContext<'_>, message: &EventMessage) {
        let stream = ctx.hub.stream(ctx.stream).map_or("?", |s| s.name());
        info!(logger = %self.label, %stream, %message, "tutorial message");
    }
}

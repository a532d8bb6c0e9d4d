use tutorial_components::{EventMessage, MessageId, StreamId};

/// Allocates message identities and remembers every message ever declared.
#[derive(Debug, Default, Clone)]
pub struct MessageCatalog {
    messages: Vec<EventMessage>,
}

impl MessageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a message published by `stream`.
    pub fn allocate(
        &mut self,
        stream: StreamId,
        name: &str,
        allow_out_of_order: bool,
    ) -> EventMessage {
        self.push(Some(stream), name, allow_out_of_order)
    }

    /// Declares a message that no stream publishes.
    pub fn allocate_unbound(&mut self, name: &str) -> EventMessage {
        self.push(None, name, false)
    }

    fn push(
        &mut self,
        stream: Option<StreamId>,
        name: &str,
        allow_out_of_order: bool,
    ) -> EventMessage {
        let id = MessageId::from_index(self.messages.len());
        let message = EventMessage::new(id, stream, name, allow_out_of_order);
        self.messages.push(message.clone());
        message
    }

    pub fn get(&self, id: MessageId) -> Option<&EventMessage> {
        self.messages.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventMessage> {
        self.messages.iter()
    }
}

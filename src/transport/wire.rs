use std::collections::HashMap;
use std::fmt;

use crate::endpoint::{Endpoint, EndpointKind};
use crate::message::MessageId;

/// A destination resolved by a transport.
///
/// Named destinations are identified by kind and name. Temporary
/// destinations carry a unique name generated by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    kind: EndpointKind,
    name: String,
    temporary: bool,
}

impl Destination {
    pub fn new(kind: EndpointKind, name: impl Into<String>, temporary: bool) -> Self {
        Self {
            kind,
            name: name.into(),
            temporary,
        }
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// The endpoint this destination answers to.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::with_temporary(self.kind, self.name.clone(), self.temporary)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EndpointKind::Queue => "queue",
            EndpointKind::Topic => "topic",
        };
        if self.temporary {
            write!(f, "temp-{}://{}", kind, self.name)
        } else {
            write!(f, "{}://{}", kind, self.name)
        }
    }
}

/// A text message as carried by the transport, with its metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireMessage {
    text: String,
    message_id: Option<MessageId>,
    correlation_id: Option<MessageId>,
    reply_to: Option<Destination>,
    headers: HashMap<String, String>,
}

impl WireMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn body(&self) -> &str {
        &self.text
    }

    pub fn message_id(&self) -> Option<&MessageId> {
        self.message_id.as_ref()
    }

    /// Set by the transport when the message is sent.
    pub fn set_message_id(&mut self, message_id: Option<MessageId>) {
        self.message_id = message_id;
    }

    pub fn correlation_id(&self) -> Option<&MessageId> {
        self.correlation_id.as_ref()
    }

    pub fn set_correlation_id(&mut self, correlation_id: Option<MessageId>) {
        self.correlation_id = correlation_id;
    }

    pub fn reply_to(&self) -> Option<&Destination> {
        self.reply_to.as_ref()
    }

    pub fn set_reply_to(&mut self, reply_to: Option<Destination>) {
        self.reply_to = reply_to;
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }
}

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Envelope, MessageId};

/// Basic information that is sent over the message bus.
///
/// The message id is assigned by the transport when the message is sent, so
/// it is normally not set by hand. The correlation id is the id of an
/// earlier message this one relates to (a "Stopped" event correlated with
/// its "Stopping" event, or a response with its request). Both ids and any
/// received headers are carried out-of-band and are never JSON-encoded.
///
/// ## Example
///
/// ```
/// use std::collections::HashMap;
/// use bus_rpc::{BasicMessage, Envelope};
///
/// let details = HashMap::from([("key1".to_string(), "val1".to_string())]);
/// let msg = BasicMessage::with_details("hello", &details);
///
/// let json = msg.to_json().unwrap();
/// let decoded = BasicMessage::from_json(&json).unwrap();
/// assert_eq!(decoded.body(), "hello");
/// assert_eq!(decoded.details(), Some(&details));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicMessage {
    #[serde(skip)]
    message_id: Option<MessageId>,
    #[serde(skip)]
    correlation_id: Option<MessageId>,
    #[serde(skip)]
    headers: Option<HashMap<String, String>>,

    #[serde(rename = "message")]
    body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<HashMap<String, String>>,
}

impl BasicMessage {
    /// Create a message with a body and no details.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Create a message with a body and a copy of the given details.
    ///
    /// An empty map is stored as "no details".
    pub fn with_details(body: impl Into<String>, details: &HashMap<String, String>) -> Self {
        Self {
            body: body.into(),
            details: (!details.is_empty()).then(|| details.clone()),
            ..Self::default()
        }
    }

    /// The id assigned by the transport, if this message was sent or received.
    pub fn message_id(&self) -> Option<&MessageId> {
        self.message_id.as_ref()
    }

    pub fn set_message_id(&mut self, message_id: Option<MessageId>) {
        self.message_id = message_id;
    }

    /// The id of the message this one is correlated with, if any.
    pub fn correlation_id(&self) -> Option<&MessageId> {
        self.correlation_id.as_ref()
    }

    pub fn set_correlation_id(&mut self, correlation_id: Option<MessageId>) {
        self.correlation_id = correlation_id;
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Replace the body. Used by envelopes that compute their body.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    /// Read-only view of the details, if any were given.
    pub fn details(&self) -> Option<&HashMap<String, String>> {
        self.details.as_ref()
    }

    /// Transport headers this message arrived with.
    pub fn headers(&self) -> Option<&HashMap<String, String>> {
        self.headers.as_ref()
    }

    pub(crate) fn set_headers(&mut self, headers: Option<HashMap<String, String>>) {
        self.headers = headers;
    }

    /// Drop a caller-supplied message id ahead of a send.
    pub(crate) fn clear_message_id(&mut self) {
        if let Some(previous) = self.message_id.take() {
            debug!(message_id = %previous, "non-empty message id will be ignored and a new one generated");
        }
    }
}

impl Envelope for BasicMessage {
    fn basic(&self) -> &BasicMessage {
        self
    }

    fn basic_mut(&mut self) -> &mut BasicMessage {
        self
    }
}

impl fmt::Display for BasicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_envelope(f, "BasicMessage", self)
    }
}

/// Shared `Display` rendering for envelopes.
pub(crate) fn write_envelope<E: Envelope>(
    f: &mut fmt::Formatter<'_>,
    type_name: &str,
    envelope: &E,
) -> fmt::Result {
    let basic = envelope.basic();
    let display_id = |id: Option<&MessageId>| id.map(ToString::to_string).unwrap_or_else(|| "null".into());
    write!(
        f,
        "{}: [message-id={}, correlation-id={}, json-body=[{}]]",
        type_name,
        display_id(basic.message_id()),
        display_id(basic.correlation_id()),
        envelope.to_json().unwrap_or_default()
    )
}

//! Logical addresses of queues and topics.

use std::borrow::Cow;
use std::fmt;

/// Whether an endpoint is a queue (point-to-point) or a topic (fan-out).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// Each message is consumed by exactly one consumer.
    Queue,
    /// Each message is delivered to every consumer attached at send time.
    Topic,
}

impl EndpointKind {
    fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Queue => "QUEUE",
            EndpointKind::Topic => "TOPIC",
        }
    }
}

/// Identifies where messages are sent to or received from.
///
/// Equality covers kind, name and the temporary flag. Temporary endpoints
/// are allocated fresh by the transport each time they are resolved, so
/// their name is only kept for display.
///
/// ## Example
///
/// ```
/// use bus_rpc::{Endpoint, EndpointKind};
///
/// let orders = Endpoint::queue("orders");
/// assert_eq!(orders.kind(), EndpointKind::Queue);
/// assert_eq!(orders.to_string(), "{QUEUE}orders");
/// assert!(Endpoint::TEMPORARY_QUEUE.is_temporary());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    kind: EndpointKind,
    name: Cow<'static, str>,
    temporary: bool,
}

impl Endpoint {
    /// Anonymous temporary queue.
    pub const TEMPORARY_QUEUE: Endpoint = Endpoint {
        kind: EndpointKind::Queue,
        name: Cow::Borrowed("__tmpQueue__"),
        temporary: true,
    };

    /// Anonymous temporary topic.
    pub const TEMPORARY_TOPIC: Endpoint = Endpoint {
        kind: EndpointKind::Topic,
        name: Cow::Borrowed("__tmpTopic__"),
        temporary: true,
    };

    /// Create a named, non-temporary endpoint.
    pub fn new(kind: EndpointKind, name: impl Into<String>) -> Self {
        Self::with_temporary(kind, name, false)
    }

    /// Create an endpoint, choosing whether it is temporary.
    pub fn with_temporary(kind: EndpointKind, name: impl Into<String>, temporary: bool) -> Self {
        Self {
            kind,
            name: Cow::Owned(name.into()),
            temporary,
        }
    }

    /// Named queue.
    pub fn queue(name: impl Into<String>) -> Self {
        Self::new(EndpointKind::Queue, name)
    }

    /// Named topic.
    pub fn topic(name: impl Into<String>) -> Self {
        Self::new(EndpointKind::Topic, name)
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
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.temporary {
            write!(f, "{{{}}}$TEMPORARY$", self.kind.as_str())
        } else {
            write!(f, "{{{}}}{}", self.kind.as_str(), self.name)
        }
    }
}

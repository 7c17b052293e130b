use std::sync::Arc;

use crate::transport::{Connection, Destination, Session};

/// Connection, session and destination for one endpoint.
#[derive(Debug, Clone, Default)]
pub struct ConnectionContext {
    connection: Option<Arc<dyn Connection>>,
    session: Option<Arc<dyn Session>>,
    destination: Option<Destination>,
}

impl ConnectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> Option<&Arc<dyn Connection>> {
        self.connection.as_ref()
    }

    pub fn set_connection(&mut self, connection: Option<Arc<dyn Connection>>) {
        self.connection = connection;
    }

    pub fn session(&self) -> Option<&Arc<dyn Session>> {
        self.session.as_ref()
    }

    pub fn set_session(&mut self, session: Option<Arc<dyn Session>>) {
        self.session = session;
    }

    pub fn destination(&self) -> Option<&Destination> {
        self.destination.as_ref()
    }

    pub fn set_destination(&mut self, destination: Option<Destination>) {
        self.destination = destination;
    }

    /// Share `other`'s connection and session. The destination is left alone.
    pub fn copy_from(&mut self, other: &ConnectionContext) {
        self.connection = other.connection.clone();
        self.session = other.session.clone();
    }
}

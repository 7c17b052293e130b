use std::sync::Arc;

use url::Url;

use super::ConnectionFactory;
use crate::error::TransportError;

/// Resolve a broker URL to a connection factory for its transport binding.
///
/// Supported schemes:
/// - `memory://<broker-name>` (feature `memory`): an [`InMemoryBroker`]
///   started under that name. The broker only has to be running when the
///   first connection is made.
///
/// [`InMemoryBroker`]: super::memory::InMemoryBroker
pub fn connection_factory_for_url(
    broker_url: &str,
) -> Result<Arc<dyn ConnectionFactory>, TransportError> {
    let url = Url::parse(broker_url)
        .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", broker_url, e)))?;

    match url.scheme() {
        #[cfg(feature = "memory")]
        "memory" => {
            let name = url
                .host_str()
                .filter(|host| !host.is_empty())
                .ok_or_else(|| {
                    TransportError::InvalidUrl(format!("{}: missing broker name", broker_url))
                })?;
            Ok(Arc::new(super::memory::MemoryConnectionFactory::new(name)))
        }
        scheme => Err(TransportError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            broker_url, scheme
        ))),
    }
}

//! Resolver target URIs: `scheme:[//authority]/endpoint`.

use crate::base::neterror::NetError;
use std::fmt;
use url::Url;

/// A parsed target such as `dns:///example.com:443` or `ipv4:10.0.0.1:80`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Target {
    uri: String,
    scheme: String,
    authority: String,
    endpoint: String,
}

impl Target {
    pub fn parse(uri: &str) -> Result<Self, NetError> {
        let url = Url::parse(uri).map_err(|e| NetError::invalid_target(uri, e.to_string()))?;

        let authority = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };
        let endpoint = if url.cannot_be_a_base() {
            url.path().to_string()
        } else {
            url.path().trim_start_matches('/').to_string()
        };

        Ok(Self { uri: uri.to_string(), scheme: url.scheme().to_string(), authority, endpoint })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Name-server authority, empty when the target does not name one.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// The name to resolve.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

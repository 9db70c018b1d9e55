use serde::{Deserialize, Serialize};
use url::Url;

/// Transport binding for a presentment session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Binding {
    /// Short-range proximity radio, requiring local engagement before connection.
    Proximity,
    /// Remote request/response protocol resolved from a request URI.
    Remote { request_uri: RequestUri },
}

impl Binding {
    /// Whether this binding closes the channel itself after a completed exchange.
    pub fn is_remote(&self) -> bool {
        matches!(self, Binding::Remote { .. })
    }
}

/// A validated absolute request URI for the remote binding.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct RequestUri(Url);

impl std::ops::Deref for RequestUri {
    type Target = Url;

    fn deref(&self) -> &Url {
        &self.0
    }
}

impl TryFrom<String> for RequestUri {
    type Error = url::ParseError;

    fn try_from(uri: String) -> Result<Self, Self::Error> {
        uri.parse().map(Self)
    }
}

impl TryFrom<&str> for RequestUri {
    type Error = url::ParseError;

    fn try_from(uri: &str) -> Result<Self, Self::Error> {
        uri.parse().map(Self)
    }
}

impl From<Url> for RequestUri {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl std::fmt::Display for RequestUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn relative_request_uri_is_rejected() {
        assert!(RequestUri::try_from("/authorize?client_id=verifier").is_err());
        assert!(RequestUri::try_from("mdoc-openid4vp://authorize?client_id=verifier").is_ok());
    }
}

//! Endpoint string parsing
//!
//! Endpoints look like `tcp://host:port`: exactly one scheme and exactly one
//! `host:port` pair, so exactly two colons in total. `*` as host binds all
//! interfaces. Port 0 asks the OS for an ephemeral port.

use std::str::FromStr;

use crate::error::{Error, Result};

/// Transport named by an endpoint's scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Length-prefixed frames over TCP
    Tcp,
}

impl Scheme {
    fn as_str(&self) -> &'static str {
        match self {
            Scheme::Tcp => "tcp",
        }
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tcp" => Ok(Scheme::Tcp),
            other => Err(Error::UnsupportedScheme(other.to_string())),
        }
    }
}

/// A parsed, bindable endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl Endpoint {
    /// Parse `scheme://host:port`
    pub fn parse(endpoint: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };

        if endpoint.matches(':').count() != 2 {
            return Err(invalid("expected exactly one scheme and one host:port pair"));
        }

        let (scheme, addr) = endpoint
            .split_once("://")
            .ok_or_else(|| invalid("missing \"://\" after scheme"))?;
        if scheme.is_empty() {
            return Err(invalid("empty scheme"));
        }

        let (host, port) = addr
            .split_once(':')
            .ok_or_else(|| invalid("missing port"))?;
        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;

        let scheme = scheme.parse::<Scheme>()?;
        let host = if host == "*" { "0.0.0.0" } else { host };

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
        })
    }

    /// Transport scheme
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host to bind (`*` already expanded to `0.0.0.0`)
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port to bind
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Endpoint::parse(s)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)
    }
}

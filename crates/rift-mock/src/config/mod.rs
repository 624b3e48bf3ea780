//! Mock server configuration.
//!
//! Tests normally start a server with the defaults (loopback, OS-assigned
//! port). A config can also be loaded from YAML:
//!
//! ```yaml
//! host: 127.0.0.1
//! port: 0
//! default_response_headers:
//!   Content-Type: application/json
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    /// `0` lets the OS pick a free port.
    #[serde(default)]
    pub port: u16,
    /// Headers added to every matched response unless the expectation sets them.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub default_response_headers: BTreeMap<String, String>,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
            default_response_headers: BTreeMap::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileNotFound {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_yaml(&contents)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn with_default_response_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_response_headers
            .insert(name.into(), value.into());
        self
    }
}

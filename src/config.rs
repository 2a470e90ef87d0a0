//! Environment configuration.
//!
//! | Variable | Default |
//! |---|---|
//! | `SWITCHYARD_ADDR` | `0.0.0.0:3000` |
//! | `SWITCHYARD_BASE_PATH_HEADER` | `x-micro-web-base-path` |

use std::net::{Ipv4Addr, SocketAddr};

use serde::Deserialize;

use crate::error::Error;
use crate::proxy::DEFAULT_BASE_PATH_HEADER;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Address the server listens on.
    #[serde(default = "default_addr")]
    pub addr: SocketAddr,

    /// Header carrying the base path stripped by an upstream proxy.
    #[serde(default = "default_base_path_header")]
    pub base_path_header: String,
}

impl Config {
    pub const ENV_PREFIX: &'static str = "SWITCHYARD_";

    /// Reads `SWITCHYARD_*` variables from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Ok(envy::prefixed(Self::ENV_PREFIX).from_env()?)
    }

    /// Same as [`from_env`](Config::from_env), over explicit pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(Self::ENV_PREFIX).from_iter(vars)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { addr: default_addr(), base_path_header: default_base_path_header() }
    }
}

fn default_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 3000))
}

fn default_base_path_header() -> String {
    DEFAULT_BASE_PATH_HEADER.to_owned()
}

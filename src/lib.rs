//! Flattens hierarchical configuration documents into container keys:
//! dotted paths mapped to string values.
//!
//! ```text
//! server:                      server.host    = localhost
//!   host: localhost      =>    server.ports.# = 2
//!   ports: [80, 443]           server.ports.0 = 80
//!                              server.ports.1 = 443
//! ```

use {std::path::Path, tap::Pipe, tracing::instrument};

pub mod decode;
pub mod flatten_config;
pub mod value;

pub use {
    flatten_config::{
        flatten::{ContainerKeys, container_keys},
        keys::{ContainerKeysExt, SerializeContainerKeysExt},
    },
    value::Value,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Decoding configuration document")]
    Decode(#[from] decode::Error),
    #[error("Flattening configuration")]
    Flatten(#[from] flatten_config::flatten::Error),
}

/// Reads the document at `path` and flattens it.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load(path: impl AsRef<Path>) -> Result<ContainerKeys, Error> {
    decode::parse(path)?
        .pipe_ref(container_keys)
        .map_err(Error::from)
}

//! Turns configuration documents into a [`Value`] tree.
//!
//! Parse failures are always returned to the caller.

use {
    crate::value::Value,
    serde::Deserialize,
    std::{
        fs,
        io::Read,
        path::{Path, PathBuf},
    },
    tap::{Pipe, TapFallible},
    tracing::{debug, instrument},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Reading {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Reading document")]
    Read(#[source] std::io::Error),
    #[error("Parsing yaml")]
    Yaml(#[source] serde_yaml::Error),
    #[error("Parsing json")]
    Json(#[source] serde_json::Error),
}

type Result<T> = std::result::Result<T, self::Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Yaml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

/// An empty stream decodes to nothing at all; treat it as an empty mapping.
fn document_root(value: Value) -> Value {
    match value {
        Value::Null => Value::empty_mapping(),
        other => other,
    }
}

fn is_blank(input: &[u8]) -> bool {
    input.iter().all(u8::is_ascii_whitespace)
}

pub fn from_str(format: Format, input: &str) -> Result<Value> {
    from_slice(format, input.as_bytes())
}

#[instrument(skip(input), fields(len = input.len()))]
pub fn from_slice(format: Format, input: &[u8]) -> Result<Value> {
    match format {
        Format::Yaml if is_blank(input) => Ok(Value::Null),
        // only the first document of a multi-document stream is read
        Format::Yaml => serde_yaml::Deserializer::from_slice(input)
            .next()
            .map(Value::deserialize)
            .transpose()
            .map(|root| root.unwrap_or(Value::Null))
            .map_err(self::Error::Yaml),
        Format::Json => serde_json::from_slice::<Value>(input).map_err(self::Error::Json),
    }
    .map(document_root)
    .tap_ok(|root| debug!(kind = root.kind(), "decoded document"))
}

#[instrument(skip(reader))]
pub fn from_reader(format: Format, mut reader: impl Read) -> Result<Value> {
    Vec::new()
        .pipe(|mut buffer| {
            reader
                .read_to_end(&mut buffer)
                .map(|_| buffer)
                .map_err(self::Error::Read)
        })
        .and_then(|buffer| from_slice(format, &buffer))
}

/// Reads and decodes the file at `path`, picking the format from its extension.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn parse(path: impl AsRef<Path>) -> Result<Value> {
    path.as_ref().pipe(|path| {
        fs::read(path)
            .map_err(|source| self::Error::Io {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|bytes| from_slice(Format::from_path(path), &bytes))
    })
}

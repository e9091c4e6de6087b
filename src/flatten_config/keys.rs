use {
    super::{
        COUNT_TAG, JOIN_TAG,
        flatten::{self, ContainerKeys, container_keys},
    },
    crate::value::Value,
    serde::Serialize,
    tracing::instrument,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not serialize the value to a tree")]
    SerializingToValue(#[source] serde_json::Error),
    #[error("Flattening the serialized value")]
    Flattening(#[from] flatten::Error),
}

/// Reading side of the key naming convention.
#[extension_traits::extension(pub trait ContainerKeysExt)]
impl ContainerKeys {
    /// Length recorded under `<path>.#`, `None` when `path` is not a sequence.
    fn sequence_len(&self, path: &str) -> Option<usize> {
        self.get(&format!("{path}{JOIN_TAG}{COUNT_TAG}"))
            .and_then(|len| len.parse().ok())
    }

    /// Scalar value of every `<path>.<idx>`; elements that were containers are `None`.
    fn sequence_items(&self, path: &str) -> Option<Vec<Option<&str>>> {
        self.sequence_len(path).map(|len| {
            (0..len)
                .map(|idx| {
                    self.get(&format!("{path}{JOIN_TAG}{idx}"))
                        .map(String::as_str)
                })
                .collect()
        })
    }
}

/// Flattens anything serializable, e.g. a typed default configuration.
pub trait SerializeContainerKeysExt {
    fn to_container_keys(&self) -> Result<ContainerKeys, self::Error>;
}

impl<T> SerializeContainerKeysExt for T
where
    T: Serialize + ?Sized,
{
    #[instrument(skip_all, fields(ty = std::any::type_name::<T>()))]
    fn to_container_keys(&self) -> Result<ContainerKeys, self::Error> {
        serde_json::to_value(self)
            .and_then(Value::try_from)
            .map_err(self::Error::SerializingToValue)
            .and_then(|tree| container_keys(&tree).map_err(self::Error::from))
    }
}

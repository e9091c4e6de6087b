use {
    super::{KeyPath, Segment, boxed_iter},
    crate::value::Value,
    indexmap::IndexMap,
    std::iter::once,
    tap::{Pipe, TapFallible},
    tracing::{debug, instrument, warn},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported top level value, it expected a mapping, found {0}")]
    UnsupportedTopLevelValue(&'static str),
    #[error("'{prefix}': map key is not a string: {key}")]
    NonStringKey { prefix: String, key: Value },
    #[error("'{prefix}': unsupported {kind} value, it expected a bool | integer | string | sequence | mapping, found {value}")]
    UnsupportedValueKind {
        prefix: String,
        kind: &'static str,
        value: Value,
    },
}

type Result<T> = std::result::Result<T, self::Error>;

/// Dotted key -> string value, in document order.
pub type ContainerKeys = IndexMap<String, String>;

/// Lazily walks `value`, yielding one entry per scalar leaf and one `#` entry per sequence.
pub fn flattened_iter<'a>(
    prefix: KeyPath<'a>,
    value: &'a Value,
) -> Box<dyn Iterator<Item = Result<(KeyPath<'a>, String)>> + 'a> {
    match value {
        Value::Bool(value) => once(Ok((prefix, value.to_string()))).pipe(boxed_iter),
        Value::Int(value) => once(Ok((prefix, value.to_string()))).pipe(boxed_iter),
        Value::String(value) => once(Ok((prefix, value.clone()))).pipe(boxed_iter),
        Value::Mapping(entries) => entries
            .iter()
            .flat_map(move |(key, value)| match key {
                Value::String(key) => flattened_iter(prefix.join(Segment::field(key)), value),
                other => once(Err(self::Error::NonStringKey {
                    prefix: prefix.to_string(),
                    key: other.clone(),
                }))
                .pipe(boxed_iter),
            })
            .pipe(boxed_iter),
        Value::Sequence(items) => once(Ok((prefix.join(Segment::Count), items.len().to_string())))
            .chain(
                items
                    .iter()
                    .enumerate()
                    .flat_map(move |(idx, item)| flattened_iter(prefix.join(Segment::Idx(idx)), item)),
            )
            .pipe(boxed_iter),
        unsupported @ (Value::Null | Value::Float(_) | Value::Bytes(_) | Value::Tagged { .. }) => {
            once(Err(self::Error::UnsupportedValueKind {
                prefix: prefix.to_string(),
                kind: unsupported.kind(),
                value: unsupported.clone(),
            }))
            .pipe(boxed_iter)
        }
    }
}

/// Flattens a parsed configuration tree into container keys.
///
/// The root must be a mapping. Fails on the first non-string map key or
/// unsupported scalar, in which case nothing is returned.
#[instrument(skip_all)]
pub fn container_keys(tree: &Value) -> Result<ContainerKeys> {
    match tree {
        Value::Mapping(_) => flattened_iter(KeyPath::default(), tree).pipe(Ok),
        other => Err(self::Error::UnsupportedTopLevelValue(other.kind())),
    }
    .and_then(|mut entries| {
        entries.try_fold(ContainerKeys::new(), |mut keys, next| {
            next.map(|(path, value)| {
                let key = path.to_string();
                if let Some(previous) = keys.insert(key.clone(), value) {
                    warn!(%key, %previous, "container key produced twice, keeping the last value");
                }
                keys
            })
        })
    })
    .tap_ok(|keys| debug!(count = keys.len(), "flattened configuration"))
    .tap_err(|error| debug!(%error, "flattening failed"))
}

#[cfg(test)]
mod tests {
    use {super::*, anyhow::Context, serde_json::json};

    fn tree(value: serde_json::Value) -> Value {
        Value::try_from(value).expect("json fixtures are always decodable")
    }

    fn expected<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> ContainerKeys {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// (scalar leaves, sequences)
    fn census(value: &Value) -> (usize, usize) {
        match value {
            Value::Mapping(entries) => entries
                .iter()
                .map(|(_, v)| census(v))
                .fold((0, 0), |(l, s), (cl, cs)| (l + cl, s + cs)),
            Value::Sequence(items) => items
                .iter()
                .map(census)
                .fold((0, 1), |(l, s), (cl, cs)| (l + cl, s + cs)),
            _ => (1, 0),
        }
    }

    #[test_log::test]
    fn test_server_example() -> anyhow::Result<()> {
        let keys = container_keys(&tree(json!({
            "server": {"host": "localhost", "ports": [80, 443], "tls": true}
        })))?;
        assert_eq!(
            keys,
            expected([
                ("server.host", "localhost"),
                ("server.ports.#", "2"),
                ("server.ports.0", "80"),
                ("server.ports.1", "443"),
                ("server.tls", "true"),
            ])
        );
        Ok(())
    }

    #[test]
    fn test_wire_contract_example() -> anyhow::Result<()> {
        let keys = container_keys(&tree(json!({"a": {"b": [true, 5]}})))?;
        assert_eq!(keys, expected([("a.b.#", "2"), ("a.b.0", "true"), ("a.b.1", "5")]));
        Ok(())
    }

    #[test]
    fn test_count_key_comes_before_items() -> anyhow::Result<()> {
        let keys = container_keys(&tree(json!({"list": ["x", "y"]})))?;
        assert_eq!(
            keys.keys().map(String::as_str).collect::<Vec<_>>(),
            ["list.#", "list.0", "list.1"]
        );
        Ok(())
    }

    #[test]
    fn test_booleans_are_lowercase() -> anyhow::Result<()> {
        let keys = container_keys(&tree(json!({"on": true, "off": false})))?;
        assert_eq!(keys["on"], "true");
        assert_eq!(keys["off"], "false");
        Ok(())
    }

    #[test]
    fn test_strings_are_verbatim() -> anyhow::Result<()> {
        let keys = container_keys(&tree(json!({"zip": "00123", "empty": "", "dotted": "a.b"})))?;
        assert_eq!(keys, expected([("zip", "00123"), ("empty", ""), ("dotted", "a.b")]));
        Ok(())
    }

    #[test]
    fn test_negative_and_wide_integers() -> anyhow::Result<()> {
        let keys = container_keys(&Value::mapping([
            ("low", Value::from(i64::MIN)),
            ("high", Value::from(u64::MAX)),
        ]))?;
        assert_eq!(keys["low"], "-9223372036854775808");
        assert_eq!(keys["high"], "18446744073709551615");
        Ok(())
    }

    #[test]
    fn test_nested_sequences_and_mappings() -> anyhow::Result<()> {
        let keys = container_keys(&tree(json!({
            "clusters": [
                {"name": "a", "nodes": [1, 2, 3]},
                {"name": "b", "nodes": []},
            ],
            "matrix": [[1], []],
        })))?;
        assert_eq!(
            keys,
            expected([
                ("clusters.#", "2"),
                ("clusters.0.name", "a"),
                ("clusters.0.nodes.#", "3"),
                ("clusters.0.nodes.0", "1"),
                ("clusters.0.nodes.1", "2"),
                ("clusters.0.nodes.2", "3"),
                ("clusters.1.name", "b"),
                ("clusters.1.nodes.#", "0"),
                ("matrix.#", "2"),
                ("matrix.0.#", "1"),
                ("matrix.0.0", "1"),
                ("matrix.1.#", "0"),
            ])
        );
        Ok(())
    }

    #[test]
    fn test_entry_count_is_leaves_plus_sequences() -> anyhow::Result<()> {
        let input = tree(json!({
            "a": {"b": [true, 5, {"c": ["x", []]}]},
            "d": "e",
            "f": {},
            "g": [[["h"]]],
        }));
        let (leaves, sequences) = census(&input);
        let keys = container_keys(&input)?;
        anyhow::ensure!(
            keys.len() == leaves + sequences,
            "{} entries, {leaves} leaves, {sequences} sequences:\n{keys:#?}",
            keys.len()
        );
        Ok(())
    }

    #[test]
    fn test_flattening_is_repeatable() -> anyhow::Result<()> {
        let input = tree(json!({"a": [1, {"b": false}], "c": "d"}));
        let first = container_keys(&input).context("first pass")?;
        let second = container_keys(&input).context("second pass")?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_empty_mapping() -> anyhow::Result<()> {
        assert!(container_keys(&Value::empty_mapping())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_empty_nested_mapping_emits_nothing() -> anyhow::Result<()> {
        assert_eq!(
            container_keys(&tree(json!({"a": {}, "b": 1})))?,
            expected([("b", "1")])
        );
        Ok(())
    }

    #[test]
    fn test_non_string_key() {
        let input = Value::mapping([(
            "ports",
            Value::mapping([(Value::from(80), "http"), (Value::from(443), "https")]),
        )]);
        match container_keys(&input) {
            Err(Error::NonStringKey { prefix, key }) => {
                assert_eq!(prefix, "ports");
                assert_eq!(key, Value::from(80));
            }
            other => panic!("expected NonStringKey, got {other:?}"),
        }
    }

    #[test]
    fn test_non_string_key_at_root() {
        let input = Value::mapping([(Value::from(true), "yes")]);
        assert!(matches!(
            container_keys(&input),
            Err(Error::NonStringKey { prefix, .. }) if prefix.is_empty()
        ));
    }

    #[test]
    fn test_float_is_unsupported() {
        match container_keys(&tree(json!({"limits": {"ratio": 0.75}}))) {
            Err(Error::UnsupportedValueKind { prefix, kind, value }) => {
                assert_eq!(prefix, "limits.ratio");
                assert_eq!(kind, "float");
                assert_eq!(value, Value::Float(0.75));
            }
            other => panic!("expected UnsupportedValueKind, got {other:?}"),
        }
    }

    #[test]
    fn test_null_inside_sequence_is_unsupported() {
        match container_keys(&tree(json!({"items": ["a", null]}))) {
            Err(Error::UnsupportedValueKind { prefix, kind, .. }) => {
                assert_eq!(prefix, "items.1");
                assert_eq!(kind, "null");
            }
            other => panic!("expected UnsupportedValueKind, got {other:?}"),
        }
    }

    #[test]
    fn test_error_message_names_the_path() {
        let error = container_keys(&tree(json!({"a": {"b": null}})))
            .expect_err("null is not a supported value");
        let message = error.to_string();
        assert!(message.contains("'a.b'"), "{message}");
        assert!(message.contains("null"), "{message}");
    }

    #[test]
    fn test_top_level_must_be_a_mapping() {
        assert!(matches!(
            container_keys(&tree(json!([1, 2]))),
            Err(Error::UnsupportedTopLevelValue("sequence"))
        ));
        assert!(matches!(
            container_keys(&Value::from("scalar")),
            Err(Error::UnsupportedTopLevelValue("string"))
        ));
    }

    #[test_log::test]
    fn test_colliding_paths_keep_the_last_value() -> anyhow::Result<()> {
        let keys = container_keys(&tree(json!({"a.b": "flat", "a": {"b": "nested"}})))?;
        assert_eq!(keys, expected([("a.b", "nested")]));
        Ok(())
    }
}

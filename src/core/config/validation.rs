use serde_json::{Map, Value};

use crate::core::errors::RagError;

pub fn validate_config(config: &Value) -> Result<(), RagError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(chunker) = expect_optional_object(root, "chunker")? {
        validate_u64_field(chunker, "chunker.target_size", "target_size", 1, 1_000_000)?;
        validate_u64_field(
            chunker,
            "chunker.extended_size",
            "extended_size",
            1,
            1_000_000,
        )?;

        let target = chunker.get("target_size").and_then(Value::as_u64);
        let extended = chunker.get("extended_size").and_then(Value::as_u64);
        if let (Some(target), Some(extended)) = (target, extended) {
            if extended < target {
                return Err(RagError::Validation(
                    "Invalid config at 'chunker.extended_size': must be >= chunker.target_size"
                        .to_string(),
                ));
            }
        }
    }

    if let Some(cache) = expect_optional_object(root, "cache")? {
        validate_u64_field(
            cache,
            "cache.namespace_ttl_secs",
            "namespace_ttl_secs",
            1,
            31_536_000,
        )?;
        validate_u64_field(
            cache,
            "cache.document_ttl_secs",
            "document_ttl_secs",
            1,
            31_536_000,
        )?;
        validate_u64_field(
            cache,
            "cache.cleanup_interval_secs",
            "cleanup_interval_secs",
            0,
            86_400,
        )?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 1_000)?;
        validate_u64_field(
            retrieval,
            "retrieval.store_timeout_ms",
            "store_timeout_ms",
            1,
            600_000,
        )?;
        validate_u64_field(
            retrieval,
            "retrieval.embed_timeout_ms",
            "embed_timeout_ms",
            1,
            600_000,
        )?;
    }

    if let Some(session) = expect_optional_object(root, "session")? {
        validate_u64_field(session, "session.max_history", "max_history", 1, 1_000)?;
        validate_u64_field(
            session,
            "session.max_sessions",
            "max_sessions",
            1,
            10_000_000,
        )?;
        validate_u64_field(
            session,
            "session.idle_ttl_secs",
            "idle_ttl_secs",
            1,
            31_536_000,
        )?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_optional_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_optional_string_field(embedding, "embedding.model", "model")?;
        validate_optional_string_field(embedding, "embedding.api_key", "api_key")?;
        validate_u64_field(
            embedding,
            "embedding.request_timeout_secs",
            "request_timeout_secs",
            1,
            3_600,
        )?;
    }

    if let Some(store) = expect_optional_object(root, "store")? {
        validate_optional_string_field(store, "store.db_file", "db_file")?;
        validate_u64_field(
            store,
            "store.upsert_batch_size",
            "upsert_batch_size",
            1,
            10_000,
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, RagError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(RagError::Validation(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(RagError::Validation(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> RagError {
    RagError::Validation(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_and_partial_configs() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({ "cache": { "namespace_ttl_secs": 120 } })).is_ok());
    }

    #[test]
    fn rejects_extended_smaller_than_target() {
        let err = validate_config(&json!({
            "chunker": { "target_size": 900, "extended_size": 600 }
        }))
        .unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
    }

    #[test]
    fn rejects_wrong_types_and_ranges() {
        assert!(validate_config(&json!({ "retrieval": { "top_k": "three" } })).is_err());
        assert!(validate_config(&json!({ "retrieval": { "top_k": 0 } })).is_err());
        assert!(validate_config(&json!({ "session": [] })).is_err());
        assert!(validate_config(&json!({ "embedding": { "model": "  " } })).is_err());
    }

    #[test]
    fn cleanup_interval_may_be_zero() {
        assert!(validate_config(&json!({ "cache": { "cleanup_interval_secs": 0 } })).is_ok());
    }
}

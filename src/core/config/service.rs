use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::RagSettings;
use super::validation::validate_config;
use crate::core::errors::RagError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 9] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "access_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "token_count", "tokens"];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("TENANT_RAG_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Public config with secrets merged over it, validated but untyped.
    pub fn load_config(&self) -> Result<Value, RagError> {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        let merged = deep_merge(&public_config, &secrets_config);
        validate_config(&merged)?;
        Ok(merged)
    }

    pub fn load_settings(&self) -> Result<RagSettings, RagError> {
        let merged = self.load_config()?;
        let mut settings: RagSettings = serde_json::from_value(merged)
            .map_err(|e| RagError::Config(format!("Failed to parse settings: {}", e)))?;

        if settings.embedding.api_key.is_none() {
            settings.embedding.api_key = env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty());
        }

        Ok(settings)
    }

    /// Merged config with secret values masked, safe to log.
    pub fn redacted_config(&self) -> Result<Value, RagError> {
        Ok(redact_sensitive_values(&self.load_config()?))
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, RagError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| RagError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

    match serde_yaml::from_str::<Value>(&contents) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(Value::Null) => Ok(Value::Object(Map::new())),
        Ok(_) => Err(RagError::Config(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
        Err(e) => Err(RagError::Config(format!(
            "Failed to parse {}: {}",
            path.display(),
            e
        ))),
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service_in(dir: &Path) -> ConfigService {
        let paths = AppPaths::with_data_dir(dir.to_path_buf(), dir.join("data"));
        ConfigService::new(Arc::new(paths))
    }

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
        });
        let override_value = json!({
            "b": { "c": 99 },
            "e": "x"
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "a": 1,
                "b": { "c": 99, "d": 3 },
                "e": "x"
            })
        );
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "embedding": {
                "api_key": "sk-live",
                "model": "text-embedding-ada-002"
            },
            "session": { "max_history": 5 }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "embedding": {
                    "api_key": "****",
                    "model": "text-embedding-ada-002"
                },
                "session": { "max_history": 5 }
            })
        );
    }

    #[test]
    fn missing_files_yield_default_settings() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        let settings = service.load_settings().unwrap();
        assert_eq!(settings.chunker.target_size, 700);
        assert_eq!(settings.chunker.extended_size, 1200);
        assert_eq!(settings.session.max_history, 5);
        assert_eq!(settings.retrieval.top_k, 3);
    }

    #[test]
    fn secrets_override_public_config() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        fs::write(
            dir.path().join("config.yml"),
            "cache:\n  namespace_ttl_secs: 120\nembedding:\n  model: embed-small\n",
        )
        .unwrap();
        fs::write(
            service.secrets_path(),
            "embedding:\n  api_key: from-secrets\n",
        )
        .unwrap();

        let settings = service.load_settings().unwrap();
        assert_eq!(settings.cache.namespace_ttl_secs, 120);
        assert_eq!(settings.embedding.model, "embed-small");
        assert_eq!(settings.embedding.api_key.as_deref(), Some("from-secrets"));
    }

    #[test]
    fn redacted_config_masks_secrets_from_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        fs::write(dir.path().join("config.yml"), "embedding:\n  model: embed-small\n").unwrap();
        fs::write(service.secrets_path(), "embedding:\n  api_key: from-secrets\n").unwrap();

        let redacted = service.redacted_config().unwrap();
        assert_eq!(redacted["embedding"]["api_key"], json!("****"));
        assert_eq!(redacted["embedding"]["model"], json!("embed-small"));
        assert!(!redacted.to_string().contains("from-secrets"));
    }

    #[test]
    fn invalid_yaml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());
        fs::write(dir.path().join("config.yml"), "chunker: [unterminated\n").unwrap();

        assert!(matches!(service.load_settings(), Err(RagError::Config(_))));
    }
}

use std::env;
use std::fs;
use std::path::Path;

use budtender_core::config::{detect_config_path, AppConfig};
use secrecy::SecretString;
use toml::Value;

use crate::commands::{load_config, CommandResult};

/// Prints the effective configuration with the source of every value.
/// Secrets are never printed.
pub fn run() -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("config", failure),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value) in effective_values(&config) {
        let source = field_source(key_path, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key_path, &value, source));
    }

    CommandResult::success("config", lines.join("\n"))
}

pub(crate) fn effective_values(config: &AppConfig) -> Vec<(&'static str, String)> {
    vec![
        ("database.url", config.database.url.clone()),
        ("database.max_connections", config.database.max_connections.to_string()),
        ("database.timeout_secs", config.database.timeout_secs.to_string()),
        ("llm.provider", format!("{:?}", config.llm.provider)),
        ("llm.model", config.llm.model.clone()),
        ("llm.base_url", config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string())),
        ("llm.api_key", redact(config.llm.api_key.as_ref())),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string()),
        ("embedding.enabled", config.embedding.enabled.to_string()),
        ("embedding.base_url", config.embedding.base_url.clone()),
        ("embedding.model", config.embedding.model.clone()),
        ("embedding.api_key", redact(config.embedding.api_key.as_ref())),
        ("relay.enabled", config.relay.enabled.to_string()),
        (
            "relay.webhook_url",
            config.relay.webhook_url.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        ("relay.signing_secret", redact(config.relay.signing_secret.as_ref())),
        ("cache.catalog_ttl_secs", config.cache.catalog_ttl_secs.to_string()),
        ("cache.similarity_threshold", config.cache.similarity_threshold.to_string()),
        ("cache.promotion_threshold", config.cache.promotion_threshold.to_string()),
        ("cache.exact_ttl_secs", config.cache.exact_ttl_secs.to_string()),
        ("server.bind_address", config.server.bind_address.clone()),
        ("server.port", config.server.port.to_string()),
        ("server.graceful_shutdown_secs", config.server.graceful_shutdown_secs.to_string()),
        ("logging.level", config.logging.level.clone()),
        ("logging.format", format!("{:?}", config.logging.format)),
    ]
}

fn redact(secret: Option<&SecretString>) -> String {
    let shown = if secret.is_some() { "<redacted>" } else { "<unset>" };
    shown.to_string()
}

/// `database.url` -> `BUDTENDER_DATABASE_URL`.
fn env_key(key_path: &str) -> String {
    format!("BUDTENDER_{}", key_path.replace('.', "_").to_ascii_uppercase())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let env_key = env_key(key_path);
    if env::var_os(&env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use budtender_core::config::AppConfig;
    use toml::Value;

    use super::{contains_path, effective_values, env_key};

    #[test]
    fn env_keys_follow_section_and_field() {
        assert_eq!(env_key("database.url"), "BUDTENDER_DATABASE_URL");
        assert_eq!(env_key("relay.signing_secret"), "BUDTENDER_RELAY_SIGNING_SECRET");
    }

    #[test]
    fn secrets_are_redacted() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-live-123".to_string().into());

        let values = effective_values(&config);
        let lookup = |key: &str| {
            values.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone()).expect("key present")
        };

        assert_eq!(lookup("llm.api_key"), "<redacted>");
        assert_eq!(lookup("relay.signing_secret"), "<unset>");
        assert!(values.iter().all(|(_, value)| !value.contains("sk-live-123")));
    }

    #[test]
    fn nested_toml_paths_are_found() {
        let doc = "[cache]\nsimilarity_threshold = 0.9\n".parse::<Value>().expect("toml");
        assert!(contains_path(&doc, "cache.similarity_threshold"));
        assert!(!contains_path(&doc, "cache.exact_ttl_secs"));
    }
}

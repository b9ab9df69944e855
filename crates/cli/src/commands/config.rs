use concierge_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_secret(key.expose_secret()))
        .unwrap_or_else(|| "(unset)".to_string());

    let lines = vec![
        "effective config (source precedence: override > env > file > default):".to_string(),
        format!("  database.url = {}", config.database.url),
        format!("  database.max_connections = {}", config.database.max_connections),
        format!("  database.timeout_secs = {}", config.database.timeout_secs),
        format!("  llm.provider = {:?}", config.llm.provider),
        format!("  llm.model = {}", config.llm.model),
        format!("  llm.api_key = {api_key}"),
        format!("  llm.base_url = {}", config.llm.base_url.as_deref().unwrap_or("(unset)")),
        format!("  llm.timeout_secs = {}", config.llm.timeout_secs),
        format!("  llm.max_retries = {}", config.llm.max_retries),
        format!("  server.bind_address = {}", config.server.bind_address),
        format!("  server.port = {}", config.server.port),
        format!("  server.graceful_shutdown_secs = {}", config.server.graceful_shutdown_secs),
        format!("  logging.level = {}", config.logging.level),
        format!("  logging.format = {:?}", config.logging.format),
    ];

    lines.join("\n")
}

fn redact_secret(value: &str) -> String {
    if value.len() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", &value[..4])
    }
}

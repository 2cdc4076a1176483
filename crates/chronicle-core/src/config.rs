use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Upper bound on transport retries. Keeps a flapping endpoint from
/// turning one request into an unbounded loop.
pub const MAX_TRANSPORT_RETRIES: u32 = 10;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let parse_retries = |var: &str| -> Result<u32, ConfigError> {
        let value = parse_u32(var, "3")?;
        if value > MAX_TRANSPORT_RETRIES {
            return Err(invalid(
                var,
                format!("must be at most {MAX_TRANSPORT_RETRIES}, got {value}"),
            ));
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("CHRONICLE_ENV", "development"))?;
    let bind_addr = or_default("CHRONICLE_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("CHRONICLE_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("CHRONICLE_LOG_LEVEL", "info");

    let crm_instance_url = require("CRM_INSTANCE_URL")?;
    let crm_access_token = require("CRM_ACCESS_TOKEN")?;
    let crm_api_version = or_default("CRM_API_VERSION", "v60.0");
    let crm_summary_object = or_default("CRM_SUMMARY_OBJECT", "Account_Summary__c");
    let crm_request_timeout_secs = parse_u64("CRM_REQUEST_TIMEOUT_SECS", "60")?;
    let crm_max_retries = parse_retries("CRM_MAX_RETRIES")?;
    let crm_retry_backoff_base_ms = parse_u64("CRM_RETRY_BACKOFF_BASE_MS", "1000")?;

    let openai_api_key = require("OPENAI_API_KEY")?;
    let openai_base_url = or_default("OPENAI_BASE_URL", "https://api.openai.com/v1");
    let openai_model = or_default("OPENAI_MODEL", "gpt-4o");
    let ai_request_timeout_secs = parse_u64("AI_REQUEST_TIMEOUT_SECS", "120")?;
    let ai_max_retries = parse_retries("AI_MAX_RETRIES")?;
    let ai_run_poll_interval_ms = parse_u64("AI_RUN_POLL_INTERVAL_MS", "1000")?;
    let ai_run_timeout_secs = parse_u64("AI_RUN_TIMEOUT_SECS", "600")?;

    let sub_batch_size = parse_positive_usize("PIPELINE_SUB_BATCH_SIZE", "500")?;
    let inline_max_records = parse_positive_usize("PIPELINE_INLINE_MAX_RECORDS", "1500")?;
    let inline_max_chars = parse_positive_usize("PIPELINE_INLINE_MAX_CHARS", "256000")?;
    let field_max_chars = parse_positive_usize("PIPELINE_FIELD_MAX_CHARS", "131070")?;
    let callback_timeout_secs = parse_u64("CALLBACK_TIMEOUT_SECS", "30")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        crm_instance_url,
        crm_access_token,
        crm_api_version,
        crm_summary_object,
        crm_request_timeout_secs,
        crm_max_retries,
        crm_retry_backoff_base_ms,
        openai_api_key,
        openai_base_url,
        openai_model,
        ai_request_timeout_secs,
        ai_max_retries,
        ai_run_poll_interval_ms,
        ai_run_timeout_secs,
        sub_batch_size,
        inline_max_records,
        inline_max_chars,
        field_max_chars,
        callback_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CHRONICLE_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

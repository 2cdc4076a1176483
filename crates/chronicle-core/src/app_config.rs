use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub crm_instance_url: String,
    pub crm_access_token: String,
    pub crm_api_version: String,
    pub crm_summary_object: String,
    pub crm_request_timeout_secs: u64,
    pub crm_max_retries: u32,
    pub crm_retry_backoff_base_ms: u64,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub ai_request_timeout_secs: u64,
    pub ai_max_retries: u32,
    pub ai_run_poll_interval_ms: u64,
    pub ai_run_timeout_secs: u64,
    pub sub_batch_size: usize,
    pub inline_max_records: usize,
    pub inline_max_chars: usize,
    pub field_max_chars: usize,
    pub callback_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("crm_instance_url", &self.crm_instance_url)
            .field("crm_access_token", &"[redacted]")
            .field("crm_api_version", &self.crm_api_version)
            .field("crm_summary_object", &self.crm_summary_object)
            .field("crm_request_timeout_secs", &self.crm_request_timeout_secs)
            .field("crm_max_retries", &self.crm_max_retries)
            .field("crm_retry_backoff_base_ms", &self.crm_retry_backoff_base_ms)
            .field("openai_api_key", &"[redacted]")
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("ai_request_timeout_secs", &self.ai_request_timeout_secs)
            .field("ai_max_retries", &self.ai_max_retries)
            .field("ai_run_poll_interval_ms", &self.ai_run_poll_interval_ms)
            .field("ai_run_timeout_secs", &self.ai_run_timeout_secs)
            .field("sub_batch_size", &self.sub_batch_size)
            .field("inline_max_records", &self.inline_max_records)
            .field("inline_max_chars", &self.inline_max_chars)
            .field("field_max_chars", &self.field_max_chars)
            .field("callback_timeout_secs", &self.callback_timeout_secs)
            .finish()
    }
}

use std::path::PathBuf;

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

/// Process-wide configuration for one worker, read from the environment.
///
/// One worker owns one browser session and one site; per-site behavior
/// (selectors, locale, timezone) lives in the site catalog, not here.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub sites_path: PathBuf,
    pub results_table: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub webdriver_url: String,
    pub user_agent: Option<String>,
    pub page_load_timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_unit_secs: u64,
    pub pacing_min_ms: u64,
    pub pacing_max_ms: u64,
    pub flush_every: usize,
    pub remote_root: PathBuf,
    pub reference_timezone: String,
    pub webhook_url: Option<String>,
    pub diagnostics_dir: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("sites_path", &self.sites_path)
            .field("results_table", &self.results_table)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("webdriver_url", &self.webdriver_url)
            .field("user_agent", &self.user_agent)
            .field("page_load_timeout_secs", &self.page_load_timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_unit_secs", &self.backoff_unit_secs)
            .field("pacing_min_ms", &self.pacing_min_ms)
            .field("pacing_max_ms", &self.pacing_max_ms)
            .field("flush_every", &self.flush_every)
            .field("remote_root", &self.remote_root)
            .field("reference_timezone", &self.reference_timezone)
            .field(
                "webhook_url",
                &self.webhook_url.as_ref().map(|_| "[redacted]"),
            )
            .field("diagnostics_dir", &self.diagnostics_dir)
            .finish()
    }
}

use std::net::SocketAddr;
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

/// Fixed browser viewport in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub browser_executable: Option<PathBuf>,
    pub browser_headless: bool,
    pub scraper_user_agent: String,
    pub scraper_locale: String,
    pub scraper_viewport: Viewport,
    pub scraper_navigation_timeout_secs: u64,
    pub scraper_results_timeout_secs: u64,
    pub scraper_max_items_per_page: usize,
    pub scraper_max_concurrent_items: usize,
    pub diagnostics_dir: PathBuf,
    pub diagnostics_enabled: bool,
    pub schedule_cron: String,
    pub schedule_enabled: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("browser_executable", &self.browser_executable)
            .field("browser_headless", &self.browser_headless)
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_locale", &self.scraper_locale)
            .field("scraper_viewport", &self.scraper_viewport)
            .field(
                "scraper_navigation_timeout_secs",
                &self.scraper_navigation_timeout_secs,
            )
            .field(
                "scraper_results_timeout_secs",
                &self.scraper_results_timeout_secs,
            )
            .field(
                "scraper_max_items_per_page",
                &self.scraper_max_items_per_page,
            )
            .field(
                "scraper_max_concurrent_items",
                &self.scraper_max_concurrent_items,
            )
            .field("diagnostics_dir", &self.diagnostics_dir)
            .field("diagnostics_enabled", &self.diagnostics_enabled)
            .field("schedule_cron", &self.schedule_cron)
            .field("schedule_enabled", &self.schedule_enabled)
            .finish()
    }
}

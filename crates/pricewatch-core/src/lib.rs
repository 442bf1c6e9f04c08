pub mod app_config;
pub mod config;
pub mod history;
pub mod offers;

pub use app_config::{AppConfig, Environment, Viewport};
pub use config::{load_app_config, load_app_config_from_env};
pub use history::{HistoryEntry, HistoryError, HistorySink};
pub use offers::{
    DiagnosticRecord, FailureKind, ItemResult, Offer, ScrapeBatchResult, Site, SiteFailure,
    SiteResult, WishItem, CURRENCY_CODE, INSTALLMENTS_NOT_INFORMED,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown site: {0}")]
    UnknownSite(String),

    #[error("unknown failure kind: {0}")]
    UnknownFailureKind(String),
}

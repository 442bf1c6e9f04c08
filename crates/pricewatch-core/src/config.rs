use crate::app_config::{AppConfig, Environment, Viewport};
use crate::ConfigError;

/// Desktop Chrome on Windows, matching what Brazilian storefronts serve their
/// regular layout to.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

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
/// Parsing and validation live here, decoupled from the real environment so
/// tests can drive it with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
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
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let parse_positive_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let value = parse_u64(var, default)?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        parse_flag(&or_default(var, default)).ok_or_else(|| {
            invalid(
                var,
                "expected one of true/false/1/0/yes/no/on/off".to_string(),
            )
        })
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("PRICEWATCH_ENV", "development"))?;

    let bind_addr = or_default("PRICEWATCH_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("PRICEWATCH_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("PRICEWATCH_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("PRICEWATCH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PRICEWATCH_DB_MIN_CONNECTIONS", "1")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "PRICEWATCH_DB_MIN_CONNECTIONS",
            format!("must not exceed PRICEWATCH_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }
    let db_acquire_timeout_secs = parse_u64("PRICEWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let browser_executable = lookup("PRICEWATCH_BROWSER_EXECUTABLE")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);
    let browser_headless = parse_bool("PRICEWATCH_BROWSER_HEADLESS", "true")?;

    let scraper_user_agent = or_default("PRICEWATCH_SCRAPER_USER_AGENT", DEFAULT_USER_AGENT);
    let scraper_locale = or_default("PRICEWATCH_SCRAPER_LOCALE", "pt-BR");
    let scraper_viewport = parse_viewport(&or_default("PRICEWATCH_SCRAPER_VIEWPORT", "1366x768"))
        .map_err(|reason| invalid("PRICEWATCH_SCRAPER_VIEWPORT", reason))?;
    let scraper_navigation_timeout_secs =
        parse_positive_u64("PRICEWATCH_SCRAPER_NAVIGATION_TIMEOUT_SECS", "30")?;
    let scraper_results_timeout_secs =
        parse_positive_u64("PRICEWATCH_SCRAPER_RESULTS_TIMEOUT_SECS", "15")?;
    let scraper_max_items_per_page =
        parse_positive_usize("PRICEWATCH_SCRAPER_MAX_ITEMS_PER_PAGE", "10")?;
    let scraper_max_concurrent_items =
        parse_positive_usize("PRICEWATCH_SCRAPER_MAX_CONCURRENT_ITEMS", "1")?;

    let diagnostics_dir = PathBuf::from(or_default("PRICEWATCH_DIAGNOSTICS_DIR", "./diagnostics"));
    let diagnostics_enabled = parse_bool("PRICEWATCH_DIAGNOSTICS_ENABLED", "true")?;

    let schedule_cron = or_default("PRICEWATCH_SCHEDULE_CRON", "0 0 6 * * *");
    let schedule_enabled = parse_bool("PRICEWATCH_SCHEDULE_ENABLED", "true")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        browser_executable,
        browser_headless,
        scraper_user_agent,
        scraper_locale,
        scraper_viewport,
        scraper_navigation_timeout_secs,
        scraper_results_timeout_secs,
        scraper_max_items_per_page,
        scraper_max_concurrent_items,
        diagnostics_dir,
        diagnostics_enabled,
        schedule_cron,
        schedule_enabled,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PRICEWATCH_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parses `WIDTHxHEIGHT`, e.g. `1366x768`.
fn parse_viewport(s: &str) -> Result<Viewport, String> {
    let (w, h) = s
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let width = w.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let height = h.trim().parse::<u32>().map_err(|e| e.to_string())?;
    if width == 0 || height == 0 {
        return Err("viewport dimensions must be non-zero".to_string());
    }
    Ok(Viewport { width, height })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

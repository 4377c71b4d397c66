use crate::app_config::{AppConfig, Environment, TransportSpec};
use crate::ConfigError;

/// Default User-Agent sent by every transport. Most storefronts serve a
/// stripped or blocked page to obvious bot agents.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files, which is useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup with no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
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

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("PRICEMESH_ENV", "development"))?;
    let bind_addr = parse_addr("PRICEMESH_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PRICEMESH_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default(
        "PRICEMESH_SOURCES_PATH",
        "./config/sources.yaml",
    ));
    let user_agent = or_default("PRICEMESH_USER_AGENT", DEFAULT_USER_AGENT);
    let transports = parse_transports(&or_default("PRICEMESH_TRANSPORTS", "direct"))?;

    let fetch_timeout_ms = parse_u64("PRICEMESH_FETCH_TIMEOUT_MS", "12000")?;
    let min_body_bytes = parse_usize("PRICEMESH_MIN_BODY_BYTES", "1000")?;
    let cache_ttl_secs = parse_u64("PRICEMESH_CACHE_TTL_SECS", "300")?;
    let cache_max_entries = parse_u64("PRICEMESH_CACHE_MAX_ENTRIES", "256")?;
    let max_attempts = parse_u32("PRICEMESH_MAX_ATTEMPTS", "3")?;
    let backoff_base_ms = parse_u64("PRICEMESH_BACKOFF_BASE_MS", "500")?;
    let search_deadline_secs = parse_u64("PRICEMESH_SEARCH_DEADLINE_SECS", "25")?;

    if fetch_timeout_ms == 0 {
        return Err(invalid(
            "PRICEMESH_FETCH_TIMEOUT_MS",
            "must be greater than zero".to_string(),
        ));
    }
    if max_attempts == 0 {
        return Err(invalid(
            "PRICEMESH_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    if search_deadline_secs == 0 {
        return Err(invalid(
            "PRICEMESH_SEARCH_DEADLINE_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        sources_path,
        user_agent,
        transports,
        fetch_timeout_ms,
        min_body_bytes,
        cache_ttl_secs,
        cache_max_entries,
        max_attempts,
        backoff_base_ms,
        search_deadline_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PRICEMESH_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

/// Parse the comma-separated `PRICEMESH_TRANSPORTS` list.
fn parse_transports(raw: &str) -> Result<Vec<TransportSpec>, ConfigError> {
    let transports = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            TransportSpec::parse(entry).ok_or_else(|| ConfigError::InvalidEnvVar {
                var: "PRICEMESH_TRANSPORTS".to_string(),
                reason: format!(
                    "unrecognised transport \"{entry}\"; expected direct, proxy:<url> or prefix:<url>"
                ),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if transports.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "PRICEMESH_TRANSPORTS".to_string(),
            reason: "at least one transport is required".to_string(),
        });
    }

    Ok(transports)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

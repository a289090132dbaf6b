//! Configuration validation.
//!
//! Validates all config fields before the first cycle runs.

use crate::domain::error::AutotraderError;
use crate::ports::config_port::ConfigPort;

pub const DATA_SOURCES: [&str; 2] = ["csv", "sqlite"];
pub const DISPATCH_POLICIES: [&str; 2] = ["all", "new_rows"];

pub fn validate_trading_config(config: &dyn ConfigPort) -> Result<(), AutotraderError> {
    validate_symbol(config)?;
    validate_timeframe(config)?;
    validate_window(config)?;
    validate_source(config)?;
    validate_strategy_name(config)?;
    validate_interval(config)?;
    validate_pool_size(config)?;
    validate_execution(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> AutotraderError {
    AutotraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn missing(section: &str, key: &str) -> AutotraderError {
    AutotraderError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), AutotraderError> {
    match config.get_string("market", "symbol") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(missing("market", "symbol")),
    }
}

fn validate_timeframe(config: &dyn ConfigPort) -> Result<(), AutotraderError> {
    match config.get_string("market", "timeframe") {
        Some(s) if s.trim().is_empty() => {
            Err(invalid("market", "timeframe", "timeframe must not be empty"))
        }
        _ => Ok(()),
    }
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), AutotraderError> {
    let value = config.get_int("market", "window", 500);
    if value < 2 {
        return Err(invalid(
            "market",
            "window",
            "window must be at least 2 rows",
        ));
    }
    Ok(())
}

fn validate_source(config: &dyn ConfigPort) -> Result<(), AutotraderError> {
    match config.get_string("market", "source") {
        Some(s) if !DATA_SOURCES.contains(&s.trim().to_lowercase().as_str()) => Err(invalid(
            "market",
            "source",
            "source must be one of: csv, sqlite",
        )),
        _ => Ok(()),
    }
}

fn validate_strategy_name(config: &dyn ConfigPort) -> Result<(), AutotraderError> {
    match config.get_string("strategy", "name") {
        Some(s) if s.trim().is_empty() => {
            Err(invalid("strategy", "name", "strategy name must not be empty"))
        }
        _ => Ok(()),
    }
}

fn validate_interval(config: &dyn ConfigPort) -> Result<(), AutotraderError> {
    let value = config.get_int("scheduler", "interval_seconds", 300);
    if value < 1 {
        return Err(invalid(
            "scheduler",
            "interval_seconds",
            "interval_seconds must be at least 1",
        ));
    }
    Ok(())
}

fn validate_pool_size(config: &dyn ConfigPort) -> Result<(), AutotraderError> {
    let value = config.get_int("storage", "pool_size", 4);
    if value < 1 {
        return Err(invalid(
            "storage",
            "pool_size",
            "pool_size must be at least 1",
        ));
    }
    Ok(())
}

fn validate_execution(config: &dyn ConfigPort) -> Result<(), AutotraderError> {
    if let Some(s) = config.get_string("execution", "dispatch") {
        if !DISPATCH_POLICIES.contains(&s.trim().to_lowercase().as_str()) {
            return Err(invalid(
                "execution",
                "dispatch",
                "dispatch must be one of: all, new_rows",
            ));
        }
    }

    if !config.get_bool("execution", "enabled", false) {
        return Ok(());
    }

    if config.get_string("execution", "order_size").is_none() {
        return Err(missing("execution", "order_size"));
    }
    let size = config.get_double("execution", "order_size", 0.0);
    if size <= 0.0 {
        return Err(invalid(
            "execution",
            "order_size",
            "order_size must be positive",
        ));
    }

    let leverage = config.get_int("execution", "leverage", 1);
    if leverage < 1 {
        return Err(invalid(
            "execution",
            "leverage",
            "leverage must be at least 1",
        ));
    }
    Ok(())
}

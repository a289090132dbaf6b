//! Domain error types.

/// Top-level error type for autotrader.
#[derive(Debug, thiserror::Error)]
pub enum AutotraderError {
    #[error("market data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("strategy {strategy} failed: {reason}")]
    Strategy { strategy: String, reason: String },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("execution error: {reason}")]
    Execution { reason: String },

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AutotraderError {
    pub fn data_unavailable(symbol: &str, reason: impl Into<String>) -> Self {
        AutotraderError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    pub fn strategy(strategy: &str, reason: impl Into<String>) -> Self {
        AutotraderError::Strategy {
            strategy: strategy.to_string(),
            reason: reason.into(),
        }
    }

    /// Errors raised before the position tracker is touched.
    pub fn aborts_cycle(&self) -> bool {
        matches!(
            self,
            AutotraderError::DataUnavailable { .. } | AutotraderError::Strategy { .. }
        )
    }
}

impl From<&AutotraderError> for std::process::ExitCode {
    fn from(err: &AutotraderError) -> Self {
        let code: u8 = match err {
            AutotraderError::Io(_) | AutotraderError::Execution { .. } => 1,
            AutotraderError::ConfigParse { .. }
            | AutotraderError::ConfigMissing { .. }
            | AutotraderError::ConfigInvalid { .. } => 2,
            AutotraderError::Storage { .. } => 3,
            AutotraderError::Strategy { .. } | AutotraderError::UnknownStrategy { .. } => 4,
            AutotraderError::DataUnavailable { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

//! Core domain types and logic.

pub mod ohlcv;
pub mod signal;
pub mod position;
pub mod indicator;
pub mod strategies;
pub mod cycle;
pub mod scheduler;
pub mod config_validation;
pub mod error;

//! Port traits for the collaborators around the execution cycle.

pub mod config_port;
pub mod data_port;
pub mod execution_port;
pub mod storage_port;

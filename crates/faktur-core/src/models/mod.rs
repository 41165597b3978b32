//! Data models: configuration, extraction inputs and normalized records.

pub mod config;
pub mod record;

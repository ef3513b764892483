/// Database configuration and connection management
pub mod database;

/// Registry seed loading from kkn.toml
pub mod seed;

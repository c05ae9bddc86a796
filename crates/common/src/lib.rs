//! Shared configuration and error types for the Lincoln directory server.

pub mod config;
pub mod error;

pub use config::{
    AppConfig, CorsConfig, DirectoryConfig, Environment, RateLimitConfig, RateLimitTier,
    ServerConfig,
};
pub use error::{DirectoryError, DirectoryResult};

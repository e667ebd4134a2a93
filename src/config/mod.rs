//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → consumed once by Proxy::from_config and HttpServer::new
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; circle topology never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AuthConfig, BackendConfig, BackendSettings, CircleConfig, HttpConfig, ListenerConfig,
    ObservabilityConfig, ProxyConfig,
};
pub use validation::ValidationError;

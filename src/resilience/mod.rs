//! # Resilience Module
//!
//! Circuit breakers that keep health probes from hammering a resource that
//! is already failing.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use healthcheck_core::resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let breaker = CircuitBreaker::new("postgres", CircuitBreakerConfig::for_database());
//!
//! let rows = breaker
//!     .execute(|| async { Ok::<u64, std::io::Error>(42) })
//!     .await?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod manager;
pub mod metrics;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState, StateChangeCallback};
pub use config::{CircuitBreakerConfig, CircuitBreakerSettings};
pub use manager::CircuitBreakerRegistry;
pub use metrics::CircuitBreakerRecord;

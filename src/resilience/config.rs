//! # Circuit Breaker Configuration
//!
//! Invalid values are sanitized to defaults rather than rejected, so a
//! misconfigured breaker still protects its checker.

use crate::utils::serde::duration_ms;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_SUCCESS_THRESHOLD: u32 = 2;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_HALF_OPEN_REQUESTS: u32 = 3;

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,

    /// Consecutive half-open successes that close the circuit
    pub success_threshold: u32,

    /// Time to wait in open state before probing
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,

    /// Probes admitted per half-open episode
    pub max_half_open_requests: u32,
}

impl CircuitBreakerConfig {
    pub fn for_database() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
            max_half_open_requests: 3,
        }
    }

    pub fn for_cache() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 2,
            timeout: Duration::from_secs(15),
            max_half_open_requests: 2,
        }
    }

    pub fn for_external_api() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(45),
            max_half_open_requests: 3,
        }
    }

    /// Replace every zero value with its default
    pub fn sanitized(self) -> Self {
        Self {
            failure_threshold: positive_or(self.failure_threshold, DEFAULT_FAILURE_THRESHOLD),
            success_threshold: positive_or(self.success_threshold, DEFAULT_SUCCESS_THRESHOLD),
            timeout: if self.timeout.is_zero() {
                DEFAULT_TIMEOUT
            } else {
                self.timeout
            },
            max_half_open_requests: positive_or(
                self.max_half_open_requests,
                DEFAULT_MAX_HALF_OPEN_REQUESTS,
            ),
        }
    }

    /// Half-open successes needed to close, bounded by the probe budget
    pub fn effective_success_threshold(&self) -> u32 {
        self.success_threshold.min(self.max_half_open_requests).max(1)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            timeout: DEFAULT_TIMEOUT,
            max_half_open_requests: DEFAULT_MAX_HALF_OPEN_REQUESTS,
        }
    }
}

fn positive_or(value: u32, default: u32) -> u32 {
    if value == 0 {
        default
    } else {
        value
    }
}

/// Breaker settings as written in configuration files.
///
/// Signed so that negative values survive deserialization and get
/// sanitized instead of failing the whole load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: i64,
    pub success_threshold: i64,
    pub timeout_ms: i64,
    pub max_half_open_requests: i64,
}

impl CircuitBreakerSettings {
    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: clamp_u32(self.failure_threshold),
            success_threshold: clamp_u32(self.success_threshold),
            timeout: Duration::from_millis(u64::try_from(self.timeout_ms).unwrap_or(0)),
            max_half_open_requests: clamp_u32(self.max_half_open_requests),
        }
        .sanitized()
    }
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        let defaults = CircuitBreakerConfig::default();
        Self {
            failure_threshold: i64::from(defaults.failure_threshold),
            success_threshold: i64::from(defaults.success_threshold),
            timeout_ms: i64::try_from(defaults.timeout.as_millis()).unwrap_or(i64::MAX),
            max_half_open_requests: i64::from(defaults.max_half_open_requests),
        }
    }
}

/// Non-positive values map to zero, which `sanitized` then replaces
fn clamp_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values_are_sanitized() {
        let config = CircuitBreakerConfig {
            failure_threshold: 0,
            success_threshold: 0,
            timeout: Duration::ZERO,
            max_half_open_requests: 0,
        }
        .sanitized();

        assert_eq!(config, CircuitBreakerConfig::default());
    }

    #[test]
    fn test_valid_values_are_kept() {
        let config = CircuitBreakerConfig {
            failure_threshold: 2,
            success_threshold: 1,
            timeout: Duration::from_millis(100),
            max_half_open_requests: 1,
        };
        assert_eq!(config.clone().sanitized(), config);
    }

    #[test]
    fn test_negative_settings_fall_back_to_defaults() {
        let settings = CircuitBreakerSettings {
            failure_threshold: -1,
            success_threshold: 4,
            timeout_ms: -500,
            max_half_open_requests: 0,
        };

        let config = settings.to_breaker_config();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.success_threshold, 4);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_half_open_requests, 3);
    }

    #[test]
    fn test_effective_success_threshold_is_bounded_by_probe_budget() {
        let config = CircuitBreakerConfig {
            success_threshold: 5,
            max_half_open_requests: 2,
            ..Default::default()
        };
        assert_eq!(config.effective_success_threshold(), 2);
        assert_eq!(CircuitBreakerConfig::default().effective_success_threshold(), 2);
    }

    #[test]
    fn test_preset_configurations() {
        assert_eq!(CircuitBreakerConfig::for_database().failure_threshold, 5);
        assert_eq!(CircuitBreakerConfig::for_cache().failure_threshold, 3);
        assert_eq!(
            CircuitBreakerConfig::for_external_api().timeout,
            Duration::from_secs(45)
        );
    }
}

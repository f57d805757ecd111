//! Rate Limiting for session control routes
//!
//! Per-peer-IP limiting via tower_governor (GCRA). Only start/stop are
//! limited; each activation opens the camera device.

use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

use crate::ApiError;

/// Governor config with X-RateLimit-* headers enabled
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Requests allowed at once
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 1,
            burst_size: 10,
        }
    }
}

/// Build the governor config for session control routes.
///
/// Needs the service to run with
/// `into_make_service_with_connect_info::<SocketAddr>()` for IP extraction.
pub fn create_governor_config(config: &RateLimitConfig) -> Result<Arc<DefaultGovernorConfig>, ApiError> {
    GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
        .ok_or_else(|| {
            ApiError::Config(format!(
                "invalid rate limit: per_second={}, burst_size={}",
                config.per_second, config.burst_size
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.per_second, 1);
        assert_eq!(config.burst_size, 10);
        assert!(create_governor_config(&config).is_ok());
    }

    #[test]
    fn test_zero_burst_rejected() {
        let config = RateLimitConfig {
            per_second: 1,
            burst_size: 0,
        };
        assert!(matches!(create_governor_config(&config), Err(ApiError::Config(_))));
    }
}

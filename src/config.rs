use std::num::NonZeroUsize;
use std::time::Duration;

use crate::error::HarvestError;

/// Upper bound on concurrently pending fetch-and-append units.
pub const DEFAULT_CONCURRENCY: usize = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub concurrency: NonZeroUsize,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            concurrency: NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("stac-harvest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HarvestConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, HarvestError> {
        self.concurrency = NonZeroUsize::new(concurrency).ok_or_else(|| {
            HarvestError::InvalidConfig("concurrency budget must be at least 1".to_string())
        })?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, HarvestError> {
        if timeout.is_zero() {
            return Err(HarvestError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        self.timeout = timeout;
        Ok(self)
    }
}

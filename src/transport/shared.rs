//! A link shared between several callers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::instrument;

use super::driver::{Driver, DriverConfig};
use super::link::Link;
use crate::protocol::{Request, Response, Result};

/// Link plus the lock that keeps frames from different callers apart.
///
/// Cloning is cheap and every clone talks to the same link.
pub struct SharedStream<L: Link> {
    inner: Arc<SharedInner<L>>,
}

impl<L: Link> Clone for SharedStream<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SharedInner<L: Link> {
    driver: Driver,
    link: Mutex<L>,
}

impl<L: Link> SharedStream<L> {
    /// Take ownership of `link`.
    #[must_use]
    pub fn new(link: L, config: DriverConfig) -> Self {
        Self {
            inner: Arc::new(SharedInner {
                driver: Driver::new(config),
                link: Mutex::new(link),
            }),
        }
    }

    /// Run one transaction while holding the link for its whole duration.
    #[instrument(level = "trace", skip_all)]
    pub fn transact(&self, request: &Request) -> Result<Response> {
        let mut link = self.lock();
        self.inner.driver.transact(&mut *link, request)
    }

    /// Driver configuration used for every transaction.
    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        self.inner.driver.config()
    }

    /// Exclusive access to the link outside of a transaction.
    pub fn lock(&self) -> MutexGuard<'_, L> {
        // The link carries no state a panicking holder could corrupt
        self.inner
            .link
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

//! Polling until a remote condition converges

use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};

/// Repeats a probe with a fixed sleep until it yields a value or the deadline passes.
///
/// The deadline is only checked between attempts, so a slow probe can
/// overrun `timeout` by at most one probe call.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Poller {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Run `probe` until it returns `Some`.
    ///
    /// `Ok(None)` means "not yet"; errors from the probe abort the wait.
    pub fn until<T, F>(&self, what: &str, mut probe: F) -> E2eResult<T>
    where
        F: FnMut() -> E2eResult<Option<T>>,
    {
        let start = Instant::now();
        let mut attempts = 0usize;

        loop {
            attempts += 1;
            if let Some(value) = probe()? {
                debug!("{} after {} attempt(s) in {:?}", what, attempts, start.elapsed());
                return Ok(value);
            }

            if start.elapsed() >= self.timeout {
                break;
            }
            std::thread::sleep(self.interval);
            if start.elapsed() >= self.timeout {
                break;
            }
        }

        let elapsed = start.elapsed();
        warn!("Gave up waiting for {} after {} attempt(s)", what, attempts);
        Err(E2eError::Timeout {
            what: what.to_string(),
            elapsed,
        })
    }

    /// Run a boolean `probe` until it returns true
    pub fn until_true<F>(&self, what: &str, mut probe: F) -> E2eResult<bool>
    where
        F: FnMut() -> E2eResult<bool>,
    {
        self.until(what, || Ok(probe()?.then_some(true)))
    }
}

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{ErrorKind, Result};

/// Upper bound for deadlines, roughly 30 years ahead
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + delay`, capped at [`FAR_FUTURE`] so huge delays cannot overflow
pub(crate) fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay.min(FAR_FUTURE))
        .unwrap_or_else(|| now + FAR_FUTURE)
}

/// Shared cooldown deadline set whenever the server answers with HTTP 429.
///
/// There is exactly one deadline per gate, shared by every endpoint: a single
/// throttled response pauses all subsequent requests until it has passed.
/// The deadline only ever moves forward.
///
/// A gate is owned by the dispatcher that created it. Pass the same
/// `Arc<RetryAfterGate>` to several dispatchers to make them share one
/// cooldown.
#[derive(Debug, Default)]
pub struct RetryAfterGate {
    deadline: Mutex<Option<Instant>>,
}

impl RetryAfterGate {
    /// Create a gate without an active cooldown
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left until requests may be sent again, `None` if not cooling down
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        let deadline = (*self.deadline())?;
        let now = Instant::now();
        (deadline > now).then(|| deadline - now)
    }

    /// Returns `true` while a cooldown is active
    #[must_use]
    pub fn is_cooling_down(&self) -> bool {
        self.remaining().is_some()
    }

    /// Suspend until the cooldown has elapsed.
    ///
    /// If another throttled response extends the deadline while we sleep,
    /// we keep waiting for the new one.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Cancelled`] if `cancel` fires first.
    pub async fn wait_if_cooling_down(&self, cancel: &CancellationToken) -> Result<()> {
        while let Some(remaining) = self.remaining() {
            log::debug!(
                "Cooling down for {}ms before the next request",
                remaining.as_millis()
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ErrorKind::Cancelled),
                () = tokio::time::sleep(remaining) => {}
            }
        }
        Ok(())
    }

    /// Push the deadline to `now + delay` unless it is already later
    pub fn record_throttled(&self, delay: Duration) {
        let candidate = deadline_after(Instant::now(), delay);
        let mut deadline = self.deadline();
        match *deadline {
            Some(current) if current >= candidate => {
                log::trace!("Keeping existing cooldown, it ends after the requested one");
            }
            _ => {
                log::debug!("Throttled by server, pausing requests for {}ms", delay.as_millis());
                *deadline = Some(candidate);
            }
        }
    }

    fn deadline(&self) -> MutexGuard<'_, Option<Instant>> {
        // A plain timestamp cannot be observed half-written.
        self.deadline.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

/// Backoff schedules the pauses between attempts of a retried operation.
///
/// The sleep bound starts at the base delay and doubles on every
/// [`Backoff::advance`], while the actual pause is drawn uniformly from
/// `1..=bound` milliseconds. Full jitter keeps concurrent callers from
/// retrying in lockstep against a service that just told them to back off.
///
/// The budget covers `max_retries` retries after the initial attempt, so an
/// operation runs at most `max_retries + 1` times.
///
/// ## Example
///
/// ```no_run
/// use std::time::Duration;
/// use signpost_core::Backoff;
///
/// # async fn example() {
/// let mut backoff = Backoff::new(3, Duration::from_millis(50));
/// while backoff.can_retry() {
///     backoff.advance();
///     backoff.wait().await;
///     // retry the operation
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct Backoff {
    max_retries: usize,
    tries: usize,
    sleep_bound: u64,
    rng: StdRng,
}

impl Backoff {
    /// Create a backoff allowing `max_retries` retries with the given base
    /// delay.
    ///
    /// Delays below one millisecond are raised to one so the jitter range
    /// never collapses.
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        Self::with_rng(max_retries, base_delay, StdRng::from_entropy())
    }

    /// Create a backoff with a caller-supplied RNG.
    ///
    /// Seeding the RNG makes the sampled delays reproducible.
    pub fn with_rng(max_retries: usize, base_delay: Duration, rng: StdRng) -> Self {
        Self {
            max_retries,
            tries: 0,
            sleep_bound: (base_delay.as_millis().max(1)) as u64,
            rng,
        }
    }

    /// Whether the budget allows another retry.
    pub fn can_retry(&self) -> bool {
        self.tries < self.max_retries
    }

    /// Whether every allowed attempt, the initial one included, has been
    /// recorded via [`Backoff::advance`].
    pub fn finished(&self) -> bool {
        self.tries > self.max_retries
    }

    /// The number of retries recorded so far.
    pub fn tries(&self) -> usize {
        self.tries
    }

    /// The current upper bound on the next sampled delay.
    pub fn sleep_bound(&self) -> Duration {
        Duration::from_millis(self.sleep_bound)
    }

    /// Record a retry and double the sleep bound.
    pub fn advance(&mut self) {
        self.tries += 1;
        self.sleep_bound = self.sleep_bound.saturating_mul(2);
    }

    /// Sample the next delay without sleeping.
    pub fn next_delay(&mut self) -> Duration {
        Duration::from_millis(self.rng.gen_range(1..=self.sleep_bound))
    }

    /// Sleep for a jittered delay below the current bound.
    pub async fn wait(&mut self) {
        tokio::time::sleep(self.next_delay()).await;
    }
}

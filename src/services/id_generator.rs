//! Snowflake identifier generator
//!
//! Ids are 63-bit positive integers laid out as
//!
//! ```text
//! | 41 bits: ms since PLAYHUB_EPOCH | 10 bits: machine id | 12 bits: sequence |
//! ```
//!
//! which is ferroid's `SnowflakeTwitterId` layout. The epoch is applied by the
//! time source, so ids from one machine sort by creation time.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ferroid::generator::{AtomicSnowflakeGenerator, IdGenStatus};
use ferroid::id::SnowflakeTwitterId;
use ferroid::time::{MonotonicClock, TimeSource};

use crate::config::IdConfig;

/// 2024-01-01T00:00:00Z in Unix milliseconds
pub const PLAYHUB_EPOCH: u64 = 1_704_067_200_000;

const TIMESTAMP_BITS: u32 = 41;
const MACHINE_ID_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;

pub const MAX_MACHINE_ID: u16 = (1 << MACHINE_ID_BITS) - 1;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;
const MAX_TIMESTAMP: u64 = (1 << TIMESTAMP_BITS) - 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("Machine id {0} exceeds the maximum of 1023")]
    MachineIdOutOfRange(u16),

    #[error("System clock ({now_ms} ms) is before the id epoch")]
    ClockBeforeEpoch { now_ms: u64 },

    #[error("System clock moved backwards by {drift_ms} ms")]
    ClockMovedBackwards { drift_ms: u64 },

    #[error("Timestamp no longer fits in the id layout")]
    TimestampOverflow,
}

/// Components of a generated id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParts {
    /// Milliseconds since `PLAYHUB_EPOCH`
    pub timestamp: u64,
    pub machine_id: u16,
    pub sequence: u16,
}

impl IdParts {
    pub fn decompose(id: i64) -> Self {
        let id = id as u64;
        Self {
            timestamp: id >> (MACHINE_ID_BITS + SEQUENCE_BITS),
            machine_id: ((id >> SEQUENCE_BITS) & MAX_MACHINE_ID as u64) as u16,
            sequence: (id & MAX_SEQUENCE) as u16,
        }
    }
}

/// Outcome of a single non-blocking generation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPoll {
    Ready(i64),
    /// Try again after this many milliseconds. Zero means another caller won
    /// the race and a retry can happen right away.
    Pending { yield_for_ms: u64 },
}

/// Generator for time-ordered 64-bit identifiers.
///
/// Constructed once at startup and shared through `AppState`. Uniqueness is
/// guaranteed within one generator; separate processes need distinct
/// machine ids.
pub struct IdGenerator<T = MonotonicClock>
where
    T: TimeSource<u64> + Clone,
{
    machine_id: u16,
    max_clock_drift_ms: u64,
    clock: T,
    inner: AtomicSnowflakeGenerator<SnowflakeTwitterId, T>,
}

impl IdGenerator<MonotonicClock> {
    pub fn from_config(config: &IdConfig) -> Result<Self, IdError> {
        if config.machine_id > MAX_MACHINE_ID {
            return Err(IdError::MachineIdOutOfRange(config.machine_id));
        }
        // MonotonicClock panics on a system clock before its epoch
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        if now_ms < PLAYHUB_EPOCH {
            return Err(IdError::ClockBeforeEpoch { now_ms });
        }

        let clock = MonotonicClock::with_epoch(Duration::from_millis(PLAYHUB_EPOCH));
        Self::new(config.machine_id, clock, config.max_clock_drift_ms)
    }
}

impl<T> IdGenerator<T>
where
    T: TimeSource<u64> + Clone,
{
    /// `clock` reports milliseconds since `PLAYHUB_EPOCH`.
    pub fn new(machine_id: u16, clock: T, max_clock_drift_ms: u64) -> Result<Self, IdError> {
        if machine_id > MAX_MACHINE_ID {
            return Err(IdError::MachineIdOutOfRange(machine_id));
        }
        Ok(Self {
            machine_id,
            max_clock_drift_ms,
            inner: AtomicSnowflakeGenerator::new(machine_id as u64, clock.clone()),
            clock,
        })
    }

    pub fn machine_id(&self) -> u16 {
        self.machine_id
    }

    /// Try once to produce an id without waiting.
    ///
    /// A backwards clock step larger than the configured drift is an error
    /// rather than a pending result.
    pub fn poll_id(&self) -> Result<IdPoll, IdError> {
        // The id layout masks the timestamp, so overflow has to be caught here
        if self.clock.current_millis() > MAX_TIMESTAMP {
            return Err(IdError::TimestampOverflow);
        }

        match self.inner.next_id() {
            IdGenStatus::Ready { id } => Ok(IdPoll::Ready(id.to_raw() as i64)),
            IdGenStatus::Pending { yield_for } if yield_for > self.max_clock_drift_ms.max(1) => {
                Err(IdError::ClockMovedBackwards {
                    drift_ms: yield_for,
                })
            }
            IdGenStatus::Pending { yield_for } => Ok(IdPoll::Pending {
                yield_for_ms: yield_for,
            }),
        }
    }

    /// Produce the next identifier.
    ///
    /// Sleeps on the tokio timer until the next millisecond when the
    /// sequence is exhausted, and until the clock catches up when it stepped
    /// back by no more than the configured drift.
    pub async fn next_id(&self) -> Result<i64, IdError> {
        loop {
            match self.poll_id()? {
                IdPoll::Ready(id) => return Ok(id),
                IdPoll::Pending { yield_for_ms: 0 } => tokio::task::yield_now().await,
                IdPoll::Pending { yield_for_ms } => {
                    tokio::time::sleep(Duration::from_millis(yield_for_ms)).await
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    /// Clock that only moves when told to
    #[derive(Clone)]
    struct ManualClock(Arc<AtomicU64>);

    impl ManualClock {
        fn at(ms: u64) -> Self {
            Self(Arc::new(AtomicU64::new(ms)))
        }

        fn set(&self, ms: u64) {
            self.0.store(ms, Ordering::SeqCst);
        }

        fn advance(&self, ms: u64) {
            self.0.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl TimeSource<u64> for ManualClock {
        fn current_millis(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    const T0: u64 = 1_000;

    fn manual(machine_id: u16, drift: u64) -> (ManualClock, IdGenerator<ManualClock>) {
        let clock = ManualClock::at(T0);
        let generator = IdGenerator::new(machine_id, clock.clone(), drift).unwrap();
        (clock, generator)
    }

    fn ready(generator: &IdGenerator<ManualClock>) -> i64 {
        match generator.poll_id().unwrap() {
            IdPoll::Ready(id) => id,
            pending => panic!("expected an id, got {:?}", pending),
        }
    }

    #[tokio::test]
    async fn test_layout() {
        let (_, generator) = manual(5, 0);
        let id = generator.next_id().await.unwrap();
        assert!(id > 0);
        assert_eq!(
            IdParts::decompose(id),
            IdParts {
                timestamp: 1_000,
                machine_id: 5,
                sequence: 0
            }
        );
    }

    #[test]
    fn test_sequence_increments_within_one_millisecond() {
        let (_, generator) = manual(1, 0);
        let a = ready(&generator);
        let b = ready(&generator);
        assert_eq!(b, a + 1);
        assert_eq!(IdParts::decompose(b).sequence, 1);
    }

    #[test]
    fn test_sequence_exhaustion_waits_for_next_millisecond() {
        let (clock, generator) = manual(0, 0);
        let mut last = 0;
        for _ in 0..=MAX_SEQUENCE {
            last = ready(&generator);
        }
        assert_eq!(IdParts::decompose(last).sequence as u64, MAX_SEQUENCE);
        assert_eq!(
            generator.poll_id(),
            Ok(IdPoll::Pending { yield_for_ms: 1 })
        );

        clock.advance(1);
        let next = ready(&generator);
        let parts = IdParts::decompose(next);
        assert_eq!(parts.timestamp, 1_001);
        assert_eq!(parts.sequence, 0);
        assert!(next > last);
    }

    #[test]
    fn test_small_backwards_step_is_pending() {
        let (clock, generator) = manual(0, 50);
        ready(&generator);
        clock.set(T0 - 10);
        assert_eq!(
            generator.poll_id(),
            Ok(IdPoll::Pending { yield_for_ms: 10 })
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_backwards_wait_does_not_block_runtime() {
        let (clock, generator) = manual(0, 50);
        let first = generator.next_id().await.unwrap();
        clock.set(T0 - 40);

        let started = Instant::now();
        let (second, ticker_ran_after) = tokio::join!(generator.next_id(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let elapsed = started.elapsed();
            clock.advance(40);
            elapsed
        });

        // A blocking wait would hold the only worker thread for 40 ms
        assert!(ticker_ran_after < Duration::from_millis(30));
        assert!(second.unwrap() > first);
    }

    #[tokio::test]
    async fn test_large_backwards_step_fails() {
        let (clock, generator) = manual(0, 50);
        generator.next_id().await.unwrap();
        clock.set(T0 - 500);
        assert_eq!(
            generator.next_id().await,
            Err(IdError::ClockMovedBackwards { drift_ms: 500 })
        );
    }

    #[test]
    fn test_timestamp_overflow() {
        let clock = ManualClock::at(MAX_TIMESTAMP + 1);
        let generator = IdGenerator::new(0, clock, 0).unwrap();
        assert_eq!(generator.poll_id(), Err(IdError::TimestampOverflow));
    }

    #[test]
    fn test_machine_id_bounds() {
        assert!(IdGenerator::new(MAX_MACHINE_ID, ManualClock::at(T0), 0).is_ok());
        assert!(matches!(
            IdGenerator::new(MAX_MACHINE_ID + 1, ManualClock::at(T0), 0),
            Err(IdError::MachineIdOutOfRange(1024))
        ));
        assert!(matches!(
            IdGenerator::from_config(&IdConfig {
                machine_id: 2_000,
                ..IdConfig::default()
            }),
            Err(IdError::MachineIdOutOfRange(2_000))
        ));
    }

    #[tokio::test]
    async fn test_system_clock_ids_carry_machine_id() {
        let generator = IdGenerator::from_config(&IdConfig {
            machine_id: 9,
            ..IdConfig::default()
        })
        .unwrap();
        let parts = IdParts::decompose(generator.next_id().await.unwrap());
        assert_eq!(parts.machine_id, 9);
        assert!(parts.timestamp > 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_system_clock_ids_are_unique_across_tasks() {
        let generator = Arc::new(IdGenerator::from_config(&IdConfig::default()).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = generator.clone();
                tokio::spawn(async move {
                    let mut ids = Vec::with_capacity(2_000);
                    for _ in 0..2_000 {
                        ids.push(generator.next_id().await.unwrap());
                    }
                    ids
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.extend(handle.await.unwrap());
        }
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.iter().all(|id| *id > 0));
    }

    #[tokio::test]
    async fn test_ids_increase_per_task() {
        let generator = IdGenerator::from_config(&IdConfig {
            machine_id: 3,
            max_clock_drift_ms: 50,
        })
        .unwrap();
        let mut ids = Vec::with_capacity(5_000);
        for _ in 0..5_000 {
            ids.push(generator.next_id().await.unwrap());
        }
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}

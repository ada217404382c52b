//! # Shared state store
//!
//! The store is a snapshot of the robot's sensor and operator inputs: a fixed
//! key space of named numeric values and named boolean triggers, safe for
//! concurrent read and write from any number of threads.
//!
//! The acquisition thread writes sensor keys at its own cadence, control
//! tasks read them on the scheduler thread, and the operator input layer
//! reads and writes its own keys from wherever it runs. Each key has its own
//! fair reader-writer lock, so contention on one key never blocks another,
//! and neither readers nor writers can be starved - a starved writer would
//! leave control loops acting on stale sensor data.
//!
//! Exactly one store instance is constructed at startup and handed (via
//! `Arc`) to every component that needs it; tests construct their own.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod key;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use parking_lot::RwLock;

// Internal
pub use key::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No such key in the fixed key space: \"{0}\"")]
    UnknownKey(String),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Shared store of named values and triggers.
///
/// Every key in [`ValueKey`] and [`TriggerKey`] has exactly one slot for the
/// life of the store. Values start at `0.0` and triggers at `false`.
pub struct Store {
    /// One slot per value key, indexed by the key's ordinal
    values: [RwLock<f64>; NUM_VALUE_KEYS],

    /// One slot per trigger key, indexed by the key's ordinal
    triggers: [RwLock<bool>; NUM_TRIGGER_KEYS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Store {
    /// Create a new store with every value at `0.0` and every trigger
    /// released.
    pub fn new() -> Self {
        Store {
            values: std::array::from_fn(|_| RwLock::new(0.0)),
            triggers: std::array::from_fn(|_| RwLock::new(false)),
        }
    }

    /// Get the most recently written value for the given key.
    pub fn value(&self, key: ValueKey) -> f64 {
        *self.values[key.index()].read()
    }

    /// Atomically replace the value for the given key.
    ///
    /// The new value is visible to any subsequent `value` call on any thread.
    pub fn set_value(&self, key: ValueKey, value: f64) {
        *self.values[key.index()].write() = value;
    }

    /// Get the pressed state of the given trigger.
    pub fn trigger(&self, key: TriggerKey) -> bool {
        *self.triggers[key.index()].read()
    }

    /// Atomically replace the pressed state of the given trigger.
    pub fn set_trigger(&self, key: TriggerKey, pressed: bool) {
        *self.triggers[key.index()].write() = pressed;
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::convert::TryFrom;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_key_coverage() {
        let store = Store::new();

        // Every key must be defined immediately after construction
        for key in ValueKey::ALL.iter() {
            assert_eq!(store.value(*key), 0.0);
        }
        for key in TriggerKey::ALL.iter() {
            assert!(!store.trigger(*key));
        }
    }

    #[test]
    fn test_read_after_write() {
        let store = Arc::new(Store::new());

        let writer = {
            let store = store.clone();
            thread::spawn(move || {
                store.set_value(ValueKey::Heading, 42.5);
                store.set_trigger(TriggerKey::StartClimber, true);
            })
        };
        writer.join().unwrap();

        // Once the write has completed it must be visible from this thread
        assert_eq!(store.value(ValueKey::Heading), 42.5);
        assert!(store.trigger(TriggerKey::StartClimber));
    }

    #[test]
    fn test_contended_key_completes() {
        const NUM_WRITERS: usize = 4;
        const NUM_READERS: usize = 4;
        const OPS_PER_THREAD: usize = 1000;

        let store = Arc::new(Store::new());
        let mut handles = Vec::new();

        // All threads hammer the same key - with fair admission every
        // operation completes in bounded time
        for w in 0..NUM_WRITERS {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    store.set_value(ValueKey::LeftEncoderPosition, (w * OPS_PER_THREAD + i) as f64);
                }
            }));
        }
        for _ in 0..NUM_READERS {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..OPS_PER_THREAD {
                    let v = store.value(ValueKey::LeftEncoderPosition);
                    assert!(v >= 0.0);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // The final value is the last write of one of the writers
        let last = store.value(ValueKey::LeftEncoderPosition);
        assert!((0..NUM_WRITERS).any(|w| last == (w * OPS_PER_THREAD + OPS_PER_THREAD - 1) as f64));
    }

    #[test]
    fn test_independent_keys() {
        let store = Arc::new(Store::new());

        // A writer spinning on one key must not stop reads of another
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let writer = {
            let store = store.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                let mut i = 0.0;
                while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                    store.set_value(ValueKey::VisTimestamp, i);
                    i += 1.0;
                }
            })
        };

        store.set_value(ValueKey::Throttle, 0.5);
        for _ in 0..10_000 {
            assert_eq!(store.value(ValueKey::Throttle), 0.5);
        }

        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        writer.join().unwrap();
    }

    #[test]
    fn test_key_parsing() {
        assert_eq!(ValueKey::try_from("heading").unwrap(), ValueKey::Heading);
        assert_eq!(
            ValueKey::try_from("left_encoder_velocity").unwrap(),
            ValueKey::LeftEncoderVelocity
        );
        assert_eq!(
            TriggerKey::try_from("climber_one_sec").unwrap(),
            TriggerKey::ClimberOneSec
        );

        // Unknown keys fail fast rather than defaulting
        assert!(matches!(
            ValueKey::try_from("no_such_sensor"),
            Err(StoreError::UnknownKey(_))
        ));
        assert!(matches!(
            TriggerKey::try_from("heading"),
            Err(StoreError::UnknownKey(_))
        ));
    }
}

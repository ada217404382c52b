//! # Periodic scheduler
//!
//! A fixed-rate timer which, once armed, invokes a run-cycle callback every
//! [`CYCLE_PERIOD`] on a single dedicated thread until disarmed.
//!
//! The scheduler is an explicit `Idle`/`Armed` state machine guarded by one
//! lock: arming while armed and disarming while idle are no-ops, and two
//! mode transitions racing each other can never end up with two timer
//! threads. Disarming joins the timer thread, so any run-cycle in flight
//! completes before `disarm` returns.
//!
//! If a run-cycle overruns the period the missed ticks are skipped, not
//! queued - the backlog under a persistent overrun would otherwise grow
//! without bound. Skipped ticks are counted and observable for diagnosis.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, warn};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one run-cycle.
pub const CYCLE_PERIOD: Duration = Duration::from_millis(20);

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The scheduler's per-tick callback.
///
/// `run_cycle` is invoked once per tick on the timer thread, never
/// concurrently with itself. Implementations must not block for longer than
/// they can afford to delay the next tick.
pub trait Cycle: Send {
    fn run_cycle(&mut self);
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Arm state of the scheduler.
enum ArmState {
    Idle,
    Armed {
        /// Tells the timer thread to stop at the next tick boundary
        stop: Arc<AtomicBool>,

        /// Handle joined on disarm so in-flight cycles complete first
        handle: JoinHandle<()>,
    },
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fixed-rate run-cycle timer.
pub struct Scheduler {
    period: Duration,

    /// The run-cycle callback, shared with the timer thread
    cycle: Arc<Mutex<dyn Cycle>>,

    /// Current arm state, guarded so arm/disarm are race-safe
    state: Mutex<ArmState>,

    /// Number of run-cycles executed since construction
    ticks: Arc<AtomicU64>,

    /// Number of ticks skipped due to run-cycle overruns
    overruns: Arc<AtomicU64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Scheduler {
    /// Create a new scheduler driving the given run-cycle at the given
    /// period. The scheduler starts idle.
    pub fn new(period: Duration, cycle: Arc<Mutex<dyn Cycle>>) -> Self {
        Scheduler {
            period,
            cycle,
            state: Mutex::new(ArmState::Idle),
            ticks: Arc::new(AtomicU64::new(0)),
            overruns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Arm the scheduler, beginning run-cycle invocations immediately.
    ///
    /// Arming while already armed is a no-op - only one timer thread ever
    /// exists.
    pub fn arm(&self) {
        let mut state = self.state.lock();

        if let ArmState::Armed { .. } = *state {
            return;
        }

        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let cycle = self.cycle.clone();
            let stop = stop.clone();
            let period = self.period;
            let ticks = self.ticks.clone();
            let overruns = self.overruns.clone();
            thread::spawn(move || timer_main(cycle, stop, period, ticks, overruns))
        };

        *state = ArmState::Armed { stop, handle };
    }

    /// Disarm the scheduler, cancelling all future run-cycles.
    ///
    /// A run-cycle currently executing completes before this returns, after
    /// which no further cycle runs until the next `arm`. Disarming while
    /// idle is a no-op.
    pub fn disarm(&self) {
        let mut state = self.state.lock();

        match std::mem::replace(&mut *state, ArmState::Idle) {
            ArmState::Idle => (),
            ArmState::Armed { stop, handle } => {
                stop.store(true, Ordering::Relaxed);

                if handle.join().is_err() {
                    error!("Scheduler timer thread panicked");
                }
            }
        }
    }

    /// True if the scheduler is currently armed.
    pub fn is_armed(&self) -> bool {
        matches!(*self.state.lock(), ArmState::Armed { .. })
    }

    /// Number of run-cycles executed since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Number of ticks skipped because a run-cycle overran the period.
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Timer thread main function.
fn timer_main(
    cycle: Arc<Mutex<dyn Cycle>>,
    stop: Arc<AtomicBool>,
    period: Duration,
    ticks: Arc<AtomicU64>,
    overruns: Arc<AtomicU64>,
) {
    let mut next = Instant::now();

    while !stop.load(Ordering::Relaxed) {
        // A panic in the run-cycle must not kill the timer thread
        let result = catch_unwind(AssertUnwindSafe(|| {
            cycle.lock().run_cycle();
        }));
        if result.is_err() {
            error!("Run-cycle panicked, scheduler continues");
        }

        ticks.fetch_add(1, Ordering::Relaxed);

        next += period;
        let now = Instant::now();

        if now < next {
            thread::sleep(next - now);
        } else {
            // Overrun: skip the missed ticks rather than queueing them up
            let mut skipped = 0u64;
            while next <= now {
                next += period;
                skipped += 1;
            }
            overruns.fetch_add(skipped, Ordering::Relaxed);
            warn!(
                "Run-cycle overran its {:?} period, skipping {} tick(s)",
                period, skipped
            );
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

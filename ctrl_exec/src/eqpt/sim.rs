//! Simulated equipment rig
//!
//! A self-contained stand-in for the drivetrain and acquisition
//! collaborators: an acquisition thread integrates the most recent arcade
//! demands into encoder and heading readings and writes them into the shared
//! state store at a fixed cadence, exactly as the real acquisition process
//! would.
//!
//! The model is deliberately crude - constant speed per unit demand plus a
//! stiction threshold below which the drivetrain does not move. The stiction
//! matters: it is what makes a biased-but-small forward demand stall near the
//! target, exercising the same stall-detection path the real robot relies on.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Internal
use super::{Acquisition, ArcadeDems, Drivetrain};
use crate::store::{Store, ValueKey};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the simulated rig.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Distance units represented by one encoder count.
    ///
    /// Units: units/count
    pub units_per_count: f64,

    /// Robot speed at full forward demand.
    ///
    /// Units: units/second
    pub max_speed_units_s: f64,

    /// Turn rate at full rotation demand.
    ///
    /// Units: degrees/second
    pub max_turn_rate_deg_s: f64,

    /// Forward demand magnitude below which the drivetrain does not move.
    pub stiction_demand: f64,

    /// Period of the acquisition thread.
    ///
    /// Units: milliseconds
    pub acq_period_ms: u64,
}

/// Kinematic state shared between the acquisition thread and encoder resets.
#[derive(Default)]
struct SimState {
    /// Encoder position, counts
    pos_counts: f64,

    /// Heading, degrees
    heading_deg: f64,
}

/// Drivetrain side of the rig: latches the most recent demand pair.
pub struct SimDrivetrain {
    dems: Arc<Mutex<ArcadeDems>>,
}

/// Encoder-reset handle implementing the acquisition contract.
pub struct SimEncoders {
    state: Arc<Mutex<SimState>>,
}

/// The simulated rig: drivetrain latch plus acquisition thread.
pub struct SimRig {
    dems: Arc<Mutex<ArcadeDems>>,
    state: Arc<Mutex<SimState>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            units_per_count: 20.0 / 11240.0,
            max_speed_units_s: 50.0,
            max_turn_rate_deg_s: 120.0,
            stiction_demand: 0.40,
            acq_period_ms: 5,
        }
    }
}

impl Drivetrain for SimDrivetrain {
    fn send_demands(&mut self, dems: &ArcadeDems) {
        // No smoothing - the latest demand wins outright
        *self.dems.lock() = *dems;
    }
}

impl Acquisition for SimEncoders {
    fn reset_encoders(&self) {
        self.state.lock().pos_counts = 0.0;
    }
}

impl SimRig {
    /// Create the rig and start its acquisition thread writing into `store`.
    pub fn new(store: Arc<Store>, params: SimParams) -> Self {
        let dems = Arc::new(Mutex::new(ArcadeDems::ZERO));
        let state = Arc::new(Mutex::new(SimState::default()));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let dems = dems.clone();
            let state = state.clone();
            let stop = stop.clone();
            thread::spawn(move || acq_main(store, dems, state, stop, params))
        };

        SimRig {
            dems,
            state,
            stop,
            handle: Some(handle),
        }
    }

    /// Get the drivetrain side of the rig.
    pub fn drivetrain(&self) -> SimDrivetrain {
        SimDrivetrain {
            dems: self.dems.clone(),
        }
    }

    /// Get the encoder-reset handle of the rig.
    pub fn encoders(&self) -> SimEncoders {
        SimEncoders {
            state: self.state.clone(),
        }
    }

    /// Stop the acquisition thread and wait for it to exit.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
        info!("Simulated rig stopped");
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Acquisition thread main function.
fn acq_main(
    store: Arc<Store>,
    dems: Arc<Mutex<ArcadeDems>>,
    state: Arc<Mutex<SimState>>,
    stop: Arc<AtomicBool>,
    params: SimParams,
) {
    let period = Duration::from_millis(params.acq_period_ms);
    let dt = period.as_secs_f64();

    info!("Simulated acquisition running at {:?} period", period);

    while !stop.load(Ordering::Relaxed) {
        let cycle_start = Instant::now();

        let current = *dems.lock();

        // Stiction: demands below the threshold do not move the robot
        let vel_units_s = if current.forward.abs() < params.stiction_demand {
            0.0
        } else {
            current.forward * params.max_speed_units_s
        };
        let turn_rate = current.rotate * params.max_turn_rate_deg_s;

        {
            let mut s = state.lock();
            s.pos_counts += vel_units_s / params.units_per_count * dt;
            s.heading_deg += turn_rate * dt;

            let pos_units = s.pos_counts * params.units_per_count;
            store.set_value(ValueKey::LeftEncoderPosition, pos_units);
            store.set_value(ValueKey::RightEncoderPosition, pos_units);
            store.set_value(ValueKey::LeftEncoderVelocity, vel_units_s);
            store.set_value(ValueKey::Heading, s.heading_deg);
            store.set_value(ValueKey::HeadingRate, turn_rate);
        }

        // Maintain the acquisition cadence
        let elapsed = cycle_start.elapsed();
        if elapsed < period {
            thread::sleep(period - elapsed);
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rig_writes_store() {
        let store = Arc::new(Store::new());
        let rig = SimRig::new(store.clone(), SimParams::default());
        let mut drivetrain = rig.drivetrain();

        drivetrain.send_demands(&ArcadeDems {
            forward: 0.8,
            rotate: 0.0,
        });
        thread::sleep(Duration::from_millis(100));

        // Full-ish forward demand must have advanced the encoders
        assert!(store.value(ValueKey::LeftEncoderPosition) > 0.0);
        assert!(store.value(ValueKey::LeftEncoderVelocity) > 0.0);

        // Resetting the encoders zeroes the accumulated position
        rig.encoders().reset_encoders();
        drivetrain.make_safe();
        thread::sleep(Duration::from_millis(50));
        assert!(store.value(ValueKey::LeftEncoderPosition).abs() < 1.0);
        assert_eq!(store.value(ValueKey::LeftEncoderVelocity), 0.0);

        rig.stop();
    }

    #[test]
    fn test_stiction_holds_robot() {
        let store = Arc::new(Store::new());
        let rig = SimRig::new(store.clone(), SimParams::default());
        let mut drivetrain = rig.drivetrain();

        drivetrain.send_demands(&ArcadeDems {
            forward: 0.2,
            rotate: 0.0,
        });
        thread::sleep(Duration::from_millis(60));

        // Below the stiction threshold nothing moves
        assert_eq!(store.value(ValueKey::LeftEncoderPosition), 0.0);
        assert_eq!(store.value(ValueKey::LeftEncoderVelocity), 0.0);

        rig.stop();
    }
}

//! # Drive-straight closed-loop task
//!
//! A command task that drives the robot a target distance while holding the
//! heading it had when it started, used standalone and as an autonomous
//! primitive.
//!
//! Two PID loops run per tick: the heading loop turns the drift between the
//! current and reference heading into a rotation demand, and the forward
//! loop turns the normalised remaining distance into a forward demand. The
//! forward demand carries a base-speed bias so the drivetrain keeps moving
//! at the shallow end of the proportional ramp, and the task watches a
//! rolling window of recent velocity samples so a robot that has stopped
//! making progress - wedged, disconnected, or simply done - always
//! terminates rather than driving its motors forever.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

// Internal
use crate::cmd::{Command, Resource};
use crate::eqpt::{Acquisition, ArcadeDems, Drivetrain};
use crate::store::{Store, ValueKey};
use util::maths::{mean, signum0};

pub use params::Params;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Target distance for the task.
///
/// A deferred target is resolved once, at `initialize` time, allowing the
/// distance to depend on runtime state (for example a vision solution) at
/// the moment the task starts rather than when it was constructed.
pub enum DistanceTarget {
    /// A fixed distance, encoder units
    Fixed(f64),

    /// A distance computed when the task starts
    Deferred(Box<dyn Fn() -> f64 + Send>),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive-straight command task.
pub struct DriveStraight {
    store: Arc<Store>,
    drivetrain: Arc<Mutex<dyn Drivetrain>>,
    acq: Arc<dyn Acquisition>,
    params: Params,

    target: DistanceTarget,

    /// Resolved target distance, encoder units
    distance: f64,

    /// Heading captured at initialize, the reference to hold
    ref_heading: f64,

    // Heading loop state
    rot_integral: f64,
    rot_prev_error: f64,

    // Forward loop state
    fwd_integral: f64,
    fwd_prev_error: f64,

    /// Rolling history of recent |velocity| samples
    past_velocities: VecDeque<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveStraight {
    /// Create a new drive-straight task.
    pub fn new(
        store: Arc<Store>,
        drivetrain: Arc<Mutex<dyn Drivetrain>>,
        acq: Arc<dyn Acquisition>,
        params: Params,
        target: DistanceTarget,
    ) -> Self {
        DriveStraight {
            store,
            drivetrain,
            acq,
            params,
            target,
            distance: 0.0,
            ref_heading: 0.0,
            rot_integral: 0.0,
            rot_prev_error: 0.0,
            fwd_integral: 0.0,
            fwd_prev_error: 0.0,
            past_velocities: VecDeque::new(),
        }
    }

    /// Rolling mean of the recent |velocity| samples.
    fn mean_velocity(&self) -> f64 {
        mean(self.past_velocities.iter().copied()).unwrap_or(0.0)
    }
}

impl Command for DriveStraight {
    fn name(&self) -> &str {
        "drive_straight"
    }

    fn resources(&self) -> &[Resource] {
        &[Resource::Drivetrain]
    }

    fn initialize(&mut self) {
        // The acquisition side owns the encoders - ask it to zero them
        self.acq.reset_encoders();

        self.distance = match &self.target {
            DistanceTarget::Fixed(d) => *d,
            DistanceTarget::Deferred(f) => f(),
        };

        self.ref_heading = self.store.value(ValueKey::Heading);

        self.rot_integral = 0.0;
        self.rot_prev_error = 0.0;
        self.fwd_integral = 0.0;
        self.fwd_prev_error = 0.0;

        // Seed the history with a non-zero value so the first ticks do not
        // read as a stall
        self.past_velocities = std::iter::repeat(self.params.vel_history_seed)
            .take(self.params.vel_history_len)
            .collect();

        info!(
            "DriveStraight: target {:.2} units, reference heading {:.2} deg",
            self.distance, self.ref_heading
        );
    }

    fn execute(&mut self) {
        let p = self.params.clone();

        // Heading loop: drift from the reference heading
        let rot_error = self.store.value(ValueKey::Heading) - self.ref_heading;
        self.rot_integral += rot_error;
        let rot_derivative = rot_error - self.rot_prev_error;
        let mut rotate =
            p.rot_k_p * rot_error + p.rot_k_i * self.rot_integral + p.rot_k_d * rot_derivative;

        // Forward loop: remaining distance, normalised by the padded target
        // so the proportional term stays bounded for small targets
        let fwd_error = (self.distance - self.store.value(ValueKey::LeftEncoderPosition))
            / (self.distance.abs() + p.fwd_denom_pad);
        self.fwd_integral += fwd_error;
        let fwd_derivative = fwd_error - self.fwd_prev_error;
        let mut forward =
            p.fwd_k_p * fwd_error + p.fwd_k_i * self.fwd_integral + p.fwd_k_d * fwd_derivative;

        rotate = rotate.clamp(-p.rot_limit, p.rot_limit);

        // Base-speed bias: once moving in a direction the drivetrain always
        // gets at least this much, a zero demand stays zero
        forward = signum0(forward) * (forward.abs() + p.base_speed);
        forward = forward.clamp(-p.fwd_limit, p.fwd_limit);

        debug!(
            "DriveStraight dems: fwd {:.3} rot {:.3}",
            forward, rotate
        );
        self.drivetrain.lock().send_demands(&ArcadeDems { forward, rotate });

        self.rot_prev_error = rot_error;
        self.fwd_prev_error = fwd_error;

        self.past_velocities.pop_front();
        self.past_velocities
            .push_back(self.store.value(ValueKey::LeftEncoderVelocity).abs());
    }

    fn is_finished(&mut self) -> bool {
        let pos = self.store.value(ValueKey::LeftEncoderPosition);
        let vel = self.store.value(ValueKey::LeftEncoderVelocity);

        // Settled at the target, or stopped making progress anywhere
        ((pos - self.distance).abs() < self.params.pos_tolerance
            && vel.abs() < self.params.vel_tolerance)
            || self.mean_velocity() < self.params.stall_mean_vel
    }

    fn end(&mut self) {
        self.drivetrain.lock().make_safe();
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Drivetrain which records every demand it receives.
    struct RecordingDrivetrain {
        dems: Vec<ArcadeDems>,
    }

    impl Drivetrain for RecordingDrivetrain {
        fn send_demands(&mut self, dems: &ArcadeDems) {
            self.dems.push(*dems);
        }
    }

    /// Acquisition stub counting encoder resets.
    struct CountingAcq {
        resets: AtomicUsize,
    }

    impl Acquisition for CountingAcq {
        fn reset_encoders(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        store: Arc<Store>,
        drivetrain: Arc<Mutex<RecordingDrivetrain>>,
        acq: Arc<CountingAcq>,
        task: DriveStraight,
    }

    fn fixture(target: DistanceTarget) -> Fixture {
        let store = Arc::new(Store::new());
        let drivetrain = Arc::new(Mutex::new(RecordingDrivetrain { dems: Vec::new() }));
        let acq = Arc::new(CountingAcq {
            resets: AtomicUsize::new(0),
        });

        let task = DriveStraight::new(
            store.clone(),
            drivetrain.clone(),
            acq.clone(),
            Params::default(),
            target,
        );

        Fixture {
            store,
            drivetrain,
            acq,
            task,
        }
    }

    #[test]
    fn test_drive_to_target() {
        let mut f = fixture(DistanceTarget::Fixed(100.0));
        f.task.initialize();
        assert_eq!(f.acq.resets.load(Ordering::SeqCst), 1);

        // Advance the encoder 2 units per tick until the target, then settle
        let mut pos: f64 = 0.0;
        let mut finished_at = None;
        for tick in 0..200 {
            if pos < 100.0 {
                pos += 2.0;
                f.store.set_value(ValueKey::LeftEncoderVelocity, 2.0);
            } else {
                f.store.set_value(ValueKey::LeftEncoderVelocity, 0.0);
            }
            pos = pos.min(100.0);
            f.store.set_value(ValueKey::LeftEncoderPosition, pos);

            f.task.execute();
            if f.task.is_finished() {
                finished_at = Some(tick);
                break;
            }
        }

        // Finished at the target with the settled velocity, well before the
        // stall window could expire
        let finished_at = finished_at.expect("task never finished");
        assert_eq!(finished_at, 50);
        assert!((pos - 100.0).abs() < 1.0);

        // Every forward demand stayed within the clamp, with the heading
        // fixed at reference no rotation was ever demanded
        for dems in f.drivetrain.lock().dems.iter() {
            assert!(dems.forward.abs() <= 0.80 + 1e-9);
            assert!(dems.rotate.abs() < 1e-9);
        }

        f.task.end();
        assert_eq!(*f.drivetrain.lock().dems.last().unwrap(), ArcadeDems::ZERO);
    }

    #[test]
    fn test_stall_detection() {
        let mut f = fixture(DistanceTarget::Fixed(100.0));
        f.task.initialize();

        // Encoder frozen at zero: nowhere near the target, but once the
        // seeded history has fully rolled over the task must give up
        for tick in 0..50 {
            f.task.execute();
            let finished = f.task.is_finished();
            if tick < 49 {
                assert!(!finished, "finished early at tick {}", tick);
            } else {
                assert!(finished, "stall not detected");
            }
        }

        f.task.end();
        assert_eq!(*f.drivetrain.lock().dems.last().unwrap(), ArcadeDems::ZERO);
    }

    #[test]
    fn test_deferred_target() {
        let store = Arc::new(Store::new());
        let drivetrain = Arc::new(Mutex::new(RecordingDrivetrain { dems: Vec::new() }));
        let acq = Arc::new(CountingAcq {
            resets: AtomicUsize::new(0),
        });

        // Target read from the vision solution at start time
        let deferred = {
            let store = store.clone();
            DistanceTarget::Deferred(Box::new(move || store.value(ValueKey::VisDistance)))
        };
        let mut task = DriveStraight::new(
            store.clone(),
            drivetrain.clone(),
            acq.clone(),
            Params::default(),
            deferred,
        );

        // The vision value written after construction is the one that counts
        store.set_value(ValueKey::VisDistance, 25.0);
        task.initialize();

        store.set_value(ValueKey::LeftEncoderPosition, 25.0);
        store.set_value(ValueKey::LeftEncoderVelocity, 0.0);
        task.execute();
        assert!(task.is_finished());
    }

    #[test]
    fn test_interrupted_zeroes_drivetrain() {
        let mut f = fixture(DistanceTarget::Fixed(100.0));
        f.task.initialize();

        f.store.set_value(ValueKey::LeftEncoderVelocity, 2.0);
        for _ in 0..5 {
            f.task.execute();
        }
        assert!(f.drivetrain.lock().dems.last().unwrap().forward > 0.0);

        f.task.interrupted();
        assert_eq!(*f.drivetrain.lock().dems.last().unwrap(), ArcadeDems::ZERO);
    }

    #[test]
    fn test_small_target_demand_bounded() {
        // A tiny target must not blow the proportional term up - the padded
        // denominator keeps the very first demand inside the clamp
        let mut f = fixture(DistanceTarget::Fixed(0.5));
        f.task.initialize();
        f.task.execute();

        let first = f.drivetrain.lock().dems[0];
        assert!(first.forward.abs() <= 0.80 + 1e-9);
    }
}

//! Main control-core executable entry point.
//!
//! # Architecture
//!
//! The execution methodology consists of:
//!
//!     - Initialise the session and logging
//!     - Load parameters
//!     - Initialise the shared state store and equipment
//!     - Arm the periodic scheduler, which ticks the command executor every
//!       cycle
//!     - Run the demonstration drive task to completion
//!     - Disarm and exit
//!
//! In production wiring the mode lifecycle (enable/disable transitions)
//! arms and disarms the scheduler and the operator input layer starts
//! tasks; here a simulated rig stands in for the acquisition process and
//! drivetrain so the core can be run end to end on a desk.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use ctrl_lib::{
    cmd::Executor,
    drive_ctrl::{self, DistanceTarget, DriveStraight},
    eqpt::sim::{SimParams, SimRig},
    sched::{Cycle, Scheduler, CYCLE_PERIOD},
    store::Store,
    telem,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of run-cycles between telemetry reports (1 Hz at the cycle period).
const TELEM_DECIMATION: u64 = 50;

/// Distance driven by the demonstration task.
///
/// Units: encoder units
const DEMO_DRIVE_DISTANCE: f64 = 100.0;

/// Give up waiting for the demonstration task after this long.
const DEMO_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The executable's run-cycle: tick every running task, then telemetry on
/// the 1 Hz boundary.
struct ControlCycle {
    executor: Arc<Mutex<Executor>>,
    store: Arc<Store>,
    num_cycles: u64,
}

impl Cycle for ControlCycle {
    fn run_cycle(&mut self) {
        self.executor.lock().run_cycle();

        if self.num_cycles % TELEM_DECIMATION == 0 {
            telem::report(&self.store);
        }
        self.num_cycles += 1;
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("ctrl_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Talos Control Core\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let drive_params: drive_ctrl::Params = util::params::load_or_default("drive_ctrl.toml")
        .wrap_err("Could not load drive_ctrl params")?;
    let sim_params: SimParams =
        util::params::load_or_default("sim.toml").wrap_err("Could not load sim params")?;

    info!("Parameters loaded");

    // ---- INITIALISE STORE & EQUIPMENT ----

    let store = Arc::new(Store::new());

    let rig = SimRig::new(store.clone(), sim_params);
    let drivetrain: Arc<Mutex<dyn ctrl_lib::eqpt::Drivetrain>> = Arc::new(Mutex::new(rig.drivetrain()));
    let encoders = Arc::new(rig.encoders());

    info!("Store and simulated equipment initialised");

    // ---- INITIALISE SCHEDULER ----

    let executor = Arc::new(Mutex::new(Executor::new()));

    let cycle: Arc<Mutex<dyn Cycle>> = Arc::new(Mutex::new(ControlCycle {
        executor: executor.clone(),
        store: store.clone(),
        num_cycles: 0,
    }));

    let scheduler = Scheduler::new(CYCLE_PERIOD, cycle);

    // ---- RUN ----

    info!("Starting demonstration drive of {} units\n", DEMO_DRIVE_DISTANCE);

    executor.lock().start(Box::new(DriveStraight::new(
        store.clone(),
        drivetrain,
        encoders,
        drive_params,
        DistanceTarget::Fixed(DEMO_DRIVE_DISTANCE),
    )));

    scheduler.arm();

    // Wait for the task to retire itself
    let deadline = Instant::now() + DEMO_TIMEOUT;
    while !executor.lock().is_idle() {
        if Instant::now() > deadline {
            warn!("Demonstration task did not complete in time, cancelling");
            executor.lock().cancel_all();
            break;
        }
        thread::sleep(Duration::from_millis(50));
    }

    scheduler.disarm();

    info!(
        "Run complete: {} cycles, {} skipped ticks",
        scheduler.ticks(),
        scheduler.overruns()
    );

    // ---- SHUTDOWN ----

    rig.stop();

    info!("End of execution");

    Ok(())
}

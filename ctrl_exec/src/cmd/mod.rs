//! # Command task abstraction
//!
//! A command task is one stateful control activation: started by a caller,
//! ticked by the scheduler once per run-cycle while running, and retired on
//! completion or interruption. Tasks claim actuator resources exclusively -
//! starting a task whose resources are already held interrupts the incumbent
//! holder first, so no two tasks can ever issue conflicting actuator output.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod executor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use executor::Executor;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Actuator domains a command task may exclusively claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Drivetrain,
    Climber,
}

/// Lifecycle state of a command task.
///
/// `Finished` and `Interrupted` are terminal - a retired task receives no
/// further ticks and is discarded, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdState {
    Constructed,
    Running,
    Finished,
    Interrupted,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Contract implemented by every command task.
///
/// `execute` is called at the fixed cycle cadence and must not block; it may
/// read and write only the shared state store and the task's own control
/// variables. `end` and `interrupted` each run at most once per task
/// lifetime, and `interrupted` must guarantee the same actuator-safe cleanup
/// as `end`.
pub trait Command: Send {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Resources this task exclusively claims while running.
    fn resources(&self) -> &[Resource];

    /// Called once when the task starts, before the first `execute`.
    fn initialize(&mut self);

    /// Called once per run-cycle while the task is running.
    fn execute(&mut self);

    /// Evaluated after each `execute`; returning true retires the task
    /// through `end`.
    fn is_finished(&mut self) -> bool;

    /// Called once on nominal completion. Must leave actuators safe.
    fn end(&mut self);

    /// Called once when the task is cancelled, for example because another
    /// task claimed its resources. Must guarantee the same cleanup as `end`.
    fn interrupted(&mut self) {
        self.end();
    }
}

//! # Control core library.
//!
//! This library holds the robot's real-time control core: the shared state
//! store written by the acquisition thread and read by control tasks, the
//! fixed-period scheduler which drives those tasks, the command-task
//! abstraction itself, and the closed-loop drive task built on top of all
//! three.
//!
//! The library deliberately stops at the equipment seams - drivetrain and
//! acquisition hardware are reached only through the traits in [`eqpt`], so
//! the whole core can be exercised against simulated equipment.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command task abstraction - resource-claiming control activations and the executor that ticks
/// them
pub mod cmd;

/// Closed-loop drive task - drives the robot straight to a target distance
pub mod drive_ctrl;

/// Equipment interfaces - demand types and trait seams for the actuator and acquisition
/// collaborators
pub mod eqpt;

/// Periodic scheduler - fixed-rate timer driving the run-cycle
pub mod sched;

/// Shared state store - the fixed key space of sensor and input readings
pub mod store;

/// Telemetry reporter - periodic dump of the display subset of the store
pub mod telem;

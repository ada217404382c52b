//! Parameters structure for the drive-straight task

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the drive-straight closed loop.
///
/// The defaults are the calibrated values for the current drivetrain. The
/// tolerances and the stall threshold are in encoder units, whose physical
/// scale depends on the gear and wheel constants applied on the acquisition
/// side - they are calibration, not algorithm, which is why they live here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- HEADING LOOP ----
    /// Proportional gain of the heading-hold loop.
    pub rot_k_p: f64,

    /// Integral gain of the heading-hold loop.
    pub rot_k_i: f64,

    /// Derivative gain of the heading-hold loop.
    pub rot_k_d: f64,

    /// Clamp applied to the rotation demand.
    pub rot_limit: f64,

    // ---- FORWARD LOOP ----
    /// Proportional gain of the forward loop.
    pub fwd_k_p: f64,

    /// Integral gain of the forward loop.
    pub fwd_k_i: f64,

    /// Derivative gain of the forward loop.
    pub fwd_k_d: f64,

    /// Pad added to |target| in the forward error denominator.
    ///
    /// Bounds the proportional term for small targets and keeps the division
    /// away from zero.
    pub fwd_denom_pad: f64,

    /// Bias added to the forward demand magnitude once moving, so the
    /// drivetrain never stalls at the end of the proportional ramp.
    pub base_speed: f64,

    /// Clamp applied to the forward demand after biasing.
    pub fwd_limit: f64,

    // ---- TERMINATION ----
    /// Position tolerance around the target.
    ///
    /// Units: encoder units
    pub pos_tolerance: f64,

    /// Velocity magnitude below which the robot counts as settled.
    ///
    /// Units: encoder units/second
    pub vel_tolerance: f64,

    /// Rolling-mean velocity magnitude below which the robot counts as
    /// stalled, terminating the task regardless of position.
    ///
    /// Units: encoder units/second
    pub stall_mean_vel: f64,

    /// Number of samples in the rolling velocity history.
    pub vel_history_len: usize,

    /// Seed value for the history, so early ticks do not read as stalled.
    pub vel_history_seed: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Params {
            rot_k_p: 0.09,
            rot_k_i: 0.003,
            rot_k_d: 0.0,
            rot_limit: 0.70,

            fwd_k_p: 0.30,
            fwd_k_i: 0.0,
            fwd_k_d: 0.0,
            fwd_denom_pad: 5.0,
            base_speed: 0.38,
            fwd_limit: 0.80,

            pos_tolerance: 1.0,
            vel_tolerance: 0.4,
            stall_mean_vel: 0.01,
            vel_history_len: 50,
            vel_history_seed: 5.0,
        }
    }
}

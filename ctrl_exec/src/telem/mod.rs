//! # Telemetry reporter
//!
//! Periodic dump of the display subset of the shared state store for the
//! operator dashboard. Read-only and best-effort: plain store reads, nothing
//! here can block the control path.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;

// Internal
use crate::store::{Store, ValueKey};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The fixed subset of value keys shown on the dashboard.
const DISPLAY_KEYS: [ValueKey; 13] = [
    ValueKey::LeftEncoderPosition,
    ValueKey::RightEncoderPosition,
    ValueKey::LeftEncoderVelocity,
    ValueKey::Heading,
    ValueKey::HeadingRate,
    ValueKey::WheelTwist,
    ValueKey::Throttle,
    ValueKey::BreakBeam,
    ValueKey::SwitchOne,
    ValueKey::SwitchTwo,
    ValueKey::SwitchThree,
    ValueKey::SwitchFour,
    ValueKey::VisConnected,
];

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Log the current value of every display key.
pub fn report(store: &Store) {
    for key in DISPLAY_KEYS.iter() {
        info!("{}: {:.3}", key.display_name(), store.value(*key));
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

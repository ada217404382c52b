//! Key enumerations for the shared state store
//!
//! The key space is closed: adding a sensor or button means adding a variant
//! here and updating the thread that feeds it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::convert::TryFrom;

use super::StoreError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of named values tracked by the store.
pub const NUM_VALUE_KEYS: usize = 20;

/// The number of named triggers tracked by the store.
pub const NUM_TRIGGER_KEYS: usize = 4;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Keys of the named numeric values held in the store.
///
/// This covers every sensor and operator input the acquisition and input
/// threads feed into the core, including the vision pipeline outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKey {
    /// Heading of the robot, degrees
    Heading,
    /// Rate of change of heading, degrees/second
    HeadingRate,
    /// Left drive encoder position, encoder units
    LeftEncoderPosition,
    /// Right drive encoder position, encoder units
    RightEncoderPosition,
    /// Left drive encoder velocity, encoder units/second
    LeftEncoderVelocity,
    /// Break-beam sensor state (0 or 1)
    BreakBeam,
    SwitchOne,
    SwitchTwo,
    SwitchThree,
    SwitchFour,
    /// Operator wheel twist input
    WheelTwist,
    /// Operator throttle input
    Throttle,
    /// Operator joystick axis input
    JoystickAxis,
    /// Vision-derived distance to the target
    VisDistance,
    /// Vision-derived angle to the target
    VisAngle,
    /// Vision-derived bearing to the target
    VisBearing,
    /// Which side the vision target is on
    VisSide,
    /// Timestamp of the last vision solution
    VisTimestamp,
    /// Whether the vision coprocessor link is up (0 or 1)
    VisConnected,
    /// Whether the last vision solution succeeded (0 or 1)
    VisSuccess,
}

/// Keys of the named boolean triggers held in the store.
///
/// Edge-callback registration (when-pressed and friends) belongs to the
/// command-binding layer, not the store - the store holds pressed state only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKey {
    ClimberSpeedToggle,
    StartClimber,
    StopClimber,
    ClimberOneSec,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ValueKey {
    /// All value keys, in ordinal order.
    pub const ALL: [ValueKey; NUM_VALUE_KEYS] = [
        ValueKey::Heading,
        ValueKey::HeadingRate,
        ValueKey::LeftEncoderPosition,
        ValueKey::RightEncoderPosition,
        ValueKey::LeftEncoderVelocity,
        ValueKey::BreakBeam,
        ValueKey::SwitchOne,
        ValueKey::SwitchTwo,
        ValueKey::SwitchThree,
        ValueKey::SwitchFour,
        ValueKey::WheelTwist,
        ValueKey::Throttle,
        ValueKey::JoystickAxis,
        ValueKey::VisDistance,
        ValueKey::VisAngle,
        ValueKey::VisBearing,
        ValueKey::VisSide,
        ValueKey::VisTimestamp,
        ValueKey::VisConnected,
        ValueKey::VisSuccess,
    ];

    /// Ordinal of this key, used to index the store's slot arena.
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Human-readable name used by the telemetry reporter.
    pub fn display_name(self) -> &'static str {
        match self {
            ValueKey::Heading => "Heading",
            ValueKey::HeadingRate => "Heading Rate",
            ValueKey::LeftEncoderPosition => "Left Distance",
            ValueKey::RightEncoderPosition => "Right Distance",
            ValueKey::LeftEncoderVelocity => "Left Velocity",
            ValueKey::BreakBeam => "Break Beam",
            ValueKey::SwitchOne => "Switch One",
            ValueKey::SwitchTwo => "Switch Two",
            ValueKey::SwitchThree => "Switch Three",
            ValueKey::SwitchFour => "Switch Four",
            ValueKey::WheelTwist => "Wheel Twist",
            ValueKey::Throttle => "Throttle",
            ValueKey::JoystickAxis => "Joystick Axis",
            ValueKey::VisDistance => "Vision Distance",
            ValueKey::VisAngle => "Vision Angle",
            ValueKey::VisBearing => "Vision Bearing",
            ValueKey::VisSide => "Vision Side",
            ValueKey::VisTimestamp => "Vision Timestamp",
            ValueKey::VisConnected => "Vision Link",
            ValueKey::VisSuccess => "Vision Success",
        }
    }
}

impl TriggerKey {
    /// All trigger keys, in ordinal order.
    pub const ALL: [TriggerKey; NUM_TRIGGER_KEYS] = [
        TriggerKey::ClimberSpeedToggle,
        TriggerKey::StartClimber,
        TriggerKey::StopClimber,
        TriggerKey::ClimberOneSec,
    ];

    /// Ordinal of this key, used to index the store's slot arena.
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Parse a value key from its snake_case name.
///
/// This is the only path on which an unknown key is reachable - the typed
/// API is closed over the enum - and it fails fast rather than defaulting.
impl TryFrom<&str> for ValueKey {
    type Error = StoreError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        match name {
            "heading" => Ok(ValueKey::Heading),
            "heading_rate" => Ok(ValueKey::HeadingRate),
            "left_encoder_position" => Ok(ValueKey::LeftEncoderPosition),
            "right_encoder_position" => Ok(ValueKey::RightEncoderPosition),
            "left_encoder_velocity" => Ok(ValueKey::LeftEncoderVelocity),
            "break_beam" => Ok(ValueKey::BreakBeam),
            "switch_one" => Ok(ValueKey::SwitchOne),
            "switch_two" => Ok(ValueKey::SwitchTwo),
            "switch_three" => Ok(ValueKey::SwitchThree),
            "switch_four" => Ok(ValueKey::SwitchFour),
            "wheel_twist" => Ok(ValueKey::WheelTwist),
            "throttle" => Ok(ValueKey::Throttle),
            "joystick_axis" => Ok(ValueKey::JoystickAxis),
            "vis_distance" => Ok(ValueKey::VisDistance),
            "vis_angle" => Ok(ValueKey::VisAngle),
            "vis_bearing" => Ok(ValueKey::VisBearing),
            "vis_side" => Ok(ValueKey::VisSide),
            "vis_timestamp" => Ok(ValueKey::VisTimestamp),
            "vis_connected" => Ok(ValueKey::VisConnected),
            "vis_success" => Ok(ValueKey::VisSuccess),
            _ => Err(StoreError::UnknownKey(name.to_string())),
        }
    }
}

/// Parse a trigger key from its snake_case name.
impl TryFrom<&str> for TriggerKey {
    type Error = StoreError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        match name {
            "climber_speed_toggle" => Ok(TriggerKey::ClimberSpeedToggle),
            "start_climber" => Ok(TriggerKey::StartClimber),
            "stop_climber" => Ok(TriggerKey::StopClimber),
            "climber_one_sec" => Ok(TriggerKey::ClimberOneSec),
            _ => Err(StoreError::UnknownKey(name.to_string())),
        }
    }
}

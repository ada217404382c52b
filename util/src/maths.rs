//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Signum which maps an exactly-zero input to zero.
///
/// `Float::signum` maps `0.0` to `1.0`, which is the wrong behaviour when the
/// sign is used to direct an actuation bias - a zero demand must stay zero.
pub fn signum0<T>(value: T) -> T
where
    T: Float,
{
    if value == T::zero() {
        T::zero()
    } else {
        value.signum()
    }
}

/// Arithmetic mean of the given values, or `None` if there are no values.
pub fn mean<T, I>(values: I) -> Option<T>
where
    T: Float,
    I: IntoIterator<Item = T>,
{
    let mut sum = T::zero();
    let mut count = 0usize;

    for value in values {
        sum = sum + value;
        count += 1;
    }

    if count == 0 {
        None
    } else {
        Some(sum / T::from(count).unwrap())
    }
}

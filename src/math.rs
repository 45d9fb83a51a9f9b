//! Arithmetic helpers exposed alongside the style pipeline.

use crate::error::{Error, Result};

/// Compute `n!`.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if the result does not fit in a `u64`
/// (`n > 20`).
pub fn factorial(n: u32) -> Result<u64> {
    (2..=u64::from(n))
        .try_fold(1u64, u64::checked_mul)
        .ok_or_else(|| Error::InvalidParameter {
            name: "n".to_string(),
            reason: format!("{n}! overflows a 64-bit integer"),
        })
}

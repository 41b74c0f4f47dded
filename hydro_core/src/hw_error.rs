//! Maps `Box<dyn Error>` from trait boundaries to typed `ControlError`.
//!
//! The HAL traits in `hydro_traits` return `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `hydro_hardware::HwError` downcasting.

use crate::error::ControlError;

/// Map a trait-boundary error to a typed `ControlError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ControlError {
    #[cfg(feature = "hardware-errors")]
    {
        use hydro_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout | HwError::ConversionTimeout => ControlError::Timeout,
                other => ControlError::Hal(other.to_string()),
            };
        }
    }

    // Also catches errors we wrapped ourselves.
    if let Some(c) = e.downcast_ref::<ControlError>() {
        return c.clone();
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        ControlError::Timeout
    } else {
        ControlError::Hal(s)
    }
}

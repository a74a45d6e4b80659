//! Range checks used by `EngineConfig::validate`.

use crate::error::CoreError;

/// `value` must lie in `[0.0, 1.0]`; NaN is rejected.
pub fn validate_unit_range(value: f64, name: &str) -> Result<(), CoreError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(CoreError::Validation(format!(
            "{name} must be between 0.0 and 1.0, got {value}"
        )));
    }
    Ok(())
}

/// Validate that a warning level sits strictly below its critical level.
pub fn validate_ordered(warning: f64, critical: f64, name: &str) -> Result<(), CoreError> {
    if !(warning < critical) {
        return Err(CoreError::Validation(format!(
            "{name}: warning level ({warning}) must be below critical level ({critical})"
        )));
    }
    Ok(())
}

/// Validate that a value is finite and strictly positive.
pub fn validate_positive(value: f64, name: &str) -> Result<(), CoreError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CoreError::Validation(format!(
            "{name} must be a positive number, got {value}"
        )));
    }
    Ok(())
}

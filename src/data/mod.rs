pub mod receivers;
pub mod record;

pub use receivers::Receivers;
pub use record::SeismicRecord;

use ndarray::Array1;

use crate::error::{invalid, shape, Result};

/// Checks that a coordinate or grid sequence is non-empty and finite.
pub(crate) fn check_sequence(values: &Array1<f64>, name: &str) -> Result<()> {
    if values.is_empty() {
        return Err(shape(format!("{name} must not be empty")));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(invalid(format!("{name} must contain finite numbers only")));
    }
    Ok(())
}

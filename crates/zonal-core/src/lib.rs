#![deny(missing_docs)]
#![doc = "Shared vocabulary of the zonal analysis core: errors, settings, source locations, intervals and directed rounding."]

pub mod errors;
pub mod format;
pub mod interval;
mod location;
pub mod mode;
pub mod rounding;
pub mod schema;
pub mod settings;

pub use errors::{ErrorInfo, ZonalError};
pub use format::{FloatFormat, LIBM_ULPS};
pub use interval::Interval;
pub use location::SourceLocation;
pub use mode::DomainMode;
pub use schema::{SchemaVersion, DIAGNOSIS_SCHEMA, TRACE_SCHEMA};
pub use settings::Settings;

/// Builds a [`ZonalError::Invariant`] error tagged with the operation name.
pub fn invariant_error(code: &str, message: impl Into<String>, operation: &str) -> ZonalError {
    ZonalError::Invariant(ErrorInfo::new(code, message).with_context("operation", operation))
}

/// Builds a [`ZonalError::Infeasible`] error raised at `location`.
pub fn infeasible_error(
    code: &str,
    message: impl Into<String>,
    location: &SourceLocation,
) -> ZonalError {
    ZonalError::Infeasible(ErrorInfo::new(code, message).at(location))
}

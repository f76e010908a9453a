//! Integration suites run against a live account.
//!
//! Each suite is a [`WorkUnit`](crate::harness::WorkUnit) registered by name in
//! [`default_registry`]. Suites only read data.

pub mod meetings;
pub mod reports;
pub mod users;

use crate::error::ZoomError;
use crate::harness::UnitRegistry;

pub use meetings::MeetingsSuite;
pub use reports::ReportsSuite;
pub use users::UsersSuite;

/// Every built-in suite, in the order they are admitted.
pub fn default_registry() -> Result<UnitRegistry, ZoomError> {
    let mut registry = UnitRegistry::new();
    registry
        .register("Users", UsersSuite::default)?
        .register("Meetings", MeetingsSuite::default)?
        .register("Reports", ReportsSuite::default)?;
    Ok(registry)
}

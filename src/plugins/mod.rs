//! Pluggable conflict detection and workspace health checks.

pub mod conflicts;
pub mod directive;
pub mod doctor;

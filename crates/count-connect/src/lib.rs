//! Student and company marketplace for short-term stock-count work.
//!
//! The [`marketplace`] module carries the domain model, the pure matching rules, the
//! repository boundary, and the HTTP router. The remaining modules hold the service
//! plumbing shared by the binaries.

pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;

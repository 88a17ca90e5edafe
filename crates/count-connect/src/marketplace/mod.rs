//! Job board for short-term stock-count work.
//!
//! [`rules`] holds the side-effect-free matching logic; [`service`] composes it with a
//! [`repository::MarketplaceRepository`] and [`router`] exposes the service over HTTP.

pub mod domain;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    AccountKind, AccountProfile, Application, ApplicationId, ApplicationStatus, CompanyProfile,
    CompanyStats, Decision, Industry, Job, JobFilter, JobId, JobStatus, PayBand, StudentProfile,
    StudentStats, UserAccount, UserId, VerificationStatus,
};
pub use repository::{MarketplaceRepository, RepositoryError};
pub use router::marketplace_router;
pub use rules::{MarketplaceError, SubmittedApplication};
pub use service::{
    ApplicationSummary, CompanyDashboard, JobListing, MarketplaceService, ServiceError,
    StudentDashboard,
};
pub use validation::{JobDraft, ProfileDraft, RegistrationRequest, ValidationError};

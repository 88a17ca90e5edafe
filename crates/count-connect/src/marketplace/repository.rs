use super::domain::{Application, ApplicationId, Job, JobId, UserAccount, UserId};

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Implementations must make a write visible to every later read. Inserts refuse taken
/// identities with [`RepositoryError::Conflict`]: an existing id, an email already held by
/// another account (compared case-insensitively), or a second application for the same job
/// and student. Updates are conditional: `current` is the record as the caller read it, and
/// the write is refused with [`RepositoryError::Stale`] when the stored record no longer
/// equals it. These checks must happen atomically with the write; they are the only guard
/// against racing requests.
pub trait MarketplaceRepository: Send + Sync {
    fn users(&self) -> Result<Vec<UserAccount>, RepositoryError>;
    fn user(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError>;
    fn insert_user(&self, account: UserAccount) -> Result<UserAccount, RepositoryError>;
    fn update_user(&self, current: &UserAccount, next: UserAccount)
        -> Result<(), RepositoryError>;

    /// Jobs in posting order.
    fn jobs(&self) -> Result<Vec<Job>, RepositoryError>;
    fn job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError>;
    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError>;
    fn update_job(&self, current: &Job, next: Job) -> Result<(), RepositoryError>;
    fn delete_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError>;

    fn applications(&self) -> Result<Vec<Application>, RepositoryError>;
    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    /// Also refused with [`RepositoryError::Stale`] when the target job is gone or no longer
    /// open at the time of the write.
    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError>;
    fn update_application(
        &self,
        current: &Application,
        next: Application,
    ) -> Result<(), RepositoryError>;
    /// Remove every application pointing at `job_id`, returning how many were dropped.
    fn delete_applications_for_job(&self, job_id: &JobId) -> Result<usize, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed since it was read")]
    Stale,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

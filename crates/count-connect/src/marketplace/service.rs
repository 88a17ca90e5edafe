use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    Application, ApplicationId, CompanyProfile, CompanyStats, Decision, Job, JobFilter, JobId,
    JobStatus, PayBand, StudentStats, UserAccount, UserId, VerificationStatus,
};
use super::repository::{MarketplaceRepository, RepositoryError};
use super::rules::{self, MarketplaceError, SubmittedApplication};
use super::validation::{JobDraft, RegistrationRequest, ValidationError};

/// Number of applications shown on a student's dashboard overview.
pub const RECENT_APPLICATION_LIMIT: usize = 3;

/// Conditional writes re-read and re-evaluate at most this many times before giving up.
const WRITE_ATTEMPTS: usize = 3;

static USER_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static VERIFICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_user_id() -> UserId {
    let id = USER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    UserId(format!("usr-{id:06}"))
}

fn next_job_id() -> JobId {
    let id = JOB_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    JobId(format!("job-{id:06}"))
}

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Company initials, issue year, and a process-wide sequence, e.g. `TC2024001`.
fn next_verification_id(company: &CompanyProfile) -> String {
    let initials: String = company
        .company_name
        .split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_ascii_alphanumeric()))
        .take(2)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let initials = if initials.is_empty() {
        "CC".to_string()
    } else {
        initials
    };
    let sequence = VERIFICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{initials}{}{sequence:03}", Utc::now().year())
}

/// A job joined with the display details a student browses by.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobListing {
    #[serde(flatten)]
    pub job: Job,
    pub company_name: String,
    pub company_verified: bool,
    pub pay_band: PayBand,
}

/// An application with the title of the job it targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationSummary {
    #[serde(flatten)]
    pub application: Application,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentDashboard {
    pub student_id: UserId,
    pub stats: StudentStats,
    pub recent_applications: Vec<ApplicationSummary>,
    pub applied_jobs: Vec<Job>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyDashboard {
    pub company_id: UserId,
    pub verification_status: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_id: Option<String>,
    pub stats: CompanyStats,
    pub jobs: Vec<Job>,
}

/// Service composing the matching rules with the repository.
///
/// Job applicant lists are never trusted from storage; every read rebuilds them from the
/// application records.
pub struct MarketplaceService<R> {
    repository: Arc<R>,
}

impl<R> MarketplaceService<R>
where
    R: MarketplaceRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Create a student or company account.
    pub fn register_user(
        &self,
        request: RegistrationRequest,
    ) -> Result<UserAccount, ServiceError> {
        let existing = self.repository.users()?;
        let account = rules::register_account(&request, &existing, next_user_id(), Utc::now())
            .map_err(|err| {
                warn!(email = %request.email, error = %err, "registration rejected");
                err
            })?;

        let stored = match self.repository.insert_user(account) {
            Err(RepositoryError::Conflict) => {
                return Err(MarketplaceError::from(ValidationError::DuplicateEmail(
                    request.email.trim().to_lowercase(),
                ))
                .into())
            }
            other => other?,
        };
        info!(user_id = %stored.id, kind = stored.kind().label(), "account registered");
        Ok(stored)
    }

    pub fn user(&self, user_id: &UserId) -> Result<UserAccount, ServiceError> {
        self.repository
            .user(user_id)?
            .ok_or_else(|| ServiceError::UserNotFound(user_id.clone()))
    }

    /// Record the outcome of a company's verification review.
    pub fn record_company_verification(
        &self,
        company_id: &UserId,
        outcome: VerificationStatus,
    ) -> Result<UserAccount, ServiceError> {
        for _ in 0..WRITE_ATTEMPTS {
            let account = self.user(company_id)?;
            let updated = rules::record_verification(&account, outcome, next_verification_id)?;
            match self.repository.update_user(&account, updated.clone()) {
                Err(RepositoryError::Stale) => {
                    debug!(company_id = %company_id, "company changed during verification, retrying");
                    continue;
                }
                other => other?,
            }
            info!(
                company_id = %company_id,
                status = outcome.label(),
                verification_id = updated.as_company().and_then(|c| c.verification_id.as_deref()),
                "company verification recorded"
            );
            return Ok(updated);
        }
        Err(RepositoryError::Stale.into())
    }

    pub fn post_job(&self, draft: JobDraft) -> Result<Job, ServiceError> {
        let owner = self.repository.user(&draft.company_id)?;
        let job = rules::create_job(&draft, owner.as_ref(), next_job_id(), Utc::now()).map_err(
            |err| {
                warn!(company_id = %draft.company_id, error = %err, "job draft rejected");
                err
            },
        )?;
        let stored = self.repository.insert_job(job)?;
        info!(
            job_id = %stored.id,
            company_id = %stored.company_id,
            pay_rate = stored.pay_rate,
            "job posted"
        );
        Ok(stored)
    }

    /// Every job with applicants derived from the application records.
    pub fn list_jobs(&self) -> Result<Vec<Job>, ServiceError> {
        let applications = self.repository.applications()?;
        self.hydrated_jobs(&applications)
    }

    pub fn browse_jobs(&self, filter: &JobFilter) -> Result<Vec<JobListing>, ServiceError> {
        let jobs = rules::filter_jobs(&self.list_jobs()?, filter);
        let users = self.repository.users()?;
        debug!(matches = jobs.len(), "job search evaluated");

        Ok(jobs
            .into_iter()
            .map(|job| {
                let company = users
                    .iter()
                    .find(|user| user.id == job.company_id)
                    .and_then(UserAccount::as_company);
                JobListing {
                    company_name: company
                        .map(|c| c.company_name.clone())
                        .unwrap_or_default(),
                    company_verified: company.is_some_and(CompanyProfile::is_verified),
                    pay_band: job.pay_band(),
                    job,
                }
            })
            .collect())
    }

    pub fn job(&self, job_id: &JobId) -> Result<Job, ServiceError> {
        let applications = self.repository.applications()?;
        self.hydrated_job(job_id, &applications)
    }

    /// Remove a job together with the applications that reference it.
    pub fn delete_job(&self, job_id: &JobId) -> Result<Job, ServiceError> {
        let job = self.job(job_id)?;
        self.repository
            .delete_job(job_id)?
            .ok_or_else(|| MarketplaceError::JobNotFound(job_id.clone()))?;
        let dropped = self.repository.delete_applications_for_job(job_id)?;
        info!(job_id = %job_id, dropped_applications = dropped, "job deleted");
        Ok(job)
    }

    pub fn apply(
        &self,
        job_id: &JobId,
        student_id: &UserId,
        message: Option<String>,
    ) -> Result<SubmittedApplication, ServiceError> {
        let student = self.repository.user(student_id)?;
        rules::ensure_student(student.as_ref(), student_id)?;

        for _ in 0..WRITE_ATTEMPTS {
            let applications = self.repository.applications()?;
            let jobs = self.hydrated_jobs(&applications)?;
            let submitted = rules::submit_application(
                &applications,
                &jobs,
                job_id,
                student_id,
                message.clone(),
                next_application_id(),
                Utc::now(),
            )
            .map_err(|err| {
                warn!(job_id = %job_id, student_id = %student_id, error = %err, "application rejected");
                err
            })?;

            match self.repository.insert_application(submitted.application.clone()) {
                Err(RepositoryError::Conflict) => {
                    return Err(MarketplaceError::DuplicateApplication {
                        job_id: job_id.clone(),
                        student_id: student_id.clone(),
                    }
                    .into())
                }
                Err(RepositoryError::Stale) => {
                    debug!(job_id = %job_id, "job changed before the application landed, retrying");
                    continue;
                }
                other => other?,
            };
            info!(
                application_id = %submitted.application.id,
                job_id = %job_id,
                student_id = %student_id,
                "application submitted"
            );
            return Ok(submitted);
        }
        Err(RepositoryError::Stale.into())
    }

    pub fn decide(
        &self,
        application_id: &ApplicationId,
        decision: Decision,
    ) -> Result<Application, ServiceError> {
        for _ in 0..WRITE_ATTEMPTS {
            let application = self
                .repository
                .application(application_id)?
                .ok_or_else(|| ServiceError::ApplicationNotFound(application_id.clone()))?;
            let decided = rules::decide_application(&application, decision)?;
            match self.repository.update_application(&application, decided.clone()) {
                Err(RepositoryError::Stale) => {
                    debug!(application_id = %application_id, "application changed, re-deciding");
                    continue;
                }
                other => other?,
            }
            info!(
                application_id = %application_id,
                status = decided.status.label(),
                "application decided"
            );
            return Ok(decided);
        }
        Err(RepositoryError::Stale.into())
    }

    pub fn close_job(&self, job_id: &JobId) -> Result<Job, ServiceError> {
        self.transition_job(job_id, JobStatus::Closed)
    }

    pub fn complete_job(&self, job_id: &JobId) -> Result<Job, ServiceError> {
        self.transition_job(job_id, JobStatus::Completed)
    }

    pub fn select_student(&self, job_id: &JobId, student_id: &UserId) -> Result<Job, ServiceError> {
        let updated = self.update_job_with(job_id, |job| rules::select_student(job, student_id))?;
        info!(job_id = %job_id, student_id = %student_id, "student selected");
        Ok(updated)
    }

    pub fn student_dashboard(&self, student_id: &UserId) -> Result<StudentDashboard, ServiceError> {
        let account = self.user(student_id)?;
        rules::ensure_student(Some(&account), student_id)?;

        let applications = self.repository.applications()?;
        let jobs = self.hydrated_jobs(&applications)?;
        let own = rules::list_applications_for_student(&applications, student_id);

        let recent_applications = rules::recent_applications(&own, RECENT_APPLICATION_LIMIT)
            .into_iter()
            .map(|application| ApplicationSummary {
                job_title: jobs
                    .iter()
                    .find(|job| job.id == application.job_id)
                    .map(|job| job.title.clone()),
                application,
            })
            .collect();

        Ok(StudentDashboard {
            student_id: student_id.clone(),
            stats: rules::compute_student_stats(&applications, student_id),
            recent_applications,
            applied_jobs: rules::list_jobs_applied_by_student(&jobs, student_id),
        })
    }

    pub fn company_dashboard(&self, company_id: &UserId) -> Result<CompanyDashboard, ServiceError> {
        let account = self.user(company_id)?;
        let company = account
            .as_company()
            .ok_or_else(|| MarketplaceError::from(ValidationError::NotACompany(company_id.clone())))?;
        let jobs = self.list_jobs()?;

        Ok(CompanyDashboard {
            company_id: company_id.clone(),
            verification_status: company.verification_status,
            verification_id: company.verification_id.clone(),
            stats: rules::compute_company_stats(&jobs, company_id),
            jobs: rules::list_jobs_for_company(&jobs, company_id),
        })
    }

    fn transition_job(&self, job_id: &JobId, target: JobStatus) -> Result<Job, ServiceError> {
        let updated = self.update_job_with(job_id, |job| rules::transition_job(job, target))?;
        info!(job_id = %job_id, status = target.label(), "job status changed");
        Ok(updated)
    }

    /// Apply `change` to the current job and store the result only if nobody wrote the job
    /// in between; a lost race re-reads and re-applies, so the rule sees the winner's state.
    fn update_job_with<F>(&self, job_id: &JobId, change: F) -> Result<Job, ServiceError>
    where
        F: Fn(&Job) -> Result<Job, MarketplaceError>,
    {
        for _ in 0..WRITE_ATTEMPTS {
            let applications = self.repository.applications()?;
            let stored = self
                .repository
                .job(job_id)?
                .ok_or_else(|| MarketplaceError::JobNotFound(job_id.clone()))?;
            let updated = change(&hydrate(&stored, &applications))?;
            match self.repository.update_job(&stored, stored_form(&updated)) {
                Err(RepositoryError::Stale) => {
                    debug!(job_id = %job_id, "job changed during update, retrying");
                    continue;
                }
                other => other?,
            }
            return Ok(updated);
        }
        Err(RepositoryError::Stale.into())
    }

    fn hydrated_jobs(&self, applications: &[Application]) -> Result<Vec<Job>, ServiceError> {
        let jobs = self.repository.jobs()?;
        Ok(rules::derive_applicants(&jobs, applications))
    }

    fn hydrated_job(
        &self,
        job_id: &JobId,
        applications: &[Application],
    ) -> Result<Job, ServiceError> {
        let job = self
            .repository
            .job(job_id)?
            .ok_or_else(|| MarketplaceError::JobNotFound(job_id.clone()))?;
        Ok(hydrate(&job, applications))
    }
}

fn hydrate(job: &Job, applications: &[Application]) -> Job {
    rules::derive_applicants(std::slice::from_ref(job), applications)
        .pop()
        .unwrap_or_else(|| job.clone())
}

/// Jobs are persisted without applicants; they are re-derived on read.
fn stored_form(job: &Job) -> Job {
    let mut stored = job.clone();
    stored.applicants.clear();
    stored
}

/// Error raised by the marketplace service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Rules(#[from] MarketplaceError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
}

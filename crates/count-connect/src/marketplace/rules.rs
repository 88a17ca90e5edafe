//! Pure matching rules over a snapshot of users, jobs, and applications.
//!
//! Nothing here performs I/O or mutates its inputs. Write operations return new values and
//! leave persistence to the caller; identifiers and timestamps are passed in so repeated
//! calls with the same arguments produce the same result.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::domain::{
    AccountProfile, Application, ApplicationId, ApplicationStatus, CompanyProfile, CompanyStats,
    Decision, Job, JobFilter, JobId, JobStatus, StudentProfile, StudentStats, UserAccount,
    UserId, VerificationStatus,
};
use super::validation::{
    normalize_skills, parse_industry, validate_year_of_study, JobDraft, ProfileDraft,
    RegistrationRequest, ValidationError,
};

/// Rule violations surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketplaceError {
    #[error("student {student_id} has already applied to job {job_id}")]
    DuplicateApplication { job_id: JobId, student_id: UserId },
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("job {job_id} is {status} and no longer accepts changes")]
    JobClosed { job_id: JobId, status: JobStatus },
    #[error("cannot move {entity} {id} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        from: &'static str,
        to: &'static str,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Result of a successful application: the record to persist and the job as the student sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedApplication {
    pub application: Application,
    pub updated_job: Job,
}

pub fn list_jobs_for_company(jobs: &[Job], company_id: &UserId) -> Vec<Job> {
    jobs.iter()
        .filter(|job| &job.company_id == company_id)
        .cloned()
        .collect()
}

pub fn list_jobs_applied_by_student(jobs: &[Job], student_id: &UserId) -> Vec<Job> {
    jobs.iter()
        .filter(|job| has_student_applied(job, student_id))
        .cloned()
        .collect()
}

pub fn list_applications_for_student(
    applications: &[Application],
    student_id: &UserId,
) -> Vec<Application> {
    applications
        .iter()
        .filter(|application| &application.student_id == student_id)
        .cloned()
        .collect()
}

pub fn filter_jobs(jobs: &[Job], criteria: &JobFilter) -> Vec<Job> {
    jobs.iter()
        .filter(|job| criteria.matches(job))
        .cloned()
        .collect()
}

pub fn has_student_applied(job: &Job, student_id: &UserId) -> bool {
    job.applicants.contains(student_id)
}

pub fn submit_application(
    applications: &[Application],
    jobs: &[Job],
    job_id: &JobId,
    student_id: &UserId,
    message: Option<String>,
    application_id: ApplicationId,
    applied_at: DateTime<Utc>,
) -> Result<SubmittedApplication, MarketplaceError> {
    let job = jobs
        .iter()
        .find(|job| &job.id == job_id)
        .ok_or_else(|| MarketplaceError::JobNotFound(job_id.clone()))?;

    let duplicate = applications.iter().any(|application| {
        &application.job_id == job_id && &application.student_id == student_id
    });
    if duplicate || has_student_applied(job, student_id) {
        return Err(MarketplaceError::DuplicateApplication {
            job_id: job_id.clone(),
            student_id: student_id.clone(),
        });
    }
    ensure_open(job)?;

    let message = message
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());
    let application = Application {
        id: application_id,
        job_id: job_id.clone(),
        student_id: student_id.clone(),
        status: ApplicationStatus::Pending,
        applied_at,
        message,
    };

    let mut updated_job = job.clone();
    updated_job.applicants.push(student_id.clone());

    Ok(SubmittedApplication {
        application,
        updated_job,
    })
}

pub fn decide_application(
    application: &Application,
    decision: Decision,
) -> Result<Application, MarketplaceError> {
    let target = decision.resulting_status();
    if application.status != ApplicationStatus::Pending {
        return Err(MarketplaceError::InvalidTransition {
            entity: "application",
            id: application.id.0.clone(),
            from: application.status.label(),
            to: target.label(),
        });
    }

    let mut decided = application.clone();
    decided.status = target;
    Ok(decided)
}

pub fn compute_student_stats(applications: &[Application], student_id: &UserId) -> StudentStats {
    applications
        .iter()
        .filter(|application| &application.student_id == student_id)
        .fold(StudentStats::default(), |mut stats, application| {
            stats.total_applications += 1;
            match application.status {
                ApplicationStatus::Pending => stats.pending_count += 1,
                ApplicationStatus::Accepted => stats.accepted_count += 1,
                ApplicationStatus::Rejected => stats.rejected_count += 1,
            }
            stats
        })
}

pub fn compute_company_stats(jobs: &[Job], company_id: &UserId) -> CompanyStats {
    jobs.iter()
        .filter(|job| &job.company_id == company_id)
        .fold(CompanyStats::default(), |mut stats, job| {
            stats.total_jobs += 1;
            stats.total_applicants += job.applicants.len();
            if job.is_open() {
                stats.active_jobs += 1;
            }
            stats
        })
}

/// Move an open job to `closed` or `completed`. Both targets are terminal.
pub fn transition_job(job: &Job, target: JobStatus) -> Result<Job, MarketplaceError> {
    if job.status != JobStatus::Open || target == JobStatus::Open {
        return Err(MarketplaceError::InvalidTransition {
            entity: "job",
            id: job.id.0.clone(),
            from: job.status.label(),
            to: target.label(),
        });
    }

    let mut transitioned = job.clone();
    transitioned.status = target;
    Ok(transitioned)
}

/// Mark an applicant as selected. Selecting the same student twice is a no-op.
pub fn select_student(job: &Job, student_id: &UserId) -> Result<Job, MarketplaceError> {
    ensure_open(job)?;
    if !has_student_applied(job, student_id) {
        return Err(ValidationError::NotAnApplicant {
            job_id: job.id.clone(),
            student_id: student_id.clone(),
        }
        .into());
    }

    let mut updated = job.clone();
    if !updated.selected_students.contains(student_id) {
        updated.selected_students.push(student_id.clone());
    }
    Ok(updated)
}

/// Rebuild every job's applicant list from the application records.
///
/// Applicants are ordered by application time (ties broken by id) and selections that no
/// longer correspond to an applicant are dropped.
pub fn derive_applicants(jobs: &[Job], applications: &[Application]) -> Vec<Job> {
    let mut by_job: HashMap<&JobId, Vec<&Application>> = HashMap::new();
    for application in applications {
        by_job.entry(&application.job_id).or_default().push(application);
    }

    jobs.iter()
        .map(|job| {
            let mut records = by_job.remove(&job.id).unwrap_or_default();
            records.sort_by(|left, right| {
                left.applied_at
                    .cmp(&right.applied_at)
                    .then_with(|| left.id.cmp(&right.id))
            });

            let mut derived = job.clone();
            derived.applicants = Vec::with_capacity(records.len());
            for record in records {
                if !derived.applicants.contains(&record.student_id) {
                    derived.applicants.push(record.student_id.clone());
                }
            }
            let applicants = &derived.applicants;
            derived
                .selected_students
                .retain(|student| applicants.contains(student));
            derived
        })
        .collect()
}

/// Newest applications first, capped at `limit`.
pub fn recent_applications(applications: &[Application], limit: usize) -> Vec<Application> {
    let mut ordered = applications.to_vec();
    ordered.sort_by(|left, right| {
        right
            .applied_at
            .cmp(&left.applied_at)
            .then_with(|| right.id.cmp(&left.id))
    });
    ordered.truncate(limit);
    ordered
}

/// Build a new open job from a validated draft.
pub fn create_job(
    draft: &JobDraft,
    owner: Option<&UserAccount>,
    job_id: JobId,
    created_at: DateTime<Utc>,
) -> Result<Job, MarketplaceError> {
    draft.validate(owner)?;
    let pay_rate = draft.checked_pay_rate()?;

    Ok(Job {
        id: job_id,
        company_id: draft.company_id.clone(),
        title: draft.title.trim().to_string(),
        description: draft.description.trim().to_string(),
        location: draft.location.trim().to_string(),
        start_date: draft.start_date,
        end_date: draft.end_date,
        duration: draft.duration_label(),
        pay_rate,
        requirements: draft.cleaned_requirements(),
        status: JobStatus::Open,
        applicants: Vec::new(),
        selected_students: Vec::new(),
        created_at,
    })
}

/// Build an account from a sign-up request. Companies always start unverified.
pub fn register_account(
    request: &RegistrationRequest,
    existing: &[UserAccount],
    user_id: UserId,
    created_at: DateTime<Utc>,
) -> Result<UserAccount, MarketplaceError> {
    request.validate(existing)?;

    let profile = match &request.profile {
        ProfileDraft::Student {
            university,
            year,
            skills,
            experience,
        } => AccountProfile::Student(StudentProfile {
            university: university.trim().to_string(),
            year: validate_year_of_study(*year)?,
            skills: normalize_skills(skills),
            experience: experience.trim().to_string(),
        }),
        ProfileDraft::Company {
            company_name,
            industry,
            address,
        } => AccountProfile::Company(CompanyProfile {
            company_name: company_name.trim().to_string(),
            industry: parse_industry(industry)?,
            address: address.trim().to_string(),
            verification_status: VerificationStatus::Pending,
            verification_id: None,
        }),
    };

    Ok(UserAccount {
        id: user_id,
        email: request.email.trim().to_string(),
        name: request.name.trim().to_string(),
        phone: request
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
            .map(str::to_string),
        is_verified: false,
        created_at,
        profile,
    })
}

/// Apply a verification outcome to a company account.
///
/// `issue_id` is only invoked when the company enters `verified`, so an identifier is
/// minted exactly once per company and never replaced afterwards.
pub fn record_verification(
    account: &UserAccount,
    outcome: VerificationStatus,
    issue_id: impl FnOnce(&CompanyProfile) -> String,
) -> Result<UserAccount, MarketplaceError> {
    let company = account
        .as_company()
        .ok_or_else(|| ValidationError::NotACompany(account.id.clone()))?;

    if !company.verification_status.can_transition_to(outcome) {
        return Err(MarketplaceError::InvalidTransition {
            entity: "company verification",
            id: account.id.0.clone(),
            from: company.verification_status.label(),
            to: outcome.label(),
        });
    }

    let mut updated_company = company.clone();
    updated_company.verification_status = outcome;
    if outcome == VerificationStatus::Verified && updated_company.verification_id.is_none() {
        updated_company.verification_id = Some(issue_id(company));
    }

    let mut updated = account.clone();
    updated.is_verified = updated_company.is_verified();
    updated.profile = AccountProfile::Company(updated_company);
    Ok(updated)
}

/// Confirm the looked-up account exists and is a student.
pub fn ensure_student(
    account: Option<&UserAccount>,
    student_id: &UserId,
) -> Result<(), MarketplaceError> {
    let account = account.ok_or_else(|| ValidationError::UnknownStudent(student_id.clone()))?;
    match account.profile {
        AccountProfile::Student(_) => Ok(()),
        AccountProfile::Company(_) => Err(ValidationError::NotAStudent(student_id.clone()).into()),
    }
}

fn ensure_open(job: &Job) -> Result<(), MarketplaceError> {
    if job.is_open() {
        Ok(())
    } else {
        Err(MarketplaceError::JobClosed {
            job_id: job.id.clone(),
            status: job.status,
        })
    }
}

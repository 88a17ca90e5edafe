use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::marketplace::domain::{
    AccountProfile, Application, ApplicationId, ApplicationStatus, CompanyProfile, Industry, Job,
    JobId, JobStatus, StudentProfile, UserAccount, UserId, VerificationStatus,
};
use crate::marketplace::repository::{MarketplaceRepository, RepositoryError};
use crate::marketplace::validation::{JobDraft, ProfileDraft, RegistrationRequest};
use crate::marketplace::{marketplace_router, MarketplaceService};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn timestamp(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn company(id: &str, name: &str, status: VerificationStatus) -> UserAccount {
    UserAccount {
        id: UserId(id.to_string()),
        email: format!("hr@{}.com", id.to_ascii_lowercase()),
        name: "Raj Sharma".to_string(),
        phone: None,
        is_verified: status == VerificationStatus::Verified,
        created_at: timestamp(1, 9),
        profile: AccountProfile::Company(CompanyProfile {
            company_name: name.to_string(),
            industry: Industry::Manufacturing,
            address: "Mumbai, Maharashtra".to_string(),
            verification_status: status,
            verification_id: (status == VerificationStatus::Verified)
                .then(|| format!("{id}2024001")),
        }),
    }
}

pub(super) fn student(id: &str) -> UserAccount {
    UserAccount {
        id: UserId(id.to_string()),
        email: format!("{}@student.com", id.to_ascii_lowercase()),
        name: "Anil Kumar".to_string(),
        phone: Some("+91 76543 21098".to_string()),
        is_verified: false,
        created_at: timestamp(2, 9),
        profile: AccountProfile::Student(StudentProfile {
            university: "Delhi University".to_string(),
            year: 3,
            skills: vec!["Excel".to_string(), "Data Entry".to_string()],
            experience: "Completed 2 stock counts last year".to_string(),
        }),
    }
}

pub(super) fn job(id: &str, company_id: &str, pay_rate: u32) -> Job {
    Job {
        id: JobId(id.to_string()),
        company_id: UserId(company_id.to_string()),
        title: "Warehouse Stock Count Assistant".to_string(),
        description: "Assist with our annual inventory count. Training will be provided."
            .to_string(),
        location: "Gurgaon, Haryana".to_string(),
        start_date: date(2024, 3, 15),
        end_date: date(2024, 3, 20),
        duration: "6 days".to_string(),
        pay_rate,
        requirements: vec!["Basic Excel knowledge".to_string()],
        status: JobStatus::Open,
        applicants: Vec::new(),
        selected_students: Vec::new(),
        created_at: timestamp(10, 9),
    }
}

pub(super) fn application(id: &str, job_id: &str, student_id: &str, status: ApplicationStatus) -> Application {
    Application {
        id: ApplicationId(id.to_string()),
        job_id: JobId(job_id.to_string()),
        student_id: UserId(student_id.to_string()),
        status,
        applied_at: timestamp(11, 9),
        message: None,
    }
}

pub(super) fn job_draft(company_id: &UserId) -> JobDraft {
    JobDraft {
        company_id: company_id.clone(),
        title: "Retail Store Inventory Count".to_string(),
        description: "Stock counting across multiple retail locations.".to_string(),
        location: "South Delhi".to_string(),
        start_date: date(2024, 3, 22),
        end_date: date(2024, 3, 25),
        duration: None,
        pay_rate: 1200,
        requirements: vec![
            "Commerce background preferred".to_string(),
            "  ".to_string(),
            "Team player".to_string(),
        ],
    }
}

pub(super) fn student_registration(email: &str) -> RegistrationRequest {
    RegistrationRequest {
        email: email.to_string(),
        name: "Sneha Singh".to_string(),
        phone: None,
        profile: ProfileDraft::Student {
            university: "Mumbai University".to_string(),
            year: 2,
            skills: vec![
                "MS Office".to_string(),
                "ms office".to_string(),
                "Accounting".to_string(),
            ],
            experience: "New to stock counting, eager to learn".to_string(),
        },
    }
}

pub(super) fn company_registration(email: &str, industry: &str) -> RegistrationRequest {
    RegistrationRequest {
        email: email.to_string(),
        name: "Priya Patel".to_string(),
        phone: Some("+91 87654 32109".to_string()),
        profile: ProfileDraft::Company {
            company_name: "FinancePlus Auditors".to_string(),
            industry: industry.to_string(),
            address: "Delhi, NCR".to_string(),
        },
    }
}

#[derive(Default)]
struct MemoryState {
    users: Vec<UserAccount>,
    jobs: Vec<Job>,
    applications: Vec<Application>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub(super) fn stored_jobs(&self) -> Vec<Job> {
        self.state.lock().expect("repository mutex poisoned").jobs.clone()
    }
}

impl MarketplaceRepository for MemoryRepository {
    fn users(&self) -> Result<Vec<UserAccount>, RepositoryError> {
        Ok(self.state.lock().expect("repository mutex poisoned").users.clone())
    }

    fn user(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard.users.iter().find(|user| &user.id == id).cloned())
    }

    fn insert_user(&self, account: UserAccount) -> Result<UserAccount, RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        let taken = guard
            .users
            .iter()
            .any(|user| user.id == account.id || user.has_email(&account.email));
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.users.push(account.clone());
        Ok(account)
    }

    fn update_user(
        &self,
        current: &UserAccount,
        next: UserAccount,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        let slot = guard
            .users
            .iter_mut()
            .find(|user| user.id == current.id)
            .ok_or(RepositoryError::NotFound)?;
        swap_if_unchanged(slot, current, next)
    }

    fn jobs(&self) -> Result<Vec<Job>, RepositoryError> {
        Ok(self.stored_jobs())
    }

    fn job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard.jobs.iter().find(|job| &job.id == id).cloned())
    }

    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        if guard.jobs.iter().any(|existing| existing.id == job.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.jobs.push(job.clone());
        Ok(job)
    }

    fn update_job(&self, current: &Job, next: Job) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        let slot = guard
            .jobs
            .iter_mut()
            .find(|existing| existing.id == current.id)
            .ok_or(RepositoryError::NotFound)?;
        swap_if_unchanged(slot, current, next)
    }

    fn delete_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        let position = guard.jobs.iter().position(|job| &job.id == id);
        Ok(position.map(|index| guard.jobs.remove(index)))
    }

    fn applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .expect("repository mutex poisoned")
            .applications
            .clone())
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let guard = self.state.lock().expect("repository mutex poisoned");
        Ok(guard
            .applications
            .iter()
            .find(|application| &application.id == id)
            .cloned())
    }

    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        let open = guard
            .jobs
            .iter()
            .any(|job| job.id == application.job_id && job.is_open());
        if !open {
            return Err(RepositoryError::Stale);
        }
        let duplicate = guard.applications.iter().any(|existing| {
            existing.id == application.id
                || (existing.job_id == application.job_id
                    && existing.student_id == application.student_id)
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.applications.push(application.clone());
        Ok(application)
    }

    fn update_application(
        &self,
        current: &Application,
        next: Application,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        let slot = guard
            .applications
            .iter_mut()
            .find(|existing| existing.id == current.id)
            .ok_or(RepositoryError::NotFound)?;
        swap_if_unchanged(slot, current, next)
    }

    fn delete_applications_for_job(&self, job_id: &JobId) -> Result<usize, RepositoryError> {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        let before = guard.applications.len();
        guard
            .applications
            .retain(|application| &application.job_id != job_id);
        Ok(before - guard.applications.len())
    }
}

fn swap_if_unchanged<T: PartialEq>(slot: &mut T, current: &T, next: T) -> Result<(), RepositoryError> {
    if slot != current {
        return Err(RepositoryError::Stale);
    }
    *slot = next;
    Ok(())
}

/// Wraps [`MemoryRepository`] so tests can force two requests to interleave.
///
/// Once [`hold_reads`](Self::hold_reads) is called, the next two reads of an application or
/// job block until both have happened, so both callers act on the same snapshot. A hook
/// registered with [`before_next_write`](Self::before_next_write) runs once, right before the
/// next application insert or job delete reaches storage.
pub(super) struct InterleavedRepository {
    inner: MemoryRepository,
    rendezvous: Barrier,
    held_reads: AtomicUsize,
    write_hook: Mutex<Option<Box<dyn FnOnce(&MemoryRepository) + Send>>>,
}

impl InterleavedRepository {
    pub(super) fn new(inner: MemoryRepository) -> Self {
        Self {
            inner,
            rendezvous: Barrier::new(2),
            held_reads: AtomicUsize::new(0),
            write_hook: Mutex::new(None),
        }
    }

    pub(super) fn hold_reads(&self) {
        self.held_reads.store(2, Ordering::SeqCst);
    }

    pub(super) fn before_next_write(&self, hook: impl FnOnce(&MemoryRepository) + Send + 'static) {
        *self.write_hook.lock().expect("hook mutex poisoned") = Some(Box::new(hook));
    }

    fn run_write_hook(&self) {
        let hook = self.write_hook.lock().expect("hook mutex poisoned").take();
        if let Some(hook) = hook {
            hook(&self.inner);
        }
    }

    fn meet_other_reader(&self) {
        let held = self
            .held_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if held {
            self.rendezvous.wait();
        }
    }
}

impl MarketplaceRepository for InterleavedRepository {
    fn users(&self) -> Result<Vec<UserAccount>, RepositoryError> {
        self.inner.users()
    }

    fn user(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        self.inner.user(id)
    }

    fn insert_user(&self, account: UserAccount) -> Result<UserAccount, RepositoryError> {
        self.inner.insert_user(account)
    }

    fn update_user(
        &self,
        current: &UserAccount,
        next: UserAccount,
    ) -> Result<(), RepositoryError> {
        self.inner.update_user(current, next)
    }

    fn jobs(&self) -> Result<Vec<Job>, RepositoryError> {
        self.inner.jobs()
    }

    fn job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        let job = self.inner.job(id);
        self.meet_other_reader();
        job
    }

    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError> {
        self.inner.insert_job(job)
    }

    fn update_job(&self, current: &Job, next: Job) -> Result<(), RepositoryError> {
        self.inner.update_job(current, next)
    }

    fn delete_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        self.run_write_hook();
        self.inner.delete_job(id)
    }

    fn applications(&self) -> Result<Vec<Application>, RepositoryError> {
        self.inner.applications()
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let application = self.inner.application(id);
        self.meet_other_reader();
        application
    }

    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        self.run_write_hook();
        self.inner.insert_application(application)
    }

    fn update_application(
        &self,
        current: &Application,
        next: Application,
    ) -> Result<(), RepositoryError> {
        self.inner.update_application(current, next)
    }

    fn delete_applications_for_job(&self, job_id: &JobId) -> Result<usize, RepositoryError> {
        self.inner.delete_applications_for_job(job_id)
    }
}

pub(super) struct UnavailableRepository;

impl MarketplaceRepository for UnavailableRepository {
    fn users(&self) -> Result<Vec<UserAccount>, RepositoryError> {
        Err(offline())
    }

    fn user(&self, _id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        Err(offline())
    }

    fn insert_user(&self, _account: UserAccount) -> Result<UserAccount, RepositoryError> {
        Err(offline())
    }

    fn update_user(
        &self,
        _current: &UserAccount,
        _next: UserAccount,
    ) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn jobs(&self) -> Result<Vec<Job>, RepositoryError> {
        Err(offline())
    }

    fn job(&self, _id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Err(offline())
    }

    fn insert_job(&self, _job: Job) -> Result<Job, RepositoryError> {
        Err(offline())
    }

    fn update_job(&self, _current: &Job, _next: Job) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn delete_job(&self, _id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Err(offline())
    }

    fn applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Err(offline())
    }

    fn application(&self, _id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Err(offline())
    }

    fn insert_application(
        &self,
        _application: Application,
    ) -> Result<Application, RepositoryError> {
        Err(offline())
    }

    fn update_application(
        &self,
        _current: &Application,
        _next: Application,
    ) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn delete_applications_for_job(&self, _job_id: &JobId) -> Result<usize, RepositoryError> {
        Err(offline())
    }
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

pub(super) fn build_service() -> (MarketplaceService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = MarketplaceService::new(repository.clone());
    (service, repository)
}

/// Service holding one verified company and two students.
pub(super) fn seeded_service() -> (
    MarketplaceService<MemoryRepository>,
    Arc<MemoryRepository>,
    Seeded,
) {
    let (service, repository) = build_service();
    let seeded = seed_accounts(&repository);
    (service, repository, seeded)
}

/// Same accounts as [`seeded_service`], behind an [`InterleavedRepository`].
pub(super) fn interleaved_service() -> (
    MarketplaceService<InterleavedRepository>,
    Arc<InterleavedRepository>,
    Seeded,
) {
    let memory = MemoryRepository::default();
    let seeded = seed_accounts(&memory);
    let repository = Arc::new(InterleavedRepository::new(memory));
    let service = MarketplaceService::new(repository.clone());
    (service, repository, seeded)
}

fn seed_accounts(repository: &MemoryRepository) -> Seeded {
    let company = company("C1", "TechCorp Industries", VerificationStatus::Verified);
    let first = student("S1");
    let second = student("S2");
    for account in [company.clone(), first.clone(), second.clone()] {
        repository.insert_user(account).expect("seed user");
    }
    Seeded {
        company: company.id,
        first_student: first.id,
        second_student: second.id,
    }
}

pub(super) struct Seeded {
    pub(super) company: UserId,
    pub(super) first_student: UserId,
    pub(super) second_student: UserId,
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn router_with_service(service: MarketplaceService<MemoryRepository>) -> axum::Router {
    marketplace_router(Arc::new(service))
}

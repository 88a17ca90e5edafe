use count_connect::marketplace::{
    Application, ApplicationId, Job, JobId, MarketplaceRepository, PayBand, RepositoryError,
    UserAccount, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct BoardTables {
    users: HashMap<UserId, UserAccount>,
    jobs: Vec<Job>,
    applications: Vec<Application>,
}

/// Process-local store backing the service; nothing survives a restart.
#[derive(Default, Clone)]
pub(crate) struct InMemoryMarketplaceRepository {
    tables: Arc<Mutex<BoardTables>>,
}

impl InMemoryMarketplaceRepository {
    fn lock(&self) -> Result<MutexGuard<'_, BoardTables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl MarketplaceRepository for InMemoryMarketplaceRepository {
    fn users(&self) -> Result<Vec<UserAccount>, RepositoryError> {
        let guard = self.lock()?;
        let mut users: Vec<UserAccount> = guard.users.values().cloned().collect();
        users.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        Ok(users)
    }

    fn user(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    fn insert_user(&self, account: UserAccount) -> Result<UserAccount, RepositoryError> {
        let mut guard = self.lock()?;
        let taken = guard.users.contains_key(&account.id)
            || guard
                .users
                .values()
                .any(|existing| existing.has_email(&account.email));
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.users.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    fn update_user(
        &self,
        current: &UserAccount,
        next: UserAccount,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let slot = guard
            .users
            .get_mut(&current.id)
            .ok_or(RepositoryError::NotFound)?;
        replace_if_current(slot, current, next)
    }

    fn jobs(&self) -> Result<Vec<Job>, RepositoryError> {
        Ok(self.lock()?.jobs.clone())
    }

    fn job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.lock()?.jobs.iter().find(|job| &job.id == id).cloned())
    }

    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.jobs.iter().any(|existing| existing.id == job.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.jobs.push(job.clone());
        Ok(job)
    }

    fn update_job(&self, current: &Job, next: Job) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let slot = guard
            .jobs
            .iter_mut()
            .find(|existing| existing.id == current.id)
            .ok_or(RepositoryError::NotFound)?;
        replace_if_current(slot, current, next)
    }

    fn delete_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        let mut guard = self.lock()?;
        let position = guard.jobs.iter().position(|job| &job.id == id);
        Ok(position.map(|index| guard.jobs.remove(index)))
    }

    fn applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Ok(self.lock()?.applications.clone())
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .lock()?
            .applications
            .iter()
            .find(|application| &application.id == id)
            .cloned())
    }

    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.lock()?;
        let accepting = guard
            .jobs
            .iter()
            .any(|job| job.id == application.job_id && job.is_open());
        if !accepting {
            return Err(RepositoryError::Stale);
        }
        let taken = guard.applications.iter().any(|existing| {
            existing.id == application.id
                || (existing.job_id == application.job_id
                    && existing.student_id == application.student_id)
        });
        if taken {
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
        let mut guard = self.lock()?;
        let slot = guard
            .applications
            .iter_mut()
            .find(|existing| existing.id == current.id)
            .ok_or(RepositoryError::NotFound)?;
        replace_if_current(slot, current, next)
    }

    fn delete_applications_for_job(&self, job_id: &JobId) -> Result<usize, RepositoryError> {
        let mut guard = self.lock()?;
        let before = guard.applications.len();
        guard
            .applications
            .retain(|application| &application.job_id != job_id);
        Ok(before - guard.applications.len())
    }
}

/// Compare-and-set under the table lock: `next` lands only if nobody wrote since `current`
/// was read.
fn replace_if_current<T: PartialEq>(
    slot: &mut T,
    current: &T,
    next: T,
) -> Result<(), RepositoryError> {
    if slot != current {
        return Err(RepositoryError::Stale);
    }
    *slot = next;
    Ok(())
}

pub(crate) fn parse_pay_band(raw: &str) -> Result<PayBand, String> {
    PayBand::parse(raw)
        .ok_or_else(|| format!("unknown pay band '{raw}' (expected low, medium, or high)"))
}

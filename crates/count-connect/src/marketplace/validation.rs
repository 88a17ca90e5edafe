use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Industry, JobId, UserAccount, UserId};

/// Malformed or inconsistent input rejected before any state changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} must not be blank")]
    BlankField(&'static str),
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("an account already exists for {0}")]
    DuplicateEmail(String),
    #[error("year of study must be between 1 and 4 (found {0})")]
    YearOfStudyOutOfRange(i64),
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
    #[error("pay rate must be a positive whole amount per day (found {0})")]
    InvalidPayRate(i64),
    #[error("unknown industry '{0}'")]
    UnknownIndustry(String),
    #[error("unknown pay band '{0}' (expected low, medium, or high)")]
    UnknownPayBand(String),
    #[error("company {0} does not exist")]
    UnknownCompany(UserId),
    #[error("account {0} is not a company")]
    NotACompany(UserId),
    #[error("company {0} must complete verification before posting jobs")]
    CompanyNotVerified(UserId),
    #[error("student {0} does not exist")]
    UnknownStudent(UserId),
    #[error("account {0} is not a student")]
    NotAStudent(UserId),
    #[error("student {student_id} has not applied to job {job_id}")]
    NotAnApplicant { job_id: JobId, student_id: UserId },
}

/// Job record submitted by a company before ids and status are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDraft {
    pub company_id: UserId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub duration: Option<String>,
    pub pay_rate: i64,
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl JobDraft {
    /// Check field shapes and that `owner` is a verified company.
    pub fn validate(&self, owner: Option<&UserAccount>) -> Result<(), ValidationError> {
        let owner = owner.ok_or_else(|| ValidationError::UnknownCompany(self.company_id.clone()))?;
        let company = owner
            .as_company()
            .ok_or_else(|| ValidationError::NotACompany(owner.id.clone()))?;
        if !company.is_verified() {
            return Err(ValidationError::CompanyNotVerified(owner.id.clone()));
        }

        require_text("title", &self.title)?;
        require_text("description", &self.description)?;
        require_text("location", &self.location)?;
        if self.end_date < self.start_date {
            return Err(ValidationError::EndBeforeStart {
                start: self.start_date,
                end: self.end_date,
            });
        }
        self.checked_pay_rate()?;
        Ok(())
    }

    pub fn checked_pay_rate(&self) -> Result<u32, ValidationError> {
        u32::try_from(self.pay_rate)
            .ok()
            .filter(|rate| *rate > 0)
            .ok_or(ValidationError::InvalidPayRate(self.pay_rate))
    }

    /// Supplied label, or the inclusive day count between the dates.
    pub fn duration_label(&self) -> String {
        match self.duration.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => {
                let days = (self.end_date - self.start_date).num_days() + 1;
                if days == 1 {
                    "1 day".to_string()
                } else {
                    format!("{days} days")
                }
            }
        }
    }

    pub fn cleaned_requirements(&self) -> Vec<String> {
        self.requirements
            .iter()
            .map(|requirement| requirement.trim())
            .filter(|requirement| !requirement.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Sign-up payload for either account kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileDraft,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProfileDraft {
    Student {
        university: String,
        year: i64,
        #[serde(default)]
        skills: Vec<String>,
        #[serde(default)]
        experience: String,
    },
    Company {
        company_name: String,
        industry: String,
        address: String,
    },
}

impl RegistrationRequest {
    /// Validate the payload against the accounts that already exist.
    pub fn validate(&self, existing: &[UserAccount]) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        validate_email(&self.email)?;
        if existing.iter().any(|account| account.has_email(&self.email)) {
            return Err(ValidationError::DuplicateEmail(self.email.trim().to_lowercase()));
        }

        match &self.profile {
            ProfileDraft::Student {
                university, year, ..
            } => {
                require_text("university", university)?;
                validate_year_of_study(*year)?;
            }
            ProfileDraft::Company {
                company_name,
                industry,
                address,
            } => {
                require_text("company name", company_name)?;
                require_text("address", address)?;
                parse_industry(industry)?;
            }
        }
        Ok(())
    }
}

pub fn parse_industry(value: &str) -> Result<Industry, ValidationError> {
    Industry::parse(value).ok_or_else(|| ValidationError::UnknownIndustry(value.to_string()))
}

pub fn validate_year_of_study(year: i64) -> Result<u8, ValidationError> {
    match u8::try_from(year) {
        Ok(valid @ 1..=4) => Ok(valid),
        _ => Err(ValidationError::YearOfStudyOutOfRange(year)),
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let trimmed = email.trim();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !trimmed.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

/// Deduplicate skill tags case-insensitively, keeping the first spelling.
pub fn normalize_skills(skills: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(skills.len());
    let mut seen = HashSet::with_capacity(skills.len());
    for skill in skills.iter().map(|skill| skill.trim()) {
        if skill.is_empty() || !seen.insert(skill.to_lowercase()) {
            continue;
        }
        normalized.push(skill.to_string());
    }
    normalized
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::BlankField(field))
    } else {
        Ok(())
    }
}

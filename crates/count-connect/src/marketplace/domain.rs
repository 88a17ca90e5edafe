use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for student and company accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Identifier wrapper for posted jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

macro_rules! display_id {
    ($($name:ident),+) => {
        $(impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })+
    };
}

display_id!(UserId, JobId, ApplicationId);

/// Discriminant of an account; fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Student,
    Company,
}

impl AccountKind {
    pub const fn label(self) -> &'static str {
        match self {
            AccountKind::Student => "student",
            AccountKind::Company => "company",
        }
    }
}

/// Registered marketplace participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub profile: AccountProfile,
}

impl UserAccount {
    pub fn kind(&self) -> AccountKind {
        self.profile.kind()
    }

    pub fn as_student(&self) -> Option<&StudentProfile> {
        match &self.profile {
            AccountProfile::Student(profile) => Some(profile),
            AccountProfile::Company(_) => None,
        }
    }

    pub fn as_company(&self) -> Option<&CompanyProfile> {
        match &self.profile {
            AccountProfile::Company(profile) => Some(profile),
            AccountProfile::Student(_) => None,
        }
    }

    /// Emails are unique across accounts regardless of case.
    pub fn has_email(&self, email: &str) -> bool {
        self.email.trim().to_lowercase() == email.trim().to_lowercase()
    }
}

/// Kind-specific payload, tagged with `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccountProfile {
    Student(StudentProfile),
    Company(CompanyProfile),
}

impl AccountProfile {
    pub fn kind(&self) -> AccountKind {
        match self {
            AccountProfile::Student(_) => AccountKind::Student,
            AccountProfile::Company(_) => AccountKind::Company,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub university: String,
    pub year: u8,
    pub skills: Vec<String>,
    pub experience: String,
}

impl StudentProfile {
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills
            .iter()
            .any(|existing| existing.to_lowercase() == skill.trim().to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub company_name: String,
    pub industry: Industry,
    pub address: String,
    pub verification_status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_id: Option<String>,
}

impl CompanyProfile {
    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }
}

/// Industries a company can register under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Industry {
    Manufacturing,
    Retail,
    #[serde(rename = "Audit/Finance")]
    AuditFinance,
    Logistics,
    Other,
}

impl Industry {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Manufacturing,
            Self::Retail,
            Self::AuditFinance,
            Self::Logistics,
            Self::Other,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Manufacturing => "Manufacturing",
            Self::Retail => "Retail",
            Self::AuditFinance => "Audit/Finance",
            Self::Logistics => "Logistics",
            Self::Other => "Other",
        }
    }

    /// Parse a free-text industry label; `None` for anything outside the fixed set.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "finance & audit" | "audit & finance" | "audit" | "finance" => {
                return Some(Self::AuditFinance)
            }
            _ => {}
        }
        Self::ordered()
            .into_iter()
            .find(|industry| industry.label().eq_ignore_ascii_case(&normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        }
    }

    /// `verified` is final; a rejected company may resubmit.
    pub fn can_transition_to(self, next: VerificationStatus) -> bool {
        matches!(
            (self, next),
            (VerificationStatus::Pending, VerificationStatus::Verified)
                | (VerificationStatus::Pending, VerificationStatus::Rejected)
                | (VerificationStatus::Rejected, VerificationStatus::Pending)
        )
    }
}

/// A posted stock-count engagement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub company_id: UserId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration: String,
    pub pay_rate: u32,
    pub requirements: Vec<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub applicants: Vec<UserId>,
    #[serde(default)]
    pub selected_students: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn is_open(&self) -> bool {
        self.status == JobStatus::Open
    }

    pub fn pay_band(&self) -> PayBand {
        PayBand::for_rate(self.pay_rate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Closed,
    Completed,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Closed => "closed",
            JobStatus::Completed => "completed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Open)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A student's request to work a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub student_id: UserId,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Company verdict on a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub const fn resulting_status(self) -> ApplicationStatus {
        match self {
            Decision::Accept => ApplicationStatus::Accepted,
            Decision::Reject => ApplicationStatus::Rejected,
        }
    }
}

/// Coarse bucket over the daily pay rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayBand {
    Low,
    Medium,
    High,
}

impl PayBand {
    pub const MEDIUM_FLOOR: u32 = 1000;
    pub const HIGH_FLOOR: u32 = 1500;

    pub const fn for_rate(pay_rate: u32) -> Self {
        if pay_rate < Self::MEDIUM_FLOOR {
            PayBand::Low
        } else if pay_rate < Self::HIGH_FLOOR {
            PayBand::Medium
        } else {
            PayBand::High
        }
    }

    pub const fn contains(self, pay_rate: u32) -> bool {
        matches!(
            (self, Self::for_rate(pay_rate)),
            (PayBand::Low, PayBand::Low)
                | (PayBand::Medium, PayBand::Medium)
                | (PayBand::High, PayBand::High)
        )
    }

    pub const fn label(self) -> &'static str {
        match self {
            PayBand::Low => "low",
            PayBand::Medium => "medium",
            PayBand::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(PayBand::Low),
            "medium" => Some(PayBand::Medium),
            "high" => Some(PayBand::High),
            _ => None,
        }
    }
}

/// Browsing criteria; every supplied field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFilter {
    #[serde(default)]
    pub text_query: Option<String>,
    #[serde(default)]
    pub location_query: Option<String>,
    #[serde(default)]
    pub pay_band: Option<PayBand>,
}

impl JobFilter {
    pub fn is_empty(&self) -> bool {
        blank(&self.text_query) && blank(&self.location_query) && self.pay_band.is_none()
    }

    pub fn matches(&self, job: &Job) -> bool {
        let text_matches = match non_blank(&self.text_query) {
            Some(query) => contains_ignore_case(&job.title, query)
                || contains_ignore_case(&job.description, query),
            None => true,
        };
        let location_matches = match non_blank(&self.location_query) {
            Some(query) => contains_ignore_case(&job.location, query),
            None => true,
        };
        let pay_matches = self
            .pay_band
            .map_or(true, |band| band.contains(job.pay_rate));

        text_matches && location_matches && pay_matches
    }
}

fn blank(value: &Option<String>) -> bool {
    non_blank(value).is_none()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|query| !query.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Application counts shown on the student dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StudentStats {
    pub total_applications: usize,
    pub pending_count: usize,
    pub accepted_count: usize,
    pub rejected_count: usize,
}

/// Posting counts shown on the company dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompanyStats {
    pub total_jobs: usize,
    /// Applicant slots across jobs; a student on two jobs counts twice.
    pub total_applicants: usize,
    pub active_jobs: usize,
}

use crate::infra::{parse_pay_band, InMemoryMarketplaceRepository};
use chrono::NaiveDate;
use clap::Args;
use count_connect::error::AppError;
use count_connect::marketplace::{
    Decision, JobDraft, JobFilter, JobId, MarketplaceRepository, MarketplaceService, PayBand,
    ProfileDraft, RegistrationRequest, ServiceError, UserId, VerificationStatus,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Free-text query matched against job titles and descriptions
    #[arg(long)]
    pub(crate) query: Option<String>,
    /// Substring matched against job locations
    #[arg(long)]
    pub(crate) location: Option<String>,
    /// Restrict listings to one pay band (low, medium, high)
    #[arg(long, value_parser = parse_pay_band)]
    pub(crate) pay_band: Option<PayBand>,
    /// Skip the apply/accept walkthrough after the listings
    #[arg(long)]
    pub(crate) skip_walkthrough: bool,
}

/// Accounts and postings created by [`seed_demo_board`].
#[derive(Debug, Clone)]
pub(crate) struct DemoBoard {
    pub(crate) techcorp: UserId,
    pub(crate) financeplus: UserId,
    pub(crate) anil: UserId,
    pub(crate) sneha: UserId,
    pub(crate) warehouse_job: JobId,
    pub(crate) retail_job: JobId,
}

/// Register two verified companies, two students, two postings, and one application.
pub(crate) fn seed_demo_board<R>(service: &MarketplaceService<R>) -> Result<DemoBoard, ServiceError>
where
    R: MarketplaceRepository + 'static,
{
    let techcorp = register_company(
        service,
        "hr@techcorp.com",
        "Raj Sharma",
        "TechCorp Industries",
        "Manufacturing",
        "Mumbai, Maharashtra",
    )?;
    let financeplus = register_company(
        service,
        "contact@financeplus.com",
        "Priya Patel",
        "FinancePlus Auditors",
        "Finance & Audit",
        "Delhi, NCR",
    )?;

    let anil = service
        .register_user(RegistrationRequest {
            email: "anil.kumar@student.com".to_string(),
            name: "Anil Kumar".to_string(),
            phone: Some("+91 76543 21098".to_string()),
            profile: ProfileDraft::Student {
                university: "Delhi University".to_string(),
                year: 3,
                skills: vec![
                    "Excel".to_string(),
                    "Data Entry".to_string(),
                    "Inventory Management".to_string(),
                ],
                experience: "Completed 2 stock counts last year".to_string(),
            },
        })?
        .id;
    let sneha = service
        .register_user(RegistrationRequest {
            email: "sneha.singh@student.com".to_string(),
            name: "Sneha Singh".to_string(),
            phone: Some("+91 65432 10987".to_string()),
            profile: ProfileDraft::Student {
                university: "Mumbai University".to_string(),
                year: 2,
                skills: vec!["MS Office".to_string(), "Accounting".to_string()],
                experience: "New to stock counting, eager to learn".to_string(),
            },
        })?
        .id;

    let warehouse_job = service
        .post_job(JobDraft {
            company_id: techcorp.clone(),
            title: "Warehouse Stock Count Assistant".to_string(),
            description: "Assist with our annual inventory count at our main warehouse. \
                          Training will be provided."
                .to_string(),
            location: "Gurgaon, Haryana".to_string(),
            start_date: demo_date(3, 15),
            end_date: demo_date(3, 20),
            duration: None,
            pay_rate: 1500,
            requirements: vec![
                "Basic Excel knowledge".to_string(),
                "Attention to detail".to_string(),
                "Available for full duration".to_string(),
            ],
        })?
        .id;
    let retail_job = service
        .post_job(JobDraft {
            company_id: financeplus.clone(),
            title: "Retail Store Inventory Count".to_string(),
            description: "Help us conduct stock counting for a retail chain across multiple \
                          locations."
                .to_string(),
            location: "South Delhi".to_string(),
            start_date: demo_date(3, 22),
            end_date: demo_date(3, 25),
            duration: None,
            pay_rate: 1200,
            requirements: vec![
                "Commerce background preferred".to_string(),
                "Team player".to_string(),
            ],
        })?
        .id;

    service.apply(
        &warehouse_job,
        &anil,
        Some("I have prior stock count experience and can commit to all six days.".to_string()),
    )?;

    Ok(DemoBoard {
        techcorp,
        financeplus,
        anil,
        sneha,
        warehouse_job,
        retail_job,
    })
}

fn register_company<R>(
    service: &MarketplaceService<R>,
    email: &str,
    contact: &str,
    company_name: &str,
    industry: &str,
    address: &str,
) -> Result<UserId, ServiceError>
where
    R: MarketplaceRepository + 'static,
{
    let account = service.register_user(RegistrationRequest {
        email: email.to_string(),
        name: contact.to_string(),
        phone: None,
        profile: ProfileDraft::Company {
            company_name: company_name.to_string(),
            industry: industry.to_string(),
            address: address.to_string(),
        },
    })?;
    service.record_company_verification(&account.id, VerificationStatus::Verified)?;
    Ok(account.id)
}

fn demo_date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap_or(NaiveDate::MIN)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        query,
        location,
        pay_band,
        skip_walkthrough,
    } = args;

    let service = MarketplaceService::new(Arc::new(InMemoryMarketplaceRepository::default()));
    let board = seed_demo_board(&service)?;

    println!("Count Connect demo");
    let filter = JobFilter {
        text_query: query,
        location_query: location,
        pay_band,
    };
    let listings = service.browse_jobs(&filter)?;
    if filter.is_empty() {
        println!("\nOpen listings ({})", listings.len());
    } else {
        println!("\nListings matching filter ({})", listings.len());
    }
    for listing in &listings {
        println!(
            "- {} | {}{} | {} | Rs {}/day ({}) | {} | {} applicant(s)",
            listing.job.title,
            listing.company_name,
            if listing.company_verified { " (verified)" } else { "" },
            listing.job.location,
            listing.job.pay_rate,
            listing.pay_band.label(),
            listing.job.duration,
            listing.job.applicants.len()
        );
    }

    for company_id in [&board.techcorp, &board.financeplus] {
        let company = service.user(company_id)?;
        let dashboard = service.company_dashboard(company_id)?;
        println!(
            "\nCompany dashboard: {} [{}{}]",
            company
                .as_company()
                .map(|profile| profile.company_name.as_str())
                .unwrap_or(company.name.as_str()),
            dashboard.verification_status.label(),
            dashboard
                .verification_id
                .as_deref()
                .map(|id| format!(" {id}"))
                .unwrap_or_default()
        );
        println!(
            "  {} job(s) | {} active | {} applicant slot(s)",
            dashboard.stats.total_jobs,
            dashboard.stats.active_jobs,
            dashboard.stats.total_applicants
        );
    }

    for student_id in [&board.anil, &board.sneha] {
        let student = service.user(student_id)?;
        let dashboard = service.student_dashboard(student_id)?;
        println!(
            "\nStudent dashboard: {} | {} application(s): {} pending, {} accepted, {} rejected",
            student.name,
            dashboard.stats.total_applications,
            dashboard.stats.pending_count,
            dashboard.stats.accepted_count,
            dashboard.stats.rejected_count
        );
        for summary in &dashboard.recent_applications {
            println!(
                "  - {} -> {}",
                summary.job_title.as_deref().unwrap_or("(job removed)"),
                summary.application.status
            );
        }
    }

    if skip_walkthrough {
        return Ok(());
    }

    println!("\nWalkthrough");
    let submitted = service.apply(&board.retail_job, &board.sneha, None)?;
    println!(
        "- Sneha applied to '{}' -> {} ({} applicant(s))",
        submitted.updated_job.title,
        submitted.application.status,
        submitted.updated_job.applicants.len()
    );
    match service.apply(&board.retail_job, &board.sneha, None) {
        Ok(_) => println!("- Second application unexpectedly accepted"),
        Err(err) => println!("- Second application refused: {err}"),
    }

    let decided = service.decide(&submitted.application.id, Decision::Accept)?;
    println!("- FinancePlus decision recorded -> {}", decided.status);
    let selected = service.select_student(&board.retail_job, &board.sneha)?;
    println!(
        "- Selected students on '{}': {}",
        selected.title,
        selected.selected_students.len()
    );

    let closed = service.close_job(&board.warehouse_job)?;
    println!("- '{}' is now {}", closed.title, closed.status);
    match service.apply(&board.warehouse_job, &board.sneha, None) {
        Ok(_) => println!("- Application to closed job unexpectedly accepted"),
        Err(err) => println!("- Application to closed job refused: {err}"),
    }

    let dashboard = service.student_dashboard(&board.sneha)?;
    match serde_json::to_string_pretty(&dashboard.stats) {
        Ok(json) => println!("  Sneha's stats payload:\n{json}"),
        Err(err) => println!("  Stats payload unavailable: {err}"),
    }

    Ok(())
}

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use super::domain::{ApplicationId, Decision, JobFilter, JobId, PayBand, UserId, VerificationStatus};
use super::repository::{MarketplaceRepository, RepositoryError};
use super::rules::MarketplaceError;
use super::service::{MarketplaceService, ServiceError};
use super::validation::{JobDraft, RegistrationRequest, ValidationError};

type SharedService<R> = Arc<MarketplaceService<R>>;

/// Router builder exposing the job board, application, and dashboard endpoints.
pub fn marketplace_router<R>(service: SharedService<R>) -> Router
where
    R: MarketplaceRepository + 'static,
{
    Router::new()
        .route(
            "/api/jobs",
            get(list_jobs_handler::<R>).post(create_job_handler::<R>),
        )
        .route(
            "/api/jobs/:job_id",
            get(job_handler::<R>).delete(delete_job_handler::<R>),
        )
        .route(
            "/api/jobs/:job_id/applications",
            post(apply_handler::<R>),
        )
        .route("/api/jobs/:job_id/close", post(close_job_handler::<R>))
        .route(
            "/api/jobs/:job_id/complete",
            post(complete_job_handler::<R>),
        )
        .route(
            "/api/jobs/:job_id/selections",
            post(select_student_handler::<R>),
        )
        .route(
            "/api/applications/:application_id/decision",
            post(decide_handler::<R>),
        )
        .route("/api/users", post(register_handler::<R>))
        .route("/api/users/:user_id", get(user_handler::<R>))
        .route(
            "/api/companies/:company_id/verification",
            post(verification_handler::<R>),
        )
        .route(
            "/api/companies/:company_id/dashboard",
            get(company_dashboard_handler::<R>),
        )
        .route(
            "/api/students/:student_id/dashboard",
            get(student_dashboard_handler::<R>),
        )
        .with_state(service)
}

/// Query string accepted by `GET /api/jobs`.
#[derive(Debug, Default, Deserialize)]
pub struct JobSearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub pay_band: Option<String>,
}

impl JobSearchParams {
    pub fn into_filter(self) -> Result<JobFilter, ValidationError> {
        let pay_band = match self.pay_band.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                Some(PayBand::parse(raw).ok_or_else(|| ValidationError::UnknownPayBand(raw.to_string()))?)
            }
        };
        Ok(JobFilter {
            text_query: self.q,
            location_query: self.location,
            pay_band,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub student_id: UserId,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub student_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
}

#[derive(Debug, Deserialize)]
pub struct VerificationRequest {
    pub status: VerificationStatus,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Rules(MarketplaceError::JobNotFound(_))
            | ServiceError::UserNotFound(_)
            | ServiceError::ApplicationNotFound(_)
            | ServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            ServiceError::Rules(MarketplaceError::DuplicateApplication { .. })
            | ServiceError::Rules(MarketplaceError::JobClosed { .. })
            | ServiceError::Rules(MarketplaceError::InvalidTransition { .. })
            | ServiceError::Repository(RepositoryError::Conflict)
            | ServiceError::Repository(RepositoryError::Stale) => StatusCode::CONFLICT,
            ServiceError::Rules(MarketplaceError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.to_string())
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, Json(payload)).into_response()
}

fn json_body<T: DeserializeOwned>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| error_response(rejection.status(), rejection.body_text()))
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn list_jobs_handler<R>(
    State(service): State<SharedService<R>>,
    Query(params): Query<JobSearchParams>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let filter = match params.into_filter() {
        Ok(filter) => filter,
        Err(error) => return ServiceError::from(MarketplaceError::from(error)).into_response(),
    };
    respond(StatusCode::OK, service.browse_jobs(&filter))
}

pub(crate) async fn create_job_handler<R>(
    State(service): State<SharedService<R>>,
    payload: Result<Json<JobDraft>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    match json_body(payload) {
        Ok(draft) => respond(StatusCode::CREATED, service.post_job(draft)),
        Err(response) => response,
    }
}

pub(crate) async fn job_handler<R>(
    State(service): State<SharedService<R>>,
    Path(job_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    respond(StatusCode::OK, service.job(&JobId(job_id)))
}

pub(crate) async fn delete_job_handler<R>(
    State(service): State<SharedService<R>>,
    Path(job_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    match service.delete_job(&JobId(job_id)) {
        Ok(job) => {
            let payload = json!({ "message": "Deleted successfully", "job": job });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn apply_handler<R>(
    State(service): State<SharedService<R>>,
    Path(job_id): Path<String>,
    payload: Result<Json<ApplyRequest>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    let request = match json_body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match service.apply(&JobId(job_id), &request.student_id, request.message) {
        Ok(submitted) => {
            let payload = json!({
                "application": submitted.application,
                "job": submitted.updated_job,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn close_job_handler<R>(
    State(service): State<SharedService<R>>,
    Path(job_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    respond(StatusCode::OK, service.close_job(&JobId(job_id)))
}

pub(crate) async fn complete_job_handler<R>(
    State(service): State<SharedService<R>>,
    Path(job_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    respond(StatusCode::OK, service.complete_job(&JobId(job_id)))
}

pub(crate) async fn select_student_handler<R>(
    State(service): State<SharedService<R>>,
    Path(job_id): Path<String>,
    payload: Result<Json<SelectionRequest>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    match json_body(payload) {
        Ok(request) => respond(
            StatusCode::OK,
            service.select_student(&JobId(job_id), &request.student_id),
        ),
        Err(response) => response,
    }
}

pub(crate) async fn decide_handler<R>(
    State(service): State<SharedService<R>>,
    Path(application_id): Path<String>,
    payload: Result<Json<DecisionRequest>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    match json_body(payload) {
        Ok(request) => respond(
            StatusCode::OK,
            service.decide(&ApplicationId(application_id), request.decision),
        ),
        Err(response) => response,
    }
}

pub(crate) async fn register_handler<R>(
    State(service): State<SharedService<R>>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    match json_body(payload) {
        Ok(request) => respond(StatusCode::CREATED, service.register_user(request)),
        Err(response) => response,
    }
}

pub(crate) async fn user_handler<R>(
    State(service): State<SharedService<R>>,
    Path(user_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    respond(StatusCode::OK, service.user(&UserId(user_id)))
}

pub(crate) async fn verification_handler<R>(
    State(service): State<SharedService<R>>,
    Path(company_id): Path<String>,
    payload: Result<Json<VerificationRequest>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    match json_body(payload) {
        Ok(request) => respond(
            StatusCode::OK,
            service.record_company_verification(&UserId(company_id), request.status),
        ),
        Err(response) => response,
    }
}

pub(crate) async fn company_dashboard_handler<R>(
    State(service): State<SharedService<R>>,
    Path(company_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    respond(StatusCode::OK, service.company_dashboard(&UserId(company_id)))
}

pub(crate) async fn student_dashboard_handler<R>(
    State(service): State<SharedService<R>>,
    Path(student_id): Path<String>,
) -> Response
where
    R: MarketplaceRepository + 'static,
{
    respond(StatusCode::OK, service.student_dashboard(&UserId(student_id)))
}

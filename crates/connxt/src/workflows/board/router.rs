use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::caller::CallerId;
use super::domain::{ApplicationDecision, ApplicationId, JobId, ModerationAction, NotificationId, User};
use super::forms::{
    ApplicationForm, JobPostingForm, StudentProfileForm, INVALID_FORM, UNANSWERED_ESSAY,
};
use super::repository::{BoardStore, RepositoryError};
use super::service::{BoardError, JobBoardService};
use super::views::{
    AdminPanelPage, ConfirmDeletePage, HomePage, InboxPage, JobFormPage, JobListPage, JobsPage,
    ProfilePage, StaticPage,
};

const PROFILE_UPDATED: &str = "Profile updated successfully!";
const JOB_POSTED: &str = "Job Posted Successfully";
const JOB_UPDATED: &str = "Job updated successfully.";
const JOB_UPDATE_FAILED: &str =
    "There was an error in updating the job. Please check the form for errors.";
const APPLIED: &str = "Application Successful.";

/// Router exposing the job board pages. Every page answers with its JSON payload.
pub fn board_router<S>(service: Arc<JobBoardService<S>>) -> Router
where
    S: BoardStore + 'static,
{
    Router::new()
        .route("/", get(home_handler::<S>))
        .route("/profile/", get(profile_handler::<S>).post(update_profile_handler::<S>))
        .route("/employer/", get(employer_handler::<S>).post(post_job_handler::<S>))
        .route("/jobs/", get(jobs_handler::<S>).post(apply_handler::<S>))
        .route("/jobedit/", get(job_list_handler::<S>))
        .route(
            "/edit_job/:id/",
            get(edit_job_page_handler::<S>).post(edit_job_handler::<S>),
        )
        .route(
            "/confirmdelete/:id/",
            get(confirm_delete_handler::<S>).post(delete_job_handler::<S>),
        )
        .route(
            "/manage_applications/",
            get(applications_handler::<S>).post(decide_application_handler::<S>),
        )
        .route(
            "/adminpanel/",
            get(admin_panel_handler::<S>).post(moderate_handler::<S>),
        )
        .route("/inbox/", get(inbox_handler::<S>).post(dismiss_handler::<S>))
        .with_state(service)
        .merge(static_routes())
}

fn static_routes() -> Router {
    const PAGES: [(&str, &str, &str); 7] = [
        ("/studentdash/", "studentdash", "Student Dashboard"),
        ("/aboutus/", "aboutus", "About Us"),
        ("/studenterror/", "studenterror", "Student Error"),
        ("/employererror/", "employererror", "Employer Error"),
        ("/studentinstructions/", "studentinstructions", "Student Instructions"),
        ("/employerinstructions/", "employerinstructions", "Employer Instructions"),
        ("/licensing/", "licensing", "Licensing"),
    ];

    PAGES
        .into_iter()
        .fold(Router::new(), |router, (path, page, title)| {
            router.route(
                path,
                get(move || async move { Json(StaticPage { page, title }) }),
            )
        })
}

/// Error wrapper that renders a [`BoardError`] with its HTTP status.
#[derive(Debug)]
pub struct BoardFailure(pub BoardError);

impl From<BoardError> for BoardFailure {
    fn from(err: BoardError) -> Self {
        Self(err)
    }
}

impl From<RepositoryError> for BoardFailure {
    fn from(err: RepositoryError) -> Self {
        Self(BoardError::Repository(err))
    }
}

impl IntoResponse for BoardFailure {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let payload = match &self.0 {
            BoardError::Invalid(errors) => json!({
                "error": INVALID_FORM,
                "field_errors": errors.errors,
            }),
            BoardError::Repository(RepositoryError::Unavailable(detail)) => {
                error!(%detail, "job board storage failure");
                json!({ "error": "storage unavailable" })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(payload)).into_response()
    }
}

pub(crate) fn status_for(err: &BoardError) -> StatusCode {
    match err {
        BoardError::Invalid(_) | BoardError::InvalidUsername => StatusCode::UNPROCESSABLE_ENTITY,
        BoardError::Refused(_)
        | BoardError::AlreadyResolved(_)
        | BoardError::AlreadyApproved(_)
        | BoardError::Repository(RepositoryError::Conflict)
        | BoardError::Repository(RepositoryError::CapacityReached) => StatusCode::CONFLICT,
        BoardError::Forbidden { .. } => StatusCode::FORBIDDEN,
        BoardError::NotFound { .. } | BoardError::Repository(RepositoryError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        BoardError::UnknownUser(_) => StatusCode::UNAUTHORIZED,
        BoardError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

type Handled = Result<Response, BoardFailure>;

fn authenticate<S>(service: &JobBoardService<S>, caller: CallerId) -> Result<User, BoardFailure>
where
    S: BoardStore + 'static,
{
    Ok(service.caller(caller.0)?)
}

/// Form ids arrive as strings; anything that is not a number cannot name a record.
fn parse_id(entity: &'static str, raw: Option<&str>) -> Result<i64, BoardFailure> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or(BoardFailure(BoardError::NotFound { entity, id: 0 }))
}

fn bad_action(action: Option<&str>) -> Response {
    let payload = json!({
        "error": format!("unsupported action: {}", action.unwrap_or_default()),
    });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

pub(crate) async fn home_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: Option<CallerId>,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = caller
        .map(|caller| authenticate(&service, caller))
        .transpose()?;
    let page = HomePage {
        unread_notifications_count: service.unread_count(user.as_ref())?,
    };
    Ok(Json(page).into_response())
}

pub(crate) async fn profile_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    let profile = service.profile(&user)?;
    let page = ProfilePage {
        form: StudentProfileForm::from(&profile),
        profile,
        success_msg: None,
        error_msg: None,
        field_errors: Vec::new(),
    };
    Ok(Json(page).into_response())
}

pub(crate) async fn update_profile_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
    Form(form): Form<StudentProfileForm>,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    match service.update_profile(&user, &form) {
        Ok(profile) => {
            let page = ProfilePage {
                form: StudentProfileForm::from(&profile),
                profile,
                success_msg: Some(PROFILE_UPDATED.to_string()),
                error_msg: None,
                field_errors: Vec::new(),
            };
            Ok(Json(page).into_response())
        }
        Err(BoardError::Invalid(errors)) => {
            let page = ProfilePage {
                profile: service.profile(&user)?,
                form,
                success_msg: None,
                error_msg: Some(INVALID_FORM.to_string()),
                field_errors: errors.errors,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(page)).into_response())
        }
        Err(other) => Err(other.into()),
    }
}

pub(crate) async fn employer_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
) -> Handled
where
    S: BoardStore + 'static,
{
    authenticate(&service, caller)?;
    let page = JobFormPage {
        job: None,
        form: JobPostingForm::default(),
        success_msg: None,
        error_msg: None,
        field_errors: Vec::new(),
    };
    Ok(Json(page).into_response())
}

pub(crate) async fn post_job_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
    Form(form): Form<JobPostingForm>,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    match service.post_job(&user, &form) {
        Ok(job) => {
            let page = JobFormPage {
                job: Some(job),
                form: JobPostingForm::default(),
                success_msg: Some(JOB_POSTED.to_string()),
                error_msg: None,
                field_errors: Vec::new(),
            };
            Ok((StatusCode::CREATED, Json(page)).into_response())
        }
        Err(BoardError::Invalid(errors)) => {
            let page = JobFormPage {
                job: None,
                form,
                success_msg: None,
                error_msg: Some(INVALID_FORM.to_string()),
                field_errors: errors.errors,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(page)).into_response())
        }
        Err(other) => Err(other.into()),
    }
}

pub(crate) async fn jobs_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    let page = JobsPage {
        board: service.job_board(&user)?,
        message: None,
    };
    Ok(Json(page).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApplyJobForm {
    pub apply_job_id: Option<String>,
    pub essay_answer: String,
}

pub(crate) async fn apply_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
    Form(form): Form<ApplyJobForm>,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    if form.apply_job_id.is_none() {
        return jobs_handler(State(service), caller).await;
    }
    let job_id = JobId(parse_id("job", form.apply_job_id.as_deref())?);
    let essay = ApplicationForm {
        essay_answer: form.essay_answer,
    };

    let (status, message) = match service.apply(&user, job_id, &essay) {
        Ok(_) => (StatusCode::CREATED, APPLIED.to_string()),
        Err(BoardError::Invalid(_)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, UNANSWERED_ESSAY.to_string())
        }
        Err(BoardError::Refused(refusal)) => (StatusCode::CONFLICT, refusal.to_string()),
        Err(other) => return Err(other.into()),
    };

    let page = JobsPage {
        board: service.job_board(&user)?,
        message: Some(message),
    };
    Ok((status, Json(page)).into_response())
}

pub(crate) async fn job_list_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    let page = JobListPage {
        jobs: service.jobs_posted_by(&user)?,
    };
    Ok(Json(page).into_response())
}

pub(crate) async fn edit_job_page_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
    Path(raw_id): Path<String>,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    let id = JobId(parse_id("job", Some(raw_id.as_str()))?);
    let job = service.job_for_owner(&user, id, super::service::EDIT_JOB)?;
    let page = JobFormPage {
        form: JobPostingForm::from(&job),
        job: Some(job),
        success_msg: None,
        error_msg: None,
        field_errors: Vec::new(),
    };
    Ok(Json(page).into_response())
}

pub(crate) async fn edit_job_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
    Path(raw_id): Path<String>,
    Form(form): Form<JobPostingForm>,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    let id = JobId(parse_id("job", Some(raw_id.as_str()))?);
    match service.edit_job(&user, id, &form) {
        Ok(job) => {
            let page = JobFormPage {
                form: JobPostingForm::from(&job),
                job: Some(job),
                success_msg: Some(JOB_UPDATED.to_string()),
                error_msg: None,
                field_errors: Vec::new(),
            };
            Ok(Json(page).into_response())
        }
        Err(BoardError::Invalid(errors)) => {
            let page = JobFormPage {
                job: Some(service.job_for_owner(&user, id, super::service::EDIT_JOB)?),
                form,
                success_msg: None,
                error_msg: Some(JOB_UPDATE_FAILED.to_string()),
                field_errors: errors.errors,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(page)).into_response())
        }
        Err(other) => Err(other.into()),
    }
}

pub(crate) async fn confirm_delete_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
    Path(raw_id): Path<String>,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    let id = JobId(parse_id("job", Some(raw_id.as_str()))?);
    let page = ConfirmDeletePage {
        job: service.job_for_owner(&user, id, super::service::DELETE_JOB)?,
    };
    Ok(Json(page).into_response())
}

pub(crate) async fn delete_job_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
    Path(raw_id): Path<String>,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    let id = JobId(parse_id("job", Some(raw_id.as_str()))?);
    service.delete_job(&user, id)?;
    Ok(Redirect::to("/jobedit/").into_response())
}

pub(crate) async fn applications_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    Ok(Json(service.applications_overview(&user)?).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApplicationActionForm {
    pub application_id: Option<String>,
    pub action: Option<String>,
}

pub(crate) async fn decide_application_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
    Form(form): Form<ApplicationActionForm>,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    if form.application_id.is_some() {
        let id = ApplicationId(parse_id("application", form.application_id.as_deref())?);
        let Some(decision) = form.action.as_deref().and_then(ApplicationDecision::parse) else {
            return Ok(bad_action(form.action.as_deref()));
        };
        service.decide_application(&user, id, decision)?;
    }
    Ok(Redirect::to("/manage_applications/").into_response())
}

pub(crate) async fn admin_panel_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    let page = AdminPanelPage {
        unapproved_jobs: service.moderation_queue(&user)?,
    };
    Ok(Json(page).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ModerationForm {
    pub job_id: Option<String>,
    pub action: Option<String>,
}

pub(crate) async fn moderate_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
    Form(form): Form<ModerationForm>,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    let id = JobId(parse_id("job", form.job_id.as_deref())?);
    let Some(action) = form.action.as_deref().and_then(ModerationAction::parse) else {
        return Ok(bad_action(form.action.as_deref()));
    };
    service.moderate_job(&user, id, action)?;
    Ok(Redirect::to("/adminpanel/").into_response())
}

pub(crate) async fn inbox_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    let page = InboxPage {
        notifications: service.inbox(&user)?,
    };
    Ok(Json(page).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DismissForm {
    pub notification_id: Option<String>,
}

pub(crate) async fn dismiss_handler<S>(
    State(service): State<Arc<JobBoardService<S>>>,
    caller: CallerId,
    Form(form): Form<DismissForm>,
) -> Handled
where
    S: BoardStore + 'static,
{
    let user = authenticate(&service, caller)?;
    let id = form
        .notification_id
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i64>().ok());
    if let Some(id) = id {
        service.dismiss_notification(&user, NotificationId(id))?;
    }
    Ok(Redirect::to("/inbox/").into_response())
}

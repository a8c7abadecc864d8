use std::sync::Arc;

use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::store::InMemoryStore;
use crate::workflows::board::caller::CALLER_HEADER;
use crate::workflows::board::domain::{
    ApplicationDecision, ApplicationId, JobApplication, JobId, JobPosting, ModerationAction,
    NewApplication, NewJobPosting, NewNotification, Notification, NotificationId, StudentId,
    StudentInfo, User, UserId,
};
use crate::workflows::board::forms::{ApplicationForm, JobPostingForm, StudentProfileForm};
use crate::workflows::board::repository::{
    ApplicationRepository, CapacityLimit, JobRepository, NotificationRepository, RepositoryError,
    StudentRepository, UserRepository,
};
use crate::workflows::board::{board_router, BoardPolicy, JobBoardService};

pub(super) type MemoryService = JobBoardService<InMemoryStore>;

/// Accounts every scenario starts from.
pub(super) struct Cast {
    pub(super) admin: User,
    pub(super) employer: User,
    pub(super) student: User,
}

pub(super) fn build_service() -> (MemoryService, Arc<InMemoryStore>, Cast) {
    build_service_with(BoardPolicy::default())
}

pub(super) fn build_service_with(policy: BoardPolicy) -> (MemoryService, Arc<InMemoryStore>, Cast) {
    let store = Arc::new(InMemoryStore::new());
    let service = JobBoardService::new(store.clone(), policy);
    let cast = Cast {
        admin: service.register_user("admin", true).expect("admin"),
        employer: service.register_user("acme", false).expect("employer"),
        student: service.register_user("ada", false).expect("student"),
    };
    (service, store, cast)
}

pub(super) fn complete_profile_form(name: &str) -> StudentProfileForm {
    StudentProfileForm {
        student_name: name.to_string(),
        student_grade: "11".to_string(),
        student_email: format!("{}@example.edu", name.to_lowercase().replace(' ', ".")),
        student_skills: "Rust, SQL".to_string(),
        student_experience: "Robotics club".to_string(),
        student_info: String::new(),
        student_resume: "https://example.edu/resume.pdf".to_string(),
    }
}

pub(super) fn job_form(title: &str, capacity: i32) -> JobPostingForm {
    JobPostingForm {
        job_title: title.to_string(),
        job_hours: "10".to_string(),
        job_skills: "Pipetting".to_string(),
        job_description: "Help run the biology lab.".to_string(),
        company: "Acme Labs".to_string(),
        job_questions: "Why biology?".to_string(),
        job_capacity: capacity.to_string(),
    }
}

pub(super) fn essay(answer: &str) -> ApplicationForm {
    ApplicationForm {
        essay_answer: answer.to_string(),
    }
}

/// Posts a job as `cast.employer` and approves it as `cast.admin`.
pub(super) fn approved_job(service: &MemoryService, cast: &Cast, capacity: i32) -> JobPosting {
    let job = service
        .post_job(&cast.employer, &job_form("Lab Assistant", capacity))
        .expect("job posts");
    service
        .moderate_job(&cast.admin, job.id, ModerationAction::Approve)
        .expect("job approves");
    service
        .store()
        .job(job.id)
        .expect("lookup")
        .expect("job present")
}

/// Registers a student with a complete profile.
pub(super) fn ready_student(service: &MemoryService, username: &str) -> User {
    let user = service.register_user(username, false).expect("student");
    service
        .update_profile(&user, &complete_profile_form(username))
        .expect("profile saves");
    user
}

pub(super) fn messages_for(service: &MemoryService, user: &User) -> Vec<String> {
    service
        .inbox(user)
        .expect("inbox")
        .into_iter()
        .map(|notification| notification.message)
        .collect()
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    board_router(Arc::new(service))
}

pub(super) fn get_as(user: &User, uri: &str) -> Request<axum::body::Body> {
    Request::get(uri)
        .header(CALLER_HEADER, user.id.to_string())
        .body(axum::body::Body::empty())
        .expect("request builds")
}

pub(super) fn post_form_as(user: &User, uri: &str, body: &str) -> Request<axum::body::Body> {
    Request::post(uri)
        .header(CALLER_HEADER, user.id.to_string())
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(axum::body::Body::from(body.to_string()))
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Store whose backend is down for every call.
pub(super) struct OfflineStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl UserRepository for OfflineStore {
    fn create_user(&self, _username: &str, _is_superuser: bool) -> Result<User, RepositoryError> {
        offline()
    }

    fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        // Identity resolution still works so that handlers reach the failing workflow.
        Ok(Some(User {
            id,
            username: "offline".to_string(),
            is_superuser: false,
        }))
    }

    fn user_by_username(&self, _username: &str) -> Result<Option<User>, RepositoryError> {
        offline()
    }

    fn users(&self) -> Result<Vec<User>, RepositoryError> {
        offline()
    }

    fn superusers(&self) -> Result<Vec<User>, RepositoryError> {
        offline()
    }

    fn promote_superuser(&self, _id: UserId) -> Result<User, RepositoryError> {
        offline()
    }
}

impl StudentRepository for OfflineStore {
    fn student(&self, _id: StudentId) -> Result<Option<StudentInfo>, RepositoryError> {
        offline()
    }

    fn student_for_user(&self, _user: UserId) -> Result<Option<StudentInfo>, RepositoryError> {
        offline()
    }

    fn get_or_create_student(&self, _user: UserId) -> Result<StudentInfo, RepositoryError> {
        offline()
    }

    fn save_student(&self, _info: &StudentInfo) -> Result<(), RepositoryError> {
        offline()
    }
}

impl JobRepository for OfflineStore {
    fn insert_job(
        &self,
        _job: NewJobPosting,
        _notices: &[NewNotification],
    ) -> Result<JobPosting, RepositoryError> {
        offline()
    }

    fn job(&self, _id: JobId) -> Result<Option<JobPosting>, RepositoryError> {
        offline()
    }

    fn save_job(&self, _job: &JobPosting) -> Result<(), RepositoryError> {
        offline()
    }

    fn delete_job(&self, _id: JobId) -> Result<Option<JobPosting>, RepositoryError> {
        offline()
    }

    fn jobs_by_owner(&self, _owner: UserId) -> Result<Vec<JobPosting>, RepositoryError> {
        offline()
    }

    fn jobs_by_approval(&self, _approved: bool) -> Result<Vec<JobPosting>, RepositoryError> {
        offline()
    }

    fn approve_job(
        &self,
        _id: JobId,
        _notice: &NewNotification,
    ) -> Result<Option<Notification>, RepositoryError> {
        offline()
    }

    fn reject_job(
        &self,
        _id: JobId,
        _notice: &NewNotification,
    ) -> Result<Option<Notification>, RepositoryError> {
        offline()
    }
}

impl ApplicationRepository for OfflineStore {
    fn insert_application(
        &self,
        _application: NewApplication,
        _limit: CapacityLimit,
        _notice: &NewNotification,
    ) -> Result<JobApplication, RepositoryError> {
        offline()
    }

    fn application(&self, _id: ApplicationId) -> Result<Option<JobApplication>, RepositoryError> {
        offline()
    }

    fn application_for(
        &self,
        _job: JobId,
        _student: StudentId,
    ) -> Result<Option<JobApplication>, RepositoryError> {
        offline()
    }

    fn applications_for_job(&self, _job: JobId) -> Result<Vec<JobApplication>, RepositoryError> {
        offline()
    }

    fn applications(&self) -> Result<Vec<JobApplication>, RepositoryError> {
        offline()
    }

    fn resolve_application(
        &self,
        _id: ApplicationId,
        _decision: ApplicationDecision,
        _notice: &NewNotification,
    ) -> Result<JobApplication, RepositoryError> {
        offline()
    }
}

impl NotificationRepository for OfflineStore {
    fn notifications_for(&self, _recipient: UserId) -> Result<Vec<Notification>, RepositoryError> {
        offline()
    }

    fn unread_count(&self, _recipient: UserId) -> Result<usize, RepositoryError> {
        offline()
    }

    fn delete_notification(
        &self,
        _recipient: UserId,
        _id: NotificationId,
    ) -> Result<bool, RepositoryError> {
        offline()
    }
}

use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationDecision, ApplicationId, JobApplication, JobId, JobPosting, NewApplication,
    NewJobPosting, NewNotification, Notification, NotificationId, StudentId, StudentInfo, User,
    UserId,
};

/// Which applications count against a posting's capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityBasis {
    #[default]
    AllApplications,
    AcceptedOnly,
}

impl CapacityBasis {
    pub fn counts(self, application: &JobApplication) -> bool {
        match self {
            CapacityBasis::AllApplications => true,
            CapacityBasis::AcceptedOnly => application.accepted(),
        }
    }
}

/// Capacity check the store re-applies inside the same critical section as the insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityLimit {
    pub capacity: i32,
    pub basis: CapacityBasis,
}

impl CapacityLimit {
    pub fn is_reached(&self, counted: usize) -> bool {
        i64::try_from(counted).unwrap_or(i64::MAX) >= i64::from(self.capacity)
    }
}

pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    fn create_user(&self, username: &str, is_superuser: bool) -> Result<User, RepositoryError>;
    fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    fn user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
    fn users(&self) -> Result<Vec<User>, RepositoryError>;
    fn superusers(&self) -> Result<Vec<User>, RepositoryError>;
    /// Grants superuser rights to an existing account and returns it.
    fn promote_superuser(&self, id: UserId) -> Result<User, RepositoryError>;
}

pub trait StudentRepository: Send + Sync {
    fn student(&self, id: StudentId) -> Result<Option<StudentInfo>, RepositoryError>;
    fn student_for_user(&self, user: UserId) -> Result<Option<StudentInfo>, RepositoryError>;
    /// Returns the existing profile or atomically inserts a blank one.
    fn get_or_create_student(&self, user: UserId) -> Result<StudentInfo, RepositoryError>;
    fn save_student(&self, info: &StudentInfo) -> Result<(), RepositoryError>;
}

/// Methods that take notices write them in the same atomic step as the change they report,
/// linked to the posting involved.
pub trait JobRepository: Send + Sync {
    fn insert_job(
        &self,
        job: NewJobPosting,
        notices: &[NewNotification],
    ) -> Result<JobPosting, RepositoryError>;
    fn job(&self, id: JobId) -> Result<Option<JobPosting>, RepositoryError>;
    fn save_job(&self, job: &JobPosting) -> Result<(), RepositoryError>;
    /// Removes the posting together with its applications.
    fn delete_job(&self, id: JobId) -> Result<Option<JobPosting>, RepositoryError>;
    fn jobs_by_owner(&self, owner: UserId) -> Result<Vec<JobPosting>, RepositoryError>;
    fn jobs_by_approval(&self, approved: bool) -> Result<Vec<JobPosting>, RepositoryError>;
    /// Marks the posting approved. The notice is skipped when its recipient already holds the
    /// same message for this posting, in which case `None` is returned.
    fn approve_job(
        &self,
        id: JobId,
        notice: &NewNotification,
    ) -> Result<Option<Notification>, RepositoryError>;
    /// Deletes an unapproved posting with its applications; `Conflict` once it is approved.
    /// The notice is deduplicated like in `approve_job`.
    fn reject_job(
        &self,
        id: JobId,
        notice: &NewNotification,
    ) -> Result<Option<Notification>, RepositoryError>;
}

pub trait ApplicationRepository: Send + Sync {
    /// Fails with `Conflict` when the student already applied and with `CapacityReached`
    /// when the limit is met; both checks happen atomically with the insert and the notice.
    fn insert_application(
        &self,
        application: NewApplication,
        limit: CapacityLimit,
        notice: &NewNotification,
    ) -> Result<JobApplication, RepositoryError>;
    fn application(&self, id: ApplicationId) -> Result<Option<JobApplication>, RepositoryError>;
    fn application_for(
        &self,
        job: JobId,
        student: StudentId,
    ) -> Result<Option<JobApplication>, RepositoryError>;
    fn applications_for_job(&self, job: JobId) -> Result<Vec<JobApplication>, RepositoryError>;
    fn applications(&self) -> Result<Vec<JobApplication>, RepositoryError>;
    /// Moves a pending application to its terminal state and records the notice;
    /// `Conflict` if it was already resolved.
    fn resolve_application(
        &self,
        id: ApplicationId,
        decision: ApplicationDecision,
        notice: &NewNotification,
    ) -> Result<JobApplication, RepositoryError>;
}

pub trait NotificationRepository: Send + Sync {
    /// Newest first.
    fn notifications_for(&self, recipient: UserId) -> Result<Vec<Notification>, RepositoryError>;
    fn unread_count(&self, recipient: UserId) -> Result<usize, RepositoryError>;
    /// Deletes only when the notification belongs to `recipient`.
    fn delete_notification(
        &self,
        recipient: UserId,
        id: NotificationId,
    ) -> Result<bool, RepositoryError>;
}

/// Everything the job board service needs from persistence.
pub trait BoardStore:
    UserRepository + StudentRepository + JobRepository + ApplicationRepository + NotificationRepository
{
}

impl<T> BoardStore for T where
    T: UserRepository
        + StudentRepository
        + JobRepository
        + ApplicationRepository
        + NotificationRepository
{
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("capacity reached")]
    CapacityReached,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

//! Student job board: profiles, employer postings, admin moderation, applications with essay
//! answers and the per-user notification inbox.

pub mod caller;
pub mod domain;
pub mod forms;
pub mod notices;
pub mod repository;
pub mod router;
pub mod service;
pub mod views;

#[cfg(test)]
mod tests;

pub use caller::{CallerId, CALLER_HEADER};
pub use domain::{
    ApplicationDecision, ApplicationId, ApplicationStatus, JobApplication, JobId, JobPosting,
    ModerationAction, Notification, NotificationId, StudentId, StudentInfo, User, UserId,
};
pub use forms::{
    ApplicationForm, FieldError, JobPostingForm, StudentProfileForm, ValidationErrors,
};
pub use repository::{BoardStore, CapacityBasis, CapacityLimit, RepositoryError};
pub use router::board_router;
pub use service::{ApplyRefusal, BoardError, BoardPolicy, JobBoardService};

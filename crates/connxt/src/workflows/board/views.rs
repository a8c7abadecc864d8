//! Serializable payloads returned by the service and rendered by the HTTP pages.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    ApplicationId, ApplicationStatus, JobApplication, JobId, JobPosting, Notification, StudentId,
    StudentInfo,
};
use super::forms::{FieldError, JobPostingForm, StudentProfileForm};

#[derive(Debug, Clone, Serialize)]
pub struct JobListing {
    pub job: JobPosting,
    pub has_applied: bool,
    pub can_apply_flag: bool,
}

/// Approved postings as one student sees them.
#[derive(Debug, Clone, Serialize)]
pub struct JobBoard {
    pub job_data: Vec<JobListing>,
    pub profile_exists: bool,
}

impl JobBoard {
    pub fn listing(&self, job: JobId) -> Option<&JobListing> {
        self.job_data.iter().find(|listing| listing.job.id == job)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub job_title: String,
    pub student_id: StudentId,
    pub student_name: String,
    pub essay_answer: String,
    pub status: ApplicationStatus,
    pub accepted: bool,
    pub rejected: bool,
    pub applied_at: DateTime<Utc>,
}

impl ApplicationView {
    pub fn new(application: &JobApplication, job: &JobPosting, student: &StudentInfo) -> Self {
        Self {
            id: application.id,
            job_id: job.id,
            job_title: job.job_title.clone(),
            student_id: student.id,
            student_name: student.student_name.clone(),
            essay_answer: application.essay_answer.clone(),
            status: application.status,
            accepted: application.accepted(),
            rejected: application.rejected(),
            applied_at: application.applied_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplicationsOverview {
    pub pending_applications: Vec<ApplicationView>,
    pub accepted_applications: Vec<ApplicationView>,
    pub rejected_applications: Vec<ApplicationView>,
}

impl ApplicationsOverview {
    pub fn push(&mut self, view: ApplicationView) {
        match view.status {
            ApplicationStatus::Pending => self.pending_applications.push(view),
            ApplicationStatus::Accepted => self.accepted_applications.push(view),
            ApplicationStatus::Rejected => self.rejected_applications.push(view),
        }
    }

    pub fn total(&self) -> usize {
        self.pending_applications.len()
            + self.accepted_applications.len()
            + self.rejected_applications.len()
    }
}

/// Result of an accept/reject action, carrying the employer-facing confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutcome {
    pub application: JobApplication,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ModerationOutcome {
    Approved { job: JobPosting, notified: bool },
    Rejected { job: JobPosting, notified: bool },
}

#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    pub unread_notifications_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaticPage {
    pub page: &'static str,
    pub title: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfilePage {
    pub profile: StudentInfo,
    pub form: StudentProfileForm,
    pub success_msg: Option<String>,
    pub error_msg: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobFormPage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobPosting>,
    pub form: JobPostingForm,
    pub success_msg: Option<String>,
    pub error_msg: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobsPage {
    #[serde(flatten)]
    pub board: JobBoard,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobListPage {
    pub jobs: Vec<JobPosting>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmDeletePage {
    pub job: JobPosting,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminPanelPage {
    pub unapproved_jobs: Vec<JobPosting>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InboxPage {
    pub notifications: Vec<Notification>,
}

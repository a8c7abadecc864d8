use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identity of an account; every other record hangs off one.
    UserId
);
record_id!(StudentId);
record_id!(JobId);
record_id!(ApplicationId);
record_id!(NotificationId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub is_superuser: bool,
}

/// Student profile, created lazily the first time its owner opens the profile page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentInfo {
    pub id: StudentId,
    pub user_id: UserId,
    pub student_name: String,
    pub student_grade: i32,
    pub student_email: String,
    pub student_skills: String,
    pub student_experience: String,
    pub student_info: String,
    pub student_resume: String,
    pub profile_complete: bool,
}

impl StudentInfo {
    pub fn blank(id: StudentId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            student_name: String::new(),
            student_grade: 0,
            student_email: String::new(),
            student_skills: String::new(),
            student_experience: String::new(),
            student_info: String::new(),
            student_resume: String::new(),
            profile_complete: false,
        }
    }

    /// Name, grade, email, skills, experience and resume must all be filled in.
    /// A grade of zero counts as missing. The free-text `student_info` is optional.
    pub fn is_complete(&self) -> bool {
        let filled = |value: &str| !value.trim().is_empty();

        filled(&self.student_name)
            && self.student_grade != 0
            && filled(&self.student_email)
            && filled(&self.student_skills)
            && filled(&self.student_experience)
            && filled(&self.student_resume)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,
    pub owner: UserId,
    pub job_title: String,
    pub job_hours: i32,
    pub job_skills: String,
    pub job_description: String,
    pub company: String,
    pub job_questions: String,
    pub job_capacity: i32,
    pub is_approved: bool,
}

impl JobPosting {
    pub fn is_owned_by(&self, user: &User) -> bool {
        self.owner == user.id
    }
}

/// Posting fields before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJobPosting {
    pub owner: UserId,
    pub job_title: String,
    pub job_hours: i32,
    pub job_skills: String,
    pub job_description: String,
    pub company: String,
    pub job_questions: String,
    pub job_capacity: i32,
}

/// Lifecycle of a single application. Only `Pending` may transition.
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
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn resolve(self, decision: ApplicationDecision) -> Option<Self> {
        match (self, decision) {
            (Self::Pending, ApplicationDecision::Accept) => Some(Self::Accepted),
            (Self::Pending, ApplicationDecision::Reject) => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Employer verdict on a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationDecision {
    Accept,
    Reject,
}

impl ApplicationDecision {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "accept" => Some(Self::Accept),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub student_id: StudentId,
    pub essay_answer: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

impl JobApplication {
    pub fn accepted(&self) -> bool {
        self.status == ApplicationStatus::Accepted
    }

    pub fn rejected(&self) -> bool {
        self.status == ApplicationStatus::Rejected
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub job_id: JobId,
    pub student_id: StudentId,
    pub essay_answer: String,
}

/// Admin verdict on a posting awaiting approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Approve,
    Reject,
}

impl ModerationAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Inbox entry. Every notice is raised by a workflow step on one posting, recorded in `job_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub job_id: JobId,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notice handed to the store together with the transition that raises it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient: UserId,
    pub message: String,
}

impl NewNotification {
    pub fn new(recipient: UserId, message: impl Into<String>) -> Self {
        Self {
            recipient,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_profile() -> StudentInfo {
        StudentInfo {
            student_name: "Ada Lovelace".to_string(),
            student_grade: 11,
            student_email: "ada@example.edu".to_string(),
            student_skills: "Rust, SQL".to_string(),
            student_experience: "Robotics club".to_string(),
            student_info: String::new(),
            student_resume: "https://example.edu/ada.pdf".to_string(),
            ..StudentInfo::blank(StudentId(1), UserId(1))
        }
    }

    #[test]
    fn profile_is_complete_without_optional_info() {
        assert!(complete_profile().is_complete());
    }

    #[test]
    fn each_required_field_gates_completeness() {
        let clearers: [fn(&mut StudentInfo); 6] = [
            |p| p.student_name.clear(),
            |p| p.student_grade = 0,
            |p| p.student_email.clear(),
            |p| p.student_skills = "   ".to_string(),
            |p| p.student_experience.clear(),
            |p| p.student_resume.clear(),
        ];

        for clear in clearers {
            let mut profile = complete_profile();
            clear(&mut profile);
            assert!(!profile.is_complete(), "{profile:?} should be incomplete");
        }
    }

    #[test]
    fn only_pending_applications_transition() {
        assert_eq!(
            ApplicationStatus::Pending.resolve(ApplicationDecision::Accept),
            Some(ApplicationStatus::Accepted)
        );
        assert_eq!(
            ApplicationStatus::Pending.resolve(ApplicationDecision::Reject),
            Some(ApplicationStatus::Rejected)
        );
        for terminal in [ApplicationStatus::Accepted, ApplicationStatus::Rejected] {
            assert!(terminal.is_terminal());
            assert_eq!(terminal.resolve(ApplicationDecision::Accept), None);
            assert_eq!(terminal.resolve(ApplicationDecision::Reject), None);
        }
    }

    #[test]
    fn actions_parse_case_insensitively() {
        assert_eq!(ModerationAction::parse(" Approve "), Some(ModerationAction::Approve));
        assert_eq!(ApplicationDecision::parse("REJECT"), Some(ApplicationDecision::Reject));
        assert_eq!(ApplicationDecision::parse("maybe"), None);
    }
}

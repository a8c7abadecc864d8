use std::fmt;

use super::domain::{NewNotification, UserId};

/// Inbox messages emitted by workflow transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice<'a> {
    JobSubmittedForReview { job_title: &'a str, employer: &'a str },
    JobAwaitingApproval { job_title: &'a str },
    JobApproved { job_title: &'a str },
    JobRejected { job_title: &'a str },
    ApplicationReceived { student_name: &'a str, job_title: &'a str },
    ApplicationAccepted { job_title: &'a str, employer: &'a str },
    ApplicationRejected { job_title: &'a str, employer: &'a str },
}

impl fmt::Display for Notice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::JobSubmittedForReview {
                job_title,
                employer,
            } => write!(
                f,
                "A new job '{job_title}' has been posted by {employer} and awaits approval."
            ),
            Notice::JobAwaitingApproval { job_title } => write!(
                f,
                "Your job '{job_title}' has been posted and is awaiting admin approval."
            ),
            Notice::JobApproved { job_title } => {
                write!(f, "Your job '{job_title}' has been approved and is now live.")
            }
            Notice::JobRejected { job_title } => {
                write!(f, "Your job '{job_title}' has been rejected by the admin.")
            }
            Notice::ApplicationReceived {
                student_name,
                job_title,
            } => write!(
                f,
                "A new application with an essay answer has been submitted by {student_name} for your job '{job_title}'."
            ),
            Notice::ApplicationAccepted {
                job_title,
                employer,
            } => write!(
                f,
                "Congratulations! You have been accepted for the job '{job_title}' by {employer}."
            ),
            Notice::ApplicationRejected {
                job_title,
                employer,
            } => write!(
                f,
                "Unfortunately, your application for the job '{job_title}' has been rejected by {employer}."
            ),
        }
    }
}

impl Notice<'_> {
    /// Address the rendered message to `recipient`.
    pub fn to(&self, recipient: UserId) -> NewNotification {
        NewNotification::new(recipient, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_notices_name_the_job() {
        assert_eq!(
            Notice::JobApproved {
                job_title: "Lab Assistant"
            }
            .to_string(),
            "Your job 'Lab Assistant' has been approved and is now live."
        );
        assert_eq!(
            Notice::JobRejected {
                job_title: "Lab Assistant"
            }
            .to_string(),
            "Your job 'Lab Assistant' has been rejected by the admin."
        );
    }

    #[test]
    fn decision_notices_name_the_employer() {
        let accepted = Notice::ApplicationAccepted {
            job_title: "Lab Assistant",
            employer: "acme",
        }
        .to_string();
        assert!(accepted.starts_with("Congratulations!"));
        assert!(accepted.ends_with("by acme."));
    }

    #[test]
    fn addressed_notice_carries_rendered_text() {
        let notice = Notice::JobAwaitingApproval {
            job_title: "Lab Assistant",
        }
        .to(UserId(7));
        assert_eq!(notice.recipient, UserId(7));
        assert_eq!(
            notice.message,
            "Your job 'Lab Assistant' has been posted and is awaiting admin approval."
        );
    }
}

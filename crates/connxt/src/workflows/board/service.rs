use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{
    ApplicationDecision, ApplicationId, JobApplication, JobId, JobPosting, ModerationAction,
    NewApplication, NewJobPosting, Notification, NotificationId, StudentInfo, User, UserId,
};
use super::forms::{
    validate_application, validate_job, validate_profile, ApplicationForm, JobPostingForm,
    StudentProfileForm, ValidationErrors,
};
use super::notices::Notice;
use super::repository::{BoardStore, CapacityBasis, CapacityLimit, RepositoryError};
use super::views::{
    ApplicationView, ApplicationsOverview, DecisionOutcome, JobBoard, JobListing,
    ModerationOutcome,
};

/// Tunable workflow rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPolicy {
    pub capacity_basis: CapacityBasis,
}

/// Job board workflows: profiles, postings, moderation, applications and the inbox.
pub struct JobBoardService<S> {
    store: Arc<S>,
    policy: BoardPolicy,
}

impl<S> JobBoardService<S>
where
    S: BoardStore + 'static,
{
    pub fn new(store: Arc<S>, policy: BoardPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn policy(&self) -> BoardPolicy {
        self.policy
    }

    /// Resolve the identity attached to a request.
    pub fn caller(&self, id: UserId) -> Result<User, BoardError> {
        self.store.user(id)?.ok_or(BoardError::UnknownUser(id))
    }

    pub fn register_user(&self, username: &str, is_superuser: bool) -> Result<User, BoardError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(BoardError::InvalidUsername);
        }
        let user = self.store.create_user(username, is_superuser)?;
        info!(user = %user.id, username, is_superuser, "registered user");
        Ok(user)
    }

    /// Create the named admin account, or promote it when it exists without superuser rights.
    pub fn ensure_superuser(&self, username: &str) -> Result<User, BoardError> {
        match self.store.user_by_username(username.trim())? {
            Some(user) if user.is_superuser => Ok(user),
            Some(user) => {
                let promoted = self.store.promote_superuser(user.id)?;
                warn!(user = %promoted.id, username = %promoted.username, "promoted bootstrap account to superuser");
                Ok(promoted)
            }
            None => self.register_user(username, true),
        }
    }

    pub fn unread_count(&self, user: Option<&User>) -> Result<usize, BoardError> {
        match user {
            Some(user) => Ok(self.store.unread_count(user.id)?),
            None => Ok(0),
        }
    }

    pub fn profile(&self, user: &User) -> Result<StudentInfo, BoardError> {
        Ok(self.store.get_or_create_student(user.id)?)
    }

    pub fn update_profile(
        &self,
        user: &User,
        form: &StudentProfileForm,
    ) -> Result<StudentInfo, BoardError> {
        let mut info = self.store.get_or_create_student(user.id)?;
        let fields = validate_profile(form)?;
        fields.apply_to(&mut info);
        self.store.save_student(&info)?;

        info!(
            user = %user.id,
            student = %info.id,
            profile_complete = info.profile_complete,
            "updated student profile"
        );
        Ok(info)
    }

    pub fn post_job(&self, employer: &User, form: &JobPostingForm) -> Result<JobPosting, BoardError> {
        let fields = validate_job(form)?;

        let review = Notice::JobSubmittedForReview {
            job_title: &fields.job_title,
            employer: &employer.username,
        };
        let mut notices: Vec<_> = self
            .store
            .superusers()?
            .iter()
            .map(|admin| review.to(admin.id))
            .collect();
        notices.push(
            Notice::JobAwaitingApproval {
                job_title: &fields.job_title,
            }
            .to(employer.id),
        );

        let job = self.store.insert_job(
            NewJobPosting {
                owner: employer.id,
                job_title: fields.job_title.clone(),
                job_hours: fields.job_hours,
                job_skills: fields.job_skills,
                job_description: fields.job_description,
                company: fields.company,
                job_questions: fields.job_questions,
                job_capacity: fields.job_capacity,
            },
            &notices,
        )?;

        info!(job = %job.id, employer = %employer.id, "job posted for review");
        Ok(job)
    }

    pub fn jobs_posted_by(&self, employer: &User) -> Result<Vec<JobPosting>, BoardError> {
        Ok(self.store.jobs_by_owner(employer.id)?)
    }

    /// Fetch a posting for its owner; `action` names the attempted operation in the refusal.
    pub fn job_for_owner(
        &self,
        user: &User,
        id: JobId,
        action: &'static str,
    ) -> Result<JobPosting, BoardError> {
        let job = self.find_job(id)?;
        if !job.is_owned_by(user) {
            return Err(BoardError::Forbidden { action });
        }
        Ok(job)
    }

    pub fn edit_job(
        &self,
        user: &User,
        id: JobId,
        form: &JobPostingForm,
    ) -> Result<JobPosting, BoardError> {
        let mut job = self.job_for_owner(user, id, EDIT_JOB)?;
        let fields = validate_job(form)?;
        fields.apply_to(&mut job);
        self.store.save_job(&job)?;

        info!(job = %job.id, "job updated");
        Ok(job)
    }

    pub fn delete_job(&self, user: &User, id: JobId) -> Result<JobPosting, BoardError> {
        let job = self.job_for_owner(user, id, DELETE_JOB)?;
        self.store.delete_job(job.id)?;

        info!(job = %job.id, "job deleted by owner");
        Ok(job)
    }

    pub fn moderation_queue(&self, admin: &User) -> Result<Vec<JobPosting>, BoardError> {
        require_superuser(admin)?;
        Ok(self.store.jobs_by_approval(false)?)
    }

    pub fn moderate_job(
        &self,
        admin: &User,
        id: JobId,
        action: ModerationAction,
    ) -> Result<ModerationOutcome, BoardError> {
        require_superuser(admin)?;
        let mut job = self.find_job(id)?;
        let missing = |err: RepositoryError| match err {
            RepositoryError::NotFound => BoardError::NotFound {
                entity: "job",
                id: id.0,
            },
            other => BoardError::Repository(other),
        };

        match action {
            ModerationAction::Approve => {
                let notice = Notice::JobApproved {
                    job_title: &job.job_title,
                }
                .to(job.owner);
                let notified = self
                    .store
                    .approve_job(job.id, &notice)
                    .map_err(missing)?
                    .is_some();
                job.is_approved = true;

                info!(job = %job.id, admin = %admin.id, notified, "job approved");
                Ok(ModerationOutcome::Approved { job, notified })
            }
            ModerationAction::Reject => {
                if job.is_approved {
                    return Err(BoardError::AlreadyApproved(job.id));
                }
                let notice = Notice::JobRejected {
                    job_title: &job.job_title,
                }
                .to(job.owner);
                let notified = self
                    .store
                    .reject_job(job.id, &notice)
                    .map_err(|err| match err {
                        RepositoryError::Conflict => BoardError::AlreadyApproved(id),
                        other => missing(other),
                    })?
                    .is_some();

                info!(job = %job.id, admin = %admin.id, notified, "job rejected");
                Ok(ModerationOutcome::Rejected { job, notified })
            }
        }
    }

    /// Approved postings annotated for the calling student.
    pub fn job_board(&self, user: &User) -> Result<JobBoard, BoardError> {
        let student = self.store.student_for_user(user.id)?;
        let mut job_data = Vec::new();

        for job in self.store.jobs_by_approval(true)? {
            let applications = self.store.applications_for_job(job.id)?;
            let has_applied = student.as_ref().is_some_and(|student| {
                applications
                    .iter()
                    .any(|application| application.student_id == student.id)
            });
            let counted = applications
                .iter()
                .filter(|application| self.policy.capacity_basis.counts(application))
                .count();
            let can_apply_flag = !self.capacity_of(&job).is_reached(counted);

            job_data.push(JobListing {
                job,
                has_applied,
                can_apply_flag,
            });
        }

        Ok(JobBoard {
            job_data,
            profile_exists: student.is_some_and(|student| student.profile_complete),
        })
    }

    pub fn apply(
        &self,
        user: &User,
        job_id: JobId,
        form: &ApplicationForm,
    ) -> Result<JobApplication, BoardError> {
        let essay_answer = validate_application(form)?;
        let job = self
            .store
            .job(job_id)?
            .filter(|job| job.is_approved)
            .ok_or(BoardError::NotFound {
                entity: "job",
                id: job_id.0,
            })?;

        let student = match self.store.student_for_user(user.id)? {
            Some(student) if student.profile_complete => student,
            _ => return Err(refuse(user, &job, ApplyRefusal::IncompleteProfile)),
        };

        if self.store.application_for(job.id, student.id)?.is_some() {
            return Err(refuse(user, &job, ApplyRefusal::AlreadyApplied));
        }

        let limit = self.capacity_of(&job);
        let counted = self
            .store
            .applications_for_job(job.id)?
            .iter()
            .filter(|application| limit.basis.counts(application))
            .count();
        if limit.is_reached(counted) {
            return Err(refuse(user, &job, ApplyRefusal::CapacityReached));
        }

        let received = Notice::ApplicationReceived {
            student_name: &student.student_name,
            job_title: &job.job_title,
        }
        .to(job.owner);
        let application = self
            .store
            .insert_application(
                NewApplication {
                    job_id: job.id,
                    student_id: student.id,
                    essay_answer,
                },
                limit,
                &received,
            )
            .map_err(|err| match err {
                RepositoryError::Conflict => refuse(user, &job, ApplyRefusal::AlreadyApplied),
                RepositoryError::CapacityReached => {
                    refuse(user, &job, ApplyRefusal::CapacityReached)
                }
                other => BoardError::Repository(other),
            })?;

        info!(
            application = %application.id,
            job = %job.id,
            student = %student.id,
            "application submitted"
        );
        Ok(application)
    }

    /// Applications to the caller's postings, or to every posting for superusers.
    pub fn applications_overview(&self, user: &User) -> Result<ApplicationsOverview, BoardError> {
        let mut overview = ApplicationsOverview::default();

        for application in self.store.applications()? {
            let Some(job) = self.store.job(application.job_id)? else {
                continue;
            };
            if !user.is_superuser && !job.is_owned_by(user) {
                continue;
            }
            let Some(student) = self.store.student(application.student_id)? else {
                continue;
            };
            overview.push(ApplicationView::new(&application, &job, &student));
        }

        Ok(overview)
    }

    pub fn decide_application(
        &self,
        user: &User,
        id: ApplicationId,
        decision: ApplicationDecision,
    ) -> Result<DecisionOutcome, BoardError> {
        let application = self.store.application(id)?.ok_or(BoardError::NotFound {
            entity: "application",
            id: id.0,
        })?;
        let job = self.find_job(application.job_id)?;
        if !user.is_superuser && !job.is_owned_by(user) {
            return Err(BoardError::Forbidden {
                action: "manage applications for this job",
            });
        }
        let student = self
            .store
            .student(application.student_id)?
            .ok_or(BoardError::NotFound {
                entity: "student",
                id: application.student_id.0,
            })?;
        let employer = self
            .store
            .user(job.owner)?
            .ok_or(BoardError::UnknownUser(job.owner))?;

        let (notice, message) = match decision {
            ApplicationDecision::Accept => (
                Notice::ApplicationAccepted {
                    job_title: &job.job_title,
                    employer: &employer.username,
                },
                format!("{} has been accepted.", student.student_name),
            ),
            ApplicationDecision::Reject => (
                Notice::ApplicationRejected {
                    job_title: &job.job_title,
                    employer: &employer.username,
                },
                format!("{} has been rejected.", student.student_name),
            ),
        };
        let resolved = self
            .store
            .resolve_application(id, decision, &notice.to(student.user_id))
            .map_err(|err| match err {
                RepositoryError::Conflict => BoardError::AlreadyResolved(id),
                other => BoardError::Repository(other),
            })?;

        info!(
            application = %resolved.id,
            status = resolved.status.label(),
            "application resolved"
        );
        Ok(DecisionOutcome {
            application: resolved,
            message,
        })
    }

    pub fn inbox(&self, user: &User) -> Result<Vec<Notification>, BoardError> {
        Ok(self.store.notifications_for(user.id)?)
    }

    /// Delete one of the caller's notifications. Unknown or foreign ids are ignored.
    pub fn dismiss_notification(&self, user: &User, id: NotificationId) -> Result<bool, BoardError> {
        let deleted = self.store.delete_notification(user.id, id)?;
        if !deleted {
            debug!(user = %user.id, notification = %id, "nothing to dismiss");
        }
        Ok(deleted)
    }

    fn find_job(&self, id: JobId) -> Result<JobPosting, BoardError> {
        self.store.job(id)?.ok_or(BoardError::NotFound {
            entity: "job",
            id: id.0,
        })
    }

    fn capacity_of(&self, job: &JobPosting) -> CapacityLimit {
        CapacityLimit {
            capacity: job.job_capacity,
            basis: self.policy.capacity_basis,
        }
    }
}

pub const EDIT_JOB: &str = "edit this job";
pub const DELETE_JOB: &str = "delete this job";

fn require_superuser(user: &User) -> Result<(), BoardError> {
    if user.is_superuser {
        Ok(())
    } else {
        Err(BoardError::Forbidden {
            action: "moderate job postings",
        })
    }
}

fn refuse(user: &User, job: &JobPosting, refusal: ApplyRefusal) -> BoardError {
    debug!(user = %user.id, job = %job.id, %refusal, "application refused");
    BoardError::Refused(refusal)
}

/// Business rules that turn an application away without persisting anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ApplyRefusal {
    #[error("Complete your profile before applying.")]
    IncompleteProfile,
    #[error("You already applied for this opportunity.")]
    AlreadyApplied,
    #[error("Job capacity reached.")]
    CapacityReached,
}

/// Error raised by the job board service.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Refused(#[from] ApplyRefusal),
    #[error("You are not allowed to {action}.")]
    Forbidden { action: &'static str },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error("username must not be blank")]
    InvalidUsername,
    #[error("application {0} has already been resolved")]
    AlreadyResolved(ApplicationId),
    #[error("job {0} is already approved")]
    AlreadyApproved(JobId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

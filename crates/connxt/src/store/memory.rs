use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::workflows::board::domain::{
    ApplicationDecision, ApplicationId, ApplicationStatus, JobApplication, JobId, JobPosting,
    NewApplication, NewJobPosting, NewNotification, Notification, NotificationId, StudentId,
    StudentInfo, User, UserId,
};
use crate::workflows::board::repository::{
    ApplicationRepository, CapacityLimit, JobRepository, NotificationRepository, RepositoryError,
    StudentRepository, UserRepository,
};

/// Process-local store. Every table sits behind one mutex so each repository call is atomic.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    sequence: i64,
    users: BTreeMap<UserId, User>,
    students: BTreeMap<StudentId, StudentInfo>,
    jobs: BTreeMap<JobId, JobPosting>,
    applications: BTreeMap<ApplicationId, JobApplication>,
    notifications: BTreeMap<NotificationId, Notification>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    /// Checked before any write so a failing notice leaves the tables untouched.
    fn ensure_recipients<'a>(
        &self,
        notices: impl IntoIterator<Item = &'a NewNotification>,
    ) -> Result<(), RepositoryError> {
        for notice in notices {
            if !self.users.contains_key(&notice.recipient) {
                return Err(RepositoryError::NotFound);
            }
        }
        Ok(())
    }

    fn notify(&mut self, job: JobId, notice: &NewNotification) -> Notification {
        let notification = Notification {
            id: NotificationId(self.next_id()),
            recipient: notice.recipient,
            job_id: job,
            message: notice.message.clone(),
            is_read: false,
            created_at: Utc::now(),
        };
        self.notifications
            .insert(notification.id, notification.clone());
        notification
    }

    fn notify_once(&mut self, job: JobId, notice: &NewNotification) -> Option<Notification> {
        let delivered = self.notifications.values().any(|existing| {
            existing.job_id == job
                && existing.recipient == notice.recipient
                && existing.message == notice.message
        });
        if delivered {
            None
        } else {
            Some(self.notify(job, notice))
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl UserRepository for InMemoryStore {
    fn create_user(&self, username: &str, is_superuser: bool) -> Result<User, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.users.values().any(|user| user.username == username) {
            return Err(RepositoryError::Conflict);
        }
        let user = User {
            id: UserId(tables.next_id()),
            username: username.to_string(),
            is_superuser,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables()?.users.get(&id).cloned())
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    fn users(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.tables()?.users.values().cloned().collect())
    }

    fn superusers(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self
            .tables()?
            .users
            .values()
            .filter(|user| user.is_superuser)
            .cloned()
            .collect())
    }

    fn promote_superuser(&self, id: UserId) -> Result<User, RepositoryError> {
        let mut tables = self.tables()?;
        let user = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.is_superuser = true;
        Ok(user.clone())
    }
}

impl StudentRepository for InMemoryStore {
    fn student(&self, id: StudentId) -> Result<Option<StudentInfo>, RepositoryError> {
        Ok(self.tables()?.students.get(&id).cloned())
    }

    fn student_for_user(&self, user: UserId) -> Result<Option<StudentInfo>, RepositoryError> {
        Ok(self
            .tables()?
            .students
            .values()
            .find(|info| info.user_id == user)
            .cloned())
    }

    fn get_or_create_student(&self, user: UserId) -> Result<StudentInfo, RepositoryError> {
        let mut tables = self.tables()?;
        if let Some(existing) = tables.students.values().find(|info| info.user_id == user) {
            return Ok(existing.clone());
        }
        if !tables.users.contains_key(&user) {
            return Err(RepositoryError::NotFound);
        }
        let info = StudentInfo::blank(StudentId(tables.next_id()), user);
        tables.students.insert(info.id, info.clone());
        Ok(info)
    }

    fn save_student(&self, info: &StudentInfo) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.students.get_mut(&info.id) {
            Some(stored) => {
                *stored = info.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

impl JobRepository for InMemoryStore {
    fn insert_job(
        &self,
        job: NewJobPosting,
        notices: &[NewNotification],
    ) -> Result<JobPosting, RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.users.contains_key(&job.owner) {
            return Err(RepositoryError::NotFound);
        }
        tables.ensure_recipients(notices)?;
        let posting = JobPosting {
            id: JobId(tables.next_id()),
            owner: job.owner,
            job_title: job.job_title,
            job_hours: job.job_hours,
            job_skills: job.job_skills,
            job_description: job.job_description,
            company: job.company,
            job_questions: job.job_questions,
            job_capacity: job.job_capacity,
            is_approved: false,
        };
        tables.jobs.insert(posting.id, posting.clone());
        for notice in notices {
            tables.notify(posting.id, notice);
        }
        Ok(posting)
    }

    fn job(&self, id: JobId) -> Result<Option<JobPosting>, RepositoryError> {
        Ok(self.tables()?.jobs.get(&id).cloned())
    }

    fn save_job(&self, job: &JobPosting) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.jobs.get_mut(&job.id) {
            Some(stored) => {
                *stored = job.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_job(&self, id: JobId) -> Result<Option<JobPosting>, RepositoryError> {
        let mut tables = self.tables()?;
        let removed = tables.jobs.remove(&id);
        if removed.is_some() {
            tables
                .applications
                .retain(|_, application| application.job_id != id);
        }
        Ok(removed)
    }

    fn jobs_by_owner(&self, owner: UserId) -> Result<Vec<JobPosting>, RepositoryError> {
        Ok(self
            .tables()?
            .jobs
            .values()
            .filter(|job| job.owner == owner)
            .cloned()
            .collect())
    }

    fn jobs_by_approval(&self, approved: bool) -> Result<Vec<JobPosting>, RepositoryError> {
        Ok(self
            .tables()?
            .jobs
            .values()
            .filter(|job| job.is_approved == approved)
            .cloned()
            .collect())
    }

    fn approve_job(
        &self,
        id: JobId,
        notice: &NewNotification,
    ) -> Result<Option<Notification>, RepositoryError> {
        let mut tables = self.tables()?;
        tables.ensure_recipients([notice])?;
        let job = tables.jobs.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        job.is_approved = true;
        Ok(tables.notify_once(id, notice))
    }

    fn reject_job(
        &self,
        id: JobId,
        notice: &NewNotification,
    ) -> Result<Option<Notification>, RepositoryError> {
        let mut tables = self.tables()?;
        tables.ensure_recipients([notice])?;
        match tables.jobs.get(&id) {
            None => return Err(RepositoryError::NotFound),
            Some(job) if job.is_approved => return Err(RepositoryError::Conflict),
            Some(_) => {}
        }
        tables.jobs.remove(&id);
        tables
            .applications
            .retain(|_, application| application.job_id != id);
        Ok(tables.notify_once(id, notice))
    }
}

impl ApplicationRepository for InMemoryStore {
    fn insert_application(
        &self,
        application: NewApplication,
        limit: CapacityLimit,
        notice: &NewNotification,
    ) -> Result<JobApplication, RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.jobs.contains_key(&application.job_id)
            || !tables.students.contains_key(&application.student_id)
        {
            return Err(RepositoryError::NotFound);
        }
        tables.ensure_recipients([notice])?;

        let mut counted = 0;
        for existing in tables
            .applications
            .values()
            .filter(|existing| existing.job_id == application.job_id)
        {
            if existing.student_id == application.student_id {
                return Err(RepositoryError::Conflict);
            }
            if limit.basis.counts(existing) {
                counted += 1;
            }
        }
        if limit.is_reached(counted) {
            return Err(RepositoryError::CapacityReached);
        }

        let stored = JobApplication {
            id: ApplicationId(tables.next_id()),
            job_id: application.job_id,
            student_id: application.student_id,
            essay_answer: application.essay_answer,
            status: ApplicationStatus::Pending,
            applied_at: Utc::now(),
        };
        tables.applications.insert(stored.id, stored.clone());
        tables.notify(stored.job_id, notice);
        Ok(stored)
    }

    fn application(&self, id: ApplicationId) -> Result<Option<JobApplication>, RepositoryError> {
        Ok(self.tables()?.applications.get(&id).cloned())
    }

    fn application_for(
        &self,
        job: JobId,
        student: StudentId,
    ) -> Result<Option<JobApplication>, RepositoryError> {
        Ok(self
            .tables()?
            .applications
            .values()
            .find(|application| application.job_id == job && application.student_id == student)
            .cloned())
    }

    fn applications_for_job(&self, job: JobId) -> Result<Vec<JobApplication>, RepositoryError> {
        Ok(self
            .tables()?
            .applications
            .values()
            .filter(|application| application.job_id == job)
            .cloned()
            .collect())
    }

    fn applications(&self) -> Result<Vec<JobApplication>, RepositoryError> {
        Ok(self.tables()?.applications.values().cloned().collect())
    }

    fn resolve_application(
        &self,
        id: ApplicationId,
        decision: ApplicationDecision,
        notice: &NewNotification,
    ) -> Result<JobApplication, RepositoryError> {
        let mut tables = self.tables()?;
        tables.ensure_recipients([notice])?;
        let application = tables
            .applications
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        application.status = application
            .status
            .resolve(decision)
            .ok_or(RepositoryError::Conflict)?;
        let resolved = application.clone();
        tables.notify(resolved.job_id, notice);
        Ok(resolved)
    }
}

impl NotificationRepository for InMemoryStore {
    fn notifications_for(&self, recipient: UserId) -> Result<Vec<Notification>, RepositoryError> {
        let mut notifications: Vec<Notification> = self
            .tables()?
            .notifications
            .values()
            .filter(|notification| notification.recipient == recipient)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notifications)
    }

    fn unread_count(&self, recipient: UserId) -> Result<usize, RepositoryError> {
        Ok(self
            .tables()?
            .notifications
            .values()
            .filter(|notification| notification.recipient == recipient && !notification.is_read)
            .count())
    }

    fn delete_notification(
        &self,
        recipient: UserId,
        id: NotificationId,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables()?;
        let owned = tables
            .notifications
            .get(&id)
            .is_some_and(|notification| notification.recipient == recipient);
        if owned {
            tables.notifications.remove(&id);
        }
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::board::repository::CapacityBasis;

    fn store_with_job() -> (InMemoryStore, User, JobPosting, StudentInfo) {
        let store = InMemoryStore::new();
        let employer = store.create_user("acme", false).expect("employer");
        let job = store
            .insert_job(
                NewJobPosting {
                    owner: employer.id,
                    job_title: "Intern".to_string(),
                    job_hours: 8,
                    job_skills: "Filing".to_string(),
                    job_description: "Keep the office running.".to_string(),
                    company: "Acme".to_string(),
                    job_questions: "Why us?".to_string(),
                    job_capacity: 2,
                },
                &[],
            )
            .expect("job inserts");
        let user = store.create_user("ada", false).expect("student user");
        let student = store.get_or_create_student(user.id).expect("profile");
        (store, employer, job, student)
    }

    fn limit() -> CapacityLimit {
        CapacityLimit {
            capacity: 2,
            basis: CapacityBasis::AllApplications,
        }
    }

    #[test]
    fn undeliverable_notice_leaves_the_application_unwritten() {
        let (store, _, job, student) = store_with_job();
        let stray = NewNotification::new(UserId(404), "nobody home");

        let result = store.insert_application(
            NewApplication {
                job_id: job.id,
                student_id: student.id,
                essay_answer: "Happy to help".to_string(),
            },
            limit(),
            &stray,
        );

        assert!(matches!(result, Err(RepositoryError::NotFound)));
        assert!(store.applications().expect("list").is_empty());
    }

    #[test]
    fn decision_and_notice_are_written_together() {
        let (store, employer, job, student) = store_with_job();
        let pending = store
            .insert_application(
                NewApplication {
                    job_id: job.id,
                    student_id: student.id,
                    essay_answer: "Happy to help".to_string(),
                },
                limit(),
                &NewNotification::new(employer.id, "received"),
            )
            .expect("applies");
        let decided = NewNotification::new(student.user_id, "accepted");

        store
            .resolve_application(pending.id, ApplicationDecision::Accept, &decided)
            .expect("accepts");
        assert!(matches!(
            store.resolve_application(pending.id, ApplicationDecision::Reject, &decided),
            Err(RepositoryError::Conflict)
        ));

        let inbox = store.notifications_for(student.user_id).expect("inbox");
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].job_id, job.id);
    }

    #[test]
    fn moderation_notices_repeat_only_across_jobs() {
        let (store, employer, job, _) = store_with_job();
        let twin = store
            .insert_job(
                NewJobPosting {
                    owner: employer.id,
                    job_title: job.job_title.clone(),
                    job_hours: job.job_hours,
                    job_skills: job.job_skills.clone(),
                    job_description: job.job_description.clone(),
                    company: job.company.clone(),
                    job_questions: job.job_questions.clone(),
                    job_capacity: job.job_capacity,
                },
                &[],
            )
            .expect("twin inserts");
        let approved = NewNotification::new(employer.id, "Your job 'Intern' has been approved.");

        assert!(store.approve_job(job.id, &approved).expect("approve").is_some());
        assert!(store.approve_job(job.id, &approved).expect("again").is_none());
        assert!(matches!(
            store.reject_job(job.id, &approved),
            Err(RepositoryError::Conflict)
        ));
        assert!(store.reject_job(twin.id, &approved).expect("reject").is_some());
        assert_eq!(store.unread_count(employer.id).expect("count"), 2);
    }

    #[test]
    fn promotion_requires_an_existing_account() {
        let store = InMemoryStore::new();
        let user = store.create_user("boss", false).expect("user");
        assert!(store.promote_superuser(user.id).expect("promoted").is_superuser);
        assert!(matches!(
            store.promote_superuser(UserId(404)),
            Err(RepositoryError::NotFound)
        ));
    }
}

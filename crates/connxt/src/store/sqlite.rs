use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};

use crate::workflows::board::domain::{
    ApplicationDecision, ApplicationId, ApplicationStatus, JobApplication, JobId, JobPosting,
    NewApplication, NewJobPosting, NewNotification, Notification, NotificationId, StudentId,
    StudentInfo, User, UserId,
};
use crate::workflows::board::repository::{
    ApplicationRepository, CapacityBasis, CapacityLimit, JobRepository, NotificationRepository,
    RepositoryError, StudentRepository, UserRepository,
};

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        is_superuser INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS student_info (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        student_name TEXT NOT NULL DEFAULT '',
        student_grade INTEGER NOT NULL DEFAULT 0,
        student_email TEXT NOT NULL DEFAULT '',
        student_skills TEXT NOT NULL DEFAULT '',
        student_experience TEXT NOT NULL DEFAULT '',
        student_info TEXT NOT NULL DEFAULT '',
        student_resume TEXT NOT NULL DEFAULT '',
        profile_complete INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS job_postings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        job_title TEXT NOT NULL,
        job_hours INTEGER NOT NULL,
        job_skills TEXT NOT NULL,
        job_description TEXT NOT NULL,
        company TEXT NOT NULL,
        job_questions TEXT NOT NULL,
        job_capacity INTEGER NOT NULL,
        is_approved INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS job_applications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        job_id INTEGER NOT NULL REFERENCES job_postings(id) ON DELETE CASCADE,
        student_id INTEGER NOT NULL REFERENCES student_info(id) ON DELETE CASCADE,
        applied_at TEXT NOT NULL,
        accepted INTEGER NOT NULL DEFAULT 0,
        rejected INTEGER NOT NULL DEFAULT 0,
        essay_answer TEXT NOT NULL DEFAULT '',
        UNIQUE (job_id, student_id),
        CHECK (NOT (accepted AND rejected))
    );

    CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        job_id INTEGER NOT NULL,
        message TEXT NOT NULL,
        created_at TEXT NOT NULL,
        is_read INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_jobs_owner ON job_postings(user_id);
    CREATE INDEX IF NOT EXISTS idx_jobs_approved ON job_postings(is_approved);
    CREATE INDEX IF NOT EXISTS idx_applications_job ON job_applications(job_id);
    CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, created_at);
    CREATE INDEX IF NOT EXISTS idx_notifications_job ON notifications(job_id, user_id);
"#;

const USER_COLUMNS: &str = "id, username, is_superuser";
const STUDENT_COLUMNS: &str = "id, user_id, student_name, student_grade, student_email, \
     student_skills, student_experience, student_info, student_resume, profile_complete";
const JOB_COLUMNS: &str = "id, user_id, job_title, job_hours, job_skills, job_description, \
     company, job_questions, job_capacity, is_approved";
const APPLICATION_COLUMNS: &str =
    "id, job_id, student_id, essay_answer, accepted, rejected, applied_at";
const NOTIFICATION_COLUMNS: &str = "id, user_id, job_id, message, is_read, created_at";

/// SQLite-backed store. Multi-step checks run inside IMMEDIATE transactions and the schema
/// carries the uniqueness and flag constraints.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| RepositoryError::Unavailable(err.to_string()))?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, RepositoryError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|_| RepositoryError::Unavailable("connection mutex poisoned".to_string()))
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            id: UserId(row.get(0)?),
            username: row.get(1)?,
            is_superuser: row.get(2)?,
        })
    }

    fn row_to_student(row: &Row) -> rusqlite::Result<StudentInfo> {
        Ok(StudentInfo {
            id: StudentId(row.get(0)?),
            user_id: UserId(row.get(1)?),
            student_name: row.get(2)?,
            student_grade: row.get(3)?,
            student_email: row.get(4)?,
            student_skills: row.get(5)?,
            student_experience: row.get(6)?,
            student_info: row.get(7)?,
            student_resume: row.get(8)?,
            profile_complete: row.get(9)?,
        })
    }

    fn row_to_job(row: &Row) -> rusqlite::Result<JobPosting> {
        Ok(JobPosting {
            id: JobId(row.get(0)?),
            owner: UserId(row.get(1)?),
            job_title: row.get(2)?,
            job_hours: row.get(3)?,
            job_skills: row.get(4)?,
            job_description: row.get(5)?,
            company: row.get(6)?,
            job_questions: row.get(7)?,
            job_capacity: row.get(8)?,
            is_approved: row.get(9)?,
        })
    }

    fn row_to_application(row: &Row) -> rusqlite::Result<JobApplication> {
        let accepted: bool = row.get(4)?;
        let rejected: bool = row.get(5)?;
        let status = match (accepted, rejected) {
            (true, _) => ApplicationStatus::Accepted,
            (_, true) => ApplicationStatus::Rejected,
            _ => ApplicationStatus::Pending,
        };
        Ok(JobApplication {
            id: ApplicationId(row.get(0)?),
            job_id: JobId(row.get(1)?),
            student_id: StudentId(row.get(2)?),
            essay_answer: row.get(3)?,
            status,
            applied_at: row.get(6)?,
        })
    }

    fn row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
        Ok(Notification {
            id: NotificationId(row.get(0)?),
            recipient: UserId(row.get(1)?),
            job_id: JobId(row.get(2)?),
            message: row.get(3)?,
            is_read: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

fn query_all<T>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    map: fn(&Row) -> rusqlite::Result<T>,
) -> Result<Vec<T>, RepositoryError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn insert_notification(
    conn: &Connection,
    job: JobId,
    notice: &NewNotification,
) -> Result<Notification, RepositoryError> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO notifications (user_id, job_id, message, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![notice.recipient.0, job.0, notice.message, created_at],
    )?;
    Ok(Notification {
        id: NotificationId(conn.last_insert_rowid()),
        recipient: notice.recipient,
        job_id: job,
        message: notice.message.clone(),
        is_read: false,
        created_at,
    })
}

/// Callers hold an IMMEDIATE transaction, so the existence check and the insert cannot interleave.
fn insert_notification_once(
    conn: &Connection,
    job: JobId,
    notice: &NewNotification,
) -> Result<Option<Notification>, RepositoryError> {
    let delivered: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM notifications
                        WHERE job_id = ?1 AND user_id = ?2 AND message = ?3)",
        params![job.0, notice.recipient.0, notice.message],
        |row| row.get(0),
    )?;
    if delivered {
        return Ok(None);
    }
    insert_notification(conn, job, notice).map(Some)
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                // Foreign keys point at a missing parent; everything else is a duplicate.
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
                    RepositoryError::NotFound
                } else {
                    RepositoryError::Conflict
                }
            }
            _ => RepositoryError::Unavailable(err.to_string()),
        }
    }
}

impl UserRepository for SqliteStore {
    fn create_user(&self, username: &str, is_superuser: bool) -> Result<User, RepositoryError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (username, is_superuser) VALUES (?1, ?2)",
            params![username, is_superuser],
        )?;
        Ok(User {
            id: UserId(conn.last_insert_rowid()),
            username: username.to_string(),
            is_superuser,
        })
    }

    fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id.0],
                Self::row_to_user,
            )
            .optional()?)
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                [username],
                Self::row_to_user,
            )
            .optional()?)
    }

    fn users(&self) -> Result<Vec<User>, RepositoryError> {
        let conn = self.conn()?;
        query_all(
            &conn,
            &format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"),
            [],
            Self::row_to_user,
        )
    }

    fn superusers(&self) -> Result<Vec<User>, RepositoryError> {
        let conn = self.conn()?;
        query_all(
            &conn,
            &format!("SELECT {USER_COLUMNS} FROM users WHERE is_superuser = 1 ORDER BY id"),
            [],
            Self::row_to_user,
        )
    }

    fn promote_superuser(&self, id: UserId) -> Result<User, RepositoryError> {
        let conn = self.conn()?;
        let changed = conn.execute("UPDATE users SET is_superuser = 1 WHERE id = ?1", [id.0])?;
        if changed == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id.0],
            Self::row_to_user,
        )?)
    }
}

impl StudentRepository for SqliteStore {
    fn student(&self, id: StudentId) -> Result<Option<StudentInfo>, RepositoryError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {STUDENT_COLUMNS} FROM student_info WHERE id = ?1"),
                [id.0],
                Self::row_to_student,
            )
            .optional()?)
    }

    fn student_for_user(&self, user: UserId) -> Result<Option<StudentInfo>, RepositoryError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {STUDENT_COLUMNS} FROM student_info WHERE user_id = ?1"),
                [user.0],
                Self::row_to_student,
            )
            .optional()?)
    }

    fn get_or_create_student(&self, user: UserId) -> Result<StudentInfo, RepositoryError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO student_info (user_id) VALUES (?1)",
            [user.0],
        )?;
        Ok(conn.query_row(
            &format!("SELECT {STUDENT_COLUMNS} FROM student_info WHERE user_id = ?1"),
            [user.0],
            Self::row_to_student,
        )?)
    }

    fn save_student(&self, info: &StudentInfo) -> Result<(), RepositoryError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE student_info SET student_name = ?2, student_grade = ?3, student_email = ?4,
                 student_skills = ?5, student_experience = ?6, student_info = ?7,
                 student_resume = ?8, profile_complete = ?9
             WHERE id = ?1",
            params![
                info.id.0,
                info.student_name,
                info.student_grade,
                info.student_email,
                info.student_skills,
                info.student_experience,
                info.student_info,
                info.student_resume,
                info.profile_complete,
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

impl JobRepository for SqliteStore {
    fn insert_job(
        &self,
        job: NewJobPosting,
        notices: &[NewNotification],
    ) -> Result<JobPosting, RepositoryError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO job_postings (user_id, job_title, job_hours, job_skills, job_description,
                 company, job_questions, job_capacity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                job.owner.0,
                job.job_title,
                job.job_hours,
                job.job_skills,
                job.job_description,
                job.company,
                job.job_questions,
                job.job_capacity,
            ],
        )?;
        let id = JobId(tx.last_insert_rowid());
        for notice in notices {
            insert_notification(&tx, id, notice)?;
        }
        tx.commit()?;

        Ok(JobPosting {
            id,
            owner: job.owner,
            job_title: job.job_title,
            job_hours: job.job_hours,
            job_skills: job.job_skills,
            job_description: job.job_description,
            company: job.company,
            job_questions: job.job_questions,
            job_capacity: job.job_capacity,
            is_approved: false,
        })
    }

    fn job(&self, id: JobId) -> Result<Option<JobPosting>, RepositoryError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM job_postings WHERE id = ?1"),
                [id.0],
                Self::row_to_job,
            )
            .optional()?)
    }

    fn save_job(&self, job: &JobPosting) -> Result<(), RepositoryError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE job_postings SET job_title = ?2, job_hours = ?3, job_skills = ?4,
                 job_description = ?5, company = ?6, job_questions = ?7, job_capacity = ?8,
                 is_approved = ?9
             WHERE id = ?1",
            params![
                job.id.0,
                job.job_title,
                job.job_hours,
                job.job_skills,
                job.job_description,
                job.company,
                job.job_questions,
                job.job_capacity,
                job.is_approved,
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn delete_job(&self, id: JobId) -> Result<Option<JobPosting>, RepositoryError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let job = tx
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM job_postings WHERE id = ?1"),
                [id.0],
                Self::row_to_job,
            )
            .optional()?;
        if job.is_some() {
            tx.execute("DELETE FROM job_applications WHERE job_id = ?1", [id.0])?;
            tx.execute("DELETE FROM job_postings WHERE id = ?1", [id.0])?;
        }
        tx.commit()?;
        Ok(job)
    }

    fn jobs_by_owner(&self, owner: UserId) -> Result<Vec<JobPosting>, RepositoryError> {
        let conn = self.conn()?;
        query_all(
            &conn,
            &format!("SELECT {JOB_COLUMNS} FROM job_postings WHERE user_id = ?1 ORDER BY id"),
            [owner.0],
            Self::row_to_job,
        )
    }

    fn jobs_by_approval(&self, approved: bool) -> Result<Vec<JobPosting>, RepositoryError> {
        let conn = self.conn()?;
        query_all(
            &conn,
            &format!("SELECT {JOB_COLUMNS} FROM job_postings WHERE is_approved = ?1 ORDER BY id"),
            [approved],
            Self::row_to_job,
        )
    }

    fn approve_job(
        &self,
        id: JobId,
        notice: &NewNotification,
    ) -> Result<Option<Notification>, RepositoryError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE job_postings SET is_approved = 1 WHERE id = ?1",
            [id.0],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound);
        }
        let notification = insert_notification_once(&tx, id, notice)?;
        tx.commit()?;
        Ok(notification)
    }

    fn reject_job(
        &self,
        id: JobId,
        notice: &NewNotification,
    ) -> Result<Option<Notification>, RepositoryError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let approved: Option<bool> = tx
            .query_row(
                "SELECT is_approved FROM job_postings WHERE id = ?1",
                [id.0],
                |row| row.get(0),
            )
            .optional()?;
        match approved {
            None => return Err(RepositoryError::NotFound),
            Some(true) => return Err(RepositoryError::Conflict),
            Some(false) => {}
        }
        tx.execute("DELETE FROM job_applications WHERE job_id = ?1", [id.0])?;
        tx.execute("DELETE FROM job_postings WHERE id = ?1", [id.0])?;
        let notification = insert_notification_once(&tx, id, notice)?;
        tx.commit()?;
        Ok(notification)
    }
}

impl ApplicationRepository for SqliteStore {
    fn insert_application(
        &self,
        application: NewApplication,
        limit: CapacityLimit,
        notice: &NewNotification,
    ) -> Result<JobApplication, RepositoryError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let duplicate: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM job_applications WHERE job_id = ?1 AND student_id = ?2)",
            params![application.job_id.0, application.student_id.0],
            |row| row.get(0),
        )?;
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        let count_sql = match limit.basis {
            CapacityBasis::AllApplications => {
                "SELECT COUNT(*) FROM job_applications WHERE job_id = ?1"
            }
            CapacityBasis::AcceptedOnly => {
                "SELECT COUNT(*) FROM job_applications WHERE job_id = ?1 AND accepted = 1"
            }
        };
        let counted: i64 = tx.query_row(count_sql, [application.job_id.0], |row| row.get(0))?;
        if limit.is_reached(usize::try_from(counted).unwrap_or(usize::MAX)) {
            return Err(RepositoryError::CapacityReached);
        }

        let applied_at = Utc::now();
        tx.execute(
            "INSERT INTO job_applications (job_id, student_id, essay_answer, applied_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                application.job_id.0,
                application.student_id.0,
                application.essay_answer,
                applied_at,
            ],
        )?;
        let id = ApplicationId(tx.last_insert_rowid());
        insert_notification(&tx, application.job_id, notice)?;
        tx.commit()?;

        Ok(JobApplication {
            id,
            job_id: application.job_id,
            student_id: application.student_id,
            essay_answer: application.essay_answer,
            status: ApplicationStatus::Pending,
            applied_at,
        })
    }

    fn application(&self, id: ApplicationId) -> Result<Option<JobApplication>, RepositoryError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE id = ?1"),
                [id.0],
                Self::row_to_application,
            )
            .optional()?)
    }

    fn application_for(
        &self,
        job: JobId,
        student: StudentId,
    ) -> Result<Option<JobApplication>, RepositoryError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {APPLICATION_COLUMNS} FROM job_applications
                     WHERE job_id = ?1 AND student_id = ?2"
                ),
                [job.0, student.0],
                Self::row_to_application,
            )
            .optional()?)
    }

    fn applications_for_job(&self, job: JobId) -> Result<Vec<JobApplication>, RepositoryError> {
        let conn = self.conn()?;
        query_all(
            &conn,
            &format!(
                "SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE job_id = ?1 ORDER BY id"
            ),
            [job.0],
            Self::row_to_application,
        )
    }

    fn applications(&self) -> Result<Vec<JobApplication>, RepositoryError> {
        let conn = self.conn()?;
        query_all(
            &conn,
            &format!("SELECT {APPLICATION_COLUMNS} FROM job_applications ORDER BY id"),
            [],
            Self::row_to_application,
        )
    }

    fn resolve_application(
        &self,
        id: ApplicationId,
        decision: ApplicationDecision,
        notice: &NewNotification,
    ) -> Result<JobApplication, RepositoryError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let column = match decision {
            ApplicationDecision::Accept => "accepted",
            ApplicationDecision::Reject => "rejected",
        };
        let changed = tx.execute(
            &format!(
                "UPDATE job_applications SET {column} = 1
                 WHERE id = ?1 AND accepted = 0 AND rejected = 0"
            ),
            [id.0],
        )?;
        let application = tx
            .query_row(
                &format!("SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE id = ?1"),
                [id.0],
                Self::row_to_application,
            )
            .optional()?
            .ok_or(RepositoryError::NotFound)?;
        if changed == 0 {
            return Err(RepositoryError::Conflict);
        }
        insert_notification(&tx, application.job_id, notice)?;
        tx.commit()?;
        Ok(application)
    }
}

impl NotificationRepository for SqliteStore {
    fn notifications_for(&self, recipient: UserId) -> Result<Vec<Notification>, RepositoryError> {
        let conn = self.conn()?;
        query_all(
            &conn,
            &format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
            ),
            [recipient.0],
            Self::row_to_notification,
        )
    }

    fn unread_count(&self, recipient: UserId) -> Result<usize, RepositoryError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
            [recipient.0],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn delete_notification(
        &self,
        recipient: UserId,
        id: NotificationId,
    ) -> Result<bool, RepositoryError> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
            [id.0, recipient.0],
        )?;
        Ok(deleted > 0)
    }
}

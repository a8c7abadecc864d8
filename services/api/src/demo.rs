use chrono::{DateTime, Utc};
use clap::Args;
use connxt::error::AppError;
use connxt::store::InMemoryStore;
use connxt::workflows::board::views::ApplicationsOverview;
use connxt::workflows::board::{
    ApplicationDecision, ApplicationForm, BoardError, BoardPolicy, CapacityBasis, JobBoardService,
    JobPostingForm, ModerationAction, StudentProfileForm, User,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Capacity of the demo posting
    #[arg(long, default_value_t = 1)]
    pub(crate) capacity: i32,
    /// Number of students with complete profiles who try to apply
    #[arg(long, default_value_t = 2)]
    pub(crate) students: usize,
    /// Count only accepted applications against capacity
    #[arg(long)]
    pub(crate) accepted_only: bool,
    /// Print the final applications overview as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            capacity: 1,
            students: 2,
            accepted_only: false,
            json: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct DemoSummary<'a> {
    generated_at: DateTime<Utc>,
    capacity_basis: CapacityBasis,
    applications: &'a ApplicationsOverview,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        capacity,
        students,
        accepted_only,
        json,
    } = args;

    let policy = BoardPolicy {
        capacity_basis: if accepted_only {
            CapacityBasis::AcceptedOnly
        } else {
            CapacityBasis::AllApplications
        },
    };
    let service = JobBoardService::new(Arc::new(InMemoryStore::new()), policy);

    println!("ConnXt job board demo");
    let admin = service.ensure_superuser("admin")?;
    let employer = service.register_user("acme-labs", false)?;

    let job = service.post_job(&employer, &demo_job(capacity))?;
    println!(
        "- {} posted '{}' (capacity {}) -> awaiting approval",
        employer.username, job.job_title, job.job_capacity
    );
    print_inbox(&service, &admin)?;

    service.moderate_job(&admin, job.id, ModerationAction::Approve)?;
    service.moderate_job(&admin, job.id, ModerationAction::Approve)?;
    println!("- {} approved the posting twice; the employer is notified once", admin.username);
    print_inbox(&service, &employer)?;

    println!("\nApplications");
    let drifter = service.register_user("drifter", false)?;
    service.update_profile(
        &drifter,
        &StudentProfileForm {
            student_name: "Drifter".to_string(),
            ..StudentProfileForm::default()
        },
    )?;
    report_apply(&service, &drifter, job.id)?;

    let mut applicants = Vec::new();
    for index in 1..=students {
        let username = format!("student-{index}");
        let student = service.register_user(&username, false)?;
        service.update_profile(&student, &demo_profile(&username))?;
        report_apply(&service, &student, job.id)?;
        applicants.push(student);
    }
    if let Some(first) = applicants.first() {
        report_apply(&service, first, job.id)?;
    }

    let overview = service.applications_overview(&employer)?;
    if let Some(pending) = overview.pending_applications.first() {
        let outcome = service.decide_application(&employer, pending.id, ApplicationDecision::Accept)?;
        println!("- {}", outcome.message);
    }
    for student in &applicants {
        print_inbox(&service, student)?;
    }

    let overview = service.applications_overview(&employer)?;
    println!(
        "\nOverview: {} pending | {} accepted | {} rejected",
        overview.pending_applications.len(),
        overview.accepted_applications.len(),
        overview.rejected_applications.len()
    );

    if json {
        let summary = DemoSummary {
            generated_at: Utc::now(),
            capacity_basis: policy.capacity_basis,
            applications: &overview,
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("  Summary payload unavailable: {err}"),
        }
    }

    Ok(())
}

fn report_apply(
    service: &JobBoardService<InMemoryStore>,
    student: &User,
    job: connxt::workflows::board::JobId,
) -> Result<(), AppError> {
    let essay = ApplicationForm {
        essay_answer: format!("{} would love to help out.", student.username),
    };
    match service.apply(student, job, &essay) {
        Ok(application) => println!(
            "- {} applied (application {})",
            student.username, application.id
        ),
        Err(BoardError::Refused(refusal)) => println!("- {} refused: {refusal}", student.username),
        Err(other) => return Err(other.into()),
    }
    Ok(())
}

fn print_inbox(service: &JobBoardService<InMemoryStore>, user: &User) -> Result<(), AppError> {
    let notifications = service.inbox(user)?;
    println!("  Inbox of {} ({} messages)", user.username, notifications.len());
    for notification in notifications {
        println!(
            "    [{}] {}",
            notification.created_at.format("%H:%M:%S"),
            notification.message
        );
    }
    Ok(())
}

fn demo_job(capacity: i32) -> JobPostingForm {
    JobPostingForm {
        job_title: "Lab Assistant".to_string(),
        job_hours: "10".to_string(),
        job_skills: "Attention to detail".to_string(),
        job_description: "Prepare samples and keep the bench tidy.".to_string(),
        company: "Acme Labs".to_string(),
        job_questions: "Why are you interested in lab work?".to_string(),
        job_capacity: capacity.to_string(),
    }
}

fn demo_profile(username: &str) -> StudentProfileForm {
    StudentProfileForm {
        student_name: username.to_string(),
        student_grade: "11".to_string(),
        student_email: format!("{username}@example.edu"),
        student_skills: "Chemistry, spreadsheets".to_string(),
        student_experience: "Science fair finalist".to_string(),
        student_info: String::new(),
        student_resume: format!("https://example.edu/{username}.pdf"),
    }
}

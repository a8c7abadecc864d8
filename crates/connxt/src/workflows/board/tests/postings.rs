use super::common::*;
use crate::workflows::board::domain::{JobId, ModerationAction};
use crate::workflows::board::forms::JobPostingForm;
use crate::workflows::board::repository::{JobRepository, UserRepository};
use crate::workflows::board::views::ModerationOutcome;
use crate::workflows::board::BoardError;

#[test]
fn posting_a_job_notifies_admins_and_the_employer() {
    let (service, _, cast) = build_service();
    let second_admin = service.register_user("root", true).expect("second admin");

    let job = service
        .post_job(&cast.employer, &job_form("Lab Assistant", 2))
        .expect("job posts");

    assert!(!job.is_approved);
    assert_eq!(job.owner, cast.employer.id);
    let review = "A new job 'Lab Assistant' has been posted by acme and awaits approval.";
    assert_eq!(messages_for(&service, &cast.admin), vec![review]);
    assert_eq!(messages_for(&service, &second_admin), vec![review]);
    assert_eq!(
        messages_for(&service, &cast.employer),
        vec!["Your job 'Lab Assistant' has been posted and is awaiting admin approval."]
    );
    assert!(messages_for(&service, &cast.student).is_empty());
}

#[test]
fn invalid_job_form_persists_nothing() {
    let (service, store, cast) = build_service();
    let form = JobPostingForm {
        job_capacity: "a few".to_string(),
        job_title: String::new(),
        ..job_form("Lab Assistant", 2)
    };

    match service.post_job(&cast.employer, &form) {
        Err(BoardError::Invalid(errors)) => {
            assert!(errors.field("job_capacity").is_some());
            assert!(errors.field("job_title").is_some());
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(store.jobs_by_owner(cast.employer.id).expect("list").is_empty());
    assert!(messages_for(&service, &cast.admin).is_empty());
}

#[test]
fn unapproved_jobs_stay_off_the_board() {
    let (service, _, cast) = build_service();
    let pending = service
        .post_job(&cast.employer, &job_form("Pending Role", 1))
        .expect("posts");
    let live = approved_job(&service, &cast, 1);

    let board = service.job_board(&cast.student).expect("board");

    assert!(board.listing(live.id).is_some());
    assert!(board.listing(pending.id).is_none());
    assert_eq!(
        service.moderation_queue(&cast.admin).expect("queue"),
        vec![pending]
    );
}

#[test]
fn approving_twice_notifies_the_employer_once() {
    let (service, _, cast) = build_service();
    let job = service
        .post_job(&cast.employer, &job_form("Lab Assistant", 1))
        .expect("posts");

    let first = service
        .moderate_job(&cast.admin, job.id, ModerationAction::Approve)
        .expect("approves");
    let second = service
        .moderate_job(&cast.admin, job.id, ModerationAction::Approve)
        .expect("re-approval is harmless");

    assert!(matches!(first, ModerationOutcome::Approved { notified: true, .. }));
    assert!(matches!(second, ModerationOutcome::Approved { notified: false, .. }));
    let approvals = messages_for(&service, &cast.employer)
        .into_iter()
        .filter(|message| message == "Your job 'Lab Assistant' has been approved and is now live.")
        .count();
    assert_eq!(approvals, 1);
}

#[test]
fn same_title_jobs_each_get_their_approval_notice() {
    let (service, _, cast) = build_service();
    let first = service
        .post_job(&cast.employer, &job_form("Intern", 1))
        .expect("first posting");
    let second = service
        .post_job(&cast.employer, &job_form("Intern", 1))
        .expect("second posting");

    for job in [&first, &second] {
        let outcome = service
            .moderate_job(&cast.admin, job.id, ModerationAction::Approve)
            .expect("approves");
        assert!(matches!(outcome, ModerationOutcome::Approved { notified: true, .. }));
    }

    let approved_jobs: Vec<JobId> = service
        .inbox(&cast.employer)
        .expect("inbox")
        .into_iter()
        .filter(|notification| {
            notification.message == "Your job 'Intern' has been approved and is now live."
        })
        .map(|notification| notification.job_id)
        .collect();
    assert_eq!(approved_jobs.len(), 2);
    assert!(approved_jobs.contains(&first.id));
    assert!(approved_jobs.contains(&second.id));
}

#[test]
fn bootstrap_promotes_an_existing_account() {
    let (service, store, cast) = build_service();
    let boss = service.register_user("boss", false).expect("plain account");
    let pending = service
        .post_job(&cast.employer, &job_form("Lab Assistant", 1))
        .expect("posts");

    let promoted = service.ensure_superuser(" boss ").expect("bootstrap");

    assert_eq!(promoted.id, boss.id);
    assert!(promoted.is_superuser);
    assert!(store.user(boss.id).expect("lookup").is_some_and(|user| user.is_superuser));
    assert_eq!(
        service.moderation_queue(&promoted).expect("queue"),
        vec![pending]
    );
    assert_eq!(service.ensure_superuser("boss").expect("idempotent"), promoted);
}

#[test]
fn rejecting_deletes_the_job_and_notifies_the_employer() {
    let (service, store, cast) = build_service();
    let job = service
        .post_job(&cast.employer, &job_form("Night Shift", 1))
        .expect("posts");

    let outcome = service
        .moderate_job(&cast.admin, job.id, ModerationAction::Reject)
        .expect("rejects");

    assert!(matches!(outcome, ModerationOutcome::Rejected { notified: true, .. }));
    assert!(store.job(job.id).expect("lookup").is_none());
    assert_eq!(
        messages_for(&service, &cast.employer)[0],
        "Your job 'Night Shift' has been rejected by the admin."
    );
}

#[test]
fn approved_jobs_cannot_be_rejected() {
    let (service, store, cast) = build_service();
    let job = approved_job(&service, &cast, 1);

    match service.moderate_job(&cast.admin, job.id, ModerationAction::Reject) {
        Err(BoardError::AlreadyApproved(id)) => assert_eq!(id, job.id),
        other => panic!("expected already approved, got {other:?}"),
    }
    assert!(store.job(job.id).expect("lookup").is_some());
}

#[test]
fn only_superusers_moderate() {
    let (service, _, cast) = build_service();
    let job = service
        .post_job(&cast.employer, &job_form("Lab Assistant", 1))
        .expect("posts");

    assert!(matches!(
        service.moderation_queue(&cast.employer),
        Err(BoardError::Forbidden { .. })
    ));
    assert!(matches!(
        service.moderate_job(&cast.employer, job.id, ModerationAction::Approve),
        Err(BoardError::Forbidden { .. })
    ));
    assert!(matches!(
        service.moderate_job(&cast.admin, JobId(404), ModerationAction::Approve),
        Err(BoardError::NotFound { entity: "job", .. })
    ));
}

#[test]
fn only_the_owner_edits_or_deletes() {
    let (service, store, cast) = build_service();
    let job = approved_job(&service, &cast, 2);

    match service.edit_job(&cast.student, job.id, &job_form("Hijacked", 9)) {
        Err(err @ BoardError::Forbidden { .. }) => {
            assert_eq!(err.to_string(), "You are not allowed to edit this job.");
        }
        other => panic!("expected forbidden, got {other:?}"),
    }
    match service.delete_job(&cast.student, job.id) {
        Err(err @ BoardError::Forbidden { .. }) => {
            assert_eq!(err.to_string(), "You are not allowed to delete this job.");
        }
        other => panic!("expected forbidden, got {other:?}"),
    }

    let edited = service
        .edit_job(&cast.employer, job.id, &job_form("Senior Lab Assistant", 3))
        .expect("owner edits");
    assert_eq!(edited.job_title, "Senior Lab Assistant");
    assert_eq!(edited.job_capacity, 3);
    assert!(edited.is_approved, "editing keeps the approval state");

    service.delete_job(&cast.employer, job.id).expect("owner deletes");
    assert!(store.job(job.id).expect("lookup").is_none());
    assert!(service
        .jobs_posted_by(&cast.employer)
        .expect("list")
        .is_empty());
}

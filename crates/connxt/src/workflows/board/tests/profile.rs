use super::common::*;
use crate::workflows::board::forms::StudentProfileForm;
use crate::workflows::board::repository::StudentRepository;
use crate::workflows::board::BoardError;

#[test]
fn profile_is_created_lazily_and_only_once() {
    let (service, store, cast) = build_service();
    assert!(store
        .student_for_user(cast.student.id)
        .expect("lookup")
        .is_none());

    let first = service.profile(&cast.student).expect("created");
    let second = service.profile(&cast.student).expect("fetched");

    assert_eq!(first.id, second.id);
    assert!(!first.profile_complete);
}

#[test]
fn complete_profile_is_marked_complete() {
    let (service, _, cast) = build_service();

    let saved = service
        .update_profile(&cast.student, &complete_profile_form("Ada Lovelace"))
        .expect("profile saves");

    assert!(saved.profile_complete);
    assert_eq!(saved.student_grade, 11);
    assert_eq!(saved.student_email, "ada.lovelace@example.edu");
}

#[test]
fn profile_missing_email_is_saved_incomplete() {
    let (service, store, cast) = build_service();
    let form = StudentProfileForm {
        student_email: String::new(),
        ..complete_profile_form("Ada Lovelace")
    };

    let saved = service
        .update_profile(&cast.student, &form)
        .expect("incomplete profiles still save");

    assert!(!saved.profile_complete);
    let stored = store
        .student_for_user(cast.student.id)
        .expect("lookup")
        .expect("profile present");
    assert_eq!(stored.student_name, "Ada Lovelace");
    assert!(!stored.profile_complete);
}

#[test]
fn clearing_a_field_revokes_completeness() {
    let (service, _, cast) = build_service();
    service
        .update_profile(&cast.student, &complete_profile_form("Ada Lovelace"))
        .expect("complete");

    let form = StudentProfileForm {
        student_grade: String::new(),
        ..complete_profile_form("Ada Lovelace")
    };
    let saved = service.update_profile(&cast.student, &form).expect("saves");

    assert!(!saved.profile_complete);
}

#[test]
fn invalid_profile_leaves_stored_values_untouched() {
    let (service, store, cast) = build_service();
    service
        .update_profile(&cast.student, &complete_profile_form("Ada Lovelace"))
        .expect("complete");

    let form = StudentProfileForm {
        student_name: "Someone Else".to_string(),
        student_grade: "senior".to_string(),
        ..complete_profile_form("Ada Lovelace")
    };
    match service.update_profile(&cast.student, &form) {
        Err(BoardError::Invalid(errors)) => {
            assert!(errors.field("student_grade").is_some());
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let stored = store
        .student_for_user(cast.student.id)
        .expect("lookup")
        .expect("profile present");
    assert_eq!(stored.student_name, "Ada Lovelace");
    assert!(stored.profile_complete);
}

//! Form payloads as they arrive from the browser and the validation that turns them into
//! typed field sets. Every value is received as a string so that a malformed number becomes a
//! field error rather than a rejected request.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail, ValidationError};

use super::domain::{JobPosting, StudentInfo};

pub const INVALID_FORM: &str = "Form is invalid. Please correct the errors below.";
pub const UNANSWERED_ESSAY: &str = "Please answer the question.";

const REQUIRED: &str = "This field is required.";
const WHOLE_NUMBER: &str = "Enter a whole number.";
const EMAIL: &str = "Enter a valid email address.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Field-level failures collected while cleaning a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.errors.iter().map(|error| error.field.as_str()).collect();
        write!(f, "invalid form fields: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn field(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|error| error.field == field)
    }

    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Trims raw values and parses numbers; length and format rules are declared on the cleaned
/// field sets and checked through `validator`.
struct Cleaner {
    errors: ValidationErrors,
}

impl Cleaner {
    fn new() -> Self {
        Self {
            errors: ValidationErrors::default(),
        }
    }

    fn text(&mut self, field: &'static str, raw: &str, required: bool) -> String {
        let value = raw.trim();
        if required && value.is_empty() {
            self.errors.push(field, REQUIRED);
        }
        value.to_string()
    }

    fn integer(&mut self, field: &'static str, raw: &str, required: bool) -> i32 {
        let value = raw.trim();
        if value.is_empty() {
            if required {
                self.errors.push(field, REQUIRED);
            }
            return 0;
        }
        match value.parse::<i32>() {
            Ok(number) => number,
            Err(_) => {
                self.errors.push(field, WHOLE_NUMBER);
                0
            }
        }
    }

    fn finish<T: Validate>(mut self, fields: T) -> Result<T, ValidationErrors> {
        if let Err(failures) = fields.validate() {
            let mut failures: Vec<_> = failures.field_errors().into_iter().collect();
            failures.sort_by(|a, b| a.0.cmp(&b.0));
            for (field, errors) in failures {
                for error in errors {
                    self.errors.push(field.to_string(), describe(error));
                }
            }
        }
        self.errors.into_result(fields)
    }
}

fn describe(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    match (&*error.code, error.params.get("max")) {
        ("length", Some(max)) => format!("Ensure this value has at most {max} characters."),
        (code, _) => format!("Invalid value ({code})."),
    }
}

/// Blank is allowed; anything else must be an address.
fn email_or_blank(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.validate_email() {
        return Ok(());
    }
    let mut error = ValidationError::new("email");
    error.message = Some(Cow::Borrowed(EMAIL));
    Err(error)
}

/// Raw profile form. Every field may be left blank; blanks only make the profile incomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentProfileForm {
    pub student_name: String,
    pub student_grade: String,
    pub student_email: String,
    pub student_skills: String,
    pub student_experience: String,
    pub student_info: String,
    pub student_resume: String,
}

impl From<&StudentInfo> for StudentProfileForm {
    fn from(info: &StudentInfo) -> Self {
        Self {
            student_name: info.student_name.clone(),
            student_grade: info.student_grade.to_string(),
            student_email: info.student_email.clone(),
            student_skills: info.student_skills.clone(),
            student_experience: info.student_experience.clone(),
            student_info: info.student_info.clone(),
            student_resume: info.student_resume.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct ProfileFields {
    #[validate(length(max = 100))]
    pub student_name: String,
    pub student_grade: i32,
    #[validate(length(max = 100), custom(function = "email_or_blank"))]
    pub student_email: String,
    #[validate(length(max = 200))]
    pub student_skills: String,
    #[validate(length(max = 200))]
    pub student_experience: String,
    #[validate(length(max = 200))]
    pub student_info: String,
    #[validate(length(max = 200))]
    pub student_resume: String,
}

impl ProfileFields {
    /// Copy the cleaned values onto a stored profile and recompute its completeness.
    pub fn apply_to(self, info: &mut StudentInfo) {
        info.student_name = self.student_name;
        info.student_grade = self.student_grade;
        info.student_email = self.student_email;
        info.student_skills = self.student_skills;
        info.student_experience = self.student_experience;
        info.student_info = self.student_info;
        info.student_resume = self.student_resume;
        info.profile_complete = info.is_complete();
    }
}

pub fn validate_profile(form: &StudentProfileForm) -> Result<ProfileFields, ValidationErrors> {
    let mut clean = Cleaner::new();
    let fields = ProfileFields {
        student_name: clean.text("student_name", &form.student_name, false),
        student_grade: clean.integer("student_grade", &form.student_grade, false),
        student_email: clean.text("student_email", &form.student_email, false),
        student_skills: clean.text("student_skills", &form.student_skills, false),
        student_experience: clean.text("student_experience", &form.student_experience, false),
        student_info: clean.text("student_info", &form.student_info, false),
        student_resume: clean.text("student_resume", &form.student_resume, false),
    };
    clean.finish(fields)
}

/// Raw job posting form shared by the create and edit pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobPostingForm {
    pub job_title: String,
    pub job_hours: String,
    pub job_skills: String,
    pub job_description: String,
    pub company: String,
    pub job_questions: String,
    pub job_capacity: String,
}

impl From<&JobPosting> for JobPostingForm {
    fn from(job: &JobPosting) -> Self {
        Self {
            job_title: job.job_title.clone(),
            job_hours: job.job_hours.to_string(),
            job_skills: job.job_skills.clone(),
            job_description: job.job_description.clone(),
            company: job.company.clone(),
            job_questions: job.job_questions.clone(),
            job_capacity: job.job_capacity.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct JobFields {
    #[validate(length(max = 100))]
    pub job_title: String,
    pub job_hours: i32,
    #[validate(length(max = 200))]
    pub job_skills: String,
    pub job_description: String,
    #[validate(length(max = 100))]
    pub company: String,
    pub job_questions: String,
    pub job_capacity: i32,
}

impl JobFields {
    pub fn apply_to(self, job: &mut JobPosting) {
        job.job_title = self.job_title;
        job.job_hours = self.job_hours;
        job.job_skills = self.job_skills;
        job.job_description = self.job_description;
        job.company = self.company;
        job.job_questions = self.job_questions;
        job.job_capacity = self.job_capacity;
    }
}

pub fn validate_job(form: &JobPostingForm) -> Result<JobFields, ValidationErrors> {
    let mut clean = Cleaner::new();
    let fields = JobFields {
        job_title: clean.text("job_title", &form.job_title, true),
        job_hours: clean.integer("job_hours", &form.job_hours, true),
        job_skills: clean.text("job_skills", &form.job_skills, true),
        job_description: clean.text("job_description", &form.job_description, true),
        company: clean.text("company", &form.company, true),
        job_questions: clean.text("job_questions", &form.job_questions, true),
        job_capacity: clean.integer("job_capacity", &form.job_capacity, true),
    };
    clean.finish(fields)
}

/// Essay answer submitted alongside an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationForm {
    pub essay_answer: String,
}

pub fn validate_application(form: &ApplicationForm) -> Result<String, ValidationErrors> {
    let mut clean = Cleaner::new();
    let answer = form.essay_answer.trim();
    if answer.is_empty() {
        clean.errors.push("essay_answer", UNANSWERED_ESSAY);
    }
    clean.errors.into_result(answer.to_string())
}

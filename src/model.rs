use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email pattern")
});

pub const MOBILE_MIN_DIGITS: usize = 7;
pub const MOBILE_MAX_DIGITS: usize = 15;
pub const PASSWORD_MIN_CHARS: usize = 6;

/// Canonical lookup key for students and complaint ownership.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    InProgress,
    Resolved,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::InProgress, Status::Resolved];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "In Progress",
            Status::Resolved => "Resolved",
        }
    }

    /// Exact match on the persisted literal after trimming. Case matters.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Pending" => Some(Status::Pending),
            "In Progress" => Some(Status::InProgress),
            "Resolved" => Some(Status::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Academic,
    Facility,
    Admin,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Academic,
        Category::Facility,
        Category::Admin,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Academic => "Academic",
            Category::Facility => "Facility",
            Category::Admin => "Admin",
            Category::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Academic" => Some(Category::Academic),
            "Facility" => Some(Category::Facility),
            "Admin" => Some(Category::Admin),
            "Other" => Some(Category::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePicture {
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Student {
    pub name: String,
    pub student_id: String,
    pub department: String,
    pub mobile: String,
    pub email: String,
    pub password: String,
    pub picture: Option<ProfilePicture>,
}

/// A complaint row. `status` and `category` hold the persisted literals so
/// that rows written by older tools still load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Complaint {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: String,
    pub student_email: String,
    pub feedback: Option<String>,
    pub feedback_updated_at: Option<String>,
    pub created_at: Option<String>,
}

impl Complaint {
    pub fn new(title: &str, description: &str, category: Category, student_email: &str) -> Self {
        Self {
            id: 0,
            title: title.to_string(),
            description: description.to_string(),
            category: category.as_str().to_string(),
            status: Status::Pending.as_str().to_string(),
            student_email: student_email.to_string(),
            feedback: None,
            feedback_updated_at: None,
            created_at: None,
        }
    }
}

/// Sign-up form as typed by the user, before trimming.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub student_id: String,
    pub department: String,
    pub mobile: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Registration {
    pub fn into_student(self, picture: Option<ProfilePicture>) -> Student {
        Student {
            name: self.name.trim().to_string(),
            student_id: self.student_id.trim().to_string(),
            department: self.department.trim().to_string(),
            mobile: self.mobile.trim().to_string(),
            email: normalize_email(&self.email),
            password: self.password,
            picture,
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Shared by sign-up and profile edits. Checked after trimming.
pub fn mobile_issues(mobile: &str) -> Vec<String> {
    let mobile = mobile.trim();
    if mobile.is_empty() {
        return vec!["Mobile Number is required.".to_string()];
    }
    let mut issues = Vec::new();
    if !mobile.chars().all(|c| c.is_ascii_digit()) {
        issues.push("Mobile Number must contain digits only.".to_string());
    }
    if !(MOBILE_MIN_DIGITS..=MOBILE_MAX_DIGITS).contains(&mobile.len()) {
        issues.push("Mobile Number must be 7 to 15 digits long.".to_string());
    }
    issues
}

/// Field-level sign-up checks. Uniqueness checks need the directory and are
/// appended by the session.
pub fn registration_issues(reg: &Registration) -> Vec<String> {
    let mut issues = Vec::new();

    if reg.name.trim().is_empty() {
        issues.push("Full Name is required.".to_string());
    }
    if reg.student_id.trim().is_empty() {
        issues.push("Student ID is required.".to_string());
    }
    if reg.department.trim().is_empty() {
        issues.push("Department is required.".to_string());
    }

    issues.extend(mobile_issues(&reg.mobile));

    let email = reg.email.trim();
    if email.is_empty() {
        issues.push("Email Address is required.".to_string());
    } else if !is_valid_email(email) {
        issues.push("Email Address format is invalid.".to_string());
    }

    if reg.password.is_empty() {
        issues.push("Password is required.".to_string());
    } else if reg.password.chars().count() < PASSWORD_MIN_CHARS {
        issues.push("Password must be at least 6 characters long.".to_string());
    }
    if reg.password != reg.confirm_password {
        issues.push("Passwords do not match.".to_string());
    }

    issues
}

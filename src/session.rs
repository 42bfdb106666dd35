//! Signed-in principal and selected complaint, plus the permission checks
//! in front of the directory and the store. Store failures are logged here
//! and leave as plain sentinels.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::complaints::{self, CountsSummary};
use crate::db::Db;
use crate::error::StoreResult;
use crate::image;
use crate::model::{
    mobile_issues, normalize_email, registration_issues, Category, Complaint, Registration, Student,
};
use crate::students;

pub const ADMIN_EMAIL: &str = "admin@portal.com";
// Plaintext comparison kept for compatibility with existing stores.
// TODO: switch both credential checks to salted hashes before any shared deployment.
pub const ADMIN_PASSWORD: &str = "admin123";

pub const EMAIL_TAKEN: &str = "Email already exists. Use a different email.";
pub const STUDENT_ID_TAKEN: &str = "Student ID already exists. Use a different ID.";
pub const REGISTER_FAILED: &str = "We couldn't create your account. Please try again.";
pub const PROFILE_UPDATE_FAILED: &str = "We couldn't update your profile. Please try again.";
pub const STUDENT_SESSION_REQUIRED: &str = "Sign in as a student to edit your profile.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Admin,
    Student(Student),
}

impl Principal {
    pub fn role(&self) -> &'static str {
        match self {
            Principal::Admin => "admin",
            Principal::Student(_) => "student",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StudentCounts {
    pub total: i64,
    pub resolved: i64,
}

/// Complaint editor fields. Values are trimmed before they are stored.
#[derive(Debug, Clone, Default)]
pub struct ComplaintForm {
    pub title: String,
    pub description: String,
    pub category: String,
}

impl ComplaintForm {
    fn parse(&self) -> Option<(String, String, Category)> {
        let title = self.title.trim();
        let description = self.description.trim();
        if title.is_empty() || description.is_empty() {
            return None;
        }
        let category = Category::parse(&self.category)?;
        Some((title.to_string(), description.to_string(), category))
    }
}

/// Editable profile fields. Email and password are not part of it.
#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub name: String,
    pub student_id: String,
    pub department: String,
    pub mobile: String,
}

fn settle<T: Default>(op: &'static str, res: StoreResult<T>) -> T {
    match res {
        Ok(v) => v,
        Err(e) => {
            warn!(op, error = %e, "store operation failed");
            T::default()
        }
    }
}

fn deny<T: Default>(op: &'static str) -> T {
    info!(op, "not permitted for the current session");
    T::default()
}

#[derive(Debug, Default)]
pub struct Session {
    principal: Option<Principal>,
    current_complaint: Option<Complaint>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn current_student(&self) -> Option<&Student> {
        match &self.principal {
            Some(Principal::Student(s)) => Some(s),
            _ => None,
        }
    }

    pub fn current_complaint(&self) -> Option<&Complaint> {
        self.current_complaint.as_ref()
    }

    fn is_admin(&self) -> bool {
        matches!(self.principal, Some(Principal::Admin))
    }

    fn may_touch(&self, complaint: &Complaint) -> bool {
        match &self.principal {
            Some(Principal::Admin) => true,
            Some(Principal::Student(s)) => normalize_email(&complaint.student_email) == s.email,
            None => false,
        }
    }

    /// A new attempt always ends the previous session first, so a failed
    /// login leaves nobody signed in.
    pub fn login(&mut self, db: &Db, email: &str, password: &str) -> Option<&Principal> {
        self.logout();

        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            debug!("login with empty credentials");
            return None;
        }

        if email == ADMIN_EMAIL && password == ADMIN_PASSWORD {
            info!("administrator signed in");
            self.principal = Some(Principal::Admin);
            return self.principal.as_ref();
        }

        let student = settle("students.find_by_email", students::find_by_email(db, &email))?;
        if student.password != password {
            info!(%email, "login rejected");
            return None;
        }
        info!(%email, "student signed in");
        self.principal = Some(Principal::Student(student));
        self.principal.as_ref()
    }

    pub fn logout(&mut self) {
        self.principal = None;
        self.current_complaint = None;
    }

    /// Collects every reason the form is unacceptable; inserts only when
    /// there are none. Does not sign the new student in.
    pub fn register_student(
        &self,
        db: &Db,
        reg: Registration,
        picture_path: Option<&Path>,
    ) -> Result<(), Vec<String>> {
        let mut issues = registration_issues(&reg);

        let picture = match picture_path.map(image::load_profile_picture) {
            None => None,
            Some(Ok(p)) => Some(p),
            Some(Err(e)) => {
                issues.push(e.to_string());
                None
            }
        };

        let email = normalize_email(&reg.email);
        if !email.is_empty() {
            match students::email_exists(db, &email) {
                Ok(true) => issues.push(EMAIL_TAKEN.to_string()),
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "email existence check failed");
                    return Err(vec![REGISTER_FAILED.to_string()]);
                }
            }
        }
        let student_id = reg.student_id.trim();
        if !student_id.is_empty() {
            match students::student_id_exists(db, student_id) {
                Ok(true) => issues.push(STUDENT_ID_TAKEN.to_string()),
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "student id existence check failed");
                    return Err(vec![REGISTER_FAILED.to_string()]);
                }
            }
        }

        if !issues.is_empty() {
            info!(count = issues.len(), "registration rejected");
            return Err(issues);
        }

        let student = reg.into_student(picture);
        match students::insert(db, &student) {
            Ok(()) => {
                info!(email = %student.email, "student registered");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "student insert failed");
                Err(vec![REGISTER_FAILED.to_string()])
            }
        }
    }

    /// Edits the signed-in student's own record and refreshes it in the
    /// session. A picture that fails to store does not fail the edit.
    pub fn update_student(
        &mut self,
        db: &Db,
        edit: ProfileEdit,
        picture_path: Option<&Path>,
    ) -> Result<(), Vec<String>> {
        let Some(current) = self.current_student().cloned() else {
            info!("profile update without a student session");
            return Err(vec![STUDENT_SESSION_REQUIRED.to_string()]);
        };

        let mut issues = Vec::new();
        let name = edit.name.trim();
        let student_id = edit.student_id.trim();
        let department = edit.department.trim();
        if name.is_empty() {
            issues.push("Full Name is required.".to_string());
        }
        if student_id.is_empty() {
            issues.push("Student ID is required.".to_string());
        }
        if department.is_empty() {
            issues.push("Department is required.".to_string());
        }
        issues.extend(mobile_issues(&edit.mobile));

        let picture = match picture_path.map(image::load_profile_picture) {
            None => None,
            Some(Ok(p)) => Some(p),
            Some(Err(e)) => {
                issues.push(e.to_string());
                None
            }
        };

        if !student_id.is_empty() && student_id != current.student_id {
            match students::student_id_exists(db, student_id) {
                Ok(true) => issues.push(STUDENT_ID_TAKEN.to_string()),
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "student id existence check failed");
                    return Err(vec![PROFILE_UPDATE_FAILED.to_string()]);
                }
            }
        }

        if !issues.is_empty() {
            return Err(issues);
        }

        let updated = Student {
            name: name.to_string(),
            student_id: student_id.to_string(),
            department: department.to_string(),
            mobile: edit.mobile.trim().to_string(),
            picture,
            ..current
        };
        if !settle("students.update", students::update(db, &updated)) {
            return Err(vec![PROFILE_UPDATE_FAILED.to_string()]);
        }

        if let Some(fresh) = settle(
            "students.find_by_email",
            students::find_by_email(db, &updated.email),
        ) {
            self.principal = Some(Principal::Student(fresh));
        }
        Ok(())
    }

    pub fn student_count(&self, db: &Db) -> i64 {
        if !self.is_admin() {
            return deny("students.count");
        }
        settle("students.count_all", students::count_all(db))
    }

    /// Files a complaint for the signed-in student. Returns the new id.
    pub fn submit_complaint(&self, db: &Db, form: &ComplaintForm) -> Option<i64> {
        let Some(student) = self.current_student() else {
            return deny("complaints.submit");
        };
        let Some((title, description, category)) = form.parse() else {
            debug!("complaint form incomplete");
            return None;
        };
        let mut complaint = Complaint::new(&title, &description, category, &student.email);
        settle("complaints.insert", complaints::insert(db, &mut complaint).map(Some))
    }

    /// Edits title, description and category. With no id the complaint
    /// selected in the session is edited. The stored status is kept.
    pub fn update_complaint(&mut self, db: &Db, id: Option<i64>, form: &ComplaintForm) -> bool {
        let Some(id) = id.or_else(|| self.current_complaint.as_ref().map(|c| c.id)) else {
            debug!("no complaint selected for update");
            return false;
        };
        let Some(mut complaint) = settle("complaints.find_by_id", complaints::find_by_id(db, id))
        else {
            return false;
        };
        if !self.may_touch(&complaint) {
            return deny("complaints.update");
        }
        let Some((title, description, category)) = form.parse() else {
            debug!(id, "complaint form incomplete");
            return false;
        };
        complaint.title = title;
        complaint.description = description;
        complaint.category = category.as_str().to_string();

        let updated = settle("complaints.update", complaints::update(db, &complaint));
        if updated {
            self.refresh_selected(db, id);
        }
        updated
    }

    pub fn delete_complaint(&mut self, db: &Db, id: i64) -> bool {
        let Some(complaint) = settle("complaints.find_by_id", complaints::find_by_id(db, id))
        else {
            return false;
        };
        if !self.may_touch(&complaint) {
            return deny("complaints.delete");
        }
        let deleted = settle("complaints.delete", complaints::delete(db, id));
        if deleted && self.current_complaint.as_ref().map(|c| c.id) == Some(id) {
            self.current_complaint = None;
        }
        deleted
    }

    pub fn get_complaint(&self, db: &Db, id: i64) -> Option<Complaint> {
        let complaint = settle("complaints.find_by_id", complaints::find_by_id(db, id))?;
        if !self.may_touch(&complaint) {
            return deny("complaints.get");
        }
        Some(complaint)
    }

    pub fn select_complaint(&mut self, db: &Db, id: i64) -> Option<&Complaint> {
        self.current_complaint = self.get_complaint(db, id);
        self.current_complaint.as_ref()
    }

    pub fn clear_selected_complaint(&mut self) {
        self.current_complaint = None;
    }

    fn refresh_selected(&mut self, db: &Db, id: i64) {
        if self.current_complaint.as_ref().map(|c| c.id) == Some(id) {
            self.current_complaint = settle("complaints.find_by_id", complaints::find_by_id(db, id));
        }
    }

    pub fn list_my_complaints(&self, db: &Db) -> Vec<Complaint> {
        let Some(student) = self.current_student() else {
            return deny("complaints.list_mine");
        };
        settle(
            "complaints.find_by_student_email",
            complaints::find_by_student_email(db, &student.email),
        )
    }

    pub fn list_all_complaints(&self, db: &Db) -> Vec<Complaint> {
        if !self.is_admin() {
            return deny("complaints.list_all");
        }
        settle("complaints.find_all", complaints::find_all(db))
    }

    /// `"All"` lists everything; any other value filters on the literal.
    pub fn list_complaints_by_status(&self, db: &Db, status: &str) -> Vec<Complaint> {
        if !self.is_admin() {
            return deny("complaints.list_by_status");
        }
        if status.trim() == "All" {
            return settle("complaints.find_all", complaints::find_all(db));
        }
        settle(
            "complaints.find_by_status",
            complaints::find_by_status(db, status),
        )
    }

    pub fn set_complaint_status(&mut self, db: &Db, id: i64, status: &str) -> bool {
        if !self.is_admin() {
            return deny("complaints.set_status");
        }
        let updated = settle("complaints.set_status", complaints::set_status(db, id, status));
        if updated {
            self.refresh_selected(db, id);
        }
        updated
    }

    pub fn set_complaint_feedback(&mut self, db: &Db, id: i64, feedback: Option<&str>) -> bool {
        if !self.is_admin() {
            return deny("complaints.set_feedback");
        }
        let updated = settle(
            "complaints.set_feedback",
            complaints::set_feedback(db, id, feedback),
        );
        if updated {
            self.refresh_selected(db, id);
        }
        updated
    }

    pub fn complaint_counts(&self, db: &Db) -> CountsSummary {
        if !self.is_admin() {
            return deny("complaints.counts");
        }
        settle("complaints.counts_summary", complaints::counts_summary(db))
    }

    /// Dashboard figures for the signed-in student.
    pub fn my_counts(&self, db: &Db) -> StudentCounts {
        let Some(student) = self.current_student() else {
            return deny("complaints.my_counts");
        };
        let res = complaints::count_by_student_email(db, &student.email).and_then(|total| {
            Ok(StudentCounts {
                total,
                resolved: complaints::count_resolved_by_student_email(db, &student.email)?,
            })
        });
        settle("complaints.my_counts", res)
    }
}

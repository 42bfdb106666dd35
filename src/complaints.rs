use rusqlite::{params_from_iter, types::Value, OptionalExtension, Row};

use crate::db::{now_ts, Db, SchemaShape};
use crate::error::{StoreError, StoreResult};
use crate::model::{normalize_email, Complaint, Status};

const NEWEST_FIRST: &str = "ORDER BY created_at DESC, id DESC";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountsSummary {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub resolved: i64,
}

fn select_columns(shape: &SchemaShape) -> String {
    format!(
        "id, title, description, category, status, student_email, {}, {}, created_at",
        if shape.feedback { "feedback" } else { "NULL" },
        if shape.feedback_updated_at {
            "feedback_updated_at"
        } else {
            "NULL"
        },
    )
}

impl Complaint {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Complaint {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            category: row.get(3)?,
            status: row.get(4)?,
            student_email: row.get(5)?,
            feedback: row.get(6)?,
            feedback_updated_at: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

fn query_list(db: &Db, filter: &str, binds: Vec<Value>) -> StoreResult<Vec<Complaint>> {
    let sql = format!(
        "SELECT {} FROM complaints {} {}",
        select_columns(&db.shape),
        filter,
        NEWEST_FIRST
    );
    let mut stmt = db.conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(binds), |row| Complaint::from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn count(db: &Db, filter: &str, binds: Vec<Value>) -> StoreResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM complaints {}", filter);
    Ok(db
        .conn
        .query_row(&sql, params_from_iter(binds), |r| r.get(0))?)
}

/// Always stores `Pending`, whatever the caller put in `status`. On success
/// the generated id, normalized email and creation time are written back.
pub fn insert(db: &Db, complaint: &mut Complaint) -> StoreResult<i64> {
    let email = normalize_email(&complaint.student_email);
    let created_at = now_ts();
    db.conn.execute(
        "INSERT INTO complaints(title, description, category, student_email, status, created_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &complaint.title,
            &complaint.description,
            &complaint.category,
            &email,
            Status::Pending.as_str(),
            &created_at,
        ),
    )?;
    let id = db.conn.last_insert_rowid();
    complaint.id = id;
    complaint.status = Status::Pending.as_str().to_string();
    complaint.student_email = email;
    complaint.created_at = Some(created_at);
    Ok(id)
}

pub fn find_by_student_email(db: &Db, email: &str) -> StoreResult<Vec<Complaint>> {
    query_list(
        db,
        "WHERE student_email = ?",
        vec![Value::Text(normalize_email(email))],
    )
}

pub fn find_all(db: &Db) -> StoreResult<Vec<Complaint>> {
    query_list(db, "", Vec::new())
}

/// The filter value is passed through as given.
pub fn find_by_status(db: &Db, status: &str) -> StoreResult<Vec<Complaint>> {
    query_list(db, "WHERE status = ?", vec![Value::Text(status.to_string())])
}

pub fn find_by_id(db: &Db, id: i64) -> StoreResult<Option<Complaint>> {
    let sql = format!(
        "SELECT {} FROM complaints WHERE id = ?",
        select_columns(&db.shape)
    );
    Ok(db
        .conn
        .query_row(&sql, [id], |row| Complaint::from_row(row))
        .optional()?)
}

/// Full overwrite of title, description, category and status. The status is
/// not checked against the domain here; `set_status` is the validated path.
pub fn update(db: &Db, complaint: &Complaint) -> StoreResult<bool> {
    let changed = if db.shape.complaint_updated_at {
        db.conn.execute(
            "UPDATE complaints
                SET title = ?, description = ?, category = ?, status = ?, updated_at = ?
              WHERE id = ?",
            (
                &complaint.title,
                &complaint.description,
                &complaint.category,
                &complaint.status,
                now_ts(),
                complaint.id,
            ),
        )?
    } else {
        db.conn.execute(
            "UPDATE complaints
                SET title = ?, description = ?, category = ?, status = ?
              WHERE id = ?",
            (
                &complaint.title,
                &complaint.description,
                &complaint.category,
                &complaint.status,
                complaint.id,
            ),
        )?
    };
    Ok(changed > 0)
}

pub fn delete(db: &Db, id: i64) -> StoreResult<bool> {
    let changed = db.conn.execute("DELETE FROM complaints WHERE id = ?", [id])?;
    Ok(changed > 0)
}

/// Validated transition. Any state may move to any other; nothing is written
/// when the value is outside the domain.
pub fn set_status(db: &Db, id: i64, status: &str) -> StoreResult<bool> {
    let Some(status) = Status::parse(status) else {
        return Err(StoreError::InvalidStatus(status.to_string()));
    };
    let changed = if db.shape.complaint_updated_at {
        db.conn.execute(
            "UPDATE complaints SET status = ?, updated_at = ? WHERE id = ?",
            (status.as_str(), now_ts(), id),
        )?
    } else {
        db.conn.execute(
            "UPDATE complaints SET status = ? WHERE id = ?",
            (status.as_str(), id),
        )?
    };
    Ok(changed > 0)
}

/// Blank or missing feedback clears the column to NULL.
pub fn set_feedback(db: &Db, id: i64, feedback: Option<&str>) -> StoreResult<bool> {
    if !db.shape.feedback {
        return Err(StoreError::MissingColumn("complaints.feedback"));
    }
    let feedback = feedback.map(str::trim).filter(|s| !s.is_empty());
    let changed = if db.shape.feedback_updated_at {
        db.conn.execute(
            "UPDATE complaints SET feedback = ?, feedback_updated_at = ? WHERE id = ?",
            (feedback, now_ts(), id),
        )?
    } else {
        db.conn.execute(
            "UPDATE complaints SET feedback = ? WHERE id = ?",
            (feedback, id),
        )?
    };
    Ok(changed > 0)
}

pub fn count_all(db: &Db) -> StoreResult<i64> {
    count(db, "", Vec::new())
}

pub fn count_by_status(db: &Db, status: &str) -> StoreResult<i64> {
    count(db, "WHERE status = ?", vec![Value::Text(status.to_string())])
}

pub fn count_by_student_email(db: &Db, email: &str) -> StoreResult<i64> {
    count(
        db,
        "WHERE student_email = ?",
        vec![Value::Text(normalize_email(email))],
    )
}

pub fn count_resolved_by_student_email(db: &Db, email: &str) -> StoreResult<i64> {
    count(
        db,
        "WHERE student_email = ? AND status = ?",
        vec![
            Value::Text(normalize_email(email)),
            Value::Text(Status::Resolved.as_str().to_string()),
        ],
    )
}

pub fn counts_summary(db: &Db) -> StoreResult<CountsSummary> {
    Ok(CountsSummary {
        total: count_all(db)?,
        pending: count_by_status(db, Status::Pending.as_str())?,
        in_progress: count_by_status(db, Status::InProgress.as_str())?,
        resolved: count_by_status(db, Status::Resolved.as_str())?,
    })
}

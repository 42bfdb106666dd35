use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use crate::db::{Db, SchemaShape};
use crate::error::StoreResult;
use crate::model::{normalize_email, ProfilePicture, Student};

/// Select list for a student row. Missing picture columns read as NULL so
/// one decoder serves every shape.
fn select_columns(shape: &SchemaShape) -> String {
    format!(
        "name, student_id, department, mobile, email, password, {}, {}",
        if shape.profile_picture {
            "profile_picture"
        } else {
            "NULL"
        },
        if shape.profile_picture && shape.profile_picture_mime {
            "profile_picture_mime"
        } else {
            "NULL"
        },
    )
}

impl Student {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let bytes: Option<Vec<u8>> = row.get(6)?;
        let mime: Option<String> = row.get(7)?;
        let picture = bytes
            .filter(|b| !b.is_empty())
            .map(|bytes| ProfilePicture { bytes, mime });
        Ok(Student {
            name: row.get(0)?,
            student_id: row.get(1)?,
            department: row.get(2)?,
            mobile: row.get(3)?,
            email: row.get(4)?,
            password: row.get(5)?,
            picture,
        })
    }
}

/// Tries every picture column the store has first and falls back once to
/// the columns every store shape has.
pub fn insert(db: &Db, student: &Student) -> StoreResult<()> {
    let email = normalize_email(&student.email);

    if db.shape.profile_picture {
        match insert_with_picture(db, student, &email) {
            Ok(()) => return Ok(()),
            Err(e) => warn!(error = %e, "student insert failed; retrying with minimal columns"),
        }
    } else {
        debug!("store has no picture columns; inserting minimal student row");
    }

    insert_minimal(&db.conn, student, &email)
}

fn insert_with_picture(db: &Db, student: &Student, email: &str) -> StoreResult<()> {
    let (bytes, mime) = match &student.picture {
        Some(p) => (Some(p.bytes.as_slice()), p.mime.as_deref()),
        None => (None, None),
    };
    if db.shape.profile_picture_mime {
        db.conn.execute(
            "INSERT INTO students
               (name, student_id, department, mobile, email, password, profile_picture, profile_picture_mime)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            (
                &student.name,
                &student.student_id,
                &student.department,
                &student.mobile,
                email,
                &student.password,
                bytes,
                mime,
            ),
        )?;
    } else {
        db.conn.execute(
            "INSERT INTO students
               (name, student_id, department, mobile, email, password, profile_picture)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            (
                &student.name,
                &student.student_id,
                &student.department,
                &student.mobile,
                email,
                &student.password,
                bytes,
            ),
        )?;
    }
    Ok(())
}

fn insert_minimal(conn: &Connection, student: &Student, email: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO students(name, student_id, department, mobile, email, password)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &student.name,
            &student.student_id,
            &student.department,
            &student.mobile,
            email,
            &student.password,
        ),
    )?;
    Ok(())
}

pub fn find_by_email(db: &Db, email: &str) -> StoreResult<Option<Student>> {
    let sql = format!(
        "SELECT {} FROM students WHERE email = ?",
        select_columns(&db.shape)
    );
    let student = db
        .conn
        .query_row(&sql, [normalize_email(email)], |row| Student::from_row(row))
        .optional()?;
    Ok(student)
}

/// Updates the editable fields by email. Email and password never change
/// here. A new picture is written as a second, separate commit whose
/// failure is logged and otherwise ignored.
pub fn update(db: &Db, student: &Student) -> StoreResult<bool> {
    let email = normalize_email(&student.email);
    let changed = db.conn.execute(
        "UPDATE students
            SET name = ?, student_id = ?, department = ?, mobile = ?
          WHERE email = ?",
        (
            &student.name,
            &student.student_id,
            &student.department,
            &student.mobile,
            &email,
        ),
    )?;
    let updated = changed > 0;

    if updated {
        if let Some(picture) = &student.picture {
            match update_picture(db, &email, picture) {
                Ok(true) => {}
                Ok(false) => warn!(%email, "profile picture not stored"),
                Err(e) => warn!(%email, error = %e, "skipping profile picture update"),
            }
        }
    }

    Ok(updated)
}

/// False when no row matched or the store has no picture column.
pub fn update_picture(db: &Db, email: &str, picture: &ProfilePicture) -> StoreResult<bool> {
    if !db.shape.profile_picture {
        debug!("store has no picture column; picture not written");
        return Ok(false);
    }
    let email = normalize_email(email);
    let changed = if db.shape.profile_picture_mime {
        db.conn.execute(
            "UPDATE students SET profile_picture = ?, profile_picture_mime = ? WHERE email = ?",
            (&picture.bytes, &picture.mime, &email),
        )?
    } else {
        db.conn.execute(
            "UPDATE students SET profile_picture = ? WHERE email = ?",
            (&picture.bytes, &email),
        )?
    };
    Ok(changed > 0)
}

pub fn email_exists(db: &Db, email: &str) -> StoreResult<bool> {
    let n: i64 = db.conn.query_row(
        "SELECT COUNT(*) FROM students WHERE email = ?",
        [normalize_email(email)],
        |r| r.get(0),
    )?;
    Ok(n > 0)
}

pub fn student_id_exists(db: &Db, student_id: &str) -> StoreResult<bool> {
    let n: i64 = db.conn.query_row(
        "SELECT COUNT(*) FROM students WHERE student_id = ?",
        [student_id],
        |r| r.get(0),
    )?;
    Ok(n > 0)
}

pub fn count_all(db: &Db) -> StoreResult<i64> {
    Ok(db
        .conn
        .query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?)
}

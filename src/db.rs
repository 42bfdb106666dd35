use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

use crate::model::Status;

pub const DB_FILE_NAME: &str = "complaints.sqlite3";

pub const DEMO_STUDENT_EMAIL: &str = "test@student.com";

/// Columns that older stores may lack. Reads and writes consult the probed
/// shape instead of failing on them.
const OPTIONAL_COLUMNS: &[(&str, &str, &str)] = &[
    ("students", "profile_picture", "BLOB"),
    ("students", "profile_picture_mime", "TEXT"),
    ("complaints", "feedback", "TEXT"),
    ("complaints", "feedback_updated_at", "TEXT"),
    ("complaints", "updated_at", "TEXT"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaShape {
    pub profile_picture: bool,
    pub profile_picture_mime: bool,
    pub feedback: bool,
    pub feedback_updated_at: bool,
    pub complaint_updated_at: bool,
}

impl SchemaShape {
    pub fn full() -> Self {
        Self {
            profile_picture: true,
            profile_picture_mime: true,
            feedback: true,
            feedback_updated_at: true,
            complaint_updated_at: true,
        }
    }

    pub fn is_full(&self) -> bool {
        *self == Self::full()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "profilePicture": self.profile_picture,
            "profilePictureMime": self.profile_picture_mime,
            "feedback": self.feedback,
            "feedbackUpdatedAt": self.feedback_updated_at,
            "updatedAt": self.complaint_updated_at,
        })
    }
}

/// Open store plus the shape it was found in.
pub struct Db {
    pub conn: Connection,
    pub shape: SchemaShape,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Seeded {
    pub student: bool,
    pub complaints: usize,
}

pub fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn open_db(workspace: &Path, seed: bool) -> anyhow::Result<Db> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!("failed to create workspace {}", workspace.to_string_lossy())
    })?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    init(conn, seed)
}

/// Schema steps in order. Stops at the first failure and keeps whatever
/// already committed.
pub fn init(conn: Connection, seed: bool) -> anyhow::Result<Db> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;
    ensure_schema(&conn)?;
    let repaired = repair_status_domain(&conn)?;
    if repaired > 0 {
        info!(repaired, "complaint statuses moved back into domain");
    }
    if seed {
        let seeded = seed_if_empty(&conn)?;
        if seeded.student || seeded.complaints > 0 {
            info!(
                student = seeded.student,
                complaints = seeded.complaints,
                "demo data seeded"
            );
        }
    }
    let shape = probe_shape(&conn)?;
    if !shape.is_full() {
        info!(?shape, "store is missing optional columns");
    }
    Ok(Db { conn, shape })
}

pub fn ensure_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            student_id TEXT NOT NULL UNIQUE,
            department TEXT NOT NULL,
            mobile TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            profile_picture BLOB,
            profile_picture_mime TEXT,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )",
        [],
    )
    .context("failed to create students table")?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_student_id ON students(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS complaints(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            category TEXT NOT NULL
                CHECK (category IN ('Academic', 'Facility', 'Admin', 'Other')),
            status TEXT NOT NULL DEFAULT 'Pending'
                CHECK (status IN ('Pending', 'In Progress', 'Resolved')),
            feedback TEXT,
            feedback_updated_at TEXT,
            student_email TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updated_at TEXT,
            FOREIGN KEY(student_email) REFERENCES students(email)
                ON DELETE CASCADE ON UPDATE CASCADE
        )",
        [],
    )
    .context("failed to create complaints table")?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_complaints_student_email ON complaints(student_email)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_complaints_status ON complaints(status)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_complaints_category ON complaints(category)",
        [],
    )?;
    Ok(())
}

/// Returns how many rows had to be rewritten.
pub fn repair_status_domain(conn: &Connection) -> anyhow::Result<usize> {
    let mut repaired = 0;

    // Near-misses keep their meaning: " in progress" -> "In Progress".
    for status in Status::ALL {
        repaired += conn
            .execute(
                "UPDATE complaints SET status = ?1
                 WHERE status <> ?1 AND lower(trim(status)) = lower(?1)",
                [status.as_str()],
            )
            .context("failed to canonicalise complaint statuses")?;
    }
    repaired += conn
        .execute(
            "UPDATE complaints SET status = 'Pending'
             WHERE status IS NULL OR status NOT IN ('Pending', 'In Progress', 'Resolved')",
            [],
        )
        .context("failed to reset out-of-domain complaint statuses")?;

    // Older tables carry no CHECK on status; the triggers enforce the domain there.
    conn.execute(
        "CREATE TRIGGER IF NOT EXISTS trg_complaints_status_insert
         BEFORE INSERT ON complaints
         WHEN NEW.status NOT IN ('Pending', 'In Progress', 'Resolved')
         BEGIN
             SELECT RAISE(ABORT, 'complaint status outside domain');
         END",
        [],
    )
    .context("failed to install status insert trigger")?;
    conn.execute(
        "CREATE TRIGGER IF NOT EXISTS trg_complaints_status_update
         BEFORE UPDATE OF status ON complaints
         WHEN NEW.status NOT IN ('Pending', 'In Progress', 'Resolved')
         BEGIN
             SELECT RAISE(ABORT, 'complaint status outside domain');
         END",
        [],
    )
    .context("failed to install status update trigger")?;

    Ok(repaired)
}

pub fn seed_if_empty(conn: &Connection) -> anyhow::Result<Seeded> {
    let mut seeded = Seeded::default();

    let students: i64 = conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?;
    if students == 0 {
        conn.execute(
            "INSERT INTO students(name, student_id, department, mobile, email, password)
             VALUES('Test Student', 'TEST001', 'Computer Science', '1234567890', ?, 'test123')",
            [DEMO_STUDENT_EMAIL],
        )
        .context("failed to seed demo student")?;
        seeded.student = true;
    }

    let complaints: i64 = conn.query_row("SELECT COUNT(*) FROM complaints", [], |r| r.get(0))?;
    let owner: i64 = conn.query_row(
        "SELECT COUNT(*) FROM students WHERE email = ?",
        [DEMO_STUDENT_EMAIL],
        |r| r.get(0),
    )?;
    if complaints == 0 && owner > 0 {
        let ts = now_ts();
        seeded.complaints = conn
            .execute(
                "INSERT INTO complaints(title, description, category, student_email, status, created_at)
                 VALUES
                   ('Sample Complaint', 'This is a sample complaint', 'Academic', ?1, 'Pending', ?2),
                   ('Course Registration Issue', 'Registration blocked due to error', 'Academic', ?1, 'In Progress', ?2),
                   ('Library Access Problem', 'Cannot access library resources', 'Admin', ?1, 'Resolved', ?2)",
                (DEMO_STUDENT_EMAIL, &ts),
            )
            .context("failed to seed demo complaints")?;
    } else if complaints == 0 {
        debug!("demo student absent; complaint seeding skipped");
    }

    Ok(seeded)
}

pub fn probe_shape(conn: &Connection) -> anyhow::Result<SchemaShape> {
    Ok(SchemaShape {
        profile_picture: table_has_column(conn, "students", "profile_picture")?,
        profile_picture_mime: table_has_column(conn, "students", "profile_picture_mime")?,
        feedback: table_has_column(conn, "complaints", "feedback")?,
        feedback_updated_at: table_has_column(conn, "complaints", "feedback_updated_at")?,
        complaint_updated_at: table_has_column(conn, "complaints", "updated_at")?,
    })
}

/// One-time migration to the current target shape. Returns the columns added.
/// The shape is re-probed even when a step fails, so columns added before
/// the failure are used.
pub fn upgrade_optional_columns(db: &mut Db) -> anyhow::Result<Vec<String>> {
    let mut added = Vec::new();
    let res = add_missing_columns(&db.conn, &mut added);
    db.shape = probe_shape(&db.conn)?;
    res.map(|()| added)
}

fn add_missing_columns(conn: &Connection, added: &mut Vec<String>) -> anyhow::Result<()> {
    for (table, column, decl) in OPTIONAL_COLUMNS {
        if table_has_column(conn, table, column)? {
            continue;
        }
        conn.execute(
            &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, decl),
            [],
        )
        .with_context(|| format!("failed to add {}.{}", table, column))?;
        info!(table, column, "added optional column");
        added.push(format!("{}.{}", table, column));
    }
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Stores in the shape the first desktop release created: no picture
/// columns, no feedback columns, no CHECK on status.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn fresh_db() -> Db {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        init(conn, false).expect("init fresh db")
    }

    pub fn create_legacy_tables(conn: &Connection) {
        conn.execute_batch(
            "CREATE TABLE students(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                student_id TEXT NOT NULL UNIQUE,
                department TEXT NOT NULL,
                mobile TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            CREATE TABLE complaints(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                status TEXT DEFAULT 'Pending',
                student_email TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                FOREIGN KEY(student_email) REFERENCES students(email)
                    ON DELETE CASCADE ON UPDATE CASCADE
            );",
        )
        .expect("create legacy tables");
    }

    pub fn legacy_db() -> Db {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        create_legacy_tables(&conn);
        init(conn, false).expect("init legacy db")
    }
}

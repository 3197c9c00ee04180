use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::schedule::codec;

/// A course with its embedded weekly schedule. `weekly_schedule` is the
/// canonical sequence of encoded slot strings; the stored column is read
/// through the codec so legacy rows are normalized on the way out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub user_id: String,
    pub semester_id: Option<String>,
    pub name: String,
    pub code: String,
    pub location: Option<String>,
    pub schedule_note: Option<String>,
    pub color: String,
    pub weekly_schedule: Vec<String>,
    pub assignment_count: i64,
    pub created_at: String,
}

impl FromRow<'_, SqliteRow> for Course {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let raw: String = row.try_get("weekly_schedule")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            semester_id: row.try_get("semester_id")?,
            name: row.try_get("name")?,
            code: row.try_get("code")?,
            location: row.try_get("location")?,
            schedule_note: row.try_get("schedule_note")?,
            color: row.try_get("color")?,
            weekly_schedule: codec::encode(&codec::decode(Some(&raw))),
            assignment_count: row.try_get("assignment_count")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub name: String,
    pub code: String,
    pub semester_id: Option<String>,
    pub location: Option<String>,
    pub schedule_note: Option<String>,
    pub color: Option<String>,
    pub weekly_schedule: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCourseRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub semester_id: Option<String>,
    pub location: Option<String>,
    pub schedule_note: Option<String>,
    pub color: Option<String>,
    pub weekly_schedule: Option<Vec<String>>,
}

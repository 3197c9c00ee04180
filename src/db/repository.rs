use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{
    Assignment, AssignmentWithCourse, Course, NewAssignmentRequest, NewCourseRequest,
    NewSemesterRequest, Semester, UpdateAssignmentRequest, UpdateCourseRequest,
    UpdateSemesterRequest,
};
use crate::schedule::ScheduleSlot;
use crate::schedule::codec;

const COURSE_COLUMNS: &str = r#"
    c.id, c.user_id, c.semester_id, c.name, c.code, c.location, c.schedule_note,
    c.color, c.weekly_schedule, c.created_at,
    (SELECT COUNT(*) FROM assignments a WHERE a.course_id = c.id) AS assignment_count
"#;

// ---- semesters ----

pub async fn fetch_semesters(db: &SqlitePool, user_id: &str) -> Result<Vec<Semester>, sqlx::Error> {
    sqlx::query_as::<_, Semester>(
        "SELECT id, user_id, name, start_date, end_date, created_at
         FROM semesters WHERE user_id = ? ORDER BY start_date DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_semester_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<Semester>, sqlx::Error> {
    sqlx::query_as::<_, Semester>(
        "SELECT id, user_id, name, start_date, end_date, created_at FROM semesters WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert_semester(
    db: &SqlitePool,
    user_id: &str,
    req: NewSemesterRequest,
) -> Result<Semester, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO semesters (id, user_id, name, start_date, end_date, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(&req.name)
    .bind(&req.start_date)
    .bind(&req.end_date)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Semester {
        id,
        user_id: user_id.to_string(),
        name: req.name,
        start_date: req.start_date,
        end_date: req.end_date,
        created_at: now,
    })
}

pub async fn update_semester(
    db: &SqlitePool,
    id: &str,
    req: UpdateSemesterRequest,
) -> Result<Option<Semester>, sqlx::Error> {
    let mut current = match find_semester_by_id(db, id).await? {
        Some(s) => s,
        None => return Ok(None),
    };

    if let Some(name) = req.name {
        current.name = name;
    }
    if let Some(start_date) = req.start_date {
        current.start_date = start_date;
    }
    if let Some(end_date) = req.end_date {
        current.end_date = end_date;
    }

    sqlx::query("UPDATE semesters SET name = ?, start_date = ?, end_date = ? WHERE id = ?")
        .bind(&current.name)
        .bind(&current.start_date)
        .bind(&current.end_date)
        .bind(id)
        .execute(db)
        .await?;

    Ok(Some(current))
}

/// Deleting a semester detaches its courses; it never cascades to them.
pub async fn delete_semester(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    sqlx::query("UPDATE courses SET semester_id = NULL WHERE semester_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM semesters WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(result > 0)
}

// ---- courses ----

pub async fn fetch_courses(db: &SqlitePool, user_id: &str) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses c WHERE c.user_id = ? ORDER BY c.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_course_by_id(db: &SqlitePool, id: &str) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses c WHERE c.id = ?"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert_course(
    db: &SqlitePool,
    user_id: &str,
    req: NewCourseRequest,
    slots: &[ScheduleSlot],
) -> Result<Course, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let color = req.color.unwrap_or_else(|| "bg-blue-500".to_string());
    let weekly_schedule = codec::encode_column(slots);

    sqlx::query(
        "INSERT INTO courses
            (id, user_id, semester_id, name, code, location, schedule_note,
            color, weekly_schedule, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(&req.semester_id)
    .bind(&req.name)
    .bind(&req.code)
    .bind(&req.location)
    .bind(&req.schedule_note)
    .bind(&color)
    .bind(&weekly_schedule)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Course {
        id,
        user_id: user_id.to_string(),
        semester_id: req.semester_id,
        name: req.name,
        code: req.code,
        location: req.location,
        schedule_note: req.schedule_note,
        color,
        weekly_schedule: codec::encode(slots),
        assignment_count: 0,
        created_at: now,
    })
}

pub async fn update_course(
    db: &SqlitePool,
    id: &str,
    req: UpdateCourseRequest,
    slots: Option<&[ScheduleSlot]>,
) -> Result<Option<Course>, sqlx::Error> {
    let mut current = match find_course_by_id(db, id).await? {
        Some(c) => c,
        None => return Ok(None),
    };

    if let Some(name) = req.name {
        current.name = name;
    }
    if let Some(code) = req.code {
        current.code = code;
    }
    if let Some(semester_id) = req.semester_id {
        current.semester_id = Some(semester_id);
    }
    if let Some(location) = req.location {
        current.location = Some(location);
    }
    if let Some(schedule_note) = req.schedule_note {
        current.schedule_note = Some(schedule_note);
    }
    if let Some(color) = req.color {
        current.color = color;
    }
    if let Some(slots) = slots {
        current.weekly_schedule = codec::encode(slots);
    }

    // The column is rewritten in canonical form on every update, so legacy
    // rows converge as they are touched.
    let column = serde_json::to_string(&current.weekly_schedule)
        .unwrap_or_else(|_| "[]".to_string());

    sqlx::query(
        "UPDATE courses
         SET semester_id = ?, name = ?, code = ?, location = ?, schedule_note = ?,
             color = ?, weekly_schedule = ?
         WHERE id = ?",
    )
    .bind(&current.semester_id)
    .bind(&current.name)
    .bind(&current.code)
    .bind(&current.location)
    .bind(&current.schedule_note)
    .bind(&current.color)
    .bind(&column)
    .bind(id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

/// Deleting a course removes its assignments with it. The owning
/// semester record is untouched.
pub async fn delete_course(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    sqlx::query("DELETE FROM assignments WHERE course_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(result > 0)
}

// ---- assignments ----

/// The ownership join: every row belongs to `user_id` through its course.
/// Filtering beyond ownership happens in memory at the API layer.
pub async fn fetch_assignments_with_courses(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<AssignmentWithCourse>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentWithCourse>(
        "SELECT a.id, a.course_id, a.title, a.type, a.due_date, a.completed,
                a.description, a.priority, a.created_at,
                c.name AS course_name, c.code AS course_code, c.color AS course_color
         FROM assignments a
         INNER JOIN courses c ON c.id = a.course_id
         WHERE c.user_id = ?
         ORDER BY a.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_assignment_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(
        "SELECT id, course_id, title, type, due_date, completed, description,
                priority, created_at
         FROM assignments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert_assignment(
    db: &SqlitePool,
    req: NewAssignmentRequest,
    due_date: String,
    priority: String,
) -> Result<Assignment, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO assignments
            (id, course_id, title, type, due_date, completed, description,
            priority, created_at)
         VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&req.course_id)
    .bind(&req.title)
    .bind(&req.kind)
    .bind(&due_date)
    .bind(&req.description)
    .bind(&priority)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Assignment {
        id,
        course_id: req.course_id,
        title: req.title,
        kind: req.kind,
        due_date,
        completed: false,
        description: req.description,
        priority,
        created_at: now,
    })
}

pub async fn update_assignment(
    db: &SqlitePool,
    id: &str,
    req: UpdateAssignmentRequest,
    due_date: Option<String>,
    priority: Option<String>,
) -> Result<Option<Assignment>, sqlx::Error> {
    let mut current = match find_assignment_by_id(db, id).await? {
        Some(a) => a,
        None => return Ok(None),
    };

    if let Some(title) = req.title {
        current.title = title;
    }
    if let Some(kind) = req.kind {
        current.kind = kind;
    }
    if let Some(due_date) = due_date {
        current.due_date = due_date;
    }
    if let Some(completed) = req.completed {
        current.completed = completed;
    }
    if let Some(description) = req.description {
        current.description = Some(description);
    }
    if let Some(priority) = priority {
        current.priority = priority;
    }

    sqlx::query(
        "UPDATE assignments
         SET title = ?, type = ?, due_date = ?, completed = ?, description = ?,
             priority = ?
         WHERE id = ?",
    )
    .bind(&current.title)
    .bind(&current.kind)
    .bind(&current.due_date)
    .bind(current.completed)
    .bind(&current.description)
    .bind(&current.priority)
    .bind(id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn delete_assignment(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM assignments WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

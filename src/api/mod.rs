use std::collections::HashMap;

use axum::extract::{Path, Query};
use axum::response::Redirect;
use axum::routing::post;
use axum::{Extension, Json, Router, extract::State, http::StatusCode, middleware, routing::get};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower::ServiceBuilder;

use crate::auth::{self, CurrentUser};
use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::schedule::codec;
use crate::schedule::projector::{self, CourseSchedule, Occurrence};
use crate::schedule::slot::format_time;
use crate::schedule::{ScheduleSlot, SlotError};
use crate::state::AppState;

#[derive(Deserialize)]
struct AssignmentQueryParams {
    course_id: Option<String>,
    completed: Option<bool>,
    sort_by: Option<String>,
}

#[derive(Deserialize)]
struct CalendarQueryParams {
    month: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

#[derive(Serialize)]
struct OccurrenceResponse {
    date: String,
    course_id: String,
    course_code: String,
    course_color: String,
    start_time: String,
    end_time: String,
    session_type: String,
}

impl From<&Occurrence> for OccurrenceResponse {
    fn from(o: &Occurrence) -> Self {
        Self {
            date: o.date.format("%Y-%m-%d").to_string(),
            course_id: o.course_id.clone(),
            course_code: o.course_code.clone(),
            course_color: o.course_color.clone(),
            start_time: format_time(o.start),
            end_time: format_time(o.end),
            session_type: o.session.as_str().to_string(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/user", get(current_user))
        .route("/login", get(login_redirect).post(login))
        .route("/logout", post(logout))
        .route("/semesters", get(list_semesters).post(create_semester))
        .route(
            "/semesters/{id}",
            get(get_semester).put(update_semester).delete(delete_semester),
        )
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/assignments", get(list_assignments).post(create_assignment))
        .route(
            "/assignments/{id}",
            get(get_assignment).put(update_assignment).delete(delete_assignment),
        )
        .route("/calendar", get(calendar))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(state.clone(), auth::resolve_identity)),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

// ---- simulated session ----

async fn current_user(Extension(user): Extension<CurrentUser>) -> Json<CurrentUser> {
    Json(user)
}

async fn login_redirect() -> Redirect {
    Redirect::to("/")
}

async fn login(Extension(user): Extension<CurrentUser>) -> Json<CurrentUser> {
    Json(user)
}

async fn logout() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Logged out" }))
}

// ---- semesters ----

async fn list_semesters(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<Semester>>, AppError> {
    let semesters = repository::fetch_semesters(&state.db, &user.id).await?;
    Ok(Json(semesters))
}

async fn create_semester(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<NewSemesterRequest>,
) -> Result<(StatusCode, Json<Semester>), AppError> {
    require_non_empty("name", &req.name)?;
    let start = validate_date("start_date", &req.start_date)?;
    let end = validate_date("end_date", &req.end_date)?;
    validate_date_range(start, end)?;

    let semester = repository::insert_semester(&state.db, &user.id, req).await?;
    Ok((StatusCode::CREATED, Json(semester)))
}

async fn get_semester(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Semester>, AppError> {
    let semester = owned_semester(&state.db, &id, &user).await?;
    Ok(Json(semester))
}

async fn update_semester(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSemesterRequest>,
) -> Result<Json<Semester>, AppError> {
    let current = owned_semester(&state.db, &id, &user).await?;

    if let Some(name) = &req.name {
        require_non_empty("name", name)?;
    }
    let start = validate_date(
        "start_date",
        req.start_date.as_deref().unwrap_or(&current.start_date),
    )?;
    let end = validate_date(
        "end_date",
        req.end_date.as_deref().unwrap_or(&current.end_date),
    )?;
    validate_date_range(start, end)?;

    let semester = repository::update_semester(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(semester))
}

async fn delete_semester(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    owned_semester(&state.db, &id, &user).await?;
    if repository::delete_semester(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

// ---- courses ----

async fn list_courses(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = repository::fetch_courses(&state.db, &user.id).await?;
    Ok(Json(courses))
}

async fn create_course(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<NewCourseRequest>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    require_non_empty("name", &req.name)?;
    require_non_empty("code", &req.code)?;
    if let Some(semester_id) = &req.semester_id {
        owned_semester(&state.db, semester_id, &user).await?;
    }
    let slots = validate_slots(req.weekly_schedule.as_deref().unwrap_or(&[]))?;

    let course = repository::insert_course(&state.db, &user.id, req, &slots).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn get_course(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Course>, AppError> {
    let course = owned_course(&state.db, &id, &user).await?;
    Ok(Json(course))
}

async fn update_course(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<Json<Course>, AppError> {
    owned_course(&state.db, &id, &user).await?;

    if let Some(name) = &req.name {
        require_non_empty("name", name)?;
    }
    if let Some(code) = &req.code {
        require_non_empty("code", code)?;
    }
    if let Some(semester_id) = &req.semester_id {
        owned_semester(&state.db, semester_id, &user).await?;
    }
    let slots = req
        .weekly_schedule
        .as_deref()
        .map(validate_slots)
        .transpose()?;

    let course = repository::update_course(&state.db, &id, req, slots.as_deref())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

async fn delete_course(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    owned_course(&state.db, &id, &user).await?;
    if repository::delete_course(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

// ---- assignments ----

async fn list_assignments(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<AssignmentQueryParams>,
) -> Result<Json<Vec<AssignmentWithCourse>>, AppError> {
    let mut assignments = repository::fetch_assignments_with_courses(&state.db, &user.id).await?;

    // Ownership is already settled by the join; the query filters are pure
    // in-memory predicates.
    if let Some(course_id) = &params.course_id {
        assignments.retain(|a| &a.course_id == course_id);
    }
    if let Some(completed) = params.completed {
        assignments.retain(|a| a.completed == completed);
    }
    if params.sort_by.as_deref() == Some("due_date") {
        assignments.sort_by_key(|a| due_sort_key(&a.due_date));
    }

    Ok(Json(assignments))
}

async fn create_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<NewAssignmentRequest>,
) -> Result<(StatusCode, Json<Assignment>), AppError> {
    require_non_empty("title", &req.title)?;
    require_non_empty("type", &req.kind)?;
    owned_course(&state.db, &req.course_id, &user).await?;
    let due_date = validate_due_date(&req.due_date)?;
    let priority = validate_priority(req.priority.as_deref().unwrap_or("medium"))?;

    let assignment = repository::insert_assignment(&state.db, req, due_date, priority).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn get_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Assignment>, AppError> {
    let assignment = owned_assignment(&state.db, &id, &user).await?;
    Ok(Json(assignment))
}

async fn update_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAssignmentRequest>,
) -> Result<Json<Assignment>, AppError> {
    owned_assignment(&state.db, &id, &user).await?;

    if let Some(title) = &req.title {
        require_non_empty("title", title)?;
    }
    let due_date = req
        .due_date
        .as_deref()
        .map(validate_due_date)
        .transpose()?;
    let priority = req
        .priority
        .as_deref()
        .map(validate_priority)
        .transpose()?;

    let assignment = repository::update_assignment(&state.db, &id, req, due_date, priority)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(assignment))
}

async fn delete_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    owned_assignment(&state.db, &id, &user).await?;
    if repository::delete_assignment(&state.db, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

// ---- calendar ----

async fn calendar(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<CalendarQueryParams>,
) -> Result<Json<Vec<OccurrenceResponse>>, AppError> {
    let (window_start, window_end) = resolve_window(&params)?;

    let semesters = repository::fetch_semesters(&state.db, &user.id).await?;
    let anchors: HashMap<String, NaiveDate> = semesters
        .iter()
        .filter_map(|s| {
            NaiveDate::parse_from_str(&s.start_date, "%Y-%m-%d")
                .ok()
                .map(|d| (s.id.clone(), d))
        })
        .collect();

    let courses = repository::fetch_courses(&state.db, &user.id).await?;
    let schedules: Vec<CourseSchedule> = courses
        .into_iter()
        .map(|c| CourseSchedule {
            anchor: c.semester_id.as_ref().and_then(|id| anchors.get(id).copied()),
            slots: codec::decode_strings(&c.weekly_schedule),
            course_id: c.id,
            course_code: c.code,
            course_color: c.color,
        })
        .collect();

    let occurrences = projector::project(window_start, window_end, &schedules);
    Ok(Json(occurrences.iter().map(OccurrenceResponse::from).collect()))
}

fn resolve_window(params: &CalendarQueryParams) -> Result<(NaiveDate, NaiveDate), AppError> {
    match (&params.month, &params.start, &params.end) {
        (Some(month), None, None) => {
            let parsed = month.split_once('-').and_then(|(y, m)| {
                Some((y.parse::<i32>().ok()?, m.parse::<u32>().ok()?))
            });
            let (year, month_number) = parsed.ok_or_else(|| {
                AppError::BadRequest(format!("month '{month}' is not in YYYY-MM form"))
            })?;
            projector::month_window(year, month_number)
                .ok_or_else(|| AppError::BadRequest(format!("month '{month}' does not exist")))
        }
        (None, Some(start), Some(end)) => {
            let start = validate_date("start", start)?;
            let end = validate_date("end", end)?;
            if start > end {
                return Err(AppError::BadRequest(
                    "start must not be after end".to_string(),
                ));
            }
            Ok((start, end))
        }
        _ => Err(AppError::BadRequest(
            "specify either month=YYYY-MM or start and end dates".to_string(),
        )),
    }
}

// ---- ownership checks ----

async fn owned_semester(
    db: &SqlitePool,
    id: &str,
    user: &CurrentUser,
) -> Result<Semester, AppError> {
    let semester = repository::find_semester_by_id(db, id)
        .await?
        .ok_or(AppError::NotFound)?;
    if semester.user_id != user.id {
        return Err(AppError::Forbidden);
    }
    Ok(semester)
}

async fn owned_course(db: &SqlitePool, id: &str, user: &CurrentUser) -> Result<Course, AppError> {
    let course = repository::find_course_by_id(db, id)
        .await?
        .ok_or(AppError::NotFound)?;
    if course.user_id != user.id {
        return Err(AppError::Forbidden);
    }
    Ok(course)
}

/// Assignment ownership runs through the owning course's user.
async fn owned_assignment(
    db: &SqlitePool,
    id: &str,
    user: &CurrentUser,
) -> Result<Assignment, AppError> {
    let assignment = repository::find_assignment_by_id(db, id)
        .await?
        .ok_or(AppError::NotFound)?;
    owned_course(db, &assignment.course_id, user).await?;
    Ok(assignment)
}

// ---- boundary validation ----

fn validate_slots(items: &[String]) -> Result<Vec<ScheduleSlot>, AppError> {
    let mut slots = Vec::with_capacity(items.len());
    for (index, raw) in items.iter().enumerate() {
        let slot = codec::parse_slot(raw).map_err(|err: SlotError| AppError::Validation {
            field: format!("weekly_schedule[{index}]"),
            message: err.to_string(),
        })?;
        slots.push(slot);
    }
    Ok(slots)
}

fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation {
            field: field.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn validate_date(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| AppError::Validation {
        field: field.to_string(),
        message: format!("'{value}' is not a YYYY-MM-DD date"),
    })
}

fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), AppError> {
    if start > end {
        return Err(AppError::Validation {
            field: "start_date".to_string(),
            message: "must not be after end_date".to_string(),
        });
    }
    Ok(())
}

/// Accepts RFC 3339, naive date-times, and bare dates; stores RFC 3339.
fn validate_due_date(value: &str) -> Result<String, AppError> {
    let v = value.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(v) {
        return Ok(dt.with_timezone(&chrono::Utc).to_rfc3339());
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc().to_rfc3339());
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M") {
        return Ok(naive.and_utc().to_rfc3339());
    }
    if let Ok(date) = NaiveDate::parse_from_str(v, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc().to_rfc3339());
        }
    }
    Err(AppError::Validation {
        field: "due_date".to_string(),
        message: format!("'{value}' is not a recognized date-time"),
    })
}

fn validate_priority(value: &str) -> Result<String, AppError> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "low" | "medium" | "high" => Ok(normalized),
        _ => Err(AppError::Validation {
            field: "priority".to_string(),
            message: format!("'{value}' is not one of low, medium, high"),
        }),
    }
}

fn due_sort_key(value: &str) -> (i64, String) {
    match chrono::DateTime::parse_from_rfc3339(value) {
        Ok(dt) => (dt.timestamp(), value.to_string()),
        Err(_) => (i64::MAX, value.to_string()),
    }
}

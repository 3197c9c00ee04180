use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use uniplan::api::router;
use uniplan::auth::DemoIdentityProvider;
use uniplan::db::repository;
use uniplan::models::{NewAssignmentRequest, NewCourseRequest};
use uniplan::state::AppState;

async fn test_app() -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite://:memory:")
        .await
        .expect("Failed to create test db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    router(AppState {
        db: pool,
        identity: Arc::new(DemoIdentityProvider),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .expect("Failed to build request"),
        None => builder.body(Body::empty()).expect("Failed to build request"),
    };

    let response = app.clone().oneshot(request).await.expect("Request failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Body was not JSON")
    };
    (status, value)
}

#[tokio::test]
async fn test_demo_identity_is_injected() {
    let app = test_app().await;

    let (status, user) = send(&app, "GET", "/api/user", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["id"], "uniplan_student_demo");

    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_and_list_courses() {
    let app = test_app().await;

    let (status, course) = send(
        &app,
        "POST",
        "/api/courses",
        Some(json!({
            "name": "Introduction to Computer Science",
            "code": "CS101",
            "location": "Room 304",
            "weekly_schedule": [
                "Mon 09:00-10:00",
                r#"{"day": "Wed", "time": "14:30-16:00", "type": "Lab", "freq": "biweekly-odd"}"#
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(course["code"], "CS101");
    assert_eq!(course["color"], "bg-blue-500");
    let slots = course["weekly_schedule"].as_array().expect("schedule missing");
    assert_eq!(slots.len(), 2);
    assert!(slots[0].as_str().expect("slot not a string").contains("\"Mon\""));

    let (status, courses) = send(&app, "GET", "/api/courses", None).await;
    assert_eq!(status, StatusCode::OK);
    let courses = courses.as_array().expect("not an array");
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0]["assignment_count"], 0);
}

#[tokio::test]
async fn test_course_create_rejects_invalid_slot_with_index() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/courses",
        Some(json!({
            "name": "Intro",
            "code": "CS101",
            "weekly_schedule": ["Mon 09:00-10:00", "Mon 10:00-09:00"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "weekly_schedule[1]");

    let (status, body) = send(
        &app,
        "POST",
        "/api/courses",
        Some(json!({
            "name": "Intro",
            "code": "CS101",
            "weekly_schedule": ["Funday 09:00-10:00"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "weekly_schedule[0]");
}

#[tokio::test]
async fn test_update_course_replaces_schedule() {
    let app = test_app().await;

    let (_, course) = send(
        &app,
        "POST",
        "/api/courses",
        Some(json!({
            "name": "Intro",
            "code": "CS101",
            "weekly_schedule": ["Mon 09:00-10:00"]
        })),
    )
    .await;
    let course_id = course["id"].as_str().expect("no course id");

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/courses/{course_id}"),
        Some(json!({
            "color": "bg-green-500",
            "weekly_schedule": [
                r#"{"day": "Tue", "time": "10:00-11:30", "type": "Tutorial", "freq": "weekly"}"#
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["color"], "bg-green-500");
    assert_eq!(updated["name"], "Intro");
    let slots = updated["weekly_schedule"].as_array().expect("schedule missing");
    assert_eq!(slots.len(), 1);
    assert!(slots[0].as_str().expect("slot not a string").contains("\"Tue\""));

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/courses/{course_id}"),
        Some(json!({ "weekly_schedule": ["Tue 11:00-10:00"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "weekly_schedule[0]");
}

#[tokio::test]
async fn test_assignment_filters_and_sort() {
    let app = test_app().await;

    let (_, course) = send(
        &app,
        "POST",
        "/api/courses",
        Some(json!({ "name": "Intro", "code": "CS101" })),
    )
    .await;
    let course_id = course["id"].as_str().expect("no course id").to_string();

    let (status, later) = send(
        &app,
        "POST",
        "/api/assignments",
        Some(json!({
            "course_id": course_id,
            "title": "Problem set 2",
            "type": "Homework",
            "due_date": "2025-03-12"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(later["priority"], "medium");

    let (status, earlier) = send(
        &app,
        "POST",
        "/api/assignments",
        Some(json!({
            "course_id": course_id,
            "title": "Problem set 1",
            "type": "Homework",
            "due_date": "2025-03-10",
            "priority": "high"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let earlier_id = earlier["id"].as_str().expect("no assignment id");
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/assignments/{earlier_id}"),
        Some(json!({ "completed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, open) = send(&app, "GET", "/api/assignments?completed=false", None).await;
    let open = open.as_array().expect("not an array");
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["title"], "Problem set 2");
    assert_eq!(open[0]["course_code"], "CS101");

    let (_, sorted) = send(&app, "GET", "/api/assignments?sort_by=due_date", None).await;
    let sorted = sorted.as_array().expect("not an array");
    assert_eq!(sorted.len(), 2);
    assert_eq!(sorted[0]["title"], "Problem set 1");
    assert_eq!(sorted[1]["title"], "Problem set 2");

    let (_, by_course) = send(
        &app,
        "GET",
        &format!("/api/assignments?course_id={course_id}"),
        None,
    )
    .await;
    assert_eq!(by_course.as_array().expect("not an array").len(), 2);

    let (_, none) = send(&app, "GET", "/api/assignments?course_id=missing", None).await;
    assert!(none.as_array().expect("not an array").is_empty());
}

#[tokio::test]
async fn test_assignment_rejects_bad_input() {
    let app = test_app().await;

    let (_, course) = send(
        &app,
        "POST",
        "/api/courses",
        Some(json!({ "name": "Intro", "code": "CS101" })),
    )
    .await;
    let course_id = course["id"].as_str().expect("no course id");

    let (status, body) = send(
        &app,
        "POST",
        "/api/assignments",
        Some(json!({
            "course_id": course_id,
            "title": "Problem set 1",
            "type": "Homework",
            "due_date": "soon"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "due_date");

    let (status, body) = send(
        &app,
        "POST",
        "/api/assignments",
        Some(json!({
            "course_id": course_id,
            "title": "Problem set 1",
            "type": "Homework",
            "due_date": "2025-03-10",
            "priority": "urgent"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "priority");

    let (status, _) = send(
        &app,
        "POST",
        "/api/assignments",
        Some(json!({
            "course_id": "missing",
            "title": "Problem set 1",
            "type": "Homework",
            "due_date": "2025-03-10"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_calendar_projects_weekly_slots() {
    let app = test_app().await;

    send(
        &app,
        "POST",
        "/api/courses",
        Some(json!({
            "name": "Intro",
            "code": "CS101",
            "weekly_schedule": ["Mon 09:00-10:00"]
        })),
    )
    .await;

    let (status, occurrences) = send(
        &app,
        "GET",
        "/api/calendar?start=2025-03-03&end=2025-03-09",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let occurrences = occurrences.as_array().expect("not an array");
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0]["date"], "2025-03-03");
    assert_eq!(occurrences[0]["start_time"], "09:00");
    assert_eq!(occurrences[0]["end_time"], "10:00");
    assert_eq!(occurrences[0]["session_type"], "Lecture");
    assert_eq!(occurrences[0]["course_code"], "CS101");

    let (status, _) = send(&app, "GET", "/api/calendar", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, month) = send(&app, "GET", "/api/calendar?month=2025-03", None).await;
    assert_eq!(status, StatusCode::OK);
    // March 2025 padded Sun..Sat covers six Mondays (Feb 24 through Mar 31).
    assert_eq!(month.as_array().expect("not an array").len(), 6);
}

#[tokio::test]
async fn test_course_delete_cascades_and_semester_survives() {
    let app = test_app().await;

    let (_, semester) = send(
        &app,
        "POST",
        "/api/semesters",
        Some(json!({
            "name": "Winter 2025",
            "start_date": "2025-01-06",
            "end_date": "2025-04-25"
        })),
    )
    .await;
    let semester_id = semester["id"].as_str().expect("no semester id").to_string();

    let (_, course) = send(
        &app,
        "POST",
        "/api/courses",
        Some(json!({ "name": "Intro", "code": "CS101", "semester_id": semester_id })),
    )
    .await;
    let course_id = course["id"].as_str().expect("no course id").to_string();

    send(
        &app,
        "POST",
        "/api/assignments",
        Some(json!({
            "course_id": course_id,
            "title": "Problem set 1",
            "type": "Homework",
            "due_date": "2025-03-10"
        })),
    )
    .await;

    let (status, _) = send(&app, "DELETE", &format!("/api/courses/{course_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, assignments) = send(&app, "GET", "/api/assignments", None).await;
    assert!(assignments.as_array().expect("not an array").is_empty());

    let (status, _) = send(&app, "GET", &format!("/api/semesters/{semester_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_semester_delete_detaches_courses() {
    let app = test_app().await;

    let (_, semester) = send(
        &app,
        "POST",
        "/api/semesters",
        Some(json!({
            "name": "Winter 2025",
            "start_date": "2025-01-06",
            "end_date": "2025-04-25"
        })),
    )
    .await;
    let semester_id = semester["id"].as_str().expect("no semester id").to_string();

    let (_, course) = send(
        &app,
        "POST",
        "/api/courses",
        Some(json!({ "name": "Intro", "code": "CS101", "semester_id": semester_id })),
    )
    .await;
    let course_id = course["id"].as_str().expect("no course id").to_string();

    let (status, _) = send(&app, "DELETE", &format!("/api/semesters/{semester_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, survivor) = send(&app, "GET", &format!("/api/courses/{course_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(survivor["semester_id"], Value::Null);
}

#[tokio::test]
async fn test_foreign_records_are_forbidden_not_filtered() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite://:memory:")
        .await
        .expect("Failed to create test db");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    let app = router(AppState {
        db: pool.clone(),
        identity: Arc::new(DemoIdentityProvider),
    });

    // Plant records owned by a different identity.
    let foreign_course = repository::insert_course(
        &pool,
        "someone-else",
        NewCourseRequest {
            name: "Other".to_string(),
            code: "OTH100".to_string(),
            semester_id: None,
            location: None,
            schedule_note: None,
            color: None,
            weekly_schedule: None,
        },
        &[],
    )
    .await
    .expect("Failed to insert course");
    let foreign_assignment = repository::insert_assignment(
        &pool,
        NewAssignmentRequest {
            course_id: foreign_course.id.clone(),
            title: "Their homework".to_string(),
            kind: "Homework".to_string(),
            due_date: "2025-03-10".to_string(),
            description: None,
            priority: None,
        },
        "2025-03-10T00:00:00+00:00".to_string(),
        "medium".to_string(),
    )
    .await
    .expect("Failed to insert assignment");

    let uri = format!("/api/courses/{}", foreign_course.id);
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/assignments/{}", foreign_assignment.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The list view simply never contains foreign rows.
    let (_, courses) = send(&app, "GET", "/api/courses", None).await;
    assert!(courses.as_array().expect("not an array").is_empty());
}

#[tokio::test]
async fn test_missing_records_return_not_found() {
    let app = test_app().await;

    let (status, _) = send(&app, "GET", "/api/courses/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/api/assignments/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/semesters/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/semesters",
        Some(json!({
            "name": "Winter 2025",
            "start_date": "2025-04-25",
            "end_date": "2025-01-06"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

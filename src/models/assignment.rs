use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: String,
    pub course_id: String,
    pub title: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub due_date: String,
    pub completed: bool,
    pub description: Option<String>,
    pub priority: String,
    pub created_at: String,
}

/// An assignment joined with its owning course, as returned by the list
/// endpoint (the course fields drive badge rendering).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssignmentWithCourse {
    pub id: String,
    pub course_id: String,
    pub title: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub due_date: String,
    pub completed: bool,
    pub description: Option<String>,
    pub priority: String,
    pub created_at: String,
    pub course_name: String,
    pub course_code: String,
    pub course_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAssignmentRequest {
    pub course_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub due_date: String,
    pub description: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAssignmentRequest {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub due_date: Option<String>,
    pub completed: Option<bool>,
    pub description: Option<String>,
    pub priority: Option<String>,
}

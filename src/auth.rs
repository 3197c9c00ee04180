use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Resolved request identity. Every record is owned by a `CurrentUser::id`
/// and every ownership check compares against it.
#[derive(Clone, Debug, Serialize)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
}

/// Identity resolution seam. Handlers never resolve identity themselves;
/// the middleware calls this once per request and injects the result.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> Result<CurrentUser, AppError>;
}

/// Stand-in provider for the single-user demo deployment. Always yields
/// the same identity regardless of cookies or headers.
pub struct DemoIdentityProvider;

#[async_trait]
impl IdentityProvider for DemoIdentityProvider {
    async fn resolve(&self, _headers: &HeaderMap) -> Result<CurrentUser, AppError> {
        Ok(CurrentUser {
            id: "uniplan_student_demo".to_string(),
            username: "student_demo".to_string(),
        })
    }
}

pub async fn resolve_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = state.identity.resolve(req.headers()).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

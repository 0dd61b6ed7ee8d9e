use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::token::decode_token;

/// Extract and validate the bearer token from the Authorization header.
/// On success the decoded claims are attached to the request for
/// downstream handlers. The signing secret comes from injected state.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("No token provided".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("No token provided".into()))?;

    let claims = decode_token(&state.jwt_secret, token)
        .map_err(|_| ApiError::Unauthorized("Invalid token".into()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::routing::get;
    use axum::{Extension, Router, middleware};
    use chrono::Utc;
    use tower::ServiceExt;
    use uuid::Uuid;

    use gather_db::Database;
    use gather_types::api::{Claims, UserResponse};
    use gather_types::models::AccessLevel;

    use super::require_auth;
    use crate::auth::{AppState, AppStateInner};
    use crate::token::issue_token;

    const SECRET: &str = "test-secret";

    /// Succeeds only when the middleware attached decoded claims.
    async fn whoami(Extension(claims): Extension<Claims>) -> String {
        claims.email
    }

    fn guarded_app() -> Router {
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: SECRET.into(),
        });
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(state, require_auth))
    }

    fn request(auth_header: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = auth_header {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn sample_token() -> String {
        let user = UserResponse {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            access_level: AccessLevel::Guest,
            avatar: "/images/default-avatar.png".into(),
            is_first_login: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        issue_token(SECRET, &user).unwrap()
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let res = guarded_app().oneshot(request(None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_unauthenticated() {
        let res = guarded_app()
            .oneshot(request(Some("Basic YWRhOnB3")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthenticated() {
        let res = guarded_app()
            .oneshot(request(Some("Bearer not.a.token")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_reaches_handler_with_claims() {
        let token = sample_token();
        let res = guarded_app()
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}

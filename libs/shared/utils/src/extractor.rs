use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Validates the bearer token and stores the resulting `User` in request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let user = validate_token(bearer.token(), &state.config.jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Doctor-only actions must target the doctor's own resources.
pub fn require_doctor(user: &User, doctor_id: &str) -> Result<(), AppError> {
    if !user.is_doctor() {
        return Err(AppError::Forbidden("Doctor role required".to_string()));
    }
    if user.id != doctor_id {
        return Err(AppError::Forbidden("Doctors may only manage their own schedule".to_string()));
    }
    Ok(())
}

pub fn require_operator(user: &User) -> Result<(), AppError> {
    if user.is_operator() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Operator role required".to_string()))
    }
}

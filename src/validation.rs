use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Boundary checks run on a request body before any service sees it.
pub trait Validate {
    fn validate(&mut self) -> Result<(), AppError>;
}

/// `Json<T>` that reports malformed bodies and failed checks as `BadRequest`.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(mut value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| {
                warn!(error = %e.body_text(), "rejected request body");
                AppError::bad_request(e.body_text())
            })?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// `Path<T>` whose rejection is a `BadRequest` envelope.
pub struct ValidPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: PathRejection| {
                warn!(error = %e.body_text(), "rejected path");
                AppError::bad_request(e.body_text())
            })?;
        Ok(ValidPath(value))
    }
}

/// `Query<T>` whose rejection is a `BadRequest` envelope.
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: QueryRejection| {
                warn!(error = %e.body_text(), "rejected query");
                AppError::bad_request(e.body_text())
            })?;
        Ok(ValidQuery(value))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims in place and checks the shape.
pub fn email(value: &mut String) -> Result<(), AppError> {
    *value = value.trim().to_string();
    if !is_valid_email(value) {
        return Err(AppError::bad_request("invalid email"));
    }
    Ok(())
}

pub fn password(value: &str) -> Result<(), AppError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "password must have at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Trims in place and requires something left.
pub fn name(value: &mut String) -> Result<(), AppError> {
    *value = value.trim().to_string();
    if value.is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    Ok(())
}

pub fn non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::bad_request(format!("{} is required", field)));
    }
    Ok(())
}

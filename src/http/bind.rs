//! Form binding with model validation.
//!
//! # Responsibilities
//! - Decode `application/x-www-form-urlencoded` pairs into a struct
//! - Run the model's own validation after a successful decode
//! - Offer the same as an axum extractor ([`Valid`])
//!
//! # Design Decisions
//! - Validation is a trait bound ([`Modeler`]), checked at compile time
//! - Rejections are expected client mistakes: logged at debug, never as errors

use std::fmt;
use std::ops::Deref;

use axum::extract::rejection::FormRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// A model that can check its own state after being decoded.
pub trait Modeler {
    fn is_valid(&self) -> Result<(), ValidationError>;
}

/// Why a model rejected its state. Displayed verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Error)]
pub enum BindError {
    #[error("decode form: {0}")]
    Decode(#[from] serde_urlencoded::de::Error),

    #[error("encode form: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),

    #[error(transparent)]
    Form(#[from] FormRejection),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl IntoResponse for BindError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "Form binding rejected");
        match self {
            BindError::Form(rejection) => rejection.into_response(),
            BindError::Invalid(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.0).into_response(),
            other => (StatusCode::BAD_REQUEST, other.to_string()).into_response(),
        }
    }
}

/// Decode an urlencoded string (`name=x&age=3`) into `T` and validate it.
pub fn bind<T>(encoded: &str) -> Result<T, BindError>
where
    T: DeserializeOwned + Modeler,
{
    let model: T = serde_urlencoded::from_str(encoded)?;
    model.is_valid()?;
    Ok(model)
}

/// Like [`bind`], for pairs that are already split.
pub fn bind_pairs<T, K, V>(pairs: &[(K, V)]) -> Result<T, BindError>
where
    T: DeserializeOwned + Modeler,
    K: Serialize,
    V: Serialize,
{
    bind(&serde_urlencoded::to_string(pairs)?)
}

/// Extractor yielding a decoded and validated `T`.
///
/// Reads the query string for GET/HEAD and the urlencoded body otherwise.
///
/// ```rust,ignore
/// async fn create(Valid(note): Valid<NewNote>) -> Response { ... }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Valid<T>(pub T);

impl<T> Deref for Valid<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Modeler,
    S: Send + Sync,
{
    type Rejection = BindError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(model) = Form::<T>::from_request(req, state).await?;
        model.is_valid()?;
        Ok(Valid(model))
    }
}

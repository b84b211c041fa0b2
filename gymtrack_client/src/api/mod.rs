//! Typed wrappers over the remote service endpoints
//!
//! Each wrapper is a thin borrow of [`GymClient`][crate::GymClient]: it
//! builds the request, sends it through the authenticated stack, and decodes
//! the response. All recovery behavior (credential attachment, refresh,
//! replay) lives in the middleware; nothing here retries on its own.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod exercises;
pub mod workouts;

pub use admin::AdminApi;
pub use auth::AuthApi;
pub use chat::ChatApi;
pub use exercises::ExercisesApi;
pub use workouts::WorkoutsApi;

use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub(crate) async fn expect_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    if !response.status().is_success() {
        return Err(ApiError::from_response(response).await);
    }
    response.json().await.map_err(ApiError::from)
}

pub(crate) async fn expect_success(response: reqwest::Response) -> Result<(), ApiError> {
    if !response.status().is_success() {
        return Err(ApiError::from_response(response).await);
    }
    Ok(())
}

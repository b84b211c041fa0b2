//! The exercise catalog

use serde::{Deserialize, Serialize};

use super::{expect_json, expect_success};
use crate::error::ApiError;
use crate::GymClient;

/// An exercise in the catalog
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    /// Catalog id
    pub id: i64,
    /// Exercise name
    pub name: String,
    /// Targeted muscle group
    pub muscle_group: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Illustration or video address
    pub media_url: Option<String>,
    /// Whether this is a user-created exercise rather than a built-in
    pub is_custom: Option<bool>,
    /// The creating account, for custom exercises
    pub created_by_user_id: Option<i64>,
}

/// Fields accepted when creating or updating an exercise
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDraft {
    /// Exercise name
    pub name: String,
    /// Targeted muscle group
    pub muscle_group: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Illustration or video address
    pub media_url: Option<String>,
}

/// CRUD over the exercise catalog
#[derive(Debug)]
pub struct ExercisesApi<'a> {
    pub(crate) client: &'a GymClient,
}

impl ExercisesApi<'_> {
    /// Lists the exercises visible to the current account
    pub async fn list(&self) -> Result<Vec<Exercise>, ApiError> {
        let url = self.client.backend_url("/api/exercises")?;
        let response = self
            .client
            .backend()
            .get(url)
            .send()
            .await
            .map_err(ApiError::from)?;
        expect_json(response).await
    }

    /// Fetches a single exercise
    pub async fn get(&self, id: i64) -> Result<Exercise, ApiError> {
        let url = self.client.backend_url(&format!("/api/exercises/{id}"))?;
        let response = self
            .client
            .backend()
            .get(url)
            .send()
            .await
            .map_err(ApiError::from)?;
        expect_json(response).await
    }

    /// Creates a new exercise
    pub async fn create(&self, draft: &ExerciseDraft) -> Result<Exercise, ApiError> {
        let url = self.client.backend_url("/api/exercises")?;
        let response = self
            .client
            .backend()
            .post(url)
            .json(draft)
            .send()
            .await
            .map_err(ApiError::from)?;
        expect_json(response).await
    }

    /// Replaces an existing exercise
    pub async fn update(&self, id: i64, draft: &ExerciseDraft) -> Result<Exercise, ApiError> {
        let url = self.client.backend_url(&format!("/api/exercises/{id}"))?;
        let response = self
            .client
            .backend()
            .put(url)
            .json(draft)
            .send()
            .await
            .map_err(ApiError::from)?;
        expect_json(response).await
    }

    /// Deletes an exercise
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let url = self.client.backend_url(&format!("/api/exercises/{id}"))?;
        let response = self
            .client
            .backend()
            .delete(url)
            .send()
            .await
            .map_err(ApiError::from)?;
        expect_success(response).await
    }
}

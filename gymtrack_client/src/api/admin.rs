//! The admin user-management console

use serde::{Deserialize, Serialize};

use super::{expect_json, expect_success};
use crate::error::ApiError;
use crate::GymClient;

/// An account as seen by an administrator
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    /// Account id
    pub id: i64,
    /// Account email address
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Granted role
    pub role: String,
    /// Whether the account may log in
    pub is_enabled: bool,
    /// Whether the account was created through an OAuth provider
    pub is_oauth: Option<bool>,
    /// The OAuth provider, when applicable
    pub oauth_provider: Option<String>,
    /// Creation timestamp
    pub created_at: Option<String>,
}

/// Fields accepted when creating or updating an account
///
/// `password` is required on create and optional on update; the other
/// optional fields fall back to backend defaults when omitted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    /// Account email address
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Account password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Granted role; the backend defaults to the regular user role
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Whether the account may log in; the backend defaults to enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
}

/// User management, restricted to administrator accounts
#[derive(Debug)]
pub struct AdminApi<'a> {
    pub(crate) client: &'a GymClient,
}

impl AdminApi<'_> {
    /// Lists every account
    pub async fn list_users(&self) -> Result<Vec<AdminUser>, ApiError> {
        let url = self.client.backend_url("/api/admin/users")?;
        let response = self
            .client
            .backend()
            .get(url)
            .send()
            .await
            .map_err(ApiError::from)?;
        expect_json(response).await
    }

    /// Fetches a single account
    pub async fn get_user(&self, id: i64) -> Result<AdminUser, ApiError> {
        let url = self.client.backend_url(&format!("/api/admin/users/{id}"))?;
        let response = self
            .client
            .backend()
            .get(url)
            .send()
            .await
            .map_err(ApiError::from)?;
        expect_json(response).await
    }

    /// Creates a new account
    pub async fn create_user(&self, draft: &UserDraft) -> Result<AdminUser, ApiError> {
        let url = self.client.backend_url("/api/admin/users")?;
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

    /// Updates an existing account
    pub async fn update_user(&self, id: i64, draft: &UserDraft) -> Result<AdminUser, ApiError> {
        let url = self.client.backend_url(&format!("/api/admin/users/{id}"))?;
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

    /// Flips whether an account may log in
    pub async fn toggle_user_enabled(&self, id: i64) -> Result<AdminUser, ApiError> {
        let url = self
            .client
            .backend_url(&format!("/api/admin/users/{id}/toggle-enabled"))?;
        let response = self
            .client
            .backend()
            .patch(url)
            .send()
            .await
            .map_err(ApiError::from)?;
        expect_json(response).await
    }

    /// Deletes an account
    pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        let url = self.client.backend_url(&format!("/api/admin/users/{id}"))?;
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

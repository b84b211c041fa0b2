//! Account and session operations

use gymtrack_session::AccessToken;
use serde::{Deserialize, Serialize};

use super::{expect_json, expect_success};
use crate::error::ApiError;
use crate::GymClient;

/// Credentials for a password login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Account email address
    pub email: String,
    /// Account password
    pub password: String,
}

/// Details for a new account
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Display name of the new account
    pub full_name: String,
    /// Account email address
    pub email: String,
    /// Account password
    pub password: String,
}

/// The backend's answer to a successful login or registration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// The fresh bearer credential
    pub token: AccessToken,
    /// The account id, when the backend exposes it
    pub user_id: Option<i64>,
    /// Account email address
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Granted role, e.g. `ROLE_USER` or `ROLE_ADMIN`
    pub role: String,
    /// Avatar address, from an OAuth provider or a custom upload
    pub avatar_url: Option<String>,
}

/// The profile of the currently authenticated account
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Account id
    pub id: i64,
    /// Account email address
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Granted role
    pub role: String,
    /// Avatar address, when set
    pub avatar_url: Option<String>,
}

/// Account and session operations against the primary backend
#[derive(Debug)]
pub struct AuthApi<'a> {
    pub(crate) client: &'a GymClient,
}

impl AuthApi<'_> {
    /// Logs in with email and password
    ///
    /// On success the returned credential is persisted into the shared store
    /// and the session is marked active again.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let url = self.client.backend_url("/api/auth/login")?;
        let response = self
            .client
            .backend()
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(ApiError::from)?;
        let auth: AuthResponse = expect_json(response).await?;
        self.adopt_session(&auth).await;
        Ok(auth)
    }

    /// Registers a new account and logs it in
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let url = self.client.backend_url("/api/auth/register")?;
        let response = self
            .client
            .backend()
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(ApiError::from)?;
        let auth: AuthResponse = expect_json(response).await?;
        self.adopt_session(&auth).await;
        Ok(auth)
    }

    /// Logs out the current session
    ///
    /// The local credential is dropped no matter what the server says; a
    /// failure of the logout call itself is still reported afterwards.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let url = self.client.backend_url("/api/auth/logout")?;
        let result = self
            .client
            .backend()
            .post(url)
            .send()
            .await
            .map_err(ApiError::from);

        if let Err(error) = self.client.credential_store().clear().await {
            tracing::warn!(
                error = (&*error as &dyn std::error::Error),
                "unable to clear stored credential on logout"
            );
        }
        self.client.remember_user_id(None);

        expect_success(result?).await
    }

    /// The address that starts an OAuth redirect login with the given
    /// provider, e.g. `google`
    ///
    /// The backend completes the provider handshake and redirects back to
    /// the application with a token; hand that token to
    /// [`adopt_token`][Self::adopt_token].
    pub fn oauth_login_url(&self, provider: &str) -> Result<reqwest::Url, ApiError> {
        Ok(self
            .client
            .backend_url(&format!("/oauth2/authorization/{provider}"))?)
    }

    /// Adopts a credential obtained out-of-band, such as from an OAuth
    /// redirect callback
    pub async fn adopt_token(&self, token: AccessToken) {
        if let Err(error) = self.client.credential_store().persist(&token).await {
            tracing::warn!(
                error = (&*error as &dyn std::error::Error),
                "unable to persist adopted credential"
            );
        }
        self.client.events().reset();
    }

    /// Fetches the profile of the authenticated account
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let url = self.client.backend_url("/api/auth/me")?;
        let response = self
            .client
            .backend()
            .get(url)
            .send()
            .await
            .map_err(ApiError::from)?;
        let profile: UserProfile = expect_json(response).await?;
        self.client.remember_user_id(Some(profile.id));
        Ok(profile)
    }

    async fn adopt_session(&self, auth: &AuthResponse) {
        if let Err(error) = self.client.credential_store().persist(&auth.token).await {
            tracing::warn!(
                error = (&*error as &dyn std::error::Error),
                "unable to persist credential after login"
            );
        }
        self.client.remember_user_id(auth.user_id);
        self.client.events().reset();
    }
}

//! Workout logs and their nested sets

use serde::{Deserialize, Serialize};

use super::expect_json;
use crate::error::ApiError;
use crate::GymClient;

/// One set within a workout log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSet {
    /// Set id, absent until the backend assigns one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Position of the set within the workout
    pub set_number: i32,
    /// The exercise performed
    pub exercise_id: i64,
    /// Repetitions performed
    pub reps: Option<i32>,
    /// Weight moved, in the account's configured unit
    pub weight: Option<f64>,
    /// Rest before the next set, in seconds
    pub rest_time_seconds: Option<i32>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Whether the set was completed
    pub is_completed: Option<bool>,
}

/// A recorded workout session
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutLog {
    /// Log id
    pub id: i64,
    /// The day of the session, as an ISO `YYYY-MM-DD` date
    pub log_date: String,
    /// Free-form notes
    pub notes: Option<String>,
    /// Whether the session was completed
    pub is_completed: Option<bool>,
    /// Total duration, in minutes
    pub total_duration_minutes: Option<i32>,
    /// The sets performed
    #[serde(default)]
    pub sets: Vec<WorkoutSet>,
}

/// Fields accepted when creating or updating a workout log
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutLogDraft {
    /// The day of the session, as an ISO `YYYY-MM-DD` date
    pub log_date: String,
    /// Free-form notes
    pub notes: Option<String>,
    /// Whether the session was completed
    pub is_completed: Option<bool>,
    /// Total duration, in minutes
    pub total_duration_minutes: Option<i32>,
    /// The sets performed
    pub sets: Vec<WorkoutSet>,
}

/// CRUD over workout logs
#[derive(Debug)]
pub struct WorkoutsApi<'a> {
    pub(crate) client: &'a GymClient,
}

impl WorkoutsApi<'_> {
    /// Lists the account's workout logs
    pub async fn list(&self) -> Result<Vec<WorkoutLog>, ApiError> {
        let url = self.client.backend_url("/api/workouts")?;
        let response = self
            .client
            .backend()
            .get(url)
            .send()
            .await
            .map_err(ApiError::from)?;
        expect_json(response).await
    }

    /// Fetches a single workout log
    pub async fn get(&self, id: i64) -> Result<WorkoutLog, ApiError> {
        let url = self.client.backend_url(&format!("/api/workouts/{id}"))?;
        let response = self
            .client
            .backend()
            .get(url)
            .send()
            .await
            .map_err(ApiError::from)?;
        expect_json(response).await
    }

    /// Fetches the workout log recorded on the given day
    pub async fn by_date(&self, date: &str) -> Result<WorkoutLog, ApiError> {
        let url = self
            .client
            .backend_url(&format!("/api/workouts/date/{date}"))?;
        let response = self
            .client
            .backend()
            .get(url)
            .send()
            .await
            .map_err(ApiError::from)?;
        expect_json(response).await
    }

    /// Records a new workout session
    pub async fn create(&self, draft: &WorkoutLogDraft) -> Result<WorkoutLog, ApiError> {
        let url = self.client.backend_url("/api/workouts")?;
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

    /// Replaces an existing workout log, sets included
    pub async fn update(&self, id: i64, draft: &WorkoutLogDraft) -> Result<WorkoutLog, ApiError> {
        let url = self.client.backend_url(&format!("/api/workouts/{id}"))?;
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

    /// Flips the completion flag of a workout log
    ///
    /// The backend has no dedicated endpoint for this; the log is re-read
    /// and written back with the flag toggled, last write wins.
    pub async fn toggle_completion(&self, id: i64) -> Result<WorkoutLog, ApiError> {
        let current = self.get(id).await?;
        let draft = WorkoutLogDraft {
            log_date: current.log_date.clone(),
            notes: current.notes.clone(),
            is_completed: Some(!current.is_completed.unwrap_or(false)),
            total_duration_minutes: current.total_duration_minutes,
            sets: current.sets.clone(),
        };
        self.update(id, &draft).await
    }
}

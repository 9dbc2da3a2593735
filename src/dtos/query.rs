use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::{config::ListingConfig, models::TaskStatus, validation::ValidationError};

/// Query parameters of `GET /tasks`.
#[derive(Debug, Serialize, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    /// Maximum number of tasks returned. Defaults to 50, values above 500 are clamped.
    pub limit: Option<usize>,
    /// Only return tasks with this status: pending, running, completed or failed.
    #[serde(alias = "status_filter")]
    pub status: Option<String>,
}

impl TaskListQuery {
    /// Resolve into a status filter and an effective limit.
    pub fn resolve(
        &self,
        listing: &ListingConfig,
    ) -> Result<(Option<TaskStatus>, usize), ValidationError> {
        let status = self
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<TaskStatus>)
            .transpose()
            .map_err(|e| ValidationError::new("status", e))?;
        let limit = match self.limit {
            None | Some(0) => listing.default_limit,
            Some(n) => n.min(listing.max_limit),
        };
        Ok((status, limit))
    }
}

/// Query parameters of `DELETE /task/{task_id}`.
#[derive(Debug, Serialize, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CancelQuery {
    /// Recorded as the task's error message. Defaults to "cancelled by caller".
    pub reason: Option<String>,
}

use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use super::TaskStore;

impl TaskStore {
    /// Remove terminal tasks whose last update is at least `max_age` old.
    ///
    /// Pending and running tasks are never removed. Returns the removed ids.
    pub fn sweep(&self, max_age: Duration) -> Vec<Uuid> {
        let Some(cutoff) = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            return Vec::new();
        };

        let candidates: Vec<Uuid> = self
            .tasks
            .iter()
            .filter(|t| t.status.is_terminal() && t.updated_at <= cutoff)
            .map(|t| t.id)
            .collect();

        candidates
            .into_iter()
            .filter(|id| {
                self.tasks
                    .remove_if(id, |_, t| t.status.is_terminal() && t.updated_at <= cutoff)
                    .is_some()
            })
            .collect()
    }
}

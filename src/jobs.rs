//! Status tracking for detached generate and maintenance runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info};
use uuid::Uuid;

/// Finished jobs retained before the oldest are evicted.
pub const DEFAULT_JOB_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Succeeded { report: serde_json::Value },
    Failed { message: String },
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub id: Uuid,
    /// What the job does, e.g. `generate` or `compaction`.
    pub kind: String,
    pub backend: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct JobTable {
    jobs: HashMap<Uuid, JobRecord>,
    /// Finished job ids, oldest first.
    finished: VecDeque<Uuid>,
}

pub struct JobTracker {
    capacity: usize,
    table: Mutex<JobTable>,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new(DEFAULT_JOB_CAPACITY)
    }
}

impl JobTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            table: Mutex::new(JobTable::default()),
        }
    }

    fn table(&self) -> MutexGuard<'_, JobTable> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a running job and return its id.
    pub fn start(&self, kind: &str, backend: &str) -> Uuid {
        let id = Uuid::new_v4();
        let record = JobRecord {
            id,
            kind: kind.to_string(),
            backend: backend.to_string(),
            status: JobStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
        };
        self.table().jobs.insert(id, record);
        id
    }

    /// Record the final status of `id`. Unknown or already finished ids are
    /// ignored.
    pub fn finish(&self, id: Uuid, status: JobStatus) {
        let mut table = self.table();
        let Some(record) = table.jobs.get_mut(&id) else {
            return;
        };
        if record.status.is_finished() {
            return;
        }
        record.status = status;
        record.finished_at = Some(Utc::now());
        table.finished.push_back(id);

        while table.finished.len() > self.capacity {
            if let Some(evicted) = table.finished.pop_front() {
                table.jobs.remove(&evicted);
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<JobRecord> {
        self.table().jobs.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.table().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `task` detached and record its outcome under a fresh job id.
    pub fn spawn<F, T, E>(self: &Arc<Self>, kind: &str, backend: &str, task: F) -> Uuid
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + Send + 'static,
        E: Display + Send + 'static,
    {
        let id = self.start(kind, backend);
        let tracker = Arc::clone(self);
        let kind = kind.to_string();
        let backend = backend.to_string();

        tokio::spawn(async move {
            let status = match task.await {
                Ok(report) => match serde_json::to_value(&report) {
                    Ok(report) => {
                        info!(job = %id, %kind, %backend, "Job succeeded");
                        JobStatus::Succeeded { report }
                    }
                    Err(e) => JobStatus::Failed {
                        message: format!("Failed to encode job report: {e}"),
                    },
                },
                Err(e) => {
                    error!(job = %id, %kind, %backend, "Job failed: {e}");
                    JobStatus::Failed {
                        message: e.to_string(),
                    }
                }
            };
            tracker.finish(id, status);
        });

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn succeeded() -> JobStatus {
        JobStatus::Succeeded {
            report: serde_json::json!({"records": 1}),
        }
    }

    #[test]
    fn test_start_and_finish() {
        let tracker = JobTracker::default();
        let id = tracker.start("generate", "memory");

        let record = tracker.get(&id).unwrap();
        assert_eq!(record.status, JobStatus::Running);
        assert!(record.finished_at.is_none());

        tracker.finish(id, succeeded());
        let record = tracker.get(&id).unwrap();
        assert_eq!(record.status, succeeded());
        assert!(record.finished_at.unwrap() >= record.started_at);

        // A second finish does not overwrite the first.
        tracker.finish(
            id,
            JobStatus::Failed {
                message: "late".to_string(),
            },
        );
        assert_eq!(tracker.get(&id).unwrap().status, succeeded());
    }

    #[test]
    fn test_oldest_finished_jobs_are_evicted() {
        let tracker = JobTracker::new(2);
        let running = tracker.start("gc", "fjall");
        let ids: Vec<Uuid> = (0..3).map(|_| tracker.start("generate", "memory")).collect();
        for id in &ids {
            tracker.finish(*id, succeeded());
        }

        assert!(tracker.get(&ids[0]).is_none());
        assert!(tracker.get(&ids[1]).is_some());
        assert!(tracker.get(&ids[2]).is_some());
        assert!(tracker.get(&running).is_some());
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_status_json_shape() {
        let value = serde_json::to_value(JobStatus::Failed {
            message: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"state": "failed", "message": "boom"}));
    }

    #[tokio::test]
    async fn test_spawn_records_outcome() {
        let tracker = Arc::new(JobTracker::default());
        let ok = tracker.spawn("generate", "memory", async { Ok::<_, String>(7u64) });
        let failed = tracker.spawn("compaction", "fjall", async {
            Err::<u64, _>("disk full".to_string())
        });

        for _ in 0..100 {
            let done = [ok, failed]
                .iter()
                .all(|id| tracker.get(id).is_some_and(|r| r.status.is_finished()));
            if done {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert_eq!(
            tracker.get(&ok).unwrap().status,
            JobStatus::Succeeded {
                report: serde_json::json!(7)
            }
        );
        assert_eq!(
            tracker.get(&failed).unwrap().status,
            JobStatus::Failed {
                message: "disk full".to_string()
            }
        );
    }
}

//! Background persistence of query results.
//!
//! Results are serialized on the caller's thread and written by a bounded
//! set of tokio tasks. A failed write is logged and counted; it never aborts
//! the remaining writes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of a batch of writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistSummary {
    pub written: usize,
    pub failed: usize,
}

enum WriteResult {
    Written(PathBuf),
    Failed(PathBuf, String),
}

/// Semaphore-bounded pool of JSON writers.
pub struct PersistPool {
    semaphore: Arc<Semaphore>,
    handles: Vec<JoinHandle<WriteResult>>,
    started: Instant,
}

impl PersistPool {
    pub fn new(workers: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
            handles: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Queue `value` to be written as pretty JSON to `path`.
    ///
    /// Waits for a free writer, so at most `workers` writes are in flight.
    pub async fn submit<T: Serialize>(&mut self, path: PathBuf, value: &T) {
        let bytes = match serde_json::to_vec_pretty(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to serialize result");
                self.handles
                    .push(tokio::spawn(async move { WriteResult::Failed(path, e.to_string()) }));
                return;
            }
        };

        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!(error = %e, "Persist pool closed");
                return;
            }
        };

        self.handles.push(tokio::spawn(async move {
            let result = match write_json(&path, &bytes).await {
                Ok(()) => WriteResult::Written(path),
                Err(e) => WriteResult::Failed(path, format!("{:#}", e)),
            };
            drop(permit);
            result
        }));
    }

    /// Number of writes queued so far.
    pub fn pending(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every queued write and summarize.
    pub async fn finish(self) -> PersistSummary {
        let mut summary = PersistSummary::default();
        for handle in self.handles {
            match handle.await {
                Ok(WriteResult::Written(path)) => {
                    debug!(path = %path.display(), "Result written");
                    summary.written += 1;
                }
                Ok(WriteResult::Failed(path, error)) => {
                    warn!(path = %path.display(), error = %error, "Failed to write result");
                    summary.failed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Persist task panicked");
                    summary.failed += 1;
                }
            }
        }

        info!(
            written = summary.written,
            failed = summary.failed,
            duration_ms = self.started.elapsed().as_millis() as u64,
            "Persistence complete"
        );
        summary
    }
}

async fn write_json(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_writes_every_result() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = PersistPool::new(2);
        for i in 0..5 {
            let path = dir.path().join("nested").join(format!("r{}.json", i));
            pool.submit(path, &json!({ "index": i })).await;
        }
        assert_eq!(pool.pending(), 5);

        let summary = pool.finish().await;
        assert_eq!(summary, PersistSummary { written: 5, failed: 0 });

        let text = std::fs::read_to_string(dir.path().join("nested/r3.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["index"], 3);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let mut pool = PersistPool::new(1);
        pool.submit(blocker.join("bad.json"), &json!(1)).await;
        pool.submit(dir.path().join("good.json"), &json!(2)).await;

        let summary = pool.finish().await;
        assert_eq!(summary.written, 1);
        assert_eq!(summary.failed, 1);
        assert!(dir.path().join("good.json").exists());
    }

    #[test]
    fn test_empty_pool_finishes() {
        let summary = tokio_test::block_on(PersistPool::new(3).finish());
        assert_eq!(summary, PersistSummary::default());
    }
}

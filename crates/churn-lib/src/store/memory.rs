//! In-process prediction store with optional JSON-lines journal

use super::{HistoryPage, HistoryQuery, PredictionStore};
use crate::error::StoreError;
use crate::models::PredictionRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Journal {
    path: PathBuf,
    // Serialises appends and truncation
    lock: Mutex<()>,
}

/// Records keyed by id. With a journal every save is appended as one
/// JSON line and the file is replayed on open.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: DashMap<String, PredictionRecord>,
    journal: Option<Journal>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a journal-backed store, replaying existing records.
    /// Lines that fail to parse are skipped.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let records = DashMap::new();
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let mut skipped = 0usize;
                for (line_no, line) in contents.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<PredictionRecord>(line) {
                        Ok(record) => {
                            records.insert(record.id.clone(), record);
                        }
                        Err(e) => {
                            skipped += 1;
                            warn!(
                                path = %path.display(),
                                line = line_no + 1,
                                error = %e,
                                "Skipping corrupt prediction record"
                            );
                        }
                    }
                }
                info!(
                    path = %path.display(),
                    records = records.len(),
                    skipped = skipped,
                    "Replayed prediction journal"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No prediction journal yet, starting empty");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            records,
            journal: Some(Journal {
                path,
                lock: Mutex::new(()),
            }),
        })
    }

    pub fn journal_path(&self) -> Option<&Path> {
        self.journal.as_ref().map(|j| j.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn snapshot_for(&self, user_id: &str) -> Vec<PredictionRecord> {
        self.records
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl PredictionStore for InMemoryStore {
    async fn save(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        let Some(journal) = &self.journal else {
            self.records.insert(record.id.clone(), record.clone());
            return Ok(());
        };

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        // held across the insert so a concurrent purge sees both or neither
        let _guard = journal.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&journal.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        query: &HistoryQuery,
    ) -> Result<HistoryPage, StoreError> {
        Ok(query.apply(self.snapshot_for(user_id)))
    }

    async fn all_for_user(&self, user_id: &str) -> Result<Vec<PredictionRecord>, StoreError> {
        let mut records = self.snapshot_for(user_id);
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn purge(&self) -> Result<u64, StoreError> {
        let removed = match &self.journal {
            Some(journal) => {
                let _guard = journal.lock.lock().await;
                tokio::fs::write(&journal.path, b"").await?;
                let removed = self.records.len();
                self.records.clear();
                removed
            }
            None => {
                let removed = self.records.len();
                self.records.clear();
                removed
            }
        };
        Ok(removed as u64)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomerRecord, FeatureContribution, Impact, PredictionLabel, RiskLevel};
    use chrono::{Duration, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    fn record(id: &str, user: &str, age_secs: i64) -> PredictionRecord {
        PredictionRecord {
            id: id.to_string(),
            timestamp: Utc::now() - Duration::seconds(age_secs),
            customer_data: CustomerRecord::try_from(json!({"tenure": [3], "contract": "Month-to-month"}))
                .unwrap(),
            prediction: PredictionLabel::Churn,
            probability: 0.82,
            risk_level: RiskLevel::VeryHigh,
            shap_values: vec![FeatureContribution::new("Tenure", 0.376, Impact::Positive)],
            user_id: user.to_string(),
        }
    }

    #[tokio::test]
    async fn test_history_is_scoped_to_user() {
        let store = InMemoryStore::new();
        store.save(&record("a", "alice", 30)).await.unwrap();
        store.save(&record("b", "bob", 20)).await.unwrap();
        store.save(&record("c", "alice", 10)).await.unwrap();

        let page = store.find_by_user("alice", &HistoryQuery::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.predictions[0].id, "c");

        let all = store.all_for_user("bob").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_journal_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("predictions.jsonl");

        let original = record("a", "alice", 0);
        {
            let store = InMemoryStore::open(&path).await.unwrap();
            store.save(&original).await.unwrap();
            store.save(&record("b", "alice", 5)).await.unwrap();
        }

        let reopened = InMemoryStore::open(&path).await.unwrap();
        assert_eq!(reopened.len(), 2);
        let all = reopened.all_for_user("alice").await.unwrap();
        let restored = all.iter().find(|r| r.id == "a").unwrap();
        assert_eq!(restored, &original);
    }

    #[tokio::test]
    async fn test_corrupt_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predictions.jsonl");
        let good = serde_json::to_string(&record("good", "alice", 0)).unwrap();
        tokio::fs::write(&path, format!("{good}\n{{not json\n\n")).await.unwrap();

        let store = InMemoryStore::open(&path).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_purge_truncates_journal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predictions.jsonl");
        let store = InMemoryStore::open(&path).await.unwrap();
        store.save(&record("a", "alice", 0)).await.unwrap();
        store.save(&record("b", "bob", 0)).await.unwrap();

        assert_eq!(store.purge().await.unwrap(), 2);
        assert!(store.is_empty());
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "");

        let reopened = InMemoryStore::open(&path).await.unwrap();
        assert!(reopened.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_save_and_purge_keep_journal_in_step() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predictions.jsonl");
        let store = std::sync::Arc::new(InMemoryStore::open(&path).await.unwrap());

        let mut tasks = Vec::new();
        for i in 0..200 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                if i % 25 == 0 {
                    store.purge().await.unwrap();
                } else {
                    store.save(&record(&format!("r{i}"), "alice", 0)).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let reopened = InMemoryStore::open(&path).await.unwrap();
        assert_eq!(reopened.len(), store.len());
        for entry in store.records.iter() {
            assert!(reopened.records.contains_key(entry.key()));
        }
    }
}

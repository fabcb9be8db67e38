use crate::models::{ApartmentPatch, ApartmentRecord};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize apartments: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Default)]
struct Loaded {
    records: Vec<ApartmentRecord>,
    /// Some or all of the file could not be read as records
    damaged: bool,
}

/// Result of saving a new record
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(ApartmentRecord),
    /// A record with the same source url is already stored; nothing was written.
    Duplicate(ApartmentRecord),
}

/// Per-user apartment collections, one JSON array file per user.
///
/// Every mutation is a read-modify-write of the owner's whole file. There
/// is no locking: two concurrent mutations for the same user can race and
/// the last rename wins.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of a user's file. The user id is percent-encoded so it can
    /// neither leave the data directory nor collide with another user.
    pub fn user_file(&self, user_id: &str) -> PathBuf {
        self.data_dir
            .join(format!("apartments_{}.json", urlencoding::encode(user_id)))
    }

    /// All records of a user, newest-added first by convention.
    pub async fn list(&self, user_id: &str) -> StoreResult<Vec<ApartmentRecord>> {
        Ok(self.load(user_id).await?.records)
    }

    async fn load(&self, user_id: &str) -> StoreResult<Loaded> {
        let path = self.user_file(user_id);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(user_id, "No apartment file yet");
                return Ok(Loaded::default());
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        let entries = match serde_json::from_str::<Vec<serde_json::Value>>(&data) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(user_id, path = %path.display(), error = %e, "Malformed apartment file, treating as empty");
                return Ok(Loaded {
                    records: Vec::new(),
                    damaged: true,
                });
            }
        };

        let mut loaded = Loaded::default();
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<ApartmentRecord>(entry) {
                Ok(record) => loaded.records.push(record),
                Err(e) => {
                    warn!(user_id, index, error = %e, "Skipping unreadable apartment entry");
                    loaded.damaged = true;
                }
            }
        }
        Ok(loaded)
    }

    /// Load for a read-modify-write. When the file could not be read in
    /// full, the original is copied to `*.json.corrupt` first so the
    /// rewrite cannot lose it.
    async fn load_for_write(&self, user_id: &str) -> StoreResult<Vec<ApartmentRecord>> {
        let loaded = self.load(user_id).await?;
        if loaded.damaged {
            let path = self.user_file(user_id);
            let backup = path.with_extension("json.corrupt");
            tokio::fs::copy(&path, &backup)
                .await
                .map_err(|source| StoreError::Write {
                    path: backup.clone(),
                    source,
                })?;
            warn!(user_id, backup = %backup.display(), "Kept a copy of the damaged apartment file");
        }
        Ok(loaded.records)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> StoreResult<Option<ApartmentRecord>> {
        Ok(self
            .list(user_id)
            .await?
            .into_iter()
            .find(|record| record.id == id))
    }

    /// Prepend a record to the user's collection unless its source url is
    /// already tracked. Manual entries are never deduplicated.
    pub async fn create(
        &self,
        user_id: &str,
        mut record: ApartmentRecord,
    ) -> StoreResult<CreateOutcome> {
        let mut records = self.load_for_write(user_id).await?;

        if !record.is_manual() {
            if let Some(existing) = records.iter().find(|r| r.url == record.url) {
                info!(user_id, url = %record.url, "Apartment already exists, skipping");
                return Ok(CreateOutcome::Duplicate(existing.clone()));
            }
        }

        record.user_id = user_id.to_string();
        records.insert(0, record.clone());
        self.persist(user_id, &records).await?;

        info!(user_id, id = %record.id, "Saved apartment");
        Ok(CreateOutcome::Created(record))
    }

    /// Merge `patch` into the record with `id`. Returns `None`, without
    /// writing, when no such record exists.
    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        patch: ApartmentPatch,
    ) -> StoreResult<Option<ApartmentRecord>> {
        let mut records = self.load_for_write(user_id).await?;

        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            debug!(user_id, id, "Update for unknown apartment ignored");
            return Ok(None);
        };
        patch.apply_to(record);
        let updated = record.clone();

        self.persist(user_id, &records).await?;
        debug!(user_id, id, "Updated apartment");
        Ok(Some(updated))
    }

    /// Remove the record with `id`. The file is rewritten only when a
    /// record was actually removed.
    pub async fn delete(&self, user_id: &str, id: &str) -> StoreResult<bool> {
        let mut records = self.load_for_write(user_id).await?;
        let before = records.len();
        records.retain(|r| r.id != id);

        if records.len() == before {
            debug!(user_id, id, "Delete for unknown apartment ignored");
            return Ok(false);
        }

        self.persist(user_id, &records).await?;
        info!(user_id, id, "Deleted apartment");
        Ok(true)
    }

    async fn persist(&self, user_id: &str, records: &[ApartmentRecord]) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|source| StoreError::Write {
                path: self.data_dir.clone(),
                source,
            })?;

        let path = self.user_file(user_id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(records)?;

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|source| StoreError::Write {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Write { path, source })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use tempfile::TempDir;

    fn record(id: &str, url: &str) -> ApartmentRecord {
        ApartmentRecord {
            id: id.to_string(),
            url: url.to_string(),
            price: "5,000".to_string(),
            address: "Herzl 1, Haifa".to_string(),
            ..Default::default()
        }
    }

    fn store() -> (TempDir, JsonFileStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("data"));
        (dir, store)
    }

    #[tokio::test]
    async fn list_without_file_is_empty() {
        let (_dir, store) = store();
        assert!(store.list("nobody@example.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_file_reads_as_empty() {
        let (_dir, store) = store();
        tokio::fs::create_dir_all(store.data_dir()).await.unwrap();
        tokio::fs::write(store.user_file("u1"), "{ not json")
            .await
            .unwrap();

        assert!(store.list("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_prepends_and_sets_owner() {
        let (_dir, store) = store();
        store.create("u1", record("a", "https://x/1")).await.unwrap();
        store.create("u1", record("b", "https://x/2")).await.unwrap();

        let records = store.list("u1").await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(records.iter().all(|r| r.user_id == "u1"));
    }

    #[tokio::test]
    async fn duplicate_url_keeps_first_record() {
        let (_dir, store) = store();
        store.create("u1", record("a", "https://x/1")).await.unwrap();
        let outcome = store.create("u1", record("b", "https://x/1")).await.unwrap();

        assert!(matches!(outcome, CreateOutcome::Duplicate(ref r) if r.id == "a"));
        let records = store.list("u1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "a");
    }

    #[tokio::test]
    async fn manual_entries_are_not_deduplicated() {
        let (_dir, store) = store();
        store.create("u1", record("a", "manual-1")).await.unwrap();
        store.create("u1", record("b", "manual-1")).await.unwrap();

        assert_eq!(store.list("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn users_do_not_see_each_other() {
        let (_dir, store) = store();
        store.create("alice@example.com", record("a", "https://x/1")).await.unwrap();

        assert!(store.list("bob@example.com").await.unwrap().is_empty());
        assert!(store.get("bob@example.com", "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_id_cannot_escape_data_dir() {
        let (_dir, store) = store();
        let path = store.user_file("../../etc/passwd");
        assert_eq!(path.parent().unwrap(), store.data_dir());
        assert_ne!(store.user_file("a/b"), store.user_file("a_b"));
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let (_dir, store) = store();
        store.create("u1", record("a", "https://x/1")).await.unwrap();

        let updated = store
            .update("u1", "a", ApartmentPatch::status("a", Status::Visited))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, Status::Visited);
        assert_eq!(updated.price, "5,000");

        let stored = store.get("u1", "a").await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn update_unknown_id_changes_nothing() {
        let (_dir, store) = store();
        store.create("u1", record("a", "https://x/1")).await.unwrap();
        let before = store.list("u1").await.unwrap();

        let result = store
            .update("u1", "missing", ApartmentPatch::status("missing", Status::Visited))
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(store.list("u1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one() {
        let (_dir, store) = store();
        store.create("u1", record("a", "https://x/1")).await.unwrap();
        store.create("u1", record("b", "https://x/2")).await.unwrap();

        assert!(store.delete("u1", "a").await.unwrap());
        assert!(store.get("u1", "a").await.unwrap().is_none());
        assert_eq!(store.list("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_unknown_id_does_not_create_file() {
        let (_dir, store) = store();
        assert!(!store.delete("u1", "a").await.unwrap());
        assert!(!store.user_file("u1").exists());
    }

    #[tokio::test]
    async fn null_fields_from_older_clients_do_not_lose_records() {
        let (_dir, store) = store();
        tokio::fs::create_dir_all(store.data_dir()).await.unwrap();
        let legacy = serde_json::json!([
            { "id": "keep1", "url": "https://x/1", "price": "5,000", "rooms": null },
            { "id": "keep2", "url": "https://x/2", "price": "6,000", "rooms": 3 }
        ]);
        tokio::fs::write(store.user_file("u1"), legacy.to_string())
            .await
            .unwrap();

        assert_eq!(store.list("u1").await.unwrap().len(), 2);
        store.create("u1", record("new", "https://x/3")).await.unwrap();

        let ids: Vec<_> = store
            .list("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["new", "keep1", "keep2"]);
        assert!(!store.user_file("u1").with_extension("json.corrupt").exists());
    }

    #[tokio::test]
    async fn unparseable_file_is_kept_aside_before_rewrite() {
        let (_dir, store) = store();
        tokio::fs::create_dir_all(store.data_dir()).await.unwrap();
        tokio::fs::write(store.user_file("u1"), "{ not json")
            .await
            .unwrap();

        store.create("u1", record("a", "https://x/1")).await.unwrap();

        let backup = store.user_file("u1").with_extension("json.corrupt");
        assert_eq!(tokio::fs::read_to_string(&backup).await.unwrap(), "{ not json");
        assert_eq!(store.list("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unreadable_entry_is_skipped_and_file_kept_aside() {
        let (_dir, store) = store();
        tokio::fs::create_dir_all(store.data_dir()).await.unwrap();
        tokio::fs::write(
            store.user_file("u1"),
            r#"[42, {"id": "keep", "url": "https://x/1"}]"#,
        )
        .await
        .unwrap();

        let records = store.list("u1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "keep");

        assert!(store.delete("u1", "keep").await.unwrap());
        assert!(store.user_file("u1").with_extension("json.corrupt").exists());
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let (_dir, store) = store();
        // A directory where the temp file should go makes the write fail
        let tmp = store.user_file("u1").with_extension("json.tmp");
        tokio::fs::create_dir_all(&tmp).await.unwrap();

        let err = store
            .create("u1", record("a", "https://x/1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert!(!store.user_file("u1").exists());
    }
}

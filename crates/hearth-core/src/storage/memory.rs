use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{encode_object_path, normalize_object_path, ObjectStorage, Upload};
use crate::{Error, Result};

const PUBLIC_BASE: &str = "https://storage.invalid/storage/v1/object/public";

#[derive(Default)]
struct State {
    objects: BTreeMap<String, Upload>,
    failing_removes: bool,
    failing_uploads: bool,
}

/// Bucket held in memory, with failure injection for tests.
#[derive(Clone)]
pub struct InMemoryStorage {
    bucket: String,
    state: Arc<Mutex<State>>,
}

impl InMemoryStorage {
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Stored object paths in sorted order.
    pub fn paths(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.objects.keys().cloned().collect())
    }

    pub fn get(&self, path: &str) -> Result<Option<Upload>> {
        Ok(self.lock()?.objects.get(path.trim_matches('/')).cloned())
    }

    pub fn fail_uploads(&self, failing: bool) -> Result<()> {
        self.lock()?.failing_uploads = failing;
        Ok(())
    }

    pub fn fail_removes(&self, failing: bool) -> Result<()> {
        self.lock()?.failing_removes = failing;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|error| Error::Storage(format!("in-memory bucket poisoned: {error}")))
    }
}

impl ObjectStorage for InMemoryStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn upload(&self, path: &str, upload: &Upload, upsert: bool) -> Result<()> {
        let path = normalize_object_path(path)?;
        let mut state = self.lock()?;
        if state.failing_uploads {
            return Err(Error::Storage(format!("simulated upload failure for {path}")));
        }
        if !upsert && state.objects.contains_key(&path) {
            return Err(Error::Storage(format!(
                "{}/{path} already exists",
                self.bucket
            )));
        }
        state.objects.insert(path, upload.clone());
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{PUBLIC_BASE}/{}/{}",
            self.bucket,
            encode_object_path(path.trim_matches('/'))
        )
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        let paths: HashSet<String> = paths
            .iter()
            .map(|path| normalize_object_path(path))
            .collect::<Result<_>>()?;
        let mut state = self.lock()?;
        if state.failing_removes {
            return Err(Error::Storage("simulated remove failure".to_string()));
        }
        state.objects.retain(|path, _| !paths.contains(path));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::storage::object_path_from_public_url;

    #[tokio::test]
    async fn upload_respects_upsert_flag() {
        let storage = InMemoryStorage::new("media");
        let first = Upload::new("a.png", vec![1]);
        let second = Upload::new("a.png", vec![2]);

        storage.upload("u/a.png", &first, false).await.unwrap();
        assert!(storage.upload("u/a.png", &second, false).await.is_err());
        storage.upload("u/a.png", &second, true).await.unwrap();
        assert_eq!(storage.get("u/a.png").unwrap().unwrap().bytes, vec![2]);
    }

    #[tokio::test]
    async fn remove_ignores_missing_objects() {
        let storage = InMemoryStorage::new("media");
        storage
            .upload("gallery/1-a.png", &Upload::new("a.png", vec![1]), false)
            .await
            .unwrap();
        storage
            .remove(&["gallery/1-a.png".to_string(), "gallery/missing.png".to_string()])
            .await
            .unwrap();
        assert!(storage.paths().unwrap().is_empty());
    }

    #[test]
    fn public_urls_resolve_back_to_paths() {
        let storage = InMemoryStorage::new("media");
        let url = storage.public_url("gallery/1-a.png");
        assert_eq!(
            object_path_from_public_url(&url, "media"),
            Some("gallery/1-a.png".to_string())
        );
    }
}

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::PublicPage;
use crate::backend::{by_id, expect_affected, Backend, Query, Table};
use crate::models::{GalleryPhoto, PhotoId};
use crate::optimistic::apply_optimistic;
use crate::storage::{gallery_object_path, object_path_from_public_url, ObjectStorage, Upload};
use crate::{Error, Result};

#[derive(Deserialize)]
struct PhotoUrl {
    url: String,
}

impl<B: Backend, S: ObjectStorage> PublicPage<B, S> {
    pub async fn load_gallery(&mut self) -> Result<usize> {
        let query = Query::new()
            .select("id,url,created_at")
            .order("created_at", false);
        self.photos = self.backend.fetch(Table::Gallery, &query).await?;
        Ok(self.photos.len())
    }

    /// Photos, newest first.
    #[must_use]
    pub fn photos(&self) -> &[GalleryPhoto] {
        &self.photos
    }

    /// Store the photo, record its public URL and show it first.
    ///
    /// If the row cannot be written the uploaded object is removed again.
    pub async fn upload_photo(&mut self, upload: &Upload, now: DateTime<Utc>) -> Result<String> {
        if upload.is_empty() {
            return Err(Error::InvalidInput(
                "Please select a photo to upload.".to_string(),
            ));
        }

        let path = gallery_object_path(&upload.file_name, now);
        self.storage.upload(&path, upload, false).await?;
        let url = self.storage.public_url(&path);

        let photo: GalleryPhoto = match self
            .backend
            .insert_record(Table::Gallery, &json!({ "url": url }))
            .await
        {
            Ok(photo) => photo,
            Err(error) => {
                if let Err(cleanup) = self.storage.remove(&[path]).await {
                    tracing::warn!("Could not remove orphaned gallery upload: {cleanup}");
                }
                return Err(error);
            }
        };
        tracing::info!("Uploaded gallery photo {}", photo.id);
        self.photos.insert(0, photo);
        Ok(url)
    }

    /// Delete a photo's row, then its stored object.
    ///
    /// A missing id is rejected before anything is read or written. Once the
    /// row is gone a storage failure is only logged.
    pub async fn delete_photo(&mut self, id: Option<PhotoId>) -> Result<()> {
        let id = id.ok_or_else(|| {
            Error::InvalidInput("Photo id is missing; nothing was deleted.".to_string())
        })?;

        let url = match self.photos.iter().find(|photo| photo.id == id) {
            Some(photo) => photo.url.clone(),
            None => {
                let photo: PhotoUrl = self
                    .backend
                    .fetch_one(Table::Gallery, &by_id(id).select("url"))
                    .await?;
                photo.url
            }
        };
        let path = object_path_from_public_url(&url, self.storage.bucket())
            .ok_or_else(|| Error::Storage(format!("cannot find object path in {url}")))?;

        let backend = &self.backend;
        let write = async move {
            let affected = backend.delete(Table::Gallery, &by_id(id)).await?;
            expect_affected(Table::Gallery, affected, id)
        };
        apply_optimistic(
            &mut self.photos,
            |photos| photos.retain(|photo| photo.id != id),
            write,
        )
        .await?;
        tracing::info!("Deleted gallery photo {id}");

        if let Err(error) = self.storage.remove(&[path]).await {
            tracing::warn!("Gallery photo {id} row removed but its file was not: {error}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::public::tests::page;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn uploaded_then_deleted_photo_leaves_nothing_behind() {
        let (mut page, backend, storage) = page();
        let url = page
            .upload_photo(&Upload::new("Beach Day.jpg", vec![0xFF, 0xD8]), now())
            .await
            .unwrap();

        assert_eq!(page.photos().len(), 1);
        assert_eq!(page.photos()[0].url, url);
        assert_eq!(storage.paths().unwrap().len(), 1);
        assert!(storage.paths().unwrap()[0].starts_with("gallery/"));

        let id = page.photos()[0].id;
        page.delete_photo(Some(id)).await.unwrap();

        assert!(page.photos().is_empty());
        assert!(storage.paths().unwrap().is_empty());
        assert!(backend.rows(Table::Gallery).unwrap().is_empty());
        page.load_gallery().await.unwrap();
        assert!(page.photos().is_empty());
    }

    #[tokio::test]
    async fn missing_id_is_rejected_before_any_call() {
        let (mut page, backend, _) = page();
        backend.fail_writes(Table::Gallery, true).unwrap();
        let error = page.delete_photo(None).await.unwrap_err();
        assert!(error.is_validation());
    }

    #[tokio::test]
    async fn failed_row_delete_keeps_stored_object() {
        let (mut page, backend, storage) = page();
        page.upload_photo(&Upload::new("a.png", vec![1]), now())
            .await
            .unwrap();
        let id = page.photos()[0].id;
        backend.fail_writes(Table::Gallery, true).unwrap();

        assert!(page.delete_photo(Some(id)).await.is_err());
        assert_eq!(storage.paths().unwrap().len(), 1);
        assert_eq!(page.photos().len(), 1);
    }

    #[tokio::test]
    async fn storage_failure_after_row_delete_still_drops_photo() {
        let (mut page, backend, storage) = page();
        page.upload_photo(&Upload::new("a.png", vec![1]), now())
            .await
            .unwrap();
        let id = page.photos()[0].id;
        storage.fail_removes(true).unwrap();

        page.delete_photo(Some(id)).await.unwrap();

        assert!(page.photos().is_empty());
        assert!(backend.rows(Table::Gallery).unwrap().is_empty());
        assert_eq!(storage.paths().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_row_insert_removes_uploaded_photo() {
        let (mut page, backend, storage) = page();
        backend.fail_writes(Table::Gallery, true).unwrap();

        let result = page
            .upload_photo(&Upload::new("a.png", vec![1]), now())
            .await;

        assert!(result.is_err());
        assert!(storage.paths().unwrap().is_empty());
        assert!(page.photos().is_empty());
    }

    #[tokio::test]
    async fn uploads_show_newest_first_without_reload() {
        let (mut page, backend, _) = page();
        page.upload_photo(&Upload::new("first.png", vec![1]), now())
            .await
            .unwrap();
        let later = now() + chrono::Duration::seconds(5);
        let url = page
            .upload_photo(&Upload::new("second.png", vec![2]), later)
            .await
            .unwrap();

        assert_eq!(page.photos().len(), 2);
        assert_eq!(page.photos()[0].url, url);
        assert_eq!(backend.rows(Table::Gallery).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_photo_is_not_found() {
        let (mut page, _, _) = page();
        let error = page.delete_photo(Some(PhotoId(9))).await.unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
    }
}

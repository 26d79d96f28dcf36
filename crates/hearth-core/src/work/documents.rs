use chrono::{DateTime, Utc};

use super::WorkDashboard;
use crate::backend::{by_id, expect_affected, Backend, Query, Table};
use crate::models::{Document, DocumentId, NewDocument};
use crate::optimistic::apply_optimistic;
use crate::storage::{document_object_path, ObjectStorage, Upload};
use crate::{Error, Result};

impl<B: Backend, S: ObjectStorage> WorkDashboard<B, S> {
    pub async fn load_documents(&mut self) -> Result<usize> {
        let query = Query::new()
            .select("*")
            .eq("user_id", self.user_id)
            .order("created_at", false);
        self.documents = self.backend.fetch(Table::Documents, &query).await?;
        Ok(self.documents.len())
    }

    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Store the file under the user's documents prefix, then record it.
    ///
    /// If the row cannot be written the uploaded object is removed again.
    pub async fn upload_document(
        &mut self,
        name: &str,
        file: Option<&Upload>,
        now: DateTime<Utc>,
    ) -> Result<DocumentId> {
        let name = name.trim();
        let file = file.filter(|file| !file.is_empty());
        let (false, Some(file)) = (name.is_empty(), file) else {
            return Err(Error::InvalidInput(
                "Please provide a name and select a file to upload.".to_string(),
            ));
        };

        let path = document_object_path(self.user_id, &file.file_name, now);
        self.storage.upload(&path, file, false).await?;
        let row = NewDocument {
            user_id: self.user_id,
            name: name.to_string(),
            file_url: self.storage.public_url(&path),
            file_path: path.clone(),
        };

        let document: Document = match self.backend.insert_record(Table::Documents, &row).await {
            Ok(document) => document,
            Err(error) => {
                if let Err(cleanup) = self.storage.remove(&[path]).await {
                    tracing::warn!("Could not remove orphaned upload: {cleanup}");
                }
                return Err(error);
            }
        };
        tracing::info!("Uploaded document {}", document.id);
        let id = document.id;
        self.documents.insert(0, document);
        Ok(id)
    }

    /// Delete the row, then the stored file.
    ///
    /// Once the row is gone the document is gone for the user, so a storage
    /// failure afterwards is only logged.
    pub async fn delete_document(&mut self, id: DocumentId) -> Result<()> {
        let file_path = self
            .documents
            .iter()
            .find(|document| document.id == id)
            .map(|document| document.file_path.clone())
            .ok_or_else(|| Error::NotFound(format!("document {id}")))?;

        let backend = &self.backend;
        let write = async move {
            let affected = backend.delete(Table::Documents, &by_id(id)).await?;
            expect_affected(Table::Documents, affected, id)
        };
        apply_optimistic(
            &mut self.documents,
            |documents| documents.retain(|document| document.id != id),
            write,
        )
        .await?;

        if let Err(error) = self.storage.remove(&[file_path]).await {
            tracing::warn!("Document {id} row removed but its file was not: {error}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::work::tests::{dashboard, now};

    fn lease() -> Upload {
        Upload::new("lease 2024.pdf", b"%PDF-1.7".to_vec())
    }

    #[tokio::test]
    async fn upload_stores_file_under_user_prefix() {
        let (mut dashboard, backend, storage) = dashboard();
        let id = dashboard
            .upload_document("Lease", Some(&lease()), now())
            .await
            .unwrap();

        let document = &dashboard.documents()[0];
        assert_eq!(document.id, id);
        assert!(document
            .file_path
            .starts_with(&format!("{}/documents/", dashboard.user_id())));
        assert_eq!(storage.paths().unwrap(), vec![document.file_path.clone()]);
        assert!(document.file_url.ends_with(&document.file_path));
        assert_eq!(backend.rows(Table::Documents).unwrap()[0]["document_name"], "Lease");
    }

    #[tokio::test]
    async fn upload_requires_name_and_file() {
        let (mut dashboard, _, storage) = dashboard();
        let cases = [
            ("", Some(lease())),
            ("Lease", None),
            ("Lease", Some(Upload::new("x.pdf", Vec::new()))),
        ];
        for (name, file) in cases {
            let error = dashboard
                .upload_document(name, file.as_ref(), now())
                .await
                .unwrap_err();
            assert!(error.is_validation());
        }
        assert!(storage.paths().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_row_insert_removes_uploaded_file() {
        let (mut dashboard, backend, storage) = dashboard();
        backend.fail_writes(Table::Documents, true).unwrap();
        assert!(dashboard
            .upload_document("Lease", Some(&lease()), now())
            .await
            .is_err());
        assert!(storage.paths().unwrap().is_empty());
        assert!(dashboard.documents().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_after_row_delete_is_not_an_error() {
        let (mut dashboard, backend, storage) = dashboard();
        let id = dashboard
            .upload_document("Lease", Some(&lease()), now())
            .await
            .unwrap();
        storage.fail_removes(true).unwrap();

        dashboard.delete_document(id).await.unwrap();
        assert!(dashboard.documents().is_empty());
        assert!(backend.rows(Table::Documents).unwrap().is_empty());
        assert_eq!(storage.paths().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_row_delete_keeps_document_and_file() {
        let (mut dashboard, backend, storage) = dashboard();
        let later = Utc.with_ymd_and_hms(2024, 6, 11, 8, 0, 0).unwrap();
        let id = dashboard
            .upload_document("Lease", Some(&lease()), later)
            .await
            .unwrap();
        backend.fail_writes(Table::Documents, true).unwrap();

        assert!(dashboard.delete_document(id).await.is_err());
        assert_eq!(dashboard.documents().len(), 1);
        assert_eq!(storage.paths().unwrap().len(), 1);
    }
}

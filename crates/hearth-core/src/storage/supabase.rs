//! Storage REST API (`/storage/v1`).

use reqwest::{Client, RequestBuilder};
use serde_json::json;

use super::{encode_object_path, normalize_object_path, ObjectStorage, Upload};
use crate::config::ClientConfig;
use crate::util::parse_api_error;
use crate::{Error, Result};

#[derive(Clone)]
pub struct SupabaseStorage {
    base_url: String,
    bucket: String,
    anon_key: String,
    access_token: Option<String>,
    client: Client,
}

impl SupabaseStorage {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            base_url: format!("{}/storage/v1", config.supabase_url),
            bucket: config.storage_bucket.clone(),
            anon_key: config.supabase_anon_key.clone(),
            access_token: None,
            client: Client::builder().build()?,
        })
    }

    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request.header("apikey", &self.anon_key).bearer_auth(bearer)
    }

    async fn send(&self, operation: &str, target: &str, request: RequestBuilder) -> Result<()> {
        let response = self.authorize(request).send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(storage_error(
            operation,
            &self.bucket,
            target,
            parse_api_error(status, &body),
        ))
    }
}

impl ObjectStorage for SupabaseStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn upload(&self, path: &str, upload: &Upload, upsert: bool) -> Result<()> {
        let path = normalize_object_path(path)?;
        let url = format!(
            "{}/object/{}/{}",
            self.base_url,
            self.bucket,
            encode_object_path(&path)
        );
        let request = self
            .client
            .post(url)
            .header("Content-Type", &upload.content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(upload.bytes.clone());
        self.send("upload", &path, request).await?;
        tracing::debug!("Uploaded {} bytes to {}/{path}", upload.bytes.len(), self.bucket);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.base_url,
            self.bucket,
            encode_object_path(path.trim_matches('/'))
        )
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        let paths = paths
            .iter()
            .map(|path| normalize_object_path(path))
            .collect::<Result<Vec<_>>>()?;
        if paths.is_empty() {
            return Ok(());
        }
        let request = self
            .client
            .delete(format!("{}/object/{}", self.base_url, self.bucket))
            .json(&json!({ "prefixes": paths }));
        self.send("remove", &paths.join(","), request).await
    }
}

fn storage_error(operation: &str, bucket: &str, target: &str, error: impl std::fmt::Display) -> Error {
    Error::Storage(format!("{operation} failed for {bucket}/{target}: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SupabaseStorage {
        let config = ClientConfig::new("https://demo.supabase.co", "anon").unwrap();
        SupabaseStorage::new(&config).unwrap()
    }

    #[test]
    fn public_url_points_at_public_bucket_path() {
        assert_eq!(
            storage().public_url("/gallery/1-a b.png"),
            "https://demo.supabase.co/storage/v1/object/public/media/gallery/1-a%20b.png"
        );
    }

    #[test]
    fn public_url_round_trips_through_path_recovery() {
        let storage = storage();
        let url = storage.public_url("user/documents/2-tax.pdf");
        assert_eq!(
            super::super::object_path_from_public_url(&url, storage.bucket()),
            Some("user/documents/2-tax.pdf".to_string())
        );
    }

    #[tokio::test]
    async fn empty_paths_are_rejected_before_any_request() {
        let error = storage()
            .upload("  / ", &Upload::new("a.png", vec![1]), false)
            .await
            .unwrap_err();
        assert!(error.is_validation());
    }
}

//! Object storage for photos, documents and profile icons.

mod memory;
mod supabase;

use std::path::Path;

use chrono::{DateTime, Utc};
use url::Url;

use crate::models::UserId;
use crate::{Error, Result};

pub use memory::InMemoryStorage;
pub use supabase::SupabaseStorage;

/// Upload / public URL / remove against one bucket.
#[allow(async_fn_in_trait)]
pub trait ObjectStorage {
    /// Bucket every path is relative to.
    fn bucket(&self) -> &str;

    /// Store bytes at `path`. With `upsert` an existing object is replaced,
    /// otherwise an existing object is an error.
    async fn upload(&self, path: &str, upload: &Upload, upsert: bool) -> Result<()>;

    /// Publicly readable URL for an object path.
    fn public_url(&self, path: &str) -> String;

    /// Remove objects by path. Missing objects are not an error.
    async fn remove(&self, paths: &[String]) -> Result<()>;
}

/// File contents selected for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Build an upload, guessing the content type from the file name.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Read a local file for upload.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::InvalidInput(format!("{} has no usable file name", path.display()))
            })?
            .to_string();
        let bytes = std::fs::read(path)?;
        Ok(Self::new(file_name, bytes))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// `gallery/<millis>-<name>`
#[must_use]
pub fn gallery_object_path(file_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "gallery/{}-{}",
        now.timestamp_millis(),
        sanitize_file_name(file_name)
    )
}

/// `<user>/documents/<millis>-<name>`
#[must_use]
pub fn document_object_path(user_id: UserId, file_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "{user_id}/documents/{}-{}",
        now.timestamp_millis(),
        sanitize_file_name(file_name)
    )
}

/// `<user>/<name>`; re-uploading the same name replaces the icon.
#[must_use]
pub fn profile_icon_path(user_id: UserId, file_name: &str) -> String {
    format!("{user_id}/{}", sanitize_file_name(file_name))
}

/// Recover the object path from a public URL issued for `bucket`.
///
/// Everything after the `/object/public/<bucket>/` segments is the object path.
#[must_use]
pub fn object_path_from_public_url(public_url: &str, bucket: &str) -> Option<String> {
    let url = Url::parse(public_url).ok()?;
    let segments: Vec<&str> = url.path_segments()?.collect();
    let start = segments
        .windows(3)
        .position(|window| window == ["object", "public", bucket])?;

    let decoded: Vec<String> = segments[start + 3..]
        .iter()
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map_or_else(|_| (*segment).to_string(), std::borrow::Cow::into_owned)
        })
        .collect();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.join("/"))
    }
}

pub(crate) fn normalize_object_path(path: &str) -> Result<String> {
    let path = path.trim().trim_matches('/').to_string();
    if path.is_empty() {
        return Err(Error::InvalidInput(
            "Object path cannot be empty".to_string(),
        ));
    }
    Ok(path)
}

/// Percent-encode each segment of an object path for use in a URL.
pub(crate) fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn sanitize_file_name(file_name: &str) -> String {
    let trimmed = file_name.trim().rsplit('/').next().unwrap_or_default();
    let (stem, ext) = trimmed.rsplit_once('.').unwrap_or((trimmed, ""));
    let stem = match sanitize_token(stem) {
        stem if stem.is_empty() => "file".to_string(),
        stem => stem,
    };
    let ext = sanitize_token(ext);

    if ext.is_empty() {
        stem
    } else {
        format!("{stem}.{ext}")
    }
}

fn sanitize_token(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_dash = false;

    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }

    out.trim_matches('-').to_string()
}

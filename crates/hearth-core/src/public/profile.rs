use serde_json::json;

use super::PublicPage;
use crate::auth::AuthUser;
use crate::backend::{by_id, Backend, Table};
use crate::models::{Profile, UserId};
use crate::storage::{profile_icon_path, ObjectStorage, Upload};
use crate::{Error, Result};

impl<B: Backend, S: ObjectStorage> PublicPage<B, S> {
    pub async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>> {
        self.backend
            .fetch_optional(Table::Profiles, &by_id(user_id).select("*"))
            .await
    }

    /// Replace the user's icon and point their profile and map marker at it.
    ///
    /// The marker picks the new icon up from the next location change event.
    pub async fn upload_icon(&self, user: &AuthUser, upload: &Upload) -> Result<String> {
        if upload.is_empty() {
            return Err(Error::InvalidInput(
                "Please select an image to upload.".to_string(),
            ));
        }

        let path = profile_icon_path(user.id, &upload.file_name);
        self.storage.upload(&path, upload, true).await?;
        let icon_url = self.storage.public_url(&path);

        self.backend
            .upsert(
                Table::Profiles,
                json!({
                    "id": user.id,
                    "icon_url": icon_url,
                    "display_name": user.display_name,
                }),
            )
            .await?;

        // No locations row yet just means the user has never shared.
        let updated = self
            .backend
            .update(
                Table::Locations,
                &by_id(user.id),
                json!({ "icon_url": icon_url }),
            )
            .await?;
        tracing::debug!("Updated icon on {updated} location rows");

        Ok(icon_url)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::fixtures;
    use crate::public::tests::page;

    fn user() -> AuthUser {
        AuthUser {
            id: fixtures::user(),
            email: Some("ana@example.com".to_string()),
            display_name: "Ana".to_string(),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn icon_upload_updates_profile_and_marker_row() {
        let (page, backend, storage) = page();
        backend
            .seed(
                Table::Locations,
                vec![json!({
                    "id": fixtures::user(),
                    "lat": 1.0,
                    "lng": 2.0,
                    "display_name": "Ana",
                    "icon_url": null,
                    "updated_at": "2024-06-01T12:00:00+00:00"
                })],
            )
            .unwrap();

        let url = page
            .upload_icon(&user(), &Upload::new("Me.PNG", vec![1, 2, 3]))
            .await
            .unwrap();

        assert_eq!(
            storage.paths().unwrap(),
            vec![format!("{}/me.png", fixtures::user())]
        );
        let profile = page.get_profile(fixtures::user()).await.unwrap().unwrap();
        assert_eq!(profile.icon_url.as_deref(), Some(url.as_str()));
        assert_eq!(profile.display_name.as_deref(), Some("Ana"));
        assert_eq!(backend.rows(Table::Locations).unwrap()[0]["icon_url"], url);

        // Same file name replaces the stored icon.
        page.upload_icon(&user(), &Upload::new("Me.PNG", vec![4]))
            .await
            .unwrap();
        assert_eq!(storage.paths().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_profile_is_none() {
        let (page, _, _) = page();
        assert!(page.get_profile(fixtures::user()).await.unwrap().is_none());
    }
}

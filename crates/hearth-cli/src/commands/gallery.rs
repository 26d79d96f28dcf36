use chrono::Utc;
use hearth_core::models::PhotoId;
use hearth_core::{ClientConfig, PublicPage, Upload};

use crate::cli::GalleryCommands;
use crate::commands::common::{anonymous, format_photo_line, signed_in, SignedIn};
use crate::error::CliError;

pub async fn run_gallery(command: GalleryCommands, config: &ClientConfig) -> Result<(), CliError> {
    match command {
        GalleryCommands::List { json } => {
            let (backend, storage) = anonymous(config)?;
            let mut page = PublicPage::new(backend, storage);
            page.load_gallery().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(page.photos())?);
            } else if page.photos().is_empty() {
                println!("No photos yet");
            } else {
                let now = Utc::now();
                for photo in page.photos() {
                    println!("{}", format_photo_line(photo, now));
                }
            }
            Ok(())
        }
        GalleryCommands::Upload { path } => {
            let upload = Upload::from_path(&path)?;
            let SignedIn {
                backend, storage, ..
            } = signed_in(config).await?;
            let mut page = PublicPage::new(backend, storage);
            let url = page.upload_photo(&upload, Utc::now()).await?;
            println!("Uploaded {url}");
            Ok(())
        }
        GalleryCommands::Delete { id } => {
            let SignedIn {
                backend, storage, ..
            } = signed_in(config).await?;
            let mut page = PublicPage::new(backend, storage);
            page.delete_photo(Some(PhotoId(id))).await?;
            println!("Deleted photo {id}");
            Ok(())
        }
    }
}

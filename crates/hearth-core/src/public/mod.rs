//! Public page: gallery, notes, timeline, favorites and the signed-in
//! user's profile icon.

mod gallery;
mod profile;

use crate::backend::{Backend, Query, Table};
use crate::format::format_long_date;
use crate::models::{Favorite, GalleryPhoto, PublicNote, TimelineEntry};
use crate::notice::Notice;
use crate::storage::ObjectStorage;
use crate::Result;

pub struct PublicPage<B, S> {
    backend: B,
    storage: S,
    photos: Vec<GalleryPhoto>,
    notes: Vec<PublicNote>,
    timeline: Vec<TimelineEntry>,
    favorites: Vec<Favorite>,
}

impl<B: Backend, S: ObjectStorage> PublicPage<B, S> {
    pub const fn new(backend: B, storage: S) -> Self {
        Self {
            backend,
            storage,
            photos: Vec::new(),
            notes: Vec::new(),
            timeline: Vec::new(),
            favorites: Vec::new(),
        }
    }

    /// Load every section; a failing section does not stop the others.
    pub async fn load(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        if let Err(error) = self.load_gallery().await {
            notices.push(Notice::from_error("Loading gallery", &error));
        }
        if let Err(error) = self.load_notes().await {
            notices.push(Notice::from_error("Loading notes", &error));
        }
        if let Err(error) = self.load_timeline().await {
            notices.push(Notice::from_error("Loading timeline", &error));
        }
        if let Err(error) = self.load_favorites().await {
            notices.push(Notice::from_error("Loading favorites", &error));
        }
        notices
    }

    pub async fn load_notes(&mut self) -> Result<usize> {
        let query = Query::new()
            .select("content")
            .order("created_at", false);
        self.notes = self.backend.fetch(Table::Notes, &query).await?;
        Ok(self.notes.len())
    }

    pub async fn load_timeline(&mut self) -> Result<usize> {
        let query = Query::new().select("*").order("event_date", true);
        self.timeline = self.backend.fetch(Table::Timeline, &query).await?;
        Ok(self.timeline.len())
    }

    pub async fn load_favorites(&mut self) -> Result<usize> {
        let query = Query::new().select("item");
        self.favorites = self.backend.fetch(Table::Favorites, &query).await?;
        Ok(self.favorites.len())
    }

    /// Notes, newest first.
    #[must_use]
    pub fn notes(&self) -> &[PublicNote] {
        &self.notes
    }

    #[must_use]
    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    /// Timeline entries with their dates spelled out, oldest first.
    #[must_use]
    pub fn timeline_labels(&self) -> Vec<(String, &TimelineEntry)> {
        self.timeline
            .iter()
            .map(|entry| (format_long_date(entry.event_date), entry))
            .collect()
    }

    #[must_use]
    pub fn favorites(&self) -> &[Favorite] {
        &self.favorites
    }
}
